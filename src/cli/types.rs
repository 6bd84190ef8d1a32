//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::models::ControllerKind;

#[derive(Parser, Debug)]
#[command(name = "smc-tune")]
#[command(about = "Sliding-mode controller tuning by particle swarm optimization", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./smc-tune.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tune the gains of one controller kind
    Optimize(OptimizeArgs),

    /// Load and validate the configuration, then print it
    ValidateConfig,

    /// Check super-twisting gains against a Lipschitz bound
    CheckSta(CheckStaArgs),
}

#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    /// Controller kind: classical, super_twisting, adaptive, hybrid
    #[arg(short = 'k', long, default_value = "classical")]
    pub controller: ControllerKind,

    /// Number of particles (overrides the configuration)
    #[arg(short, long)]
    pub swarm_size: Option<usize>,

    /// Maximum number of iterations (overrides the configuration)
    #[arg(short, long)]
    pub iterations: Option<usize>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the full tuning report as JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckStaArgs {
    /// Proportional gain K1
    #[arg(long)]
    pub k1: f64,

    /// Integral gain K2
    #[arg(long)]
    pub k2: f64,

    /// Lipschitz bound L of the matched disturbance derivative
    #[arg(long, default_value = "1.0")]
    pub lipschitz: f64,
}
