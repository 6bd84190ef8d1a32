//! `smc-tune optimize`: tune one controller's gains on the reference plant.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::commands::{init_logging, load_config};
use crate::cli::output::{create_progress_bar, output, CommandOutput, ProgressBarExt, TableFormatter};
use crate::cli::types::{Cli, OptimizeArgs};
use crate::domain::models::GainBounds;
use crate::infrastructure::plant::{DoublePendulum, DoublePendulumFactory};
use crate::services::{TuningReport, TuningRequest, TuningService};

/// What the optimize command prints.
#[derive(Debug, Serialize)]
pub struct OptimizeOutput {
    /// The tuning report itself.
    #[serde(flatten)]
    pub report: TuningReport,
    /// Search bounds, shown beside the gains.
    pub bounds: GainBounds,
    /// Configured reference gains for comparison.
    pub reference_gains: Vec<f64>,
}

impl CommandOutput for OptimizeOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        format!(
            "{}\n\n{}\n\n{}",
            formatter.format_summary(&self.report),
            formatter.format_gains(&self.report, &self.bounds, &self.reference_gains),
            formatter.format_scenarios(&self.report),
        )
    }
}

/// Run `smc-tune optimize`.
pub fn execute(args: &OptimizeArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let _logger = init_logging(&config, cli.log_level.as_deref())?;

    let settings = config.controllers.get(args.controller).clone();
    let physics = config.physics;
    let service = TuningService::new(
        config,
        Arc::new(DoublePendulum::new(physics)),
        Arc::new(DoublePendulumFactory::new(physics)),
    );

    let request = TuningRequest {
        kind: Some(args.controller),
        swarm_size: args.swarm_size,
        iterations: args.iterations,
        seed: args.seed,
    };
    let iterations = request
        .iterations
        .unwrap_or(service.config().optimizer.iterations);

    let progress = create_progress_bar(iterations as u64 + 1, cli.json);
    let report = service
        .tune(&request, |record| progress.record(record))
        .with_context(|| format!("Failed to tune {} controller", args.controller));
    progress.finish_and_clear();
    let report = report?;

    if let Some(path) = &args.output {
        write_report(path, &report)?;
        info!(path = %path.display(), "wrote tuning report");
    }

    output(
        &OptimizeOutput {
            report,
            bounds: settings.bounds,
            reference_gains: settings.reference_gains.into_inner(),
        },
        cli.json,
    );
    Ok(())
}

fn write_report(path: &Path, report: &TuningReport) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report file {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
