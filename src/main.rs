//! smc-tune CLI entry point.

use clap::Parser;

use smc_tune::cli::commands;
use smc_tune::cli::{handle_error, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Optimize(args) => commands::optimize::execute(args, &cli),
        Commands::ValidateConfig => commands::validate_config::execute(&cli),
        Commands::CheckSta(args) => commands::check_sta::execute(args, cli.json),
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
