//! `smc-tune validate-config`: load, validate and echo the configuration.

use anyhow::Result;
use serde::Serialize;

use crate::cli::commands::load_config;
use crate::cli::types::Cli;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, ControllerKind};

/// Result of `smc-tune validate-config`.
#[derive(Debug, Serialize)]
pub struct ValidateConfigOutput {
    pub valid: bool,
    /// Effective scenario count, uncertainty draws included.
    pub scenarios: usize,
    pub config: Config,
}

impl CommandOutput for ValidateConfigOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Configuration is valid ({} scenarios, swarm {} x {} iterations).",
            self.scenarios, self.config.optimizer.swarm_size, self.config.optimizer.iterations
        )];
        for kind in ControllerKind::ALL {
            let settings = self.config.controllers.get(kind);
            lines.push(format!(
                "  {kind:<15} gains {:?}  max_force {}  boundary_layer {}",
                kind.gain_names(),
                settings.max_force,
                settings.boundary_layer
            ));
        }
        lines.join("\n")
    }
}

/// Run `smc-tune validate-config`.
pub fn execute(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    output(
        &ValidateConfigOutput {
            valid: true,
            scenarios: config.effective_scenarios().len(),
            config,
        },
        cli.json,
    );
    Ok(())
}
