//! `smc-tune check-sta`: super-twisting gain feasibility.

use anyhow::{ensure, Result};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::cli::types::CheckStaArgs;
use crate::services::controllers::{validate_sta_gains, StaFeasibility};

/// Result of `smc-tune check-sta`.
#[derive(Debug, Serialize)]
pub struct CheckStaOutput {
    pub feasible: bool,
    #[serde(flatten)]
    pub feasibility: StaFeasibility,
}

impl CommandOutput for CheckStaOutput {
    fn to_human(&self) -> String {
        let verdict = if self.feasible {
            "Gains satisfy the super-twisting convergence conditions."
        } else {
            "Gains violate the super-twisting convergence conditions."
        };
        format!(
            "{}\n{verdict}",
            TableFormatter::new().format_feasibility(&self.feasibility)
        )
    }
}

/// Run `smc-tune check-sta`.
pub fn execute(args: &CheckStaArgs, json_mode: bool) -> Result<()> {
    ensure!(
        args.lipschitz.is_finite() && args.lipschitz >= 0.0,
        "Lipschitz bound must be finite and non-negative, got {}",
        args.lipschitz
    );
    let feasibility = validate_sta_gains(args.k1, args.k2, args.lipschitz);
    output(
        &CheckStaOutput {
            feasible: feasibility.is_feasible(),
            feasibility,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let feasibility = validate_sta_gains(25.0, 15.0, 1.0);
        let out = CheckStaOutput {
            feasible: feasibility.is_feasible(),
            feasibility,
        };
        let json = out.to_json();
        assert_eq!(json["feasible"], serde_json::Value::Bool(true));
        assert_eq!(json["min_k1"], serde_json::json!(2.0));
    }

    #[test]
    fn test_negative_lipschitz_rejected() {
        let args = CheckStaArgs {
            k1: 10.0,
            k2: 5.0,
            lipschitz: -1.0,
        };
        assert!(execute(&args, true).is_err());
    }
}
