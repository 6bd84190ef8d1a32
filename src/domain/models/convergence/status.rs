//! Search-state classification for an optimization run.
//!
//! ```text
//! NotStarted → Initializing → Exploring → { Converging → Converged
//!                                         | Stagnated
//!                                         | Oscillating
//!                                         | Diverging
//!                                         | PrematureConvergence }
//! ```
//!
//! The status is recomputed every iteration from the trailing window, so a
//! run may move back from `Converging` to `Exploring` when a new basin opens.
//! `PrematureConvergence` is never counted as convergence.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The current search state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStatus {
    /// No iteration has been analyzed.
    #[default]
    NotStarted,
    /// Fewer iterations than the analysis window requires.
    Initializing,
    /// Fitness still improving substantially; population spread out.
    Exploring,
    /// One convergence criterion holds, or improvement is steady and shrinking.
    Converging,
    /// Two or more independent convergence criteria agree.
    Converged,
    /// No meaningful improvement for the stagnation window while the
    /// population is still dispersed.
    Stagnated,
    /// Fitness deltas alternate sign with non-negligible amplitude.
    Oscillating,
    /// Fitness is consistently getting worse.
    Diverging,
    /// Diversity collapsed early or quickly without matching fitness gain.
    PrematureConvergence,
}

impl ConvergenceStatus {
    /// snake_case name used in logs and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Initializing => "initializing",
            Self::Exploring => "exploring",
            Self::Converging => "converging",
            Self::Converged => "converged",
            Self::Stagnated => "stagnated",
            Self::Oscillating => "oscillating",
            Self::Diverging => "diverging",
            Self::PrematureConvergence => "premature_convergence",
        }
    }

    /// True only for genuine convergence.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }

    /// States after which further iterations are unlikely to help.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Converged | Self::Stagnated | Self::Diverging | Self::PrematureConvergence
        )
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premature_is_not_converged() {
        assert!(!ConvergenceStatus::PrematureConvergence.is_converged());
        assert!(ConvergenceStatus::PrematureConvergence.is_terminal());
        assert!(ConvergenceStatus::Converged.is_converged());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ConvergenceStatus::PrematureConvergence).unwrap();
        assert_eq!(json, "\"premature_convergence\"");
    }
}
