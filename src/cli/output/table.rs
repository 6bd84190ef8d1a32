//! Table output formatting for CLI commands
//!
//! Renders tuning reports and feasibility checks with comfy-table. Colors
//! are dropped when `NO_COLOR` is set or the terminal is dumb.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::env;

use crate::domain::models::{ConvergenceStatus, GainBounds};
use crate::services::controllers::StaFeasibility;
use crate::services::TuningReport;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
}

impl TableFormatter {
    /// Formatter that colors output unless `NO_COLOR` or a dumb terminal
    /// says otherwise.
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Tuned gains next to their reference values and search bounds
    pub fn format_gains(&self, report: &TuningReport, bounds: &GainBounds, reference: &[f64]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            self.header("Gain"),
            self.header("Tuned"),
            self.header("Reference"),
            self.header("Lower"),
            self.header("Upper"),
        ]);

        for (i, name) in report.gain_names.iter().enumerate() {
            table.add_row(vec![
                Cell::new(name),
                number(report.optimization.best_position.get(i).copied()),
                number(reference.get(i).copied()),
                number(bounds.lower.get(i).copied()),
                number(bounds.upper.get(i).copied()),
            ]);
        }

        table.to_string()
    }

    /// Run summary: costs, termination and convergence state
    pub fn format_summary(&self, report: &TuningReport) -> String {
        let result = &report.optimization;
        let mut table = self.create_base_table();
        table.set_header(vec![self.header("Field"), self.header("Value")]);

        let rows: Vec<(&str, Cell)> = vec![
            ("Controller", Cell::new(report.kind)),
            ("Run ID", Cell::new(result.run_id)),
            ("Seed", Cell::new(result.seed)),
            ("Best cost", Cell::new(format!("{:.6e}", result.best_cost))),
            ("Reference cost", Cell::new(format!("{:.6e}", report.reference_cost))),
            ("Improvement", Cell::new(format!("{:.1}%", report.improvement() * 100.0))),
            ("Status", self.status_cell(result.status)),
            ("Termination", Cell::new(result.termination.as_str())),
            ("Iterations", Cell::new(result.history.len().saturating_sub(1))),
            ("Evaluations", Cell::new(result.evaluations)),
            ("Duration", Cell::new(format!("{:.2}s", result.duration_secs()))),
        ];
        for (field, value) in rows {
            table.add_row(vec![Cell::new(field), value]);
        }

        table.to_string()
    }

    /// Per-scenario outcome of the tuned gains
    pub fn format_scenarios(&self, report: &TuningReport) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            self.header("Scenario"),
            self.header("Weight"),
            self.header("Cost"),
            self.header("Settling (s)"),
            self.header("Overshoot (rad)"),
            self.header("Outcome"),
        ]);

        for outcome in &report.best.scenarios {
            let settling = outcome
                .metrics
                .settling_time
                .map_or_else(|| "-".to_string(), |t| format!("{t:.2}"));
            let verdict = match &outcome.failure {
                None => self.colored("stable", Color::Green),
                Some(failure) => self.colored(
                    &format!("failed at {:.2}s: {:?}", failure.time, failure.reason),
                    Color::Red,
                ),
            };
            table.add_row(vec![
                Cell::new(&outcome.scenario),
                Cell::new(format!("{:.3}", outcome.weight)),
                Cell::new(format!("{:.4e}", outcome.cost.total())),
                Cell::new(settling),
                Cell::new(format!("{:.4}", outcome.metrics.max_overshoot)),
                verdict,
            ]);
        }

        table.to_string()
    }

    /// Super-twisting gain feasibility against a Lipschitz bound
    pub fn format_feasibility(&self, feasibility: &StaFeasibility) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            self.header("Condition"),
            self.header("Gain"),
            self.header("Required"),
            self.header("Result"),
        ]);
        table.add_row(vec![
            Cell::new("K1 > 2L"),
            Cell::new(format!("{:.4}", feasibility.k1)),
            Cell::new(format!("> {:.4}", feasibility.min_k1)),
            self.verdict(feasibility.proportional_ok()),
        ]);
        table.add_row(vec![
            Cell::new("K2 > (5 L K1 + 4 L²) / (2 K1)"),
            Cell::new(format!("{:.4}", feasibility.k2)),
            Cell::new(format!("> {:.4}", feasibility.min_k2)),
            self.verdict(feasibility.integral_ok()),
        ]);
        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }

    fn header(&self, text: &str) -> Cell {
        let cell = Cell::new(text).set_alignment(CellAlignment::Left);
        if self.use_colors {
            cell.add_attribute(Attribute::Bold)
        } else {
            cell
        }
    }

    fn colored(&self, text: &str, color: Color) -> Cell {
        let cell = Cell::new(text);
        if self.use_colors {
            cell.fg(color)
        } else {
            cell
        }
    }

    fn verdict(&self, ok: bool) -> Cell {
        if ok {
            self.colored("ok", Color::Green)
        } else {
            self.colored("violated", Color::Red)
        }
    }

    fn status_cell(&self, status: ConvergenceStatus) -> Cell {
        self.colored(status.as_str(), status_color(status))
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn number(value: Option<f64>) -> Cell {
    Cell::new(value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}")))
        .set_alignment(CellAlignment::Right)
}

/// Check if color output is supported
fn supports_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    !matches!(env::var("TERM"), Ok(term) if term == "dumb")
}

/// Map convergence status to color
fn status_color(status: ConvergenceStatus) -> Color {
    match status {
        ConvergenceStatus::Converged => Color::Green,
        ConvergenceStatus::Converging | ConvergenceStatus::Exploring => Color::Cyan,
        ConvergenceStatus::Stagnated | ConvergenceStatus::Oscillating => Color::Yellow,
        ConvergenceStatus::Diverging | ConvergenceStatus::PrematureConvergence => Color::Red,
        ConvergenceStatus::NotStarted | ConvergenceStatus::Initializing => Color::Grey,
    }
}
