//! Progress bar utilities using indicatif for terminal output

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::services::IterationRecord;

/// Style template for the optimizer progress bar
const PROGRESS_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg} (ETA: {eta})";

/// Progress bar characters for visual effect
const PROGRESS_CHARS: &str = "█▓▒░ ";

/// Create a progress bar over `total` optimizer iterations.
///
/// Draws to stderr so it never interleaves with command output. A hidden
/// bar is returned when `hidden` is set (JSON mode) or the template fails
/// to parse.
pub fn create_progress_bar(total: u64, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
        pb.set_style(style.progress_chars(PROGRESS_CHARS));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Extension trait for reporting optimizer iterations on a progress bar
pub trait ProgressBarExt {
    /// Advance to the record's iteration and show its best cost and status
    fn record(&self, record: &IterationRecord);
}

impl ProgressBarExt for ProgressBar {
    fn record(&self, record: &IterationRecord) {
        self.set_position(record.iteration as u64 + 1);
        let status = record
            .convergence
            .as_ref()
            .map_or("exploring", |m| m.status.as_str());
        self.set_message(format!("best {:.4e} [{status}]", record.best_cost));
    }
}
