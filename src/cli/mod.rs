//! Command-line front-end for smc-tune.

pub mod commands;
pub mod output;
pub mod types;

pub use types::{CheckStaArgs, Cli, Commands, OptimizeArgs};

/// Print an error and exit with status 1.
///
/// In JSON mode the error chain is emitted as `{"error": ..., "causes": [...]}`
/// on stdout so scripted callers can parse it.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({ "error": err.to_string(), "causes": causes });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1)
}
