//! CLI command implementations for sigscope.
//!
//! This module provides implementations for all CLI subcommands:
//! - `inspect`: Recording summary
//! - `window`: Window resolution, parallel reduction and CSV export
//! - `simulate`: Realtime session on simulated data
//! - `generate`: Synthetic recording generation
//! - `config`: Configuration file generation

pub mod config;
pub mod generate;
pub mod inspect;
pub mod simulate;
pub mod window;

use crate::cli::OutputFormat;
use anyhow::Context;
use serde::Serialize;

// Re-export command functions
pub use config::command_config;
pub use generate::command_generate_testdata;
pub use inspect::command_inspect;
pub use simulate::command_simulate;
pub use window::command_window;

/// Prints `report` as JSON or YAML, or through `text` for the text format.
fn emit<T: Serialize>(
    report: &T,
    format: OutputFormat,
    text: impl FnOnce(&T),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => text(report),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialize report")?
        ),
        OutputFormat::Yaml => print!(
            "{}",
            serde_yaml::to_string(report).context("Failed to serialize report")?
        ),
    }
    Ok(())
}
