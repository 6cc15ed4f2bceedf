//! Inspect command implementation.
//!
//! Summarizes a recording: size, time span and cycle transitions.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sigscope::{format_memory_size, format_time_from_seconds, CycleTransition, Recording, Window};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::commands::emit;
use crate::config::Config;

/// Inspect report for JSON/YAML output.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub path: PathBuf,
    pub records: usize,
    pub file_size: String,
    pub base_time: DateTime<Utc>,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    pub duration: String,
    pub ordering_verified: Option<bool>,
    pub cycle_transitions: Vec<CycleTransition>,
}

/// Prints a summary of a recording.
pub fn command_inspect(
    file: PathBuf,
    verify: bool,
    format: OutputFormat,
    config: &Config,
) -> anyhow::Result<()> {
    let recording = Recording::open(&file, config.recording.base_time)
        .with_context(|| format!("Failed to open recording {}", file.display()))?;
    info!(
        "Inspecting {} ({} records)",
        file.display(),
        recording.record_count()
    );

    let ordering_verified = if verify {
        recording
            .store()
            .verify_ordering()
            .with_context(|| format!("Ordering check failed for {}", file.display()))?;
        Some(true)
    } else {
        None
    };

    let all = Window::new(0, recording.record_count(), recording.record_count())?;
    let cycle_transitions = recording.cycle_transitions(all)?;
    debug!("Found {} cycle transitions", cycle_transitions.len());

    let report = InspectReport {
        records: recording.record_count(),
        file_size: format_memory_size(recording.store().file_size() as u64),
        base_time: recording.base_time(),
        first: recording.first_timestamp()?,
        last: recording.last_timestamp()?,
        duration: format_time_from_seconds(recording.total_seconds()?),
        ordering_verified,
        cycle_transitions,
        path: file,
    };

    emit(&report, format, print_text)
}

fn print_text(report: &InspectReport) {
    println!("📄 {}", report.path.display());
    println!("   Records:   {}", report.records);
    println!("   File size: {}", report.file_size);
    match (report.first, report.last) {
        (Some(first), Some(last)) => {
            println!("   First:     {}", first);
            println!("   Last:      {}", last);
            println!("   Duration:  {}", report.duration);
        }
        _ => println!("   (empty recording)"),
    }
    if report.ordering_verified == Some(true) {
        println!("   ✅ Timestamps are strictly increasing");
    }

    println!("\n   Cycle transitions: {}", report.cycle_transitions.len());
    for t in &report.cycle_transitions {
        println!(
            "     #{:<8} {}  {} -> {}",
            t.index, t.timestamp, t.from, t.to
        );
    }
}
