//! Window command implementation.
//!
//! Resolves a window of a recording, reduces the selected parameters in
//! parallel and optionally exports the raw window as CSV.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use sigscope::record;
use sigscope::window::seconds_from_unit;
use sigscope::{
    format_time_from_seconds, reduce, EngineError, FileView, PlotPoint, Recording, Window,
};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::commands::emit;
use crate::config::Config;

/// Reduced series of one parameter.
#[derive(Debug, Serialize)]
pub struct SeriesSummary {
    pub parameter: String,
    pub raw_points: usize,
    pub plotted_points: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub points: Vec<PlotPoint>,
}

/// Window report for JSON/YAML output.
#[derive(Debug, Serialize)]
pub struct WindowReport {
    pub window: Window,
    pub window_duration: String,
    pub scroll_seconds: u64,
    pub scroll_range_seconds: u64,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub max_points: usize,
    pub series: Vec<SeriesSummary>,
}

#[derive(Debug)]
pub struct WindowRequest {
    pub file: PathBuf,
    pub window: i64,
    pub unit: usize,
    pub scroll: i64,
    pub parameters: Option<String>,
    pub csv: Option<PathBuf>,
    pub format: OutputFormat,
}

/// Resolves and reduces one window of a recording.
pub fn command_window(request: WindowRequest, config: &Config) -> anyhow::Result<()> {
    let recording = Recording::open(&request.file, config.recording.base_time)
        .with_context(|| format!("Failed to open recording {}", request.file.display()))?;

    let window_seconds =
        seconds_from_unit(request.unit, request.window).context("Invalid --window")?;
    let scroll_seconds =
        seconds_from_unit(request.unit, request.scroll).context("Invalid --scroll")?;
    let total_seconds = recording.total_seconds()?;

    let view = FileView::new(window_seconds)?.with_scroll(scroll_seconds, total_seconds);
    let window = recording.window_for_view(&view)?;
    info!(
        "Window {} at +{}s: records [{}, {})",
        format_time_from_seconds(view.window_seconds),
        view.scroll_seconds,
        window.start,
        window.end
    );

    let parameters = select_parameters(request.parameters.as_deref())?;
    let max_points = config.recording.max_points_per_series;

    let started = Instant::now();
    let series = parameters
        .par_iter()
        .map(|&p| summarize(&recording, p, window, max_points))
        .collect::<Result<Vec<_>, EngineError>>()
        .context("Failed to reduce window")?;
    debug!(
        "Reduced {} series in {:.3}s",
        series.len(),
        started.elapsed().as_secs_f64()
    );

    if let Some(csv) = &request.csv {
        let rows = if csv_to_stdout(Some(csv.as_path())) {
            recording.export_csv(window, &parameters, io::stdout().lock())?
        } else {
            let out = File::create(csv)
                .with_context(|| format!("Failed to create {}", csv.display()))?;
            recording.export_csv(window, &parameters, BufWriter::new(out))?
        };
        info!("Exported {} rows to {}", rows, csv.display());
    }

    // Stdout already carries the CSV
    if csv_to_stdout(request.csv.as_deref()) {
        return Ok(());
    }

    let (from, to) = if window.is_empty() {
        (None, None)
    } else {
        (
            Some(recording.timestamp_at(window.start)?),
            Some(recording.timestamp_at(window.end - 1)?),
        )
    };

    let report = WindowReport {
        window,
        window_duration: format_time_from_seconds(view.window_seconds),
        scroll_seconds: view.scroll_seconds,
        scroll_range_seconds: view.scroll_range(total_seconds),
        from,
        to,
        max_points,
        series,
    };

    emit(&report, request.format, print_text)
}

fn csv_to_stdout(csv: Option<&Path>) -> bool {
    csv.is_some_and(|p| p.as_os_str() == "-")
}

/// Parameter indices from a comma-separated list of names; all when `None`.
fn select_parameters(names: Option<&str>) -> anyhow::Result<Vec<usize>> {
    let Some(names) = names else {
        return Ok((0..record::SIGNAL_COUNT).collect());
    };

    let mut indices = Vec::new();
    for name in names.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match record::parameter_index(name) {
            Some(i) => indices.push(i),
            None => bail!("Unknown parameter '{}'", name),
        }
    }
    if indices.is_empty() {
        bail!("No parameters selected");
    }
    Ok(indices)
}

fn summarize(
    recording: &Recording,
    parameter: usize,
    window: Window,
    max_points: usize,
) -> Result<SeriesSummary, EngineError> {
    let raw = recording.signal_points(parameter, window)?;
    let points = reduce(&raw, max_points)?;
    let min = raw.iter().map(|p| p.y).reduce(f64::min);
    let max = raw.iter().map(|p| p.y).reduce(f64::max);
    Ok(SeriesSummary {
        parameter: record::parameter_name(parameter)
            .unwrap_or_default()
            .to_string(),
        raw_points: raw.len(),
        plotted_points: points.len(),
        min,
        max,
        points,
    })
}

fn print_text(report: &WindowReport) {
    println!(
        "🪟 Window {} (scroll {}s of {}s): records [{}, {})",
        report.window_duration,
        report.scroll_seconds,
        report.scroll_range_seconds,
        report.window.start,
        report.window.end
    );
    if let (Some(from), Some(to)) = (report.from, report.to) {
        println!("   {} .. {}", from, to);
    }
    println!(
        "\n   {:<12} {:>8} {:>8} {:>14} {:>14}",
        "PARAMETER", "RAW", "PLOTTED", "MIN", "MAX"
    );
    for s in &report.series {
        println!(
            "   {:<12} {:>8} {:>8} {:>14} {:>14}",
            s.parameter,
            s.raw_points,
            s.plotted_points,
            s.min.map_or("-".into(), |v| format!("{v:.3}")),
            s.max.map_or("-".into(), |v| format!("{v:.3}"))
        );
    }
}
