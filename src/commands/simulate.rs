//! Simulate command implementation.
//!
//! Drives a realtime session from a simulated source and prints what a plot
//! would show at the end.

use anyhow::Context;
use serde::Serialize;
use sigscope::{PlotPoint, RealtimeSession, SessionStatus, SimulatedSource};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::commands::emit;
use crate::config::Config;

/// Visible series of one parameter.
#[derive(Debug, Serialize)]
pub struct VisibleSeries {
    pub parameter: String,
    pub points: Vec<PlotPoint>,
}

/// Simulation report for JSON/YAML output.
#[derive(Debug, Serialize)]
pub struct SimulateReport {
    pub status: SessionStatus,
    pub series: Vec<VisibleSeries>,
}

/// Runs a simulated realtime session.
///
/// Without `realtime` the session clock is advanced by one interval per tick,
/// so an hour of data takes no wall-clock time.
pub fn command_simulate(
    duration_seconds: u64,
    realtime: bool,
    scroll_seconds: i64,
    format: OutputFormat,
    config: &Config,
) -> anyhow::Result<()> {
    let settings = config.realtime.session_settings();
    let interval_ms = settings.interval_ms;
    let parameters = settings.parameters.clone();
    let duration_ms = i64::try_from(duration_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);

    let source = SimulatedSource::new(config.realtime.seed);
    let mut session = RealtimeSession::new(settings, Box::new(source))
        .context("Failed to create realtime session")?;

    info!(
        "Simulating {}s of realtime data for {} parameters",
        duration_seconds,
        parameters.len()
    );

    if realtime {
        let started = Instant::now();
        session.start(0);
        loop {
            let now_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
            if now_ms > duration_ms {
                break;
            }
            session.advance(now_ms);
            thread::sleep(Duration::from_millis(interval_ms.unsigned_abs().min(100)));
        }
    } else {
        session.start(0);
        let mut now_ms = 0;
        while now_ms <= duration_ms {
            session.advance(now_ms);
            now_ms = now_ms.saturating_add(interval_ms);
        }
    }
    session.stop();

    session.set_scroll_offset(scroll_seconds.saturating_mul(1000));
    let max_points = config.recording.max_points_per_series;
    let mut series = Vec::with_capacity(parameters.len());
    for parameter in &parameters {
        let points = session
            .visible_points(parameter, max_points)
            .with_context(|| format!("Failed to read visible points of {}", parameter))?;
        debug!("{}: {} visible points", parameter, points.len());
        series.push(VisibleSeries {
            parameter: parameter.clone(),
            points,
        });
    }

    let report = SimulateReport {
        status: session.status(),
        series,
    };
    emit(&report, format, print_text)
}

fn print_text(report: &SimulateReport) {
    let s = &report.status;
    println!("⏱  Elapsed:       {} ({} ticks)", s.elapsed, s.ticks);
    println!(
        "💾 Memory:        {} of {} MB ({} points, cap {} per parameter)",
        s.memory_used, s.memory_budget_mb, s.total_points, s.max_points_per_param
    );
    println!(
        "🔭 Scroll:        {} of {} ms (window {} ms)",
        s.scroll_offset_ms, s.max_scroll_offset_ms, s.window_duration_ms
    );
    if let Some(visible) = s.visible {
        println!("   Visible:       {} .. {} ms", visible.start, visible.end);
    }
    println!();
    for series in &report.series {
        let last = series
            .points
            .last()
            .map_or("-".to_string(), |p| format!("{:.3}", p.y));
        println!(
            "   {:<12} {:>8} points, last {}",
            series.parameter,
            series.points.len(),
            last
        );
    }
}
