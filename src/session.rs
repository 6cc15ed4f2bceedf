//! Realtime session: lifecycle, tick-driven ingestion and view state.
//!
//! The host calls [`RealtimeSession::advance`] from its own scheduling loop at
//! a fixed cadence; the session never spawns anything. Timestamps are
//! milliseconds since the epoch set by [`RealtimeSession::start`].

use crate::downsample::{reduce, PlotPoint};
use crate::error::{EngineError, Result};
use crate::format::{format_elapsed_time, format_memory_size};
use crate::realtime::{RealtimeBuffer, RealtimePoint};
use crate::window::{slice_by_time, RealtimeView, TimeRange};
use ahash::AHashMap as HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::f64::consts::TAU;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Produces the next value of a parameter for a tick.
pub trait SampleSource: Send {
    fn next_value(&mut self, parameter: &str, timestamp_ms: i64) -> f32;
}

/// Simulated feed: a slow sine per parameter with a random phase, plus
/// uniform noise.
pub struct SimulatedSource {
    rng: StdRng,
    phases: HashMap<String, f64>,
    period_ms: f64,
    amplitude: f64,
    noise: f64,
}

impl SimulatedSource {
    /// Seeded sources are reproducible; `None` seeds from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            phases: HashMap::new(),
            period_ms: 60_000.0,
            amplitude: 10.0,
            noise: 1.0,
        }
    }
}

impl SampleSource for SimulatedSource {
    fn next_value(&mut self, parameter: &str, timestamp_ms: i64) -> f32 {
        let phase = match self.phases.get(parameter) {
            Some(phase) => *phase,
            None => {
                let phase = self.rng.gen_range(0.0..TAU);
                self.phases.insert(parameter.to_string(), phase);
                phase
            }
        };
        let wave = (TAU * timestamp_ms as f64 / self.period_ms + phase).sin();
        let noise = self.rng.gen_range(-1.0..=1.0) * self.noise;
        (self.amplitude * wave + noise) as f32
    }
}

/// Plain-value settings for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub memory_budget_mb: usize,
    pub interval_ms: i64,
    pub window_duration_ms: i64,
    pub parameters: Vec<String>,
}

/// Display values for the host.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub running: bool,
    pub elapsed_ms: i64,
    pub elapsed: String,
    pub ticks: u64,
    pub memory_used_bytes: usize,
    pub memory_used: String,
    pub memory_budget_mb: usize,
    pub max_points_per_param: usize,
    pub total_points: usize,
    pub window_duration_ms: i64,
    pub scroll_offset_ms: i64,
    pub max_scroll_offset_ms: i64,
    pub visible: Option<TimeRange>,
}

#[derive(Debug, Clone, Copy)]
struct Clock {
    epoch_ms: i64,
    last_tick_ms: Option<i64>,
}

/// A realtime plotting session over a [`RealtimeBuffer`].
pub struct RealtimeSession {
    buffer: Arc<RealtimeBuffer>,
    source: Box<dyn SampleSource>,
    interval_ms: i64,
    clock: Option<Clock>,
    elapsed_ms: i64,
    ticks: u64,
    view: RealtimeView,
}

impl RealtimeSession {
    pub fn new(settings: SessionSettings, source: Box<dyn SampleSource>) -> Result<Self> {
        check_interval(settings.interval_ms)?;
        let view = RealtimeView::new(settings.window_duration_ms)?;
        let buffer = RealtimeBuffer::new(settings.memory_budget_mb, &settings.parameters)?;
        Ok(Self {
            buffer: Arc::new(buffer),
            source,
            interval_ms: settings.interval_ms,
            clock: None,
            elapsed_ms: 0,
            ticks: 0,
            view,
        })
    }

    /// Starts the session with its epoch at `now_ms`. Data from a previous
    /// run is discarded. Starting a running session does nothing.
    pub fn start(&mut self, now_ms: i64) {
        if self.is_running() {
            return;
        }
        self.buffer.clear();
        self.clock = Some(Clock {
            epoch_ms: now_ms,
            last_tick_ms: None,
        });
        self.elapsed_ms = 0;
        self.ticks = 0;
        self.view = RealtimeView {
            scroll_offset_ms: 0,
            ..self.view
        };
        info!(
            "Realtime session started ({} parameters, {} ms interval)",
            self.buffer.active_parameter_count(),
            self.interval_ms
        );
    }

    /// Stops appending. Idempotent; stored data and elapsed time stay
    /// available for scrolling.
    pub fn stop(&mut self) {
        if self.clock.take().is_some() {
            info!(
                "Realtime session stopped after {}",
                format_elapsed_time(self.elapsed_ms)
            );
        }
    }

    /// Stops and discards all data.
    pub fn reset(&mut self) {
        self.stop();
        self.buffer.clear();
        self.elapsed_ms = 0;
        self.ticks = 0;
        self.view = RealtimeView {
            scroll_offset_ms: 0,
            ..self.view
        };
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_some()
    }

    /// Tick. When at least one interval has passed since the previous tick,
    /// appends one value per active parameter. Returns the number of points
    /// stored.
    pub fn advance(&mut self, now_ms: i64) -> usize {
        let Some(clock) = self.clock.as_mut() else {
            return 0;
        };

        let timestamp = now_ms - clock.epoch_ms;
        self.elapsed_ms = self.elapsed_ms.max(timestamp);

        if let Some(last) = clock.last_tick_ms {
            if now_ms - last < self.interval_ms && now_ms >= last {
                return 0;
            }
        }
        clock.last_tick_ms = Some(now_ms);
        self.ticks += 1;

        let mut appended = 0;
        for parameter in self.buffer.parameters() {
            let value = self.source.next_value(&parameter, timestamp);
            match self.buffer.append(&parameter, timestamp, value) {
                Ok(()) => appended += 1,
                Err(e) => warn!("Dropping realtime sample: {}", e),
            }
        }
        debug!("Tick at {} ms: {} points", timestamp, appended);
        appended
    }

    pub fn set_interval(&mut self, interval_ms: i64) -> Result<()> {
        check_interval(interval_ms)?;
        self.interval_ms = interval_ms;
        Ok(())
    }

    pub fn set_memory_budget(&mut self, memory_budget_mb: usize) -> Result<()> {
        self.buffer.set_memory_budget(memory_budget_mb)
    }

    pub fn set_parameters<S: AsRef<str>>(&mut self, parameters: &[S]) {
        self.buffer.set_active_parameters(parameters);
    }

    pub fn set_window_duration(&mut self, window_duration_ms: i64) -> Result<()> {
        self.view = self
            .view
            .with_window_duration(window_duration_ms, self.elapsed_ms)?;
        Ok(())
    }

    /// Scrolls back by `offset_ms` from the latest data, clamped to the
    /// current scroll range.
    pub fn set_scroll_offset(&mut self, offset_ms: i64) {
        self.view = self.view.with_scroll_offset(offset_ms, self.elapsed_ms);
    }

    pub fn view(&self) -> RealtimeView {
        self.view
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    /// Milliseconds since start, as of the latest tick.
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed_ms
    }

    /// Upper bound of the scroll offset. Grows with elapsed time while the
    /// window duration stays fixed.
    pub fn scroll_range(&self) -> i64 {
        self.view.max_scroll_offset(self.elapsed_ms)
    }

    pub fn visible_window(&self) -> Option<TimeRange> {
        self.view
            .visible_window(self.elapsed_ms, self.buffer.time_range())
    }

    /// Visible points of `parameter`, reduced to at most `max_points`.
    pub fn visible_points(&self, parameter: &str, max_points: usize) -> Result<Vec<PlotPoint>> {
        let snapshot = self
            .buffer
            .snapshot(parameter)
            .ok_or_else(|| EngineError::invalid(format!("parameter '{parameter}' is not active")))?;
        let Some(range) = self.visible_window() else {
            return Ok(Vec::new());
        };

        let window = slice_by_time(&snapshot, RealtimePoint::timestamp, range);
        let points: Vec<PlotPoint> = snapshot[window.range()]
            .iter()
            .map(|p| PlotPoint::new(p.timestamp() as f64, f64::from(p.value())))
            .collect();
        reduce(&points, max_points)
    }

    /// Shared handle for readers on other threads.
    pub fn buffer(&self) -> Arc<RealtimeBuffer> {
        Arc::clone(&self.buffer)
    }

    pub fn status(&self) -> SessionStatus {
        let memory_used_bytes = self.buffer.memory_usage_bytes();
        SessionStatus {
            running: self.is_running(),
            elapsed_ms: self.elapsed_ms,
            elapsed: format_elapsed_time(self.elapsed_ms),
            ticks: self.ticks,
            memory_used_bytes,
            memory_used: format_memory_size(memory_used_bytes as u64),
            memory_budget_mb: self.buffer.memory_budget_mb(),
            max_points_per_param: self.buffer.max_points_per_param(),
            total_points: self.buffer.total_points(),
            window_duration_ms: self.view.window_duration_ms,
            scroll_offset_ms: self.view.scroll_offset_ms,
            max_scroll_offset_ms: self.scroll_range(),
            visible: self.visible_window(),
        }
    }
}

fn check_interval(interval_ms: i64) -> Result<()> {
    if interval_ms <= 0 {
        return Err(EngineError::invalid(format!(
            "tick interval must be positive, got {interval_ms} ms"
        )));
    }
    Ok(())
}
