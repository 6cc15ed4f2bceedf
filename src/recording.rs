//! Recording: a file store bound to its base time.
//!
//! Record timestamps are millisecond offsets; the base time is supplied from
//! outside the file (config or command line). All window lookups binary-search
//! straight through the mapping.

use crate::downsample::PlotPoint;
use crate::error::{EngineError, Result};
use crate::file_store::FileStore;
use crate::record::{self, SIGNAL_COUNT};
use crate::window::{resolve_window_by, FileView, Window};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Index where the cycle value changes from the previous record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleTransition {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub from: u8,
    pub to: u8,
}

/// A loaded recording file.
#[derive(Debug)]
pub struct Recording {
    store: FileStore,
    base_time: DateTime<Utc>,
}

impl Recording {
    pub fn open(path: impl AsRef<Path>, base_time: DateTime<Utc>) -> Result<Self> {
        Ok(Self::from_store(FileStore::open(path)?, base_time))
    }

    pub fn from_store(store: FileStore, base_time: DateTime<Utc>) -> Self {
        Self { store, base_time }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn base_time(&self) -> DateTime<Utc> {
        self.base_time
    }

    pub fn record_count(&self) -> usize {
        self.store.record_count()
    }

    /// Absolute timestamp of record `i`.
    pub fn timestamp_at(&self, i: usize) -> Result<DateTime<Utc>> {
        self.absolute(i, self.store.timestamp_at(i)?)
    }

    fn absolute(&self, i: usize, offset: u64) -> Result<DateTime<Utc>> {
        i64::try_from(offset)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|d| self.base_time.checked_add_signed(d))
            .ok_or_else(|| {
                EngineError::CorruptRecord(format!(
                    "record {i}: timestamp offset {offset} ms out of range"
                ))
            })
    }

    pub fn first_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        if self.store.is_empty() {
            return Ok(None);
        }
        self.timestamp_at(0).map(Some)
    }

    pub fn last_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        match self.store.record_count() {
            0 => Ok(None),
            n => self.timestamp_at(n - 1).map(Some),
        }
    }

    /// Whole seconds between the first and the last record.
    pub fn total_seconds(&self) -> Result<u64> {
        match (self.first_timestamp()?, self.last_timestamp()?) {
            (Some(first), Some(last)) => Ok((last - first).num_seconds().max(0) as u64),
            _ => Ok(0),
        }
    }

    /// All timestamps. Costs 12 bytes per record; prefer [`Self::resolve_window`].
    pub fn timestamps(&self) -> Result<Vec<DateTime<Utc>>> {
        (0..self.store.record_count())
            .map(|i| self.timestamp_at(i))
            .collect()
    }

    /// Smallest index window holding every record in `[t0, t1]`.
    pub fn resolve_window(&self, t0: DateTime<Utc>, t1: DateTime<Utc>) -> Result<Window> {
        let window = resolve_window_by(
            self.store.record_count(),
            |i| self.timestamp_at(i),
            &t0,
            &t1,
        )?;
        debug!(
            "Resolved {} .. {} to records [{}, {})",
            t0, t1, window.start, window.end
        );
        Ok(window)
    }

    /// Index window for a [`FileView`] positioned from the first record.
    pub fn window_for_view(&self, view: &FileView) -> Result<Window> {
        match self.first_timestamp()? {
            Some(first) => {
                let (t0, t1) = view.time_range(first)?;
                self.resolve_window(t0, t1)
            }
            None => Ok(Window::empty(0)),
        }
    }

    /// Plot series of one parameter over `window`; `x` is epoch milliseconds.
    pub fn signal_points(&self, parameter_index: usize, window: Window) -> Result<Vec<PlotPoint>> {
        if parameter_index >= SIGNAL_COUNT {
            return Err(EngineError::Index {
                index: parameter_index,
                len: SIGNAL_COUNT,
            });
        }
        self.check_window(window)?;

        window
            .range()
            .map(|i| {
                let x = self.timestamp_at(i)?.timestamp_millis() as f64;
                let y = self.store.signal_at(i, parameter_index)?;
                Ok(PlotPoint::new(x, y))
            })
            .collect()
    }

    /// Cycle value changes inside `window`, compared record to record.
    pub fn cycle_transitions(&self, window: Window) -> Result<Vec<CycleTransition>> {
        self.check_window(window)?;

        let mut transitions = Vec::new();
        let mut previous: Option<u8> = None;
        for i in window.range() {
            let value = self.store.cycle_value_at(i)?;
            if let Some(from) = previous.filter(|&p| p != value) {
                transitions.push(CycleTransition {
                    index: i,
                    timestamp: self.timestamp_at(i)?,
                    from,
                    to: value,
                });
            }
            previous = Some(value);
        }
        Ok(transitions)
    }

    /// Writes `window` as CSV: `index,timestamp,cycle_value` followed by the
    /// selected parameters. Returns the number of data rows written.
    pub fn export_csv<W: Write>(
        &self,
        window: Window,
        parameter_indices: &[usize],
        mut writer: W,
    ) -> Result<usize> {
        let mut header = String::from("index,timestamp,cycle_value");
        for &p in parameter_indices {
            let name = record::parameter_name(p).ok_or(EngineError::Index {
                index: p,
                len: SIGNAL_COUNT,
            })?;
            header.push(',');
            header.push_str(name);
        }
        self.write_line(&mut writer, &header)?;

        let mut rows = 0;
        let range = self.store.read_range(window.start, window.end)?;
        for (i, sample) in range.range_indices().zip(range) {
            let sample = sample?;
            let timestamp = self.absolute(i, sample.timestamp)?;
            let mut line = format!(
                "{},{},{}",
                sample.index,
                timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                sample.cycle_value
            );
            for &p in parameter_indices {
                line.push(',');
                line.push_str(&sample.signal_values[p].to_string());
            }
            self.write_line(&mut writer, &line)?;
            rows += 1;
        }

        writer
            .flush()
            .map_err(|e| EngineError::io(self.store.path(), e))?;
        Ok(rows)
    }

    fn write_line<W: Write>(&self, writer: &mut W, line: &str) -> Result<()> {
        writeln!(writer, "{line}").map_err(|e| EngineError::io(self.store.path(), e))
    }

    fn check_window(&self, window: Window) -> Result<()> {
        Window::new(window.start, window.end, self.store.record_count()).map(|_| ())
    }
}
