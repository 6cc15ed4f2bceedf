//! sigscope time-series engine
//!
//! This library holds the data side of a signal monitoring tool: it reads
//! recordings of fixed-size binary records through a read-only memory map,
//! keeps realtime samples in a memory-budgeted store, maps visible time spans
//! onto both, and reduces series to a plot-sized number of points. Rendering
//! is left to the host.
//!
//! # Features
//!
//! - **Recording files**: 653-byte records, decoded on demand, no copy of the file
//! - **Realtime buffer**: one FIFO ring per parameter under a shared memory budget
//! - **Windowing**: binary-searched index windows and scrollable realtime views
//! - **Downsampling**: bucket reduction that keeps spikes visible
//!
//! # Usage
//!
//! ```rust
//! use sigscope::{reduce, PlotPoint, RealtimeBuffer};
//!
//! // 10 MB shared by two parameters
//! let buffer = RealtimeBuffer::new(10, &["Signal_1", "Signal_2"]).unwrap();
//!
//! for t in 0..5_000 {
//!     buffer.append("Signal_1", t * 100, (t % 50) as f32).unwrap();
//! }
//!
//! let points: Vec<PlotPoint> = buffer
//!     .snapshot("Signal_1")
//!     .unwrap()
//!     .iter()
//!     .map(|p| PlotPoint::new(p.timestamp() as f64, f64::from(p.value())))
//!     .collect();
//!
//! let plotted = reduce(&points, 500).unwrap();
//! assert!(plotted.len() <= 500);
//! println!("{} MB in use", buffer.stats().used_bytes as f64 / 1_048_576.0);
//! ```

pub mod downsample;
pub mod error;
pub mod file_store;
pub mod format;
pub mod realtime;
pub mod record;
pub mod recording;
pub mod session;
pub mod window;

// Re-export main types for convenience
pub use downsample::{reduce, PlotPoint};
pub use error::{EngineError, Result};
pub use file_store::{FileStore, RecordRange};
pub use format::{format_elapsed_time, format_memory_size, format_time_from_seconds};
pub use realtime::{BufferStats, RealtimeBuffer, RealtimePoint, POINT_SIZE_BYTES};
pub use record::{decode, encode, Sample, RECORD_SIZE, SIGNAL_COUNT};
pub use recording::{CycleTransition, Recording};
pub use session::{RealtimeSession, SampleSource, SessionSettings, SessionStatus, SimulatedSource};
pub use window::{resolve_window, FileView, RealtimeView, TimeRange, Window};
