//! Record codec for recording files.
//!
//! A recording is a flat concatenation of fixed-size records with no framing.
//! Each record is packed little-endian in field order:
//!
//! | offset | size | field          |
//! |--------|------|----------------|
//! | 0      | 4    | index (u32)    |
//! | 4      | 8    | timestamp (u64, ms offset from the base time) |
//! | 12     | 1    | cycle value (u8, 1..=8) |
//! | 13     | 640  | 80 × f64 signal values |

use crate::error::{EngineError, Result};
use once_cell::sync::Lazy;

/// Number of signal channels in a record.
pub const SIGNAL_COUNT: usize = 80;

const INDEX_OFFSET: usize = 0;
const TIMESTAMP_OFFSET: usize = 4;
const CYCLE_OFFSET: usize = 12;
const SIGNALS_OFFSET: usize = 13;

/// Size of a single on-disk record in bytes (653, no padding).
pub const RECORD_SIZE: usize = SIGNALS_OFFSET + SIGNAL_COUNT * 8;

/// Valid range of the cycle value tag.
pub const CYCLE_MIN: u8 = 1;
pub const CYCLE_MAX: u8 = 8;

static PARAMETER_NAMES: Lazy<Vec<String>> = Lazy::new(|| {
    (1..=SIGNAL_COUNT)
        .map(|i| format!("Signal_{i}"))
        .collect()
});

/// One decoded record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub index: u32,
    pub timestamp: u64,
    pub cycle_value: u8,
    pub signal_values: [f64; SIGNAL_COUNT],
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            index: 0,
            timestamp: 0,
            cycle_value: CYCLE_MIN,
            signal_values: [0.0; SIGNAL_COUNT],
        }
    }
}

/// Decodes one record. The slice must be exactly [`RECORD_SIZE`] bytes.
pub fn decode(buf: &[u8]) -> Result<Sample> {
    if buf.len() != RECORD_SIZE {
        return Err(EngineError::CorruptRecord(format!(
            "expected {} bytes, got {}",
            RECORD_SIZE,
            buf.len()
        )));
    }

    let cycle_value = read_cycle_value(buf)?;

    let mut signal_values = [0.0; SIGNAL_COUNT];
    for (i, value) in signal_values.iter_mut().enumerate() {
        *value = f64::from_le_bytes(read_array(buf, SIGNALS_OFFSET + i * 8));
    }

    Ok(Sample {
        index: read_index(buf),
        timestamp: read_timestamp(buf),
        cycle_value,
        signal_values,
    })
}

/// Encodes a sample into a fresh record buffer.
pub fn encode(sample: &Sample) -> [u8; RECORD_SIZE] {
    let mut buf = [0u8; RECORD_SIZE];
    encode_into(sample, &mut buf);
    buf
}

/// Encodes a sample into `buf`, which must hold at least [`RECORD_SIZE`] bytes.
///
/// # Panics
/// Panics if `buf` is shorter than [`RECORD_SIZE`].
pub fn encode_into(sample: &Sample, buf: &mut [u8]) {
    buf[INDEX_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&sample.index.to_le_bytes());
    buf[TIMESTAMP_OFFSET..CYCLE_OFFSET].copy_from_slice(&sample.timestamp.to_le_bytes());
    buf[CYCLE_OFFSET] = sample.cycle_value;
    for (i, value) in sample.signal_values.iter().enumerate() {
        let offset = SIGNALS_OFFSET + i * 8;
        buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }
}

// Field readers used by the file store to avoid decoding all 80 signals when
// only one field is needed. Callers guarantee `buf.len() == RECORD_SIZE`.

pub(crate) fn read_index(buf: &[u8]) -> u32 {
    u32::from_le_bytes(read_array(buf, INDEX_OFFSET))
}

pub(crate) fn read_timestamp(buf: &[u8]) -> u64 {
    u64::from_le_bytes(read_array(buf, TIMESTAMP_OFFSET))
}

/// Cycle value of a record, rejecting tags outside `1..=8`.
pub(crate) fn read_cycle_value(buf: &[u8]) -> Result<u8> {
    let cycle_value = buf[CYCLE_OFFSET];
    if !(CYCLE_MIN..=CYCLE_MAX).contains(&cycle_value) {
        return Err(EngineError::CorruptRecord(format!(
            "cycle value {cycle_value} outside {CYCLE_MIN}..={CYCLE_MAX}"
        )));
    }
    Ok(cycle_value)
}

pub(crate) fn read_signal(buf: &[u8], parameter_index: usize) -> f64 {
    f64::from_le_bytes(read_array(buf, SIGNALS_OFFSET + parameter_index * 8))
}

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

/// All file parameter names, `Signal_1` through `Signal_80`.
pub fn parameter_names() -> &'static [String] {
    &PARAMETER_NAMES
}

/// Name of the parameter at `parameter_index` (0-based).
pub fn parameter_name(parameter_index: usize) -> Option<&'static str> {
    PARAMETER_NAMES.get(parameter_index).map(String::as_str)
}

/// Index of a `Signal_N` parameter name.
pub fn parameter_index(name: &str) -> Option<usize> {
    let n: usize = name.strip_prefix("Signal_")?.parse().ok()?;
    (1..=SIGNAL_COUNT).contains(&n).then(|| n - 1)
}

/// Case-insensitive substring filter over parameter names. An empty query
/// keeps everything.
pub fn filter_parameters<'a, S: AsRef<str>>(names: &'a [S], query: &str) -> Vec<&'a str> {
    let query = query.trim().to_lowercase();
    names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| query.is_empty() || name.to_lowercase().contains(&query))
        .collect()
}
