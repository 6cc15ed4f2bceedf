//! Memory-mapped access to recording files.
//!
//! The store maps the file read-only once at open time and decodes records on
//! demand. Nothing is copied out of the mapping until a caller asks for a
//! record, so windowing over a multi-gigabyte file only touches the pages it
//! reads.

use crate::error::{EngineError, Result};
use crate::record::{self, Sample, RECORD_SIZE};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read-only view over a recording file.
///
/// Owns the mapping; it is released exactly once, on [`FileStore::close`] or
/// when the store is dropped.
#[derive(Debug)]
pub struct FileStore {
    // None for an empty file, which cannot be mapped.
    mmap: Option<Mmap>,
    path: PathBuf,
    record_count: usize,
}

impl FileStore {
    /// Opens and maps a recording.
    ///
    /// Fails with [`EngineError::Io`] when the file cannot be opened or mapped
    /// or when its size is not an exact multiple of [`RECORD_SIZE`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| EngineError::io(&path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| EngineError::io(&path, e))?
            .len();

        if file_size % RECORD_SIZE as u64 != 0 {
            return Err(EngineError::io(
                &path,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "file size {} is not a multiple of the record size {} ({} trailing bytes)",
                        file_size,
                        RECORD_SIZE,
                        file_size % RECORD_SIZE as u64
                    ),
                ),
            ));
        }

        let file_size = usize::try_from(file_size).map_err(|_| {
            EngineError::io(
                &path,
                io::Error::new(io::ErrorKind::InvalidData, "file too large to map"),
            )
        })?;

        let mmap = if file_size == 0 {
            None
        } else {
            // SAFETY: the mapping is read-only and owned by the store. Recording
            // files are not expected to be modified while they are open.
            let mmap = unsafe { MmapOptions::new().len(file_size).map(&file) }
                .map_err(|e| EngineError::io(&path, e))?;
            Some(mmap)
        };

        let record_count = file_size / RECORD_SIZE;
        info!(
            "Mapped recording {} ({} records, {} bytes)",
            path.display(),
            record_count,
            file_size
        );

        Ok(Self {
            mmap,
            path,
            record_count,
        })
    }

    /// Path the store was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records in the file.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Returns true if the file holds no records.
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Size of the mapped file in bytes.
    pub fn file_size(&self) -> usize {
        self.record_count * RECORD_SIZE
    }

    /// Decodes record `i`.
    pub fn read_record(&self, i: usize) -> Result<Sample> {
        record::decode(self.record_bytes(i)?)
    }

    /// Lazy, restartable sequence over records `[i0, i1)`.
    pub fn read_range(&self, i0: usize, i1: usize) -> Result<RecordRange<'_>> {
        if i1 > self.record_count {
            return Err(EngineError::Index {
                index: i1,
                len: self.record_count,
            });
        }
        if i0 > i1 {
            return Err(EngineError::Index {
                index: i0,
                len: i1,
            });
        }
        Ok(RecordRange {
            store: self,
            start: i0,
            end: i1,
        })
    }

    /// Raw timestamp field of record `i` without decoding its signals.
    pub fn timestamp_at(&self, i: usize) -> Result<u64> {
        self.record_bytes(i).map(record::read_timestamp)
    }

    /// Cycle value of record `i` without decoding its signals.
    pub fn cycle_value_at(&self, i: usize) -> Result<u8> {
        self.record_bytes(i).and_then(record::read_cycle_value)
    }

    /// Single signal of record `i`.
    pub fn signal_at(&self, i: usize, parameter_index: usize) -> Result<f64> {
        if parameter_index >= record::SIGNAL_COUNT {
            return Err(EngineError::Index {
                index: parameter_index,
                len: record::SIGNAL_COUNT,
            });
        }
        self.record_bytes(i)
            .map(|buf| record::read_signal(buf, parameter_index))
    }

    /// Scans the whole file once and checks that `index` and `timestamp`
    /// strictly increase. Touches every page of the mapping.
    pub fn verify_ordering(&self) -> Result<()> {
        let mut previous: Option<(u32, u64)> = None;
        for i in 0..self.record_count {
            let buf = self.record_bytes(i)?;
            let current = (record::read_index(buf), record::read_timestamp(buf));
            if let Some((index, timestamp)) = previous {
                if current.0 <= index || current.1 <= timestamp {
                    return Err(EngineError::CorruptRecord(format!(
                        "record {} (index {}, timestamp {}) does not follow index {}, timestamp {}",
                        i, current.0, current.1, index, timestamp
                    )));
                }
            }
            previous = Some(current);
        }
        debug!("Verified ordering of {} records", self.record_count);
        Ok(())
    }

    /// Releases the mapping.
    pub fn close(self) {
        debug!("Closing recording {}", self.path.display());
        drop(self);
    }

    // Bytes of record `i`. Records with an invalid cycle value are rejected
    // here so that no single-field read interprets them.
    fn record_bytes(&self, i: usize) -> Result<&[u8]> {
        match &self.mmap {
            Some(mmap) if i < self.record_count => {
                let offset = i * RECORD_SIZE;
                let buf = &mmap[offset..offset + RECORD_SIZE];
                record::read_cycle_value(buf).map_err(|e| match e {
                    EngineError::CorruptRecord(msg) => {
                        EngineError::CorruptRecord(format!("record {i}: {msg}"))
                    }
                    other => other,
                })?;
                Ok(buf)
            }
            _ => Err(EngineError::Index {
                index: i,
                len: self.record_count,
            }),
        }
    }
}

/// A lazily decoded range of records.
///
/// `Copy`, so it can be iterated any number of times; every pass decodes
/// straight from the mapping.
#[derive(Debug, Clone, Copy)]
pub struct RecordRange<'a> {
    store: &'a FileStore,
    start: usize,
    end: usize,
}

impl<'a> RecordRange<'a> {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Record indices covered by the range.
    pub fn range_indices(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }

    /// Iterates the range. Decoding errors are yielded per record.
    pub fn iter(&self) -> RecordIter<'a> {
        RecordIter {
            store: self.store,
            next: self.start,
            end: self.end,
        }
    }
}

impl<'a> IntoIterator for RecordRange<'a> {
    type Item = Result<Sample>;
    type IntoIter = RecordIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &RecordRange<'a> {
    type Item = Result<Sample>;
    type IntoIter = RecordIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator behind [`RecordRange`].
#[derive(Debug, Clone)]
pub struct RecordIter<'a> {
    store: &'a FileStore,
    next: usize,
    end: usize,
}

impl Iterator for RecordIter<'_> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let item = self.store.read_record(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RecordIter<'_> {}

impl DoubleEndedIterator for RecordIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        self.end -= 1;
        Some(self.store.read_record(self.end))
    }
}
