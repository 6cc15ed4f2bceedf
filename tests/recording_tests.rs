//! Integration tests for recordings.
//!
//! These tests write real recording files and exercise the file store,
//! window resolution and reduction through the public API.

use chrono::{DateTime, Duration, TimeZone, Utc};
use sigscope::window::seconds_from_unit;
use sigscope::{
    encode, reduce, resolve_window, EngineError, FileStore, FileView, Recording, Sample, Window,
    RECORD_SIZE,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

/// One record per second with a sawtooth on Signal_1.
fn write_recording(count: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for i in 0..count {
        let mut sample = Sample {
            index: i as u32,
            timestamp: i as u64 * 1000,
            cycle_value: 1 + (i / 100 % 8) as u8,
            ..Sample::default()
        };
        sample.signal_values[0] = (i % 20) as f64;
        sample.signal_values[79] = -(i as f64);
        file.write_all(&encode(&sample)).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_open_and_read_back() {
    let file = write_recording(250);
    let store = FileStore::open(file.path()).unwrap();
    assert_eq!(store.record_count(), 250);
    assert_eq!(store.file_size(), 250 * RECORD_SIZE);

    let sample = store.read_record(123).unwrap();
    assert_eq!(sample.index, 123);
    assert_eq!(sample.timestamp, 123_000);
    assert_eq!(sample.cycle_value, 2);
    assert_eq!(sample.signal_values[0], 3.0);
    assert_eq!(sample.signal_values[79], -123.0);

    assert!(matches!(
        store.read_record(250),
        Err(EngineError::Index { index: 250, len: 250 })
    ));
    store.verify_ordering().unwrap();
}

#[test]
fn test_truncated_file_is_rejected() {
    let mut file = write_recording(3);
    file.write_all(&[0u8; 10]).unwrap();
    file.flush().unwrap();
    assert!(matches!(
        FileStore::open(file.path()),
        Err(EngineError::Io { .. })
    ));
}

#[test]
fn test_missing_file_is_rejected() {
    let err = FileStore::open("/nonexistent/recording.bin").unwrap_err();
    assert!(matches!(err, EngineError::Io { .. }));
}

#[test]
fn test_range_is_restartable() {
    let file = write_recording(50);
    let store = FileStore::open(file.path()).unwrap();
    let range = store.read_range(10, 20).unwrap();

    let first: Vec<u32> = range.iter().map(|s| s.unwrap().index).collect();
    let second: Vec<u32> = range.into_iter().map(|s| s.unwrap().index).collect();
    assert_eq!(first, (10..20).collect::<Vec<u32>>());
    assert_eq!(first, second);

    assert!(store.read_range(20, 10).is_err());
    assert!(store.read_range(0, 51).is_err());
    assert!(store.read_range(50, 50).unwrap().is_empty());
}

#[test]
fn test_window_of_ten_seconds() {
    let file = write_recording(100);
    let rec = Recording::open(file.path(), base()).unwrap();

    let t0 = base() + Duration::seconds(10);
    let t1 = base() + Duration::seconds(20);
    let window = rec.resolve_window(t0, t1).unwrap();
    assert_eq!(window, Window { start: 10, end: 21 });

    // Same answer as the search over materialized timestamps
    let timestamps = rec.timestamps().unwrap();
    assert_eq!(window, resolve_window(&t0, &t1, &timestamps));
}

#[test]
fn test_scrolled_view_reduces_to_budget() {
    let file = write_recording(3600);
    let rec = Recording::open(file.path(), base()).unwrap();
    let total = rec.total_seconds().unwrap();
    assert_eq!(total, 3599);

    let view = FileView::new(600).unwrap().with_scroll(1200, total);
    let window = rec.window_for_view(&view).unwrap();
    assert_eq!(window, Window { start: 1200, end: 1801 });

    let points = rec.signal_points(0, window).unwrap();
    assert_eq!(points.len(), 601);
    let reduced = reduce(&points, 100).unwrap();
    assert!(reduced.len() <= 100);
    // Buckets that start on the rising edge keep the peak
    assert!(reduced.iter().any(|p| p.y == 19.0));
    assert!(reduced.windows(2).all(|w| w[0].x < w[1].x));
}

#[test]
fn test_scroll_clamps_at_end() {
    let file = write_recording(100);
    let rec = Recording::open(file.path(), base()).unwrap();
    let total = rec.total_seconds().unwrap();

    let view = FileView::new(30).unwrap().with_scroll(10_000, total);
    assert_eq!(view.scroll_seconds, 69);
    let window = rec.window_for_view(&view).unwrap();
    assert_eq!(window.end, 100);
}

#[test]
fn test_huge_window_covers_recording() {
    let file = write_recording(3);
    let rec = Recording::open(file.path(), base()).unwrap();
    let total = rec.total_seconds().unwrap();

    let view = FileView::new(seconds_from_unit(2, 3_000_000_000).unwrap())
        .unwrap()
        .with_scroll(0, total);
    assert_eq!(view.scroll_seconds, 0);
    assert_eq!(rec.window_for_view(&view).unwrap(), Window { start: 0, end: 3 });
}

#[test]
fn test_bad_cycle_value_is_never_plotted() {
    let file = write_recording(3);
    let mut bytes = std::fs::read(file.path()).unwrap();
    bytes[RECORD_SIZE + 12] = 0;
    std::fs::write(file.path(), &bytes).unwrap();

    let rec = Recording::open(file.path(), base()).unwrap();
    let window = Window::new(0, 3, rec.record_count()).unwrap();
    assert!(matches!(
        rec.store().read_record(1),
        Err(EngineError::CorruptRecord(_))
    ));
    assert!(matches!(
        rec.signal_points(0, window),
        Err(EngineError::CorruptRecord(_))
    ));
    assert!(matches!(
        rec.cycle_transitions(window),
        Err(EngineError::CorruptRecord(_))
    ));
}

#[test]
fn test_empty_file() {
    let file = NamedTempFile::new().unwrap();
    let store = FileStore::open(file.path()).unwrap();
    assert!(store.is_empty());
    assert_eq!(store.record_count(), 0);
    assert!(store.read_range(0, 0).unwrap().is_empty());
    store.close();
}

#[test]
fn test_store_is_shareable_across_threads() {
    let file = write_recording(500);
    let rec = Recording::open(file.path(), base()).unwrap();
    let window = Window::new(0, 500, rec.record_count()).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = [0usize, 79]
            .into_iter()
            .map(|p| {
                let rec = &rec;
                scope.spawn(move || rec.signal_points(p, window).unwrap().len())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 500);
        }
    });
}
