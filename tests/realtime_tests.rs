//! Integration tests for the realtime path.
//!
//! These tests verify end-to-end behavior of the realtime buffer and session
//! by exercising the public API through realistic usage patterns.

use sigscope::realtime::max_points_for_budget;
use sigscope::{
    EngineError, RealtimeBuffer, RealtimeSession, SampleSource, SessionSettings, SimulatedSource,
    POINT_SIZE_BYTES,
};
use std::sync::Arc;
use std::thread;

struct ConstantSource(f32);

impl SampleSource for ConstantSource {
    fn next_value(&mut self, _parameter: &str, _timestamp_ms: i64) -> f32 {
        self.0
    }
}

fn names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("Signal_{i}")).collect()
}

/// Test that demonstrates the expected memory allocation pattern
#[test]
fn test_memory_calculation_examples() {
    let test_cases = vec![
        (10, 10, 87_381), // 10 MB, 10 parameters
        (10, 1, 873_813), // one parameter gets the whole budget
        (1, 80, 1_092),   // every file signal active
        (100, 4, 2_184_533),
    ];

    for (budget_mb, parameters, expected) in test_cases {
        assert_eq!(
            max_points_for_budget(budget_mb, parameters),
            expected,
            "{budget_mb} MB, {parameters} parameters"
        );
    }
}

#[test]
fn test_bound_holds_after_every_append() {
    let buffer = RealtimeBuffer::new(1, &names(80)).unwrap();
    let cap = buffer.max_points_per_param();
    assert_eq!(cap, 1_092);

    for t in 0..(cap as i64 * 3) {
        buffer.append("Signal_5", t, t as f32).unwrap();
        assert!(buffer.point_count("Signal_5") <= cap);
        assert!(buffer.memory_usage_bytes() <= 1024 * 1024);
    }

    // The retained points are the most recent ones, oldest first
    let snapshot = buffer.snapshot("Signal_5").unwrap();
    let first = cap as i64 * 2;
    let expected: Vec<i64> = (first..first + cap as i64).collect();
    let actual: Vec<i64> = snapshot.iter().map(|p| p.timestamp()).collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_shrinking_parameter_set_raises_cap() {
    let buffer = RealtimeBuffer::new(1, &names(80)).unwrap();
    for t in 0..2_000 {
        buffer.append("Signal_1", t, 0.0).unwrap();
    }
    assert_eq!(buffer.point_count("Signal_1"), 1_092);

    buffer.set_active_parameters(&["Signal_1", "Signal_2"]);
    assert_eq!(buffer.max_points_per_param(), 43_690);
    // Evicted points do not come back
    assert_eq!(buffer.point_count("Signal_1"), 1_092);
    assert_eq!(buffer.active_parameter_count(), 2);
}

#[test]
fn test_concurrent_ingest_and_snapshots() {
    let buffer = Arc::new(RealtimeBuffer::new(1, &names(4)).unwrap());
    let cap = buffer.max_points_per_param();
    let per_writer = cap + 5_000;

    let writers: Vec<_> = (1..=4)
        .map(|p| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let name = format!("Signal_{p}");
                for t in 0..per_writer as i64 {
                    buffer.append(&name, t, p as f32).unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for _ in 0..200 {
                let snapshot = buffer.snapshot("Signal_2").unwrap();
                assert!(snapshot.len() <= cap);
                assert!(snapshot.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()));
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(buffer.total_points(), 4 * cap);
    assert_eq!(buffer.memory_usage_bytes(), 4 * cap * POINT_SIZE_BYTES);
}

#[test]
fn test_concurrent_budget_change_keeps_bound() {
    let buffer = Arc::new(RealtimeBuffer::new(4, &names(1)).unwrap());

    let writer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for t in 0..400_000 {
                buffer.append("Signal_1", t, 0.0).unwrap();
            }
        })
    };
    for mb in [3, 2, 1, 2, 1] {
        buffer.set_memory_budget(mb).unwrap();
    }
    writer.join().unwrap();

    assert_eq!(buffer.memory_budget_mb(), 1);
    assert!(buffer.point_count("Signal_1") <= buffer.max_points_per_param());
}

#[test]
fn test_session_hour_of_data() {
    let settings = SessionSettings {
        memory_budget_mb: 10,
        interval_ms: 1000,
        window_duration_ms: 60_000,
        parameters: names(10),
    };
    let mut session = RealtimeSession::new(settings, Box::new(ConstantSource(1.5))).unwrap();
    session.start(1_700_000_000_000);

    let mut previous_range = 0;
    let mut appended = 0;
    for s in 0..=3_600 {
        appended += session.advance(1_700_000_000_000 + s * 1000);
        let range = session.scroll_range();
        assert!(range >= previous_range);
        previous_range = range;
    }
    assert_eq!(appended, 3_601 * 10);
    assert_eq!(session.scroll_range(), 3_540_000);

    let status = session.status();
    assert_eq!(status.elapsed, "01:00:00");
    assert_eq!(status.max_points_per_param, 87_381);
    assert_eq!(status.memory_used_bytes, 3_601 * 10 * 12);

    let points = session.visible_points("Signal_3", 20).unwrap();
    assert!(points.len() <= 20);
    assert!(points.iter().all(|p| p.y == 1.5));
    assert!(points.iter().all(|p| p.x >= 3_540_000.0));
}

#[test]
fn test_session_parameter_change_mid_run() {
    let settings = SessionSettings {
        memory_budget_mb: 1,
        interval_ms: 100,
        window_duration_ms: 10_000,
        parameters: names(2),
    };
    let mut session =
        RealtimeSession::new(settings, Box::new(SimulatedSource::new(Some(42)))).unwrap();
    session.start(0);
    for t in (0..1_000).step_by(100) {
        session.advance(t);
    }
    session.set_parameters(&["Signal_2", "Signal_9"]);
    for t in (1_000..2_000).step_by(100) {
        session.advance(t);
    }

    let buffer = session.buffer();
    assert_eq!(buffer.point_count("Signal_1"), 0);
    assert_eq!(buffer.point_count("Signal_2"), 20);
    assert_eq!(buffer.point_count("Signal_9"), 10);
    assert!(matches!(
        session.visible_points("Signal_1", 10),
        Err(EngineError::InvalidArgument(_))
    ));

    session.reset();
    assert!(!session.is_running());
    assert_eq!(buffer.total_points(), 0);
}
