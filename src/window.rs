//! Window manager.
//!
//! Pure functions and small value types that map a requested visible span onto
//! a data source. Nothing in here holds on to UI state: the current view is
//! passed in and the updated view is returned.
//!
//! Two time representations are handled and never mixed:
//! - recordings use absolute `DateTime<Utc>` timestamps and resolve to index
//!   windows ([`resolve_window`], [`FileView`]);
//! - realtime sessions use milliseconds since the session epoch and resolve to
//!   time ranges ([`visible_window`], [`RealtimeView`]).

use crate::error::{EngineError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Half-open index window `[start, end)`. `start == end` means nothing is
/// visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    /// Creates a window over a sequence of `len` items.
    pub fn new(start: usize, end: usize, len: usize) -> Result<Self> {
        if start > end || end > len {
            return Err(EngineError::Index {
                index: start.max(end),
                len,
            });
        }
        Ok(Self { start, end })
    }

    /// Empty window positioned at `at`.
    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Closed millisecond range `[start, end]` on a realtime clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

/// Resolves `[t0, t1]` against sorted `timestamps`.
///
/// Returns the first index `>= t0` and the first index `> t1`, i.e. the
/// smallest window holding every timestamp inside `[t0, t1]`. When `t1 < t0`
/// the window is empty.
pub fn resolve_window<T: Ord>(t0: &T, t1: &T, timestamps: &[T]) -> Window {
    let start = timestamps.partition_point(|t| t < t0);
    if t1 < t0 {
        return Window::empty(start);
    }
    let end = timestamps.partition_point(|t| t <= t1);
    Window { start, end }
}

/// Same search as [`resolve_window`] over an indexed accessor, for sources
/// that should not materialize their timestamps.
pub fn resolve_window_by<T, E, F>(
    len: usize,
    mut key_at: F,
    t0: &T,
    t1: &T,
) -> std::result::Result<Window, E>
where
    T: Ord,
    F: FnMut(usize) -> std::result::Result<T, E>,
{
    let start = partition_by(len, |i| Ok(key_at(i)? < *t0))?;
    if t1 < t0 {
        return Ok(Window::empty(start));
    }
    let end = partition_by(len, |i| Ok(key_at(i)? <= *t1))?;
    Ok(Window { start, end })
}

// First index in 0..len for which `pred` is false; `pred` must be
// monotonically true-then-false.
fn partition_by<E>(
    len: usize,
    mut pred: impl FnMut(usize) -> std::result::Result<bool, E>,
) -> std::result::Result<usize, E> {
    let (mut lo, mut hi) = (0usize, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid)? {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

/// Index window of the points whose timestamps fall in `range`.
pub fn slice_by_time<P>(points: &[P], timestamp: impl Fn(&P) -> i64, range: TimeRange) -> Window {
    let start = points.partition_point(|p| timestamp(p) < range.start);
    if range.end < range.start {
        return Window::empty(start);
    }
    let end = points.partition_point(|p| timestamp(p) <= range.end);
    Window { start, end }
}

/// Visible realtime range.
///
/// `end = now - scroll_offset`, `start = end - window_duration_ms`, both
/// clamped to `data_range` (first and last stored timestamp). Returns `None`
/// when there is no data.
pub fn visible_window(
    now: i64,
    window_duration_ms: i64,
    scroll_offset: i64,
    data_range: Option<(i64, i64)>,
) -> Option<TimeRange> {
    let (first, last) = data_range?;
    let end = now.saturating_sub(scroll_offset);
    let start = end.saturating_sub(window_duration_ms);
    Some(TimeRange {
        start: start.clamp(first, last),
        end: end.clamp(first, last),
    })
}

/// Largest scroll offset that still shows a full window.
pub fn max_scroll_offset(total_span_ms: i64, window_duration_ms: i64) -> i64 {
    total_span_ms.saturating_sub(window_duration_ms).max(0)
}

/// Time units offered for window durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Unit for a selector index: 0 seconds, 1 minutes, 2 hours.
    pub fn from_index(unit_index: usize) -> Option<Self> {
        match unit_index {
            0 => Some(Self::Seconds),
            1 => Some(Self::Minutes),
            2 => Some(Self::Hours),
            _ => None,
        }
    }

    pub fn seconds_per_unit(self) -> u64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3600,
        }
    }
}

/// Converts `value` units into seconds.
pub fn seconds_from_unit(unit_index: usize, value: i64) -> Result<u64> {
    let unit = TimeUnit::from_index(unit_index)
        .ok_or_else(|| EngineError::invalid(format!("unknown time unit index {unit_index}")))?;
    let value = u64::try_from(value)
        .map_err(|_| EngineError::invalid(format!("negative duration {value}")))?;
    value
        .checked_mul(unit.seconds_per_unit())
        .ok_or_else(|| EngineError::invalid(format!("duration {value} {unit:?} overflows")))
}

/// Realtime view state: how much is visible and how far back it is scrolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RealtimeView {
    pub window_duration_ms: i64,
    /// 0 means anchored to the latest data.
    pub scroll_offset_ms: i64,
}

impl RealtimeView {
    pub fn new(window_duration_ms: i64) -> Result<Self> {
        check_duration(window_duration_ms)?;
        Ok(Self {
            window_duration_ms,
            scroll_offset_ms: 0,
        })
    }

    /// Returns the view with a new duration; the scroll offset is re-clamped
    /// against the new scroll range.
    pub fn with_window_duration(self, window_duration_ms: i64, total_span_ms: i64) -> Result<Self> {
        check_duration(window_duration_ms)?;
        let view = Self {
            window_duration_ms,
            ..self
        };
        Ok(view.with_scroll_offset(view.scroll_offset_ms, total_span_ms))
    }

    /// Returns the view scrolled to `offset`, clamped to `[0, max_scroll_offset]`.
    pub fn with_scroll_offset(self, offset: i64, total_span_ms: i64) -> Self {
        let max = self.max_scroll_offset(total_span_ms);
        Self {
            scroll_offset_ms: offset.clamp(0, max),
            ..self
        }
    }

    pub fn max_scroll_offset(&self, total_span_ms: i64) -> i64 {
        max_scroll_offset(total_span_ms, self.window_duration_ms)
    }

    pub fn is_anchored(&self) -> bool {
        self.scroll_offset_ms == 0
    }

    pub fn visible_window(&self, now: i64, data_range: Option<(i64, i64)>) -> Option<TimeRange> {
        visible_window(now, self.window_duration_ms, self.scroll_offset_ms, data_range)
    }
}

/// Recording view state in whole seconds from the first record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileView {
    pub window_seconds: u64,
    pub scroll_seconds: u64,
}

impl FileView {
    pub fn new(window_seconds: u64) -> Result<Self> {
        if window_seconds == 0 {
            return Err(EngineError::invalid("window duration must be positive"));
        }
        Ok(Self {
            window_seconds,
            scroll_seconds: 0,
        })
    }

    /// Upper bound of the scroll position for a recording spanning
    /// `total_seconds`.
    pub fn scroll_range(&self, total_seconds: u64) -> u64 {
        total_seconds.saturating_sub(self.window_seconds)
    }

    pub fn with_scroll(self, scroll_seconds: u64, total_seconds: u64) -> Self {
        Self {
            scroll_seconds: scroll_seconds.min(self.scroll_range(total_seconds)),
            ..self
        }
    }

    /// `[t0, t1]` for this view over a recording starting at `first`.
    ///
    /// An end past the last representable instant saturates there, since the
    /// window then covers everything after `t0`.
    pub fn time_range(&self, first: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let t0 = add_seconds(first, self.scroll_seconds).ok_or_else(|| {
            EngineError::invalid(format!(
                "scroll position {}s is out of range",
                self.scroll_seconds
            ))
        })?;
        let t1 = add_seconds(t0, self.window_seconds).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Ok((t0, t1))
    }
}

fn add_seconds(t: DateTime<Utc>, seconds: u64) -> Option<DateTime<Utc>> {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|d| t.checked_add_signed(d))
}

fn check_duration(window_duration_ms: i64) -> Result<()> {
    if window_duration_ms <= 0 {
        return Err(EngineError::invalid(format!(
            "window duration must be positive, got {window_duration_ms} ms"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seconds_series(n: i64) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::seconds(i)).collect()
    }

    #[test]
    fn test_resolve_window_inclusive_bounds() {
        let ts = seconds_series(100);
        let w = resolve_window(&ts[10], &ts[20], &ts);
        assert_eq!(w, Window { start: 10, end: 21 });
        assert_eq!(w.len(), 11);
    }

    #[test]
    fn test_resolve_window_between_samples() {
        let ts: Vec<i64> = (0..10).map(|i| i * 10).collect();
        assert_eq!(resolve_window(&15, &45, &ts), Window { start: 2, end: 5 });
        assert_eq!(resolve_window(&15, &19, &ts), Window { start: 2, end: 2 });
    }

    #[test]
    fn test_resolve_window_clamps() {
        let ts: Vec<i64> = (0..10).collect();
        assert_eq!(resolve_window(&-50, &100, &ts), Window { start: 0, end: 10 });
        assert_eq!(resolve_window(&100, &200, &ts), Window { start: 10, end: 10 });
        assert_eq!(resolve_window(&-20, &-10, &ts), Window { start: 0, end: 0 });
    }

    #[test]
    fn test_resolve_window_reversed_is_empty() {
        let ts: Vec<i64> = (0..10).collect();
        let w = resolve_window(&7, &3, &ts);
        assert!(w.is_empty());
        assert_eq!(w.start, 7);
    }

    #[test]
    fn test_resolve_window_empty_sequence() {
        let ts: Vec<i64> = Vec::new();
        assert_eq!(resolve_window(&0, &10, &ts), Window::empty(0));
    }

    #[test]
    fn test_resolve_window_by_matches_slice() {
        let ts: Vec<i64> = (0..1000).map(|i| i * 3).collect();
        for (t0, t1) in [(0, 0), (5, 100), (-1, 3000), (2997, 2997), (50, 10)] {
            let by = resolve_window_by(ts.len(), |i| Ok::<_, ()>(ts[i]), &t0, &t1).unwrap();
            assert_eq!(by, resolve_window(&t0, &t1, &ts), "t0={t0} t1={t1}");
        }
    }

    #[test]
    fn test_resolve_window_by_propagates_errors() {
        let res = resolve_window_by(10, |_| Err::<i64, _>("boom"), &0, &5);
        assert_eq!(res, Err("boom"));
    }

    #[test]
    fn test_window_new() {
        assert!(Window::new(0, 0, 0).is_ok());
        assert!(Window::new(2, 5, 5).is_ok());
        assert!(Window::new(3, 2, 5).is_err());
        assert!(Window::new(0, 6, 5).is_err());
    }

    #[test]
    fn test_visible_window_anchored() {
        let r = visible_window(10_000, 3_000, 0, Some((0, 10_000))).unwrap();
        assert_eq!(r, TimeRange { start: 7_000, end: 10_000 });
    }

    #[test]
    fn test_visible_window_scrolled_and_clamped() {
        let r = visible_window(10_000, 3_000, 8_000, Some((0, 10_000))).unwrap();
        assert_eq!(r, TimeRange { start: 0, end: 2_000 });

        // Window longer than the data
        let r = visible_window(10_000, 60_000, 0, Some((4_000, 10_000))).unwrap();
        assert_eq!(r, TimeRange { start: 4_000, end: 10_000 });
    }

    #[test]
    fn test_visible_window_no_data() {
        assert_eq!(visible_window(10_000, 3_000, 0, None), None);
    }

    #[test]
    fn test_max_scroll_offset() {
        assert_eq!(max_scroll_offset(3_600_000, 60_000), 3_540_000);
        assert_eq!(max_scroll_offset(30_000, 60_000), 0);
        assert_eq!(max_scroll_offset(0, 60_000), 0);
    }

    #[test]
    fn test_slice_by_time() {
        let pts: Vec<i64> = (0..10).map(|i| i * 100).collect();
        let w = slice_by_time(&pts, |p| *p, TimeRange { start: 150, end: 500 });
        assert_eq!(w, Window { start: 2, end: 6 });
    }

    #[test]
    fn test_seconds_from_unit() {
        assert_eq!(seconds_from_unit(0, 45).unwrap(), 45);
        assert_eq!(seconds_from_unit(1, 3).unwrap(), 180);
        assert_eq!(seconds_from_unit(2, 2).unwrap(), 7200);
        assert!(matches!(
            seconds_from_unit(3, 1),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            seconds_from_unit(0, -1),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_realtime_view_clamps_scroll() {
        let view = RealtimeView::new(60_000).unwrap();
        let scrolled = view.with_scroll_offset(10_000_000, 3_600_000);
        assert_eq!(scrolled.scroll_offset_ms, 3_540_000);
        assert!(!scrolled.is_anchored());

        let back = scrolled.with_scroll_offset(-5, 3_600_000);
        assert!(back.is_anchored());
    }

    #[test]
    fn test_realtime_view_duration_change_reclamps() {
        let view = RealtimeView::new(60_000)
            .unwrap()
            .with_scroll_offset(3_000_000, 3_600_000);
        let wider = view.with_window_duration(1_200_000, 3_600_000).unwrap();
        assert_eq!(wider.scroll_offset_ms, 2_400_000);

        assert!(RealtimeView::new(0).is_err());
        assert!(view.with_window_duration(-1, 3_600_000).is_err());
    }

    #[test]
    fn test_file_view() {
        let view = FileView::new(60).unwrap();
        assert_eq!(view.scroll_range(3600), 3540);
        assert_eq!(view.scroll_range(30), 0);

        let view = view.with_scroll(5000, 3600);
        assert_eq!(view.scroll_seconds, 3540);

        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let (t0, t1) = view.time_range(first).unwrap();
        assert_eq!((t0 - first).num_seconds(), 3540);
        assert_eq!((t1 - t0).num_seconds(), 60);

        assert!(FileView::new(0).is_err());
    }

    #[test]
    fn test_file_view_huge_window_saturates() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for seconds in [seconds_from_unit(2, 3_000_000_000).unwrap(), u64::MAX] {
            let view = FileView::new(seconds).unwrap().with_scroll(0, 100);
            let (t0, t1) = view.time_range(first).unwrap();
            assert_eq!(t0, first);
            assert_eq!(t1, DateTime::<Utc>::MAX_UTC);
        }
    }

    #[test]
    fn test_file_view_unreachable_scroll_is_rejected() {
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let view = FileView {
            window_seconds: 60,
            scroll_seconds: u64::MAX,
        };
        assert!(matches!(
            view.time_range(first),
            Err(EngineError::InvalidArgument(_))
        ));
    }
}
