//! Human-readable strings for elapsed time, window durations and memory.

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

/// Formats a duration in seconds as `"2h 0m 0s"`, `"5m 3s"` or `"42s"`.
pub fn format_time_from_seconds(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Formats elapsed milliseconds as `HH:MM:SS`. Hours are not wrapped.
pub fn format_elapsed_time(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Formats a byte count with binary units.
pub fn format_memory_size(bytes: u64) -> String {
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::seconds_from_unit;

    #[test]
    fn test_format_time_from_seconds() {
        assert_eq!(format_time_from_seconds(0), "0s");
        assert_eq!(format_time_from_seconds(42), "42s");
        assert_eq!(format_time_from_seconds(303), "5m 3s");
        assert_eq!(format_time_from_seconds(3600), "1h 0m 0s");
        assert_eq!(format_time_from_seconds(3725), "1h 2m 5s");
    }

    #[test]
    fn test_whole_units_roundtrip() {
        assert_eq!(format_time_from_seconds(seconds_from_unit(2, 2).unwrap()), "2h 0m 0s");
        assert_eq!(format_time_from_seconds(seconds_from_unit(1, 15).unwrap()), "15m 0s");
        assert_eq!(format_time_from_seconds(seconds_from_unit(0, 30).unwrap()), "30s");
    }

    #[test]
    fn test_format_elapsed_time() {
        assert_eq!(format_elapsed_time(0), "00:00:00");
        assert_eq!(format_elapsed_time(999), "00:00:00");
        assert_eq!(format_elapsed_time(61_000), "00:01:01");
        assert_eq!(format_elapsed_time(7_322_000), "02:02:02");
        assert_eq!(format_elapsed_time(100 * 3_600_000), "100:00:00");
        assert_eq!(format_elapsed_time(-5), "00:00:00");
    }

    #[test]
    fn test_format_memory_size() {
        assert_eq!(format_memory_size(0), "0 B");
        assert_eq!(format_memory_size(1023), "1023 B");
        assert_eq!(format_memory_size(1536), "1.50 KB");
        assert_eq!(format_memory_size(10 * 1024 * 1024), "10.00 MB");
        assert_eq!(format_memory_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }
}
