use std::time::Duration;

/// Format a duration the way the search API expects time values.
///
/// Sub-millisecond durations are written in nanoseconds (`"500nanos"`),
/// everything else in whole milliseconds, truncated (`"1ms"` for 1.5ms).
pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_millis(1) {
        format!("{}nanos", duration.as_nanos())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
