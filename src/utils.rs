use std::time::{Duration, Instant};

/// Render a duration with two decimals and a scaled unit, e.g. `1.94ms`.
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Warn when `operation`, started at `start`, ran longer than `threshold`.
pub fn log_if_slow(start: Instant, threshold: Duration, operation: &str) {
    let elapsed = start.elapsed();
    if elapsed > threshold {
        tracing::warn!(
            operation,
            elapsed = fmt_duration(elapsed),
            threshold = fmt_duration(threshold),
            "database call exceeded its time budget"
        );
    }
}

/// Current wall-clock time as milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
