//! Display helpers for elapsed reading time.

/// Renders elapsed seconds as `H:MM:SS` once an hour has passed, `MM:SS` before.
/// Fractions are truncated, never rounded.
pub fn format_reading_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}
