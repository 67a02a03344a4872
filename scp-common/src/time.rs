//! Playback time display
//!
//! Positions and durations are shown as `M:SS`. Minutes are not wrapped into hours,
//! so a 75 minute mix shows as `75:00`.

/// Format seconds as `M:SS`
///
/// Zero, negative, and non-finite inputs all format as `"0:00"`; fractional seconds
/// are truncated.
///
/// # Examples
///
/// ```
/// use scp_common::time::format_time;
///
/// assert_eq!(format_time(65.0), "1:05");
/// assert_eq!(format_time(f64::NAN), "0:00");
/// ```
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Format an optional duration, treating unknown as zero
pub fn format_time_opt(seconds: Option<f64>) -> String {
    format_time(seconds.unwrap_or(0.0))
}
