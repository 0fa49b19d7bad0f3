/// Formatting helpers for session logging
use time::macros::format_description;
use time::OffsetDateTime;

use crate::sampler::SamplerReport;

/// Format a timestamp as HH:MM:SS.mmm for session markers
pub fn format_timestamp(dt: &OffsetDateTime) -> String {
    let format = format_description!("[hour]:[minute]:[second].[subsecond digits:3]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Accepted colours per second over a session
pub fn paint_rate(accepted: u64, duration: time::Duration) -> f64 {
    let secs = duration.as_seconds_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    accepted as f64 / secs
}

/// One-line summary of a finished painting session
pub fn summarize_session(report: &SamplerReport, duration: time::Duration) -> String {
    format!(
        "{} ticks, {} colours painted ({:.1}/s), {} stale, {} read issues, {} skipped",
        report.ticks,
        report.accepted,
        paint_rate(report.accepted, duration),
        report.stale,
        report.read_issues,
        report.skipped
    )
}
