//! Telemetry carried in engine events

/// Log key announcing the output size in bytes
const TOTAL_SIZE_KEY: &str = "total_size";

/// Extract the byte count from a `total_size=<N>` log line.
///
/// Only the segment after the first `=` is considered, and only its leading
/// digits are parsed. An explicit `+` sign is accepted; a negative value is
/// not a byte count and yields `None`, as do lines with another key or a
/// value with no leading digits (the core prints `total_size=N/A` before
/// any output exists).
pub fn parse_total_size(message: &str) -> Option<u64> {
    let mut parts = message.split('=');
    if parts.next()? != TOTAL_SIZE_KEY {
        return None;
    }
    let value = parts.next()?.trim_start();
    let value = value.strip_prefix('+').unwrap_or(value);
    let digits = value
        .find(|c: char| !c.is_ascii_digit())
        .map_or(value, |end| &value[..end]);
    digits.parse().ok()
}

/// Convert a fractional progress value to a whole percentage.
///
/// Floors `progress * 100` and clamps into `[0, 100]`; the core sometimes
/// reports slightly out of range values near the ends of a job. Non-finite
/// values yield `None`.
pub fn progress_percent(progress: f64) -> Option<u8> {
    if !progress.is_finite() {
        return None;
    }
    Some((progress * 100.0).floor().clamp(0.0, 100.0) as u8)
}
