//! Human-readable byte sizes

const BYTES_PER_MB: u128 = 1024 * 1024;

/// Format a byte count as megabytes with one fractional digit.
///
/// Rounds half up on the tenths digit, so `1310720` (exactly 1.25 MB)
/// becomes `"1.3"`. Input is unsigned, so negative or NaN sizes cannot
/// be expressed.
pub fn bytes_to_mb(bytes: u64) -> String {
    let tenths = (bytes as u128 * 10 + BYTES_PER_MB / 2) / BYTES_PER_MB;
    format!("{}.{}", tenths / 10, tenths % 10)
}
