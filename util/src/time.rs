//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(duration_to_seconds(chrono::Duration::milliseconds(1500)), Some(1.5));
        assert_eq!(duration_to_seconds(chrono::Duration::zero()), Some(0.0));
        assert_eq!(duration_to_seconds(chrono::Duration::days(200_000)), None);
    }
}
