//! Split/pace derivation and display formatting.

use crate::models::Pace;

/// Shown in place of a pace that cannot be computed yet
pub const PACE_SENTINEL: &str = "—";

/// Distance below which no pace is reported, in meters
pub const MIN_PACE_DISTANCE_M: f64 = 1.0;

/// Whether enough of the session has passed to derive an average.
///
/// Needs at least 1 m of distance and one whole elapsed second; until the
/// first second completes the display shows the sentinel.
pub fn average_available(elapsed_seconds: f64, meters: f64) -> bool {
    meters >= MIN_PACE_DISTANCE_M && elapsed_seconds.floor() > 0.0
}

/// Seconds per 500 m at the average speed so far
pub fn split_per_500m(elapsed_seconds: f64, meters: f64) -> Pace {
    if !average_available(elapsed_seconds, meters) {
        return Pace::Unavailable;
    }
    Pace::Split {
        seconds_per_500m: elapsed_seconds * (500.0 / meters),
    }
}

/// `m:ss`, truncating fractional seconds
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let total_seconds = elapsed_ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

pub fn format_distance(meters: f64) -> String {
    format!("{:.1}m", meters)
}

impl std::fmt::Display for Pace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pace::Split { seconds_per_500m } => {
                let minutes = (seconds_per_500m / 60.0).floor() as u64;
                let seconds = (seconds_per_500m % 60.0).floor() as u64;
                write!(f, "{}:{:02} /500m", minutes, seconds)
            }
            Pace::Unavailable => write!(f, "{}", PACE_SENTINEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_distance_reports_sentinel() {
        let pace = split_per_500m(10.0, 0.5);
        assert_eq!(pace, Pace::Unavailable);
        assert_eq!(pace.to_string(), "—");
    }

    #[test]
    fn test_zero_elapsed_reports_sentinel() {
        assert_eq!(split_per_500m(0.0, 120.0), Pace::Unavailable);
        assert_eq!(split_per_500m(f64::NAN, 120.0), Pace::Unavailable);
    }

    #[test]
    fn test_first_second_reports_sentinel() {
        assert_eq!(split_per_500m(0.75, 3.0), Pace::Unavailable);
        assert_eq!(split_per_500m(0.999, 50.0).to_string(), "—");

        // past the first second the unfloored time is used
        let pace = split_per_500m(1.5, 3.0);
        assert_eq!(pace.seconds_per_500m(), Some(250.0));
    }

    #[test]
    fn test_split_value_and_format() {
        // 250 m in 62.5 s -> 125 s per 500 m
        let pace = split_per_500m(62.5, 250.0);
        assert_eq!(pace.seconds_per_500m(), Some(125.0));
        assert_eq!(pace.to_string(), "2:05 /500m");
    }

    #[test]
    fn test_elapsed_and_distance_format() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(65_999), "1:05");
        assert_eq!(format_elapsed(3_600_000), "60:00");
        assert_eq!(format_distance(12.345), "12.3m");
    }
}
