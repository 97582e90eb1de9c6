//! Max/average of whole-day durations.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TimeSpanStats {
    pub max: i64,
    pub avg: f64,
}

/// Single pass over `days`. Both values are 0 for an empty input, and `max`
/// never drops below 0.
pub fn max_and_avg(days: &[i64]) -> TimeSpanStats {
    let mut max = 0;
    let mut sum = 0;
    for &d in days {
        sum += d;
        if d > max {
            max = d;
        }
    }

    let avg = if days.is_empty() {
        0.0
    } else {
        sum as f64 / days.len() as f64
    };

    TimeSpanStats { max, avg }
}

/// Whole days from `start` to `end`, rounded towards negative infinity.
pub fn whole_days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_seconds().div_euclid(86_400)
}
