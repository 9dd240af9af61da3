//! Timeline coordinates in microseconds

use serde::{Deserialize, Serialize};

/// Point on the session timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Time(pub i64);

/// Signed distance between two points in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Duration(pub i64);

impl Time {
    pub const ZERO: Time = Time(0);

    pub fn from_micros(us: i64) -> Self {
        Time(us)
    }

    pub fn from_millis(ms: i64) -> Self {
        Time(ms.saturating_mul(1_000))
    }

    pub fn micros(self) -> i64 {
        self.0
    }
}

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub fn from_micros(us: i64) -> Self {
        Duration(us)
    }

    pub fn from_millis(ms: i64) -> Self {
        Duration(ms.saturating_mul(1_000))
    }

    pub fn micros(self) -> i64 {
        self.0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl std::ops::Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Time {
        Time(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Time {
    type Output = Duration;

    fn sub(self, rhs: Time) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:06}s", sign, abs / 1_000_000, abs % 1_000_000)
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Time(self.0))
    }
}

/// Half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: Time,
    pub end: Time,
}

impl TimeSpan {
    pub fn new(start: Time, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    pub fn between(start: Time, end: Time) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, t: Time) -> bool {
        self.start <= t && t < self.end
    }

    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_display() {
        assert_eq!(Time::from_millis(1_500).to_string(), "1.500000s");
        assert_eq!(Time(-250_000).to_string(), "-0.250000s");
    }

    #[test]
    fn test_span_is_half_open() {
        let span = TimeSpan::new(Time(10), Duration(5));
        assert!(span.contains(Time(10)));
        assert!(!span.contains(Time(15)));
        assert!(!span.overlaps(&TimeSpan::new(Time(15), Duration(5))));
    }
}
