//! Calendar-aware duration type.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// ISO 8601 duration (months, days, seconds, nanoseconds).
///
/// Components are kept separate because months and days have no fixed
/// length; comparison uses the conventional estimate of 30-day months.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Duration {
    pub months: i64,
    pub days: i64,
    pub seconds: i64,
    pub nanos: i32,
}

impl Duration {
    pub fn new(months: i64, days: i64, seconds: i64, nanos: i32) -> Self {
        Self { months, days, seconds, nanos }
    }

    /// Parse an ISO 8601 duration string such as `P1Y2M3DT4H5M6.5S`.
    /// Returns None on malformed input.
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim();
        let (negative, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let s = s.strip_prefix(['P', 'p'])?;

        let mut months: i64 = 0;
        let mut days: i64 = 0;
        let mut seconds: i64 = 0;
        let mut nanos: i64 = 0;
        let mut in_time = false;
        let mut saw_component = false;

        let mut num = String::new();
        for ch in s.chars() {
            match ch {
                'T' | 't' => {
                    if in_time || !num.is_empty() {
                        return None;
                    }
                    in_time = true;
                }
                '0'..='9' | '.' => num.push(ch),
                unit => {
                    if num.is_empty() {
                        return None;
                    }
                    let value: f64 = num.parse().ok()?;
                    num.clear();
                    saw_component = true;
                    match (in_time, unit.to_ascii_uppercase()) {
                        (false, 'Y') => months += (value as i64) * 12,
                        (false, 'M') => months += value as i64,
                        (false, 'W') => days += (value as i64) * 7,
                        (false, 'D') => days += value as i64,
                        (true, 'H') => seconds += (value * 3600.0) as i64,
                        (true, 'M') => seconds += (value * 60.0) as i64,
                        (true, 'S') => {
                            seconds += value.trunc() as i64;
                            nanos += (value.fract() * 1e9).round() as i64;
                        }
                        _ => return None,
                    }
                }
            }
        }
        if !num.is_empty() || !saw_component {
            return None;
        }

        let mut d = Self {
            months,
            days,
            seconds,
            nanos: nanos as i32,
        };
        if negative {
            d = Self {
                months: -d.months,
                days: -d.days,
                seconds: -d.seconds,
                nanos: -d.nanos,
            };
        }
        Some(d)
    }

    /// Total seconds under the 30-day-month convention. Used only for
    /// ordering, never for arithmetic.
    fn estimated_seconds(&self) -> f64 {
        (self.months as f64) * 30.0 * 86_400.0
            + (self.days as f64) * 86_400.0
            + self.seconds as f64
            + f64::from(self.nanos) / 1e9
    }

    pub fn checked_add(&self, other: &Duration) -> Option<Duration> {
        Some(Duration {
            months: self.months.checked_add(other.months)?,
            days: self.days.checked_add(other.days)?,
            seconds: self.seconds.checked_add(other.seconds)?,
            nanos: self.nanos.checked_add(other.nanos)?,
        })
    }

    pub fn negated(&self) -> Duration {
        Duration {
            months: -self.months,
            days: -self.days,
            seconds: -self.seconds,
            nanos: -self.nanos,
        }
    }

    /// Component accessor for the temporal built-ins.
    pub fn component(&self, name: &str) -> Option<i64> {
        match name {
            "year" => Some(self.months / 12),
            "month" => Some(self.months % 12),
            "day" => Some(self.days),
            "hour" => Some(self.seconds / 3600),
            "minute" => Some((self.seconds % 3600) / 60),
            "second" => Some(self.seconds % 60),
            _ => None,
        }
    }
}

impl PartialOrd for Duration {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.estimated_seconds().partial_cmp(&other.estimated_seconds())
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nanos == 0 {
            write!(f, "P{}M{}DT{}S", self.months, self.days, self.seconds)
        } else {
            write!(
                f,
                "P{}M{}DT{}.{:09}S",
                self.months,
                self.days,
                self.seconds,
                self.nanos.unsigned_abs()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let d = Duration::parse("P1Y2M3DT4H5M6S").unwrap();
        assert_eq!(d.months, 14);
        assert_eq!(d.days, 3);
        assert_eq!(d.seconds, 4 * 3600 + 5 * 60 + 6);
    }

    #[test]
    fn test_parse_weeks() {
        let d = Duration::parse("P2W").unwrap();
        assert_eq!(d.days, 14);
    }

    #[test]
    fn test_parse_fractional_seconds() {
        let d = Duration::parse("PT1.5S").unwrap();
        assert_eq!(d.seconds, 1);
        assert_eq!(d.nanos, 500_000_000);
    }

    #[test]
    fn test_parse_negative() {
        let d = Duration::parse("-P1D").unwrap();
        assert_eq!(d.days, -1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Duration::parse("1Y").is_none());
        assert!(Duration::parse("P").is_none());
        assert!(Duration::parse("PX").is_none());
        assert!(Duration::parse("P1").is_none());
    }

    #[test]
    fn test_ordering() {
        let a = Duration::parse("P1D").unwrap();
        let b = Duration::parse("PT25H").unwrap();
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Less));
    }

    #[test]
    fn test_components() {
        let d = Duration::parse("P1Y3MT90M").unwrap();
        assert_eq!(d.component("year"), Some(1));
        assert_eq!(d.component("month"), Some(3));
        assert_eq!(d.component("hour"), Some(1));
        assert_eq!(d.component("minute"), Some(30));
    }
}
