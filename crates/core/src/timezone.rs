//! Timezone handling utilities
//!
//! Provides functions for parsing timezones and resolving a local
//! calendar date/time into a concrete UTC instant, including the DST edge
//! cases spring-forward gaps and fall-back ambiguity (§4.D, §7 edge cases).

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{OccasionError, OccasionResult};

/// Parse an IANA timezone string (e.g., "Asia/Singapore", "Europe/London")
///
/// # Examples
///
/// ```
/// use occasio_core::timezone::parse_timezone;
///
/// let tz = parse_timezone("America/New_York").unwrap();
/// assert_eq!(tz.name(), "America/New_York");
/// ```
pub fn parse_timezone(tz_str: &str) -> OccasionResult<Tz> {
    tz_str
        .parse::<Tz>()
        .map_err(|_| OccasionError::InvalidTimezone(tz_str.to_string()))
}

/// Convert UTC time to a specific timezone
pub fn to_timezone<Tz2: TimeZone>(utc_time: &DateTime<Utc>, tz: &Tz2) -> DateTime<Tz2> {
    utc_time.with_timezone(tz)
}

/// Convert a timezone-aware time to UTC
pub fn to_utc<Tz2: TimeZone>(time: &DateTime<Tz2>) -> DateTime<Utc> {
    time.with_timezone(&Utc)
}

/// Validate that a timezone string is valid
pub fn validate_timezone(tz_str: &str) -> OccasionResult<()> {
    parse_timezone(tz_str)?;
    Ok(())
}

/// Get the default timezone (UTC), used when a user's timezone is missing
/// or fails to parse (§7 edge case: invalid/missing timezone).
pub fn default_timezone() -> Tz {
    Tz::UTC
}

/// Resolve a wall-clock local date and time, in a given IANA timezone, to
/// a concrete UTC instant.
///
/// DST transitions make the local→UTC mapping non-injective twice a year:
///
/// - **Gap** (spring forward): the wall-clock time never occurs. We walk
///   forward minute by minute until we land in a time that does exist,
///   per the REDESIGN FLAG directing gap times to resolve to the first
///   valid instant after the gap rather than being silently dropped.
/// - **Ambiguity** (fall back): the wall-clock time occurs twice. We take
///   the earlier of the two offsets, so a scheduled send never fires
///   twice for the same occasion.
pub fn resolve_local_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _later) => earlier.with_timezone(&Utc),
        LocalResult::None => walk_forward_past_gap(naive, tz),
    }
}

/// Walk forward minute by minute past a DST gap until a valid local
/// instant is found. Gaps are at most a couple of hours wide in practice,
/// so this terminates quickly; the loop is bounded defensively at 24h.
fn walk_forward_past_gap(start: chrono::NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    let mut candidate = start;
    for _ in 0..(24 * 60) {
        candidate += chrono::Duration::minutes(1);
        if let LocalResult::Single(dt) = tz.from_local_datetime(&candidate) {
            return dt.with_timezone(&Utc);
        }
    }
    // Unreachable for any real IANA zone; fall back to UTC interpretation
    // rather than panicking on a malformed tzdata entry.
    Utc.from_utc_datetime(&start)
}

/// A validated IANA timezone
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Timezone(String);

impl Timezone {
    /// Create a new Timezone if valid
    pub fn new(tz: &str) -> OccasionResult<Self> {
        validate_timezone(tz)?;
        Ok(Self(tz.to_string()))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into the underlying `chrono_tz::Tz`
    pub fn to_tz(&self) -> Tz {
        // Validated at construction; only UTC panics-free path is used here.
        self.0.parse().unwrap_or(Tz::UTC)
    }

    /// Get the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Timezone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn test_parse_timezone_valid() {
        let tz = parse_timezone("America/New_York");
        assert!(tz.is_ok());
        assert_eq!(tz.unwrap().name(), "America/New_York");
    }

    #[test]
    fn test_parse_timezone_invalid() {
        let tz = parse_timezone("Invalid/Timezone");
        assert!(tz.is_err());
        match tz {
            Err(OccasionError::InvalidTimezone(s)) => {
                assert_eq!(s, "Invalid/Timezone");
            }
            _ => panic!("Expected InvalidTimezone error"),
        }
    }

    #[test]
    fn test_utc_to_singapore_conversion() {
        let singapore_tz = parse_timezone("Asia/Singapore").unwrap();
        let utc_time = Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(2026, 1, 18)
                .unwrap()
                .and_hms_opt(4, 0, 0)
                .unwrap(),
        );
        let singapore_time = to_timezone(&utc_time, &singapore_tz);
        assert_eq!(singapore_time.hour(), 12);
    }

    #[test]
    fn test_validate_timezone() {
        assert!(validate_timezone("Europe/London").is_ok());
        assert!(validate_timezone("Invalid/Zone").is_err());
    }

    #[test]
    fn test_default_timezone() {
        assert_eq!(default_timezone().name(), "UTC");
    }

    #[test]
    fn test_resolve_local_to_utc_ordinary_day() {
        let tz: Tz = "Europe/London".parse().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let time = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let utc = resolve_local_to_utc(date, time, tz);
        // BST is UTC+1 in June.
        assert_eq!(utc.hour(), 8);
    }

    #[test]
    fn test_resolve_local_to_utc_spring_forward_gap() {
        // US clocks spring forward at 2am -> 3am on 2025-03-09; 02:30 never occurs.
        let tz: Tz = "America/New_York".parse().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let time = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        let utc = resolve_local_to_utc(date, time, tz);
        let local = to_timezone(&utc, &tz);
        // Result lands at or after 3:00am local, the first valid instant past the gap.
        assert!(local.hour() >= 3);
    }

    #[test]
    fn test_resolve_local_to_utc_fall_back_ambiguous() {
        // US clocks fall back at 2am on 2025-11-02; 01:30 occurs twice.
        let tz: Tz = "America/New_York".parse().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 11, 2).unwrap();
        let time = NaiveTime::from_hms_opt(1, 30, 0).unwrap();
        // Should resolve deterministically without panicking, picking the
        // earlier (pre-fallback, daylight) offset.
        let utc = resolve_local_to_utc(date, time, tz);
        let local = to_timezone(&utc, &tz);
        assert_eq!(local.hour(), 1);
        assert_eq!(local.minute(), 30);
    }
}
