//! Occasion matching: mapping a user's birthday/anniversary onto a
//! concrete calendar year, and resolving it to the UTC send instant (§4.D,
//! §4.E).

use chrono::{Datelike, NaiveDate, NaiveTime, Utc};

use crate::models::MessageType;
use crate::timezone::resolve_local_to_utc;
use chrono_tz::Tz;

/// The fixed local send time for every occasion (§3, §4.D): 09:00.
pub fn send_time_local() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).expect("09:00:00 is always a valid time")
}

/// Project a recurring month/day occasion (e.g. a birthday) onto a
/// concrete calendar date in `year`.
///
/// Feb 29 in a non-leap `year` maps to Feb 28 (§7 edge case, I-list).
pub fn occasion_date_in_year(occasion: NaiveDate, year: i32) -> NaiveDate {
    let (month, day) = (occasion.month(), occasion.day());
    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| {
            debug_assert!(
                month == 2 && day == 29,
                "only Feb 29 can fail to project onto a later year"
            );
            NaiveDate::from_ymd_opt(year, 2, 28)
        })
        .expect("Feb 28 always exists")
}

/// Compute the UTC instant at which `message_type`'s occasion for `user`,
/// materialized for `year`, should be sent: 09:00 local on the projected
/// occasion date in the user's timezone.
///
/// Returns `None` if `user` has no date set for `message_type`.
pub fn scheduled_send_time(
    occasion: NaiveDate,
    year: i32,
    tz: Tz,
) -> chrono::DateTime<Utc> {
    let local_date = occasion_date_in_year(occasion, year);
    resolve_local_to_utc(local_date, send_time_local(), tz)
}

/// Label used purely for log/metric grouping; has no bearing on the
/// idempotency key, which always uses the projected local date.
pub fn occasion_label(message_type: MessageType, local_date: NaiveDate) -> String {
    format!("{}@{}", message_type, local_date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_occasion_date_in_year_ordinary() {
        let dob = NaiveDate::from_ymd_opt(1990, 5, 10).unwrap();
        assert_eq!(
            occasion_date_in_year(dob, 2025),
            NaiveDate::from_ymd_opt(2025, 5, 10).unwrap()
        );
    }

    #[test]
    fn test_occasion_date_leap_day_in_non_leap_year() {
        let dob = NaiveDate::from_ymd_opt(1992, 2, 29).unwrap();
        assert_eq!(
            occasion_date_in_year(dob, 2025),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
    }

    #[test]
    fn test_occasion_date_leap_day_in_leap_year() {
        let dob = NaiveDate::from_ymd_opt(1992, 2, 29).unwrap();
        assert_eq!(
            occasion_date_in_year(dob, 2028),
            NaiveDate::from_ymd_opt(2028, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_scheduled_send_time_london_matches_worked_example() {
        // Spec worked example: Alice, Europe/London, DOB 1990-05-10,
        // expects scheduled_send_time = 2025-05-10T08:00Z.
        let dob = NaiveDate::from_ymd_opt(1990, 5, 10).unwrap();
        let tz: Tz = "Europe/London".parse().unwrap();
        let send_time = scheduled_send_time(dob, 2025, tz);
        assert_eq!(
            send_time,
            Utc.with_ymd_and_hms(2025, 5, 10, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_scheduled_send_time_tokyo_matches_worked_example() {
        // Bob, Asia/Tokyo, DOB 1985-05-10, expects 2025-05-10T00:00Z.
        let dob = NaiveDate::from_ymd_opt(1985, 5, 10).unwrap();
        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        let send_time = scheduled_send_time(dob, 2025, tz);
        assert_eq!(
            send_time,
            Utc.with_ymd_and_hms(2025, 5, 10, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_scheduled_send_time_dst_spring_forward_no_gap_at_nine() {
        // Spec worked example 6: Eve, America/New_York, 2025-03-09.
        // 09:00 local is not itself skipped (the gap is 02:00-03:00), so
        // this resolves normally to 13:00Z.
        let dob = NaiveDate::from_ymd_opt(1990, 3, 9).unwrap();
        let tz: Tz = "America/New_York".parse().unwrap();
        let send_time = scheduled_send_time(dob, 2025, tz);
        assert_eq!(
            send_time,
            Utc.with_ymd_and_hms(2025, 3, 9, 13, 0, 0).unwrap()
        );
    }
}
