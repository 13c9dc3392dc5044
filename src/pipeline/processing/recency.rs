use chrono::{DateTime, Months, NaiveDateTime, Utc};
use tracing::debug;

use crate::domain::CustomerRecord;

/// Look-back window for the signup filter.
pub const RECENCY_WINDOW_MONTHS: u32 = 12;

/// Oldest signup timestamp (exclusive) still considered recent.
///
/// Computed once per invocation from the reference time; calendar months are
/// subtracted, so 29 Feb clamps to 28 Feb.
pub fn signup_cutoff(reference_time: DateTime<Utc>) -> NaiveDateTime {
    let now = reference_time.naive_utc();
    now.checked_sub_months(Months::new(RECENCY_WINDOW_MONTHS))
        .unwrap_or(NaiveDateTime::MIN)
}

/// Keep records whose signup is strictly after the cutoff.
/// Records without a signup date never qualify.
pub fn retain_recent_signups(
    records: Vec<CustomerRecord>,
    reference_time: DateTime<Utc>,
) -> Vec<CustomerRecord> {
    let cutoff = signup_cutoff(reference_time);
    let before = records.len();
    let kept: Vec<CustomerRecord> = records
        .into_iter()
        .filter(|r| r.signup_date.map_or(false, |signup| signup > cutoff))
        .collect();
    debug!(
        "Recency filter kept {}/{} records (cutoff {})",
        kept.len(),
        before,
        cutoff
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::Map;

    fn record(user_id: i64, signup: Option<(i32, u32, u32)>) -> CustomerRecord {
        CustomerRecord {
            user_id,
            name: None,
            email: None,
            age: 30.0,
            signup_date: signup.map(|(y, m, d)| {
                NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
            }),
            account_number: None,
            balance: 0.0,
            debt: 0.0,
            address: None,
            age_group: None,
            balance_inr: None,
            balance_group: None,
            valid_email: None,
            age_constraints: None,
            extra: Map::new(),
        }
    }

    // The reference time is pinned: with the wall clock the kept set would
    // change from one day to the next for the same input.
    #[test]
    fn test_keeps_only_signups_after_cutoff() {
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 10, 0, 0).unwrap();
        let records = vec![
            record(1, Some((2023, 11, 30))),
            record(2, Some((2023, 12, 1))), // midnight is before 10:00 on the cutoff day
            record(3, Some((2023, 12, 2))),
            record(4, Some((2024, 6, 1))),
            record(5, None),
        ];
        let kept: Vec<i64> = retain_recent_signups(records, now)
            .iter()
            .map(|r| r.user_id)
            .collect();
        assert_eq!(kept, vec![3, 4]);
    }

    #[test]
    fn test_cutoff_is_strict() {
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();
        let kept = retain_recent_signups(vec![record(1, Some((2023, 12, 1)))], now);
        assert!(kept.is_empty());
    }

    #[test]
    fn test_cutoff_clamps_leap_day() {
        let now = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        assert_eq!(
            signup_cutoff(now),
            NaiveDate::from_ymd_opt(2023, 2, 28).unwrap().and_hms_opt(12, 0, 0).unwrap()
        );
    }
}
