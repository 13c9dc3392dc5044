use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::debug;

use crate::domain::{CustomerRecord, DateField, InputRecord, DERIVED_FIELDS};
use crate::error::{EtlError, Result};

/// Timestamp layouts accepted for `signup_date` besides plain dates and RFC 3339.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a wire `signup_date` into a UTC wall-clock timestamp.
/// Date-only values map to midnight.
pub fn parse_signup_date(value: &DateField) -> Option<NaiveDateTime> {
    match value {
        DateField::EpochMillis(ms) => {
            DateTime::<Utc>::from_timestamp_millis(*ms).map(|dt| dt.naive_utc())
        }
        DateField::Text(text) => {
            let text = text.trim();
            if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                return Some(date.and_time(NaiveTime::MIN));
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.naive_utc());
            }
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        }
    }
}

/// Mean of the ages present in this batch, if any.
pub fn batch_mean_age(ages: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = ages.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Coerce numeric columns, impute missing values and parse signup dates.
///
/// Missing `age` takes the mean of the ages present in this batch; missing
/// `balance`/`debt` become 0. A batch with no ages at all, including an empty
/// batch, has nothing to impute from and fails. A record with no `signup_date` at all is kept
/// with `None` (the recency filter drops it); a `signup_date` that is present
/// but unparseable fails the batch.
pub fn clean_batch(records: Vec<InputRecord>) -> Result<Vec<CustomerRecord>> {
    let mut ages = Vec::with_capacity(records.len());
    let mut balances = Vec::with_capacity(records.len());
    let mut debts = Vec::with_capacity(records.len());

    for record in &records {
        let id = record.user_id;
        ages.push(resolve(record.age.as_ref(), id, "age")?);
        balances.push(resolve(record.balance.as_ref(), id, "balance")?);
        debts.push(resolve(record.debt.as_ref(), id, "debt")?);
    }

    let mean_age = batch_mean_age(&ages).ok_or(EtlError::NoAgesForImputation)?;
    let missing_ages = ages.iter().filter(|a| a.is_none()).count();
    if missing_ages > 0 {
        debug!(
            "Imputing {} missing ages with batch mean {:.3}",
            missing_ages, mean_age
        );
    }

    let mut cleaned = Vec::with_capacity(records.len());
    for (((record, age), balance), debt) in records.into_iter().zip(ages).zip(balances).zip(debts) {
        let signup_date = match &record.signup_date {
            Some(raw) => Some(parse_signup_date(raw).ok_or_else(|| EtlError::InvalidDate {
                user_id: record.user_id,
                value: raw.to_string(),
            })?),
            None => None,
        };

        let mut extra = record.extra;
        for field in DERIVED_FIELDS {
            extra.remove(field);
        }

        cleaned.push(CustomerRecord {
            user_id: record.user_id,
            name: record.name,
            email: record.email,
            age: age.unwrap_or(mean_age),
            signup_date,
            account_number: record.account_number,
            balance: balance.unwrap_or(0.0),
            debt: debt.unwrap_or(0.0),
            address: record.address,
            age_group: None,
            balance_inr: None,
            balance_group: None,
            valid_email: None,
            age_constraints: None,
            extra,
        });
    }

    Ok(cleaned)
}

fn resolve(
    field: Option<&crate::domain::NumericField>,
    user_id: i64,
    name: &'static str,
) -> Result<Option<f64>> {
    match field {
        Some(value) => value.resolve(user_id, name),
        None => Ok(None),
    }
}
