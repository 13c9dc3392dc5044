//! Record shapes flowing through the transform.
//!
//! `InputRecord` is what the upstream export writes: permissive about missing
//! and loosely typed values. `CustomerRecord` is the cleaned row, which the
//! later stages extend with derived fields before it is written back out.

use crate::error::{EtlError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field names the transform adds. Stale copies on input are discarded.
pub const DERIVED_FIELDS: [&str; 5] = [
    "age_group",
    "balance_inr",
    "balance_group",
    "valid_email",
    "age_constraints",
];

/// A numeric column as it appears on the wire: a JSON number, or a decimal
/// rendered as text (how DECIMAL columns often come out of an export).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(f64),
    Text(String),
}

impl NumericField {
    /// Resolve to a finite number. Blank text counts as missing.
    pub fn resolve(&self, user_id: i64, field: &'static str) -> Result<Option<f64>> {
        let malformed = |value: String| EtlError::MalformedField {
            user_id,
            field,
            value,
        };
        match self {
            NumericField::Number(n) if n.is_finite() => Ok(Some(*n)),
            NumericField::Number(n) => Err(malformed(n.to_string())),
            NumericField::Text(s) if s.trim().is_empty() => Ok(None),
            NumericField::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(malformed(s.clone())),
            },
        }
    }
}

/// `signup_date` on the wire: a date/timestamp string or epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateField {
    EpochMillis(i64),
    Text(String),
}

impl std::fmt::Display for DateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateField::EpochMillis(ms) => write!(f, "{ms}"),
            DateField::Text(s) => f.write_str(s),
        }
    }
}

/// One row of the upstream export (users joined with bank_accounts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub user_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<NumericField>,
    #[serde(default)]
    pub signup_date: Option<DateField>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub balance: Option<NumericField>,
    #[serde(default)]
    pub debt: Option<NumericField>,
    #[serde(default)]
    pub address: Option<String>,
    /// Columns this transform does not know about; carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A cleaned row plus the fields derived from it.
///
/// Derived fields stay `None` until their stage has run. After a full pass
/// only `age_group` and `balance_group` can still be `None` (value out of
/// the binned range).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub user_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(serialize_with = "serialize_age")]
    pub age: f64,
    #[serde(with = "signup_date_format")]
    pub signup_date: Option<NaiveDateTime>,
    pub account_number: Option<String>,
    pub balance: f64,
    pub debt: f64,
    pub address: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub balance_inr: Option<f64>,
    #[serde(default)]
    pub balance_group: Option<String>,
    #[serde(default)]
    pub valid_email: Option<bool>,
    #[serde(default)]
    pub age_constraints: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A balance notice addressed to one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Parse a source object body: a UTF-8 JSON array of input records.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<InputRecord>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Serialize output records as a compact JSON array.
pub fn serialize_records(records: &[CustomerRecord]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(records)?)
}

/// Transformed objects are read back by the notifier.
pub fn parse_customer_records(bytes: &[u8]) -> Result<Vec<CustomerRecord>> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Largest magnitude below which every whole `f64` is an exact integer (2^53).
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Whole ages are written as integers; imputed means keep their fraction.
fn serialize_age<S>(age: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if age.fract() == 0.0 && age.abs() < EXACT_INTEGER_LIMIT {
        serializer.serialize_i64(*age as i64)
    } else {
        serializer.serialize_f64(*age)
    }
}

/// `signup_date` is written as a plain `YYYY-MM-DD` date.
mod signup_date_format {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            NaiveDate::parse_from_str(&s, FORMAT)
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
                .map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}
