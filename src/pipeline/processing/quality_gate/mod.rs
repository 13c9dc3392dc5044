use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

use crate::constants::{EMAIL_PATTERN, MAX_SUPPORTED_AGE, MIN_ADULT_AGE};
use crate::domain::CustomerRecord;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"));

/// Shape-only email check: local part of word characters, dots and hyphens,
/// a domain with at least one dot, and a word-character suffix.
pub fn is_valid_email(email: Option<&str>) -> bool {
    email.map_or(false, |e| EMAIL_REGEX.is_match(e))
}

/// Advisory only: 18 <= age <= 100.
pub fn within_age_constraints(age: f64) -> bool {
    (MIN_ADULT_AGE..=MAX_SUPPORTED_AGE).contains(&age)
}

/// Why the gate removed a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NegativeBalance,
    NegativeDebt,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::NegativeBalance => "negative_balance",
            DropReason::NegativeDebt => "negative_debt",
        }
    }
}

/// Trait for the validation checkpoint.
///
/// `assess` annotates the record (`valid_email`, `age_constraints`) and
/// returns a reason when the record must be dropped. The annotations never
/// cause a drop by themselves; only the numeric rules do.
pub trait QualityGate {
    fn assess(&self, record: &mut CustomerRecord) -> Option<DropReason>;

    fn validate_batch(&self, records: Vec<CustomerRecord>) -> ValidatedBatch {
        let rows_in = records.len();
        let mut kept = Vec::with_capacity(rows_in);
        let mut dropped_negative_balance = 0;
        let mut dropped_negative_debt = 0;

        for mut record in records {
            match self.assess(&mut record) {
                None => kept.push(record),
                Some(DropReason::NegativeBalance) => dropped_negative_balance += 1,
                Some(DropReason::NegativeDebt) => dropped_negative_debt += 1,
            }
        }

        let summary = ValidationSummary::from_records(
            &kept,
            rows_in,
            dropped_negative_balance,
            dropped_negative_debt,
        );
        ValidatedBatch {
            records: kept,
            summary,
        }
    }
}

/// Email shape, advisory age range, and non-negative balance/debt.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultQualityGate;

impl DefaultQualityGate {
    pub fn new() -> Self {
        Self
    }
}

impl QualityGate for DefaultQualityGate {
    fn assess(&self, record: &mut CustomerRecord) -> Option<DropReason> {
        record.valid_email = Some(is_valid_email(record.email.as_deref()));
        record.age_constraints = Some(within_age_constraints(record.age));

        if record.balance < 0.0 {
            Some(DropReason::NegativeBalance)
        } else if record.debt < 0.0 {
            Some(DropReason::NegativeDebt)
        } else {
            None
        }
    }
}

/// Records that passed the gate, with the counts computed over them.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub records: Vec<CustomerRecord>,
    pub summary: ValidationSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub label: String,
    pub count: usize,
}

/// Non-zero counts per bin label, in ascending bin order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupCounts(pub Vec<GroupCount>);

impl GroupCounts {
    pub fn tally<'a>(labels: impl Iterator<Item = Option<&'a str>>) -> Self {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for label in labels.flatten() {
            *counts.entry(label).or_default() += 1;
        }
        let mut groups: Vec<GroupCount> = counts
            .into_iter()
            .map(|(label, count)| GroupCount {
                label: label.to_string(),
                count,
            })
            .collect();
        groups.sort_by_key(|g| (bin_lower_bound(&g.label), g.label.clone()));
        Self(groups)
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|g| g.count).sum()
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.0.iter().find(|g| g.label == label).map(|g| g.count)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Serialized as {"label": count, ...} keeping bin order
impl Serialize for GroupCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for group in &self.0 {
            map.serialize_entry(&group.label, &group.count)?;
        }
        map.end()
    }
}

/// "40-44" -> 40, "100K-150K" -> 100
fn bin_lower_bound(label: &str) -> u64 {
    label
        .split('-')
        .next()
        .map(|lo| lo.trim_end_matches('K'))
        .and_then(|lo| lo.parse().ok())
        .unwrap_or(u64::MAX)
}

/// Aggregates over the post-filter dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_negative_balance: usize,
    pub dropped_negative_debt: usize,
    pub age_group_counts: GroupCounts,
    pub balance_group_counts: GroupCounts,
    pub invalid_email_count: usize,
    pub under_18_count: usize,
}

impl ValidationSummary {
    pub fn from_records(
        records: &[CustomerRecord],
        rows_in: usize,
        dropped_negative_balance: usize,
        dropped_negative_debt: usize,
    ) -> Self {
        Self {
            rows_in,
            rows_out: records.len(),
            dropped_negative_balance,
            dropped_negative_debt,
            age_group_counts: GroupCounts::tally(records.iter().map(|r| r.age_group.as_deref())),
            balance_group_counts: GroupCounts::tally(
                records.iter().map(|r| r.balance_group.as_deref()),
            ),
            invalid_email_count: records
                .iter()
                .filter(|r| r.valid_email != Some(true))
                .count(),
            under_18_count: records.iter().filter(|r| r.age < MIN_ADULT_AGE).count(),
        }
    }
}
