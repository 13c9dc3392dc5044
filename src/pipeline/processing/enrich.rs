use crate::constants::{
    AGE_BIN_LIMIT, AGE_BIN_WIDTH, BALANCE_BIN_LIMIT, BALANCE_BIN_WIDTH, INR_PER_USD,
};
use crate::domain::CustomerRecord;
use crate::error::{EtlError, Result};

/// Trait for adding derived fields to cleaned records
pub trait Enricher {
    /// Fill the derived fields of one record from its cleaned fields
    fn enrich(&self, record: &mut CustomerRecord) -> Result<()>;

    /// Stops at the first record that cannot be enriched
    fn enrich_batch(&self, records: &mut [CustomerRecord]) -> Result<()> {
        for record in records.iter_mut() {
            self.enrich(record)?;
        }
        Ok(())
    }
}

/// Default enricher: 5-year age bins, USD to INR conversion, 50K INR balance bins
pub struct DefaultEnricher {
    /// Target-currency units per source-currency unit
    pub conversion_rate: f64,
}

impl Default for DefaultEnricher {
    fn default() -> Self {
        Self {
            conversion_rate: INR_PER_USD,
        }
    }
}

impl DefaultEnricher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Enricher for DefaultEnricher {
    fn enrich(&self, record: &mut CustomerRecord) -> Result<()> {
        let balance_inr = record.balance * self.conversion_rate;
        // A finite balance can still overflow once converted
        if !balance_inr.is_finite() {
            return Err(EtlError::MalformedField {
                user_id: record.user_id,
                field: "balance",
                value: format!("{:e}", record.balance),
            });
        }
        record.age_group = age_group(record.age);
        record.balance_inr = Some(balance_inr);
        record.balance_group = balance_group(balance_inr);
        Ok(())
    }
}

/// `"{lo}-{lo+4}"` for ages in [0, 100), half-open 5-year bins.
pub fn age_group(age: f64) -> Option<String> {
    if !(0.0..AGE_BIN_LIMIT as f64).contains(&age) {
        return None;
    }
    let lo = (age / AGE_BIN_WIDTH as f64).floor() as u32 * AGE_BIN_WIDTH;
    Some(format!("{}-{}", lo, lo + AGE_BIN_WIDTH - 1))
}

/// `"{lo}K-{hi}K"` for converted balances in [0, 10,000,000), half-open 50K bins.
pub fn balance_group(balance_inr: f64) -> Option<String> {
    if !(0.0..BALANCE_BIN_LIMIT as f64).contains(&balance_inr) {
        return None;
    }
    let lo = (balance_inr / BALANCE_BIN_WIDTH as f64).floor() as u64 * BALANCE_BIN_WIDTH;
    Some(format!("{}K-{}K", lo / 1000, (lo + BALANCE_BIN_WIDTH) / 1000))
}
