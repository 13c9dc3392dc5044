/// Conversion and binning constants for the customer transform.
/// Values mirror what downstream reports already assume, so change them together.

// 1 unit of source currency (USD) in target currency (INR)
pub const INR_PER_USD: f64 = 85.0;

// Age bins: [0, 5), [5, 10), ... [95, 100)
pub const AGE_BIN_WIDTH: u32 = 5;
pub const AGE_BIN_LIMIT: u32 = 100;

// Balance bins over the converted amount: [0, 50K), ... [9950K, 10000K)
pub const BALANCE_BIN_WIDTH: u64 = 50_000;
pub const BALANCE_BIN_LIMIT: u64 = 10_000_000;

// Inclusive range for the advisory age_constraints flag
pub const MIN_ADULT_AGE: f64 = 18.0;
pub const MAX_SUPPORTED_AGE: f64 = 100.0;

pub const EMAIL_PATTERN: &str = r"^[\w.-]+@[\w.-]+\.\w+$";

pub const DEFAULT_DESTINATION_BUCKET: &str = "transformeds3sql";
pub const DEFAULT_DESTINATION_PREFIX: &str = "transformed_";
pub const JSON_CONTENT_TYPE: &str = "application/json";

pub const DEFAULT_STORE_ROOT: &str = "data";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_CONFIG_PATH: &str = "customer_etl.toml";

/// Destination key for a given source key, e.g. `data.json` -> `transformed_data.json`
pub fn destination_key(prefix: &str, source_key: &str) -> String {
    format!("{prefix}{source_key}")
}
