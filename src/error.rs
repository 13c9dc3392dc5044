use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Object store error: {0}")]
    Storage(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid signup_date '{value}' for user_id {user_id}")]
    InvalidDate { user_id: i64, value: String },

    #[error("Cannot impute missing age: no ages present in batch")]
    NoAgesForImputation,

    #[error("Malformed {field} '{value}' for user_id {user_id}")]
    MalformedField {
        user_id: i64,
        field: &'static str,
        value: String,
    },

    #[error("Invalid trigger event: {0}")]
    InvalidTrigger(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;
