use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};

/// Object-storage "new object" notification, as delivered to the handler.
///
/// Only the fields the transform reads are modelled; everything else in the
/// notification is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<TriggerRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

/// A bucket/key pair addressing one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

impl TriggerEvent {
    /// Build a single-record notification for `bucket`/`key`.
    pub fn for_object(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            records: vec![TriggerRecord {
                s3: S3Entity {
                    bucket: BucketEntity { name: bucket.into() },
                    object: ObjectEntity { key: key.into() },
                },
            }],
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| EtlError::InvalidTrigger(e.to_string()))
    }

    /// The source object of the first record. Later records are ignored:
    /// one invocation handles exactly one object.
    pub fn source(&self) -> Result<ObjectLocation> {
        let record = self
            .records
            .first()
            .ok_or_else(|| EtlError::InvalidTrigger("notification has no records".to_string()))?;
        let bucket = &record.s3.bucket.name;
        let key = &record.s3.object.key;
        if bucket.is_empty() || key.is_empty() {
            return Err(EtlError::InvalidTrigger(
                "bucket name and object key are required".to_string(),
            ));
        }
        Ok(ObjectLocation::new(bucket.clone(), key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_notification() {
        let json = br#"{
            "Records": [{
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": {"name": "raw-exports", "arn": "arn:aws:s3:::raw-exports"},
                    "object": {"key": "data.json_20240601120000.json", "size": 2048}
                }
            }]
        }"#;
        let event = TriggerEvent::from_json(json).unwrap();
        let source = event.source().unwrap();
        assert_eq!(source, ObjectLocation::new("raw-exports", "data.json_20240601120000.json"));
        assert_eq!(source.to_string(), "raw-exports/data.json_20240601120000.json");
    }

    #[test]
    fn test_empty_notification_is_invalid() {
        let event = TriggerEvent::from_json(br#"{"Records": []}"#).unwrap();
        assert!(matches!(event.source(), Err(EtlError::InvalidTrigger(_))));
    }

    #[test]
    fn test_malformed_notification_is_invalid() {
        let err = TriggerEvent::from_json(br#"{"Records": [{"s3": {}}]}"#).unwrap_err();
        assert!(matches!(err, EtlError::InvalidTrigger(_)));
    }
}
