use crate::app::ports::ObjectStorePort;
use crate::error::{EtlError, Result};
use crate::trigger::ObjectLocation;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// In-memory object store for tests
#[derive(Default, Clone)]
pub struct InMemoryObjectStore {
    objects: Arc<Mutex<HashMap<ObjectLocation, StoredObject>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ObjectLocation, StoredObject>>> {
        self.objects
            .lock()
            .map_err(|_| EtlError::Storage("in-memory store lock poisoned".to_string()))
    }

    /// Seed an object without a content type.
    pub fn insert(&self, location: ObjectLocation, body: impl Into<Vec<u8>>) -> Result<()> {
        self.lock()?.insert(
            location,
            StoredObject {
                body: body.into(),
                content_type: None,
            },
        );
        Ok(())
    }

    pub fn object(&self, location: &ObjectLocation) -> Result<Option<StoredObject>> {
        Ok(self.lock()?.get(location).cloned())
    }

    pub fn contains(&self, location: &ObjectLocation) -> Result<bool> {
        Ok(self.lock()?.contains_key(location))
    }

    pub fn object_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

#[async_trait]
impl ObjectStorePort for InMemoryObjectStore {
    async fn get(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        self.lock()?
            .get(location)
            .map(|o| o.body.clone())
            .ok_or_else(|| EtlError::ObjectNotFound {
                bucket: location.bucket.clone(),
                key: location.key.clone(),
            })
    }

    async fn put(
        &self,
        location: &ObjectLocation,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        debug!("Storing {} bytes at {}", body.len(), location);
        self.lock()?.insert(
            location.clone(),
            StoredObject {
                body,
                content_type: Some(content_type.to_string()),
            },
        );
        Ok(())
    }
}
