use async_trait::async_trait;

use crate::domain::Notice;
use crate::error::Result;
use crate::trigger::ObjectLocation;

#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    /// Whole object body. A missing object is `EtlError::ObjectNotFound`.
    async fn get(&self, location: &ObjectLocation) -> Result<Vec<u8>>;

    /// Store `body` at `location`, replacing any existing object.
    /// Readers never observe a partially written body.
    async fn put(&self, location: &ObjectLocation, body: Vec<u8>, content_type: &str) -> Result<()>;
}

#[async_trait]
pub trait NotifierPort: Send + Sync {
    async fn send(&self, notice: &Notice) -> Result<()>;
}
