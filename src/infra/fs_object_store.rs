use crate::app::ports::ObjectStorePort;
use crate::error::{EtlError, Result};
use crate::trigger::ObjectLocation;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Directory-backed object store: `<root>/<bucket>/<key>`.
///
/// Keys may contain `/` and map onto subdirectories. Writes go to a temporary
/// file beside the target and are renamed into place.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a location to a path under the root, rejecting anything that
    /// could escape it.
    pub fn path_for(&self, location: &ObjectLocation) -> Result<PathBuf> {
        let bucket = Path::new(&location.bucket);
        let key = Path::new(&location.key);
        if !is_plain_relative(bucket) || bucket.components().count() != 1 {
            return Err(EtlError::Storage(format!("invalid bucket name '{}'", location.bucket)));
        }
        if !is_plain_relative(key) {
            return Err(EtlError::Storage(format!("invalid object key '{}'", location.key)));
        }
        Ok(self.root.join(bucket).join(key))
    }
}

fn is_plain_relative(path: &Path) -> bool {
    let mut components = path.components().peekable();
    components.peek().is_some() && components.all(|c| matches!(c, Component::Normal(_)))
}

#[async_trait]
impl ObjectStorePort for FsObjectStore {
    async fn get(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        let path = self.path_for(location)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(EtlError::ObjectNotFound {
                bucket: location.bucket.clone(),
                key: location.key.clone(),
            }),
            Err(e) => Err(EtlError::Io(e)),
        }
    }

    async fn put(
        &self,
        location: &ObjectLocation,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let path = self.path_for(location)?;
        let dir = path.parent().ok_or_else(|| {
            EtlError::Storage(format!("no parent directory for {}", path.display()))
        })?;
        tokio::fs::create_dir_all(dir).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&tmp, &body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(EtlError::Io(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(EtlError::Io(e));
        }

        // Content type has no place on a plain filesystem; logged for traceability
        debug!(
            "Wrote {} bytes to {} ({})",
            body.len(),
            path.display(),
            content_type
        );
        Ok(())
    }
}
