//! Relocation of rejected uploads to `rejected/<job_id>/<filename>`.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::storage::ObjectStore;

/// Prefix under which rejected uploads are kept, in the source bucket.
pub const REJECTED_PREFIX: &str = "rejected";

/// Last path segment of an object key.
pub fn basename(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Destination key for a rejected upload. Same inputs, same key.
pub fn rejected_key_for(job_id: &str, source_key: &str) -> String {
    format!("{}/{}/{}", REJECTED_PREFIX, job_id, basename(source_key))
}

#[derive(Clone)]
pub struct QuarantineMover {
    store: Arc<dyn ObjectStore>,
}

impl QuarantineMover {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Copy the upload into the rejection area, then delete the original.
    ///
    /// A failed copy is an error and leaves the source untouched. A failed
    /// delete after a good copy is only logged: the file then exists at both
    /// keys, and the rejected key is still returned.
    #[instrument(skip(self))]
    pub async fn quarantine(&self, bucket: &str, source_key: &str, job_id: &str) -> Result<String> {
        let rejected_key = rejected_key_for(job_id, source_key);

        self.store
            .copy(bucket, source_key, &rejected_key)
            .await
            .context(format!("Failed to copy {} into quarantine", source_key))?;

        if let Err(e) = self.store.delete(bucket, source_key).await {
            warn!(
                error = ?e,
                source_key,
                rejected_key = %rejected_key,
                "Quarantined copy written but source could not be deleted"
            );
        } else {
            info!(source_key, rejected_key = %rejected_key, "Moved upload to quarantine");
        }

        Ok(rejected_key)
    }
}
