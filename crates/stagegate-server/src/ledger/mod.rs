//! Job ledger
//!
//! Records each job's lifecycle in a keyed status store:
//!
//! ```text
//! VALIDATING ──► PENDING   (validated, work item queued)
//!      │
//!      └───────► FAILED    (read, validation, or enqueue failure)
//! ```
//!
//! The initial write replaces the whole record, so a re-upload of the same
//! filename starts a fresh entry. Later transitions are partial updates that
//! only touch the attributes they name. Nothing here checks the previous
//! state before writing: concurrent triage of one filename ends with the last
//! writer's status.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stagegate_common::types::{ledger_timestamp, JobStatus};
use std::sync::Arc;
use tracing::{info, instrument};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStatusStore;
pub use postgres::PgStatusStore;

/// Message stored with the initial `VALIDATING` record.
pub const VALIDATING_MESSAGE: &str = "Validating CSV structure";

/// Message stored when a job is handed to the work queue.
pub const QUEUED_MESSAGE: &str = "Queued for processing";

/// Full ledger entry for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    /// `s3://bucket/key` of the upload. Absent only when a partial update
    /// created the entry.
    pub source_uri: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_key: Option<String>,
}

/// Partial update: status and message always, the rest only when `Some`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobUpdate {
    pub status: JobStatus,
    pub message: String,
    pub finished_at: Option<String>,
    pub rejected_key: Option<String>,
}

impl JobRecord {
    /// Apply `update` with the store's partial-update semantics.
    pub fn apply(&mut self, update: &JobUpdate) {
        self.status = update.status;
        self.message = update.message.clone();
        if let Some(finished_at) = &update.finished_at {
            self.finished_at = Some(finished_at.clone());
        }
        if let Some(rejected_key) = &update.rejected_key {
            self.rejected_key = Some(rejected_key.clone());
        }
    }

    /// Entry created by an update that found no existing record.
    pub fn from_update(job_id: &str, update: &JobUpdate) -> Self {
        let mut record = Self {
            job_id: job_id.to_string(),
            status: update.status,
            source_uri: None,
            started_at: None,
            finished_at: None,
            message: String::new(),
            rejected_key: None,
        };
        record.apply(update);
        record
    }
}

/// Keyed status store holding one [`JobRecord`] per job id.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Replace the entry for `record.job_id`.
    async fn put(&self, record: &JobRecord) -> Result<()>;

    /// Apply a partial update, creating the entry if it does not exist.
    async fn update(&self, job_id: &str, update: &JobUpdate) -> Result<()>;

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>>;
}

/// State-machine operations over a [`StatusStore`].
#[derive(Clone)]
pub struct JobLedger {
    store: Arc<dyn StatusStore>,
}

impl JobLedger {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Start (or restart) a job in `VALIDATING`.
    #[instrument(skip(self))]
    pub async fn create_validating(&self, job_id: &str, source_uri: &str) -> Result<()> {
        let record = JobRecord {
            job_id: job_id.to_string(),
            status: JobStatus::Validating,
            source_uri: Some(source_uri.to_string()),
            started_at: Some(ledger_timestamp()),
            finished_at: None,
            message: VALIDATING_MESSAGE.to_string(),
            rejected_key: None,
        };

        self.store.put(&record).await?;
        info!(job_id, status = %JobStatus::Validating, "Job recorded");
        Ok(())
    }

    /// Terminal failure. `rejected_key` is recorded only when quarantine succeeded.
    #[instrument(skip(self))]
    pub async fn mark_failed(
        &self,
        job_id: &str,
        message: &str,
        rejected_key: Option<&str>,
    ) -> Result<()> {
        let update = JobUpdate {
            status: JobStatus::Failed,
            message: message.to_string(),
            finished_at: Some(ledger_timestamp()),
            rejected_key: rejected_key.map(str::to_string),
        };

        self.store.update(job_id, &update).await?;
        info!(job_id, status = %JobStatus::Failed, "Job status updated");
        Ok(())
    }

    /// Hand-off to the work queue. The job is not finished, so no finish time.
    #[instrument(skip(self))]
    pub async fn mark_pending(&self, job_id: &str, message: &str) -> Result<()> {
        let update = JobUpdate {
            status: JobStatus::Pending,
            message: message.to_string(),
            finished_at: None,
            rejected_key: None,
        };

        self.store.update(job_id, &update).await?;
        info!(job_id, status = %JobStatus::Pending, "Job status updated");
        Ok(())
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.store.get(job_id).await
    }
}
