//! Triage orchestration
//!
//! For one staged upload:
//!
//! 1. derive the job id and record `VALIDATING`
//! 2. read the object; an unreadable or non-UTF-8 file is marked `FAILED`
//!    without quarantine, since its content was never confirmed
//! 3. validate structure
//!    - invalid: quarantine (best effort), then mark `FAILED`
//!    - valid: enqueue a work item, then mark `PENDING`
//!
//! Every side effect is visible as soon as it happens; there is no rollback
//! across steps. Errors never escape [`TriageOrchestrator::triage`]: each path
//! ends in a ledger write attempt and a [`TriageOutcome`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    ledger::{JobLedger, StatusStore, QUEUED_MESSAGE},
    quarantine::QuarantineMover,
    queue::{WorkItem, WorkQueue},
    storage::ObjectStore,
    validation::{self, ValidationOutcome, REQUIRED_COLUMNS},
};

pub mod event;

pub use event::{derive_job_id, ObjectCreated, S3Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageStatus {
    Ok,
    Failed,
}

/// What the invoking transport gets back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageOutcome {
    pub status: TriageStatus,
    pub job_id: String,
}

impl TriageOutcome {
    fn ok(job_id: String) -> Self {
        Self {
            status: TriageStatus::Ok,
            job_id,
        }
    }

    fn failed(job_id: String) -> Self {
        Self {
            status: TriageStatus::Failed,
            job_id,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == TriageStatus::Ok
    }
}

/// Attempt, log, continue.
///
/// Turns a secondary step's error into a log line and `None` so the caller's
/// control flow does not change.
pub trait BestEffort<T> {
    fn best_effort(self, step: &str) -> Option<T>;
}

impl<T> BestEffort<T> for anyhow::Result<T> {
    fn best_effort(self, step: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(step, error = ?e, "Best-effort step failed, continuing");
                None
            },
        }
    }
}

/// Wires storage, validation, quarantine, queue, and ledger together.
#[derive(Clone)]
pub struct TriageOrchestrator {
    objects: Arc<dyn ObjectStore>,
    queue: Arc<dyn WorkQueue>,
    ledger: JobLedger,
    quarantine: QuarantineMover,
}

impl TriageOrchestrator {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        queue: Arc<dyn WorkQueue>,
        status: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            quarantine: QuarantineMover::new(objects.clone()),
            ledger: JobLedger::new(status),
            objects,
            queue,
        }
    }

    pub fn ledger(&self) -> &JobLedger {
        &self.ledger
    }

    #[instrument(
        skip(self, object),
        fields(bucket = %object.bucket, key = %object.key, job_id = tracing::field::Empty)
    )]
    pub async fn triage(&self, object: &ObjectCreated) -> TriageOutcome {
        let job_id = derive_job_id(&object.key);
        tracing::Span::current().record("job_id", job_id.as_str());

        info!("Validating upload {}", object.source_uri());

        // Later updates upsert, so a lost initial write still ends in a terminal record.
        self.ledger
            .create_validating(&job_id, &object.source_uri())
            .await
            .best_effort("record VALIDATING");

        let bytes = match self.objects.get(&object.bucket, &object.key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(error = ?e, "Failed to read file");
                return self.fail(job_id, &format!("Could not read file: {:#}", e), None).await;
            },
        };

        let outcome = match validation::validate(&bytes, &REQUIRED_COLUMNS) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Failed to decode file");
                return self.fail(job_id, &format!("Could not read file: {}", e), None).await;
            },
        };

        match outcome {
            ValidationOutcome::Invalid(reason) => {
                error!(reason = %reason, "Upload rejected");
                let rejected_key = self
                    .quarantine
                    .quarantine(&object.bucket, &object.key, &job_id)
                    .await
                    .best_effort("quarantine rejected upload");
                self.fail(job_id, &reason, rejected_key.as_deref()).await
            },
            ValidationOutcome::Valid => self.admit(job_id, object).await,
        }
    }

    async fn admit(&self, job_id: String, object: &ObjectCreated) -> TriageOutcome {
        let item = WorkItem::new(job_id.clone(), object.bucket.clone(), object.key.clone());

        if let Err(e) = self.queue.enqueue(&item).await {
            error!(error = ?e, "Failed to enqueue work item");
            return self
                .fail(job_id, &format!("Could not enqueue job: {:#}", e), None)
                .await;
        }

        self.ledger
            .mark_pending(&job_id, QUEUED_MESSAGE)
            .await
            .best_effort("record PENDING");

        info!("Job validated and queued");
        TriageOutcome::ok(job_id)
    }

    async fn fail(
        &self,
        job_id: String,
        message: &str,
        rejected_key: Option<&str>,
    ) -> TriageOutcome {
        self.ledger
            .mark_failed(&job_id, message, rejected_key)
            .await
            .best_effort("record FAILED");

        TriageOutcome::failed(job_id)
    }

    /// Triage objects one after another, skipping folder placeholders.
    pub async fn triage_all(&self, objects: &[ObjectCreated]) -> Vec<TriageOutcome> {
        let mut outcomes = Vec::with_capacity(objects.len());
        for object in objects {
            if object.is_folder_marker() {
                info!(bucket = %object.bucket, key = %object.key, "Skipping folder marker");
                continue;
            }
            outcomes.push(self.triage(object).await);
        }
        outcomes
    }
}
