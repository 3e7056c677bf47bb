//! Common types used across stagegate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};

/// Format used for every ledger timestamp (`startedAt`, `finishedAt`).
pub const LEDGER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Render a UTC instant in the ledger timestamp format.
pub fn format_ledger_timestamp(at: DateTime<Utc>) -> String {
    at.format(LEDGER_TIMESTAMP_FORMAT).to_string()
}

/// Current UTC time in the ledger timestamp format.
pub fn ledger_timestamp() -> String {
    format_ledger_timestamp(Utc::now())
}

// ============================================================================
// Job Status
// ============================================================================

/// Lifecycle status of a triage job.
///
/// Only the states owned by the gatekeeper are modeled. Downstream processors
/// move `PENDING` jobs forward on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Structural validation is in progress
    Validating,
    /// Validation passed and a work item was queued
    Pending,
    /// Validation or I/O failed
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Validating => "VALIDATING",
            JobStatus::Pending => "PENDING",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Whether the gatekeeper may move a job from `self` to `next`.
    ///
    /// `VALIDATING` is also reachable from every state because a re-upload of
    /// the same filename replaces the ledger entry.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (_, JobStatus::Validating)
                | (JobStatus::Validating, JobStatus::Pending)
                | (JobStatus::Validating, JobStatus::Failed)
        )
    }

    /// No further transition is made by the gatekeeper once here.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "VALIDATING" => Ok(JobStatus::Validating),
            "PENDING" => Ok(JobStatus::Pending),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(GateError::Parse(format!("Unknown job status: {}", other))),
        }
    }
}

// ============================================================================
// Work Item
// ============================================================================

/// Message handed to downstream processors once a file passes validation.
///
/// Serialized as `{"jobId": ..., "bucket": ..., "key": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    /// Ledger key of the job
    pub job_id: String,

    /// Bucket holding the validated source file
    pub bucket: String,

    /// Object key of the validated source file
    pub key: String,
}

impl WorkItem {
    pub fn new(job_id: impl Into<String>, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_job_status_transitions() {
        assert!(JobStatus::Validating.can_transition_to(JobStatus::Pending));
        assert!(JobStatus::Validating.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Failed.can_transition_to(JobStatus::Validating));
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Validating));

        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Validating.is_terminal());
        assert!(JobStatus::Pending.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_job_status_round_trip_str() {
        for status in [JobStatus::Validating, JobStatus::Pending, JobStatus::Failed] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("RUNNING".parse::<JobStatus>().is_err());
        assert!("pending".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_status_serde_uppercase() {
        let json = serde_json::to_string(&JobStatus::Validating).unwrap();
        assert_eq!(json, "\"VALIDATING\"");
    }

    #[test]
    fn test_work_item_wire_format() {
        let item = WorkItem::new("job-42", "staging", "uploads/job-42.csv");
        let body = item.to_json().unwrap();
        assert_eq!(
            body,
            r#"{"jobId":"job-42","bucket":"staging","key":"uploads/job-42.csv"}"#
        );
        assert_eq!(WorkItem::from_json(&body).unwrap(), item);
    }

    #[test]
    fn test_ledger_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 5).unwrap();
        assert_eq!(format_ledger_timestamp(at), "2024-01-15T10:30:05Z");
        assert_eq!(ledger_timestamp().len(), "2024-01-15T10:30:05Z".len());
    }
}
