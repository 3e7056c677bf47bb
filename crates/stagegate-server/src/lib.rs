//! Stagegate Server Library
//!
//! Ingestion gatekeeper for CSV uploads landing in a staging bucket.
//!
//! # Overview
//!
//! Each notified upload is read, checked for the required `id`, `value`, and
//! `timestamp` columns and for well-formed timestamps, then either handed to
//! downstream processors through a work queue or moved to
//! `rejected/<job_id>/` with the reason recorded in the job ledger.
//!
//! - **validation**: timestamp grammar and structural checks (pure)
//! - **quarantine**: copy-then-delete into the rejection area
//! - **ledger**: `VALIDATING → PENDING | FAILED` state machine over a status store
//! - **queue**: work items for downstream processors
//! - **storage**: object-store access (S3/MinIO)
//! - **triage**: the orchestrator tying the above together
//! - **api**: HTTP transport for event notifications and job lookups
//!
//! Collaborators are traits injected at construction, so tests swap in the
//! in-memory implementations.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stagegate_server::{
//!     ledger::MemoryStatusStore, queue::MemoryWorkQueue, storage::MemoryObjectStore,
//!     triage::{ObjectCreated, TriageOrchestrator},
//! };
//!
//! # async fn run() {
//! let objects = Arc::new(MemoryObjectStore::new());
//! objects.insert("staging", "uploads/job-42.csv", "id,value,timestamp\n1,2,1700000000\n");
//!
//! let orchestrator = TriageOrchestrator::new(
//!     objects,
//!     Arc::new(MemoryWorkQueue::new()),
//!     Arc::new(MemoryStatusStore::new()),
//! );
//! let outcome = orchestrator
//!     .triage(&ObjectCreated::new("staging", "uploads/job-42.csv"))
//!     .await;
//! assert!(outcome.is_ok());
//! # }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod middleware;
pub mod quarantine;
pub mod queue;
pub mod storage;
pub mod triage;
pub mod validation;

pub use error::AppError;
