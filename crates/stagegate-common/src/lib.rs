//! Stagegate Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the stagegate workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`GateError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Types**: the job status enum and the work item handed to downstream
//!   processors, so both sides of the queue agree on the wire format
//!
//! # Example
//!
//! ```no_run
//! use stagegate_common::types::{JobStatus, WorkItem};
//!
//! let item = WorkItem::new("job-42", "staging", "uploads/job-42.csv");
//! let body = item.to_json().unwrap();
//! assert!(body.contains("\"jobId\":\"job-42\""));
//! assert!(JobStatus::Validating.can_transition_to(JobStatus::Pending));
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{GateError, Result};
