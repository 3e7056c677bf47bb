//! In-process status store with failure injection, for tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use stagegate_common::types::JobStatus;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use super::{JobRecord, JobUpdate, StatusStore};

#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    records: Mutex<HashMap<String, JobRecord>>,
    /// Every status written per job, in write order.
    history: Mutex<HashMap<String, Vec<JobStatus>>>,
    fail_writes: AtomicBool,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self, job_id: &str) -> Vec<JobStatus> {
        lock(&self.history).get(job_id).cloned().unwrap_or_default()
    }

    pub fn record(&self, job_id: &str) -> Option<JobRecord> {
        lock(&self.records).get(job_id).cloned()
    }

    /// Make every later `put`/`update` fail.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("injected status store failure");
        }
        Ok(())
    }

    fn push_history(&self, job_id: &str, status: JobStatus) {
        lock(&self.history)
            .entry(job_id.to_string())
            .or_default()
            .push(status);
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn put(&self, record: &JobRecord) -> Result<()> {
        self.check_write()?;
        lock(&self.records).insert(record.job_id.clone(), record.clone());
        self.push_history(&record.job_id, record.status);
        Ok(())
    }

    async fn update(&self, job_id: &str, update: &JobUpdate) -> Result<()> {
        self.check_write()?;
        lock(&self.records)
            .entry(job_id.to_string())
            .and_modify(|record| record.apply(update))
            .or_insert_with(|| JobRecord::from_update(job_id, update));
        self.push_history(job_id, update.status);
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        Ok(self.record(job_id))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
