//! In-process object store with failure injection, for tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::ObjectStore;

/// Operation selector for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Copy,
    Delete,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    failing: Mutex<HashSet<StoreOp>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        lock(&self.objects).insert((bucket.to_string(), key.to_string()), data.into());
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        lock(&self.objects).contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys present in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.objects)
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Make every later call of `op` fail.
    pub fn fail_on(&self, op: StoreOp) {
        lock(&self.failing).insert(op);
    }

    fn check(&self, op: StoreOp) -> Result<()> {
        if lock(&self.failing).contains(&op) {
            bail!("injected {:?} failure", op);
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.check(StoreOp::Get)?;
        match self.object(bucket, key) {
            Some(data) => Ok(data),
            None => bail!("NoSuchKey: s3://{}/{}", bucket, key),
        }
    }

    async fn copy(&self, bucket: &str, source_key: &str, dest_key: &str) -> Result<()> {
        self.check(StoreOp::Copy)?;
        let Some(data) = self.object(bucket, source_key) else {
            bail!("NoSuchKey: s3://{}/{}", bucket, source_key);
        };
        self.insert(bucket, dest_key, data);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.check(StoreOp::Delete)?;
        lock(&self.objects).remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
