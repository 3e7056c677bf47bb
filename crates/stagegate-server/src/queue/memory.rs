//! In-process work queue with failure injection, for tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use super::{WorkItem, WorkQueue};

#[derive(Debug, Default)]
pub struct MemoryWorkQueue {
    /// Serialized message bodies, in enqueue order
    messages: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Decoded view of [`MemoryWorkQueue::messages`].
    pub fn items(&self) -> Vec<WorkItem> {
        self.messages()
            .iter()
            .filter_map(|body| WorkItem::from_json(body).ok())
            .collect()
    }

    pub fn fail_enqueue(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn enqueue(&self, item: &WorkItem) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("injected queue failure");
        }

        let body = item.to_json()?;
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(body);
        Ok(())
    }
}
