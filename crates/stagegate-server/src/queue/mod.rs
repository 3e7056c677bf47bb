//! Work queue consumed by downstream processors
//!
//! A validated upload produces exactly one [`WorkItem`]. The queue identity is
//! fixed when the implementation is constructed.

use anyhow::Result;
use async_trait::async_trait;

pub use stagegate_common::types::WorkItem;

pub mod memory;
pub mod postgres;

pub use memory::MemoryWorkQueue;
pub use postgres::PgWorkQueue;

#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, item: &WorkItem) -> Result<()>;
}
