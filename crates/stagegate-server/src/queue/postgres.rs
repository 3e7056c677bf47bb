//! Postgres-backed work queue.
//!
//! Items land in a shared `work_items` table tagged with the queue name.
//! Consumers claim rows with:
//!
//! ```sql
//! UPDATE work_items SET status = 'claimed', claimed_at = now()
//! WHERE id = (
//!     SELECT id FROM work_items
//!     WHERE queue = $1 AND status = 'pending'
//!     ORDER BY id
//!     LIMIT 1
//!     FOR UPDATE SKIP LOCKED
//! )
//! RETURNING payload;
//! ```

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use tracing::{info, instrument};

use super::{WorkItem, WorkQueue};

#[derive(Clone)]
pub struct PgWorkQueue {
    pool: PgPool,
    queue: String,
}

impl PgWorkQueue {
    pub fn new(pool: PgPool, queue: impl Into<String>) -> Result<Self> {
        let queue = queue.into();
        if queue.trim().is_empty() {
            bail!("Work queue name cannot be empty");
        }
        Ok(Self { pool, queue })
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS work_items (
                id          BIGSERIAL PRIMARY KEY,
                queue       TEXT NOT NULL,
                payload     JSONB NOT NULL,
                status      TEXT NOT NULL DEFAULT 'pending',
                enqueued_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                claimed_at  TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create work_items table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS work_items_pending_idx \
             ON work_items (queue, id) WHERE status = 'pending'",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create work_items index")?;

        Ok(())
    }
}

#[async_trait]
impl WorkQueue for PgWorkQueue {
    #[instrument(skip(self, item), fields(job_id = %item.job_id, queue = %self.queue))]
    async fn enqueue(&self, item: &WorkItem) -> Result<()> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO work_items (queue, payload) VALUES ($1, $2) RETURNING id",
        )
        .bind(&self.queue)
        .bind(Json(item))
        .fetch_one(&self.pool)
        .await
        .context(format!("Failed to enqueue work item for job {}", item.job_id))?;

        info!(work_item_id = id, "Work item enqueued");
        Ok(())
    }
}
