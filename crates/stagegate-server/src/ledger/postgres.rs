//! Postgres-backed status store.
//!
//! One row per job id. `put` overwrites every column; `update` upserts and
//! uses `COALESCE` so columns the update leaves out keep their values.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use stagegate_common::types::JobStatus;
use tracing::{debug, instrument};

use super::{JobRecord, JobUpdate, StatusStore};
use crate::db::is_sql_identifier;

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    job_id: String,
    status: String,
    source_uri: Option<String>,
    started_at: Option<String>,
    finished_at: Option<String>,
    message: String,
    rejected_key: Option<String>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = anyhow::Error;

    fn try_from(row: JobRow) -> Result<Self> {
        Ok(Self {
            status: row.status.parse::<JobStatus>()?,
            job_id: row.job_id,
            source_uri: row.source_uri,
            started_at: row.started_at,
            finished_at: row.finished_at,
            message: row.message,
            rejected_key: row.rejected_key,
        })
    }
}

#[derive(Clone)]
pub struct PgStatusStore {
    pool: PgPool,
    table: String,
}

impl PgStatusStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        if !is_sql_identifier(&table) {
            bail!("Invalid status store table name: {:?}", table);
        }
        Ok(Self { pool, table })
    }

    /// Create the ledger table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                job_id       TEXT PRIMARY KEY,
                status       TEXT NOT NULL,
                source_uri   TEXT,
                started_at   TEXT,
                finished_at  TEXT,
                message      TEXT NOT NULL DEFAULT '',
                rejected_key TEXT
            )
            "#,
            table = self.table
        );

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .context(format!("Failed to create status store table {}", self.table))?;

        debug!(table = %self.table, "Status store schema ready");
        Ok(())
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    #[instrument(skip(self, record), fields(job_id = %record.job_id))]
    async fn put(&self, record: &JobRecord) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {table}
                (job_id, status, source_uri, started_at, finished_at, message, rejected_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (job_id) DO UPDATE SET
                status = EXCLUDED.status,
                source_uri = EXCLUDED.source_uri,
                started_at = EXCLUDED.started_at,
                finished_at = EXCLUDED.finished_at,
                message = EXCLUDED.message,
                rejected_key = EXCLUDED.rejected_key
            "#,
            table = self.table
        );

        sqlx::query(&sql)
            .bind(&record.job_id)
            .bind(record.status.as_str())
            .bind(&record.source_uri)
            .bind(&record.started_at)
            .bind(&record.finished_at)
            .bind(&record.message)
            .bind(&record.rejected_key)
            .execute(&self.pool)
            .await
            .context(format!("Failed to write job record {}", record.job_id))?;

        Ok(())
    }

    #[instrument(skip(self, update))]
    async fn update(&self, job_id: &str, update: &JobUpdate) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {table} (job_id, status, message, finished_at, rejected_key)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (job_id) DO UPDATE SET
                status = EXCLUDED.status,
                message = EXCLUDED.message,
                finished_at = COALESCE(EXCLUDED.finished_at, {table}.finished_at),
                rejected_key = COALESCE(EXCLUDED.rejected_key, {table}.rejected_key)
            "#,
            table = self.table
        );

        sqlx::query(&sql)
            .bind(job_id)
            .bind(update.status.as_str())
            .bind(&update.message)
            .bind(&update.finished_at)
            .bind(&update.rejected_key)
            .execute(&self.pool)
            .await
            .context(format!("Failed to update job record {}", job_id))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let sql = format!(
            r#"
            SELECT job_id, status, source_uri, started_at, finished_at, message, rejected_key
            FROM {table}
            WHERE job_id = $1
            "#,
            table = self.table
        );

        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .context(format!("Failed to read job record {}", job_id))?;

        row.map(JobRecord::try_from).transpose()
    }
}
