// SQLite JobStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use speedcompare_core::domain::JobKind;
use speedcompare_core::error::{AppError, Result};
use speedcompare_core::port::{JobStore, StoredJob};
use sqlx::SqlitePool;
use tracing::debug;

const SELECT_COLUMNS: &str =
    "SELECT id, kind, version, finished, external_test_id, created_at, updated_at, body FROM jobs";

pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn insert(&self, job: &StoredJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, kind, version, finished, external_test_id, created_at, updated_at, body
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(job.kind.as_str())
        .bind(job.version)
        .bind(job.finished)
        .bind(&job.external_test_id)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.body.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(job_id = %job.id, kind = %job.kind, "Job inserted");
        Ok(())
    }

    async fn find(&self, kind: JobKind, id: &str) -> Result<Option<StoredJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!("{} WHERE id = ? AND kind = ?", SELECT_COLUMNS))
            .bind(id)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(JobRow::into_stored).transpose()
    }

    async fn save(&self, job: &StoredJob) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET version = version + 1, finished = ?, external_test_id = ?, updated_at = ?, body = ?
            WHERE id = ? AND kind = ?
            "#,
        )
        .bind(job.finished)
        .bind(&job.external_test_id)
        .bind(job.updated_at)
        .bind(job.body.to_string())
        .bind(&job.id)
        .bind(job.kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{} {} not found", job.kind, job.id)));
        }
        Ok(())
    }

    async fn update_if_version(&self, job: &StoredJob) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET version = version + 1, finished = ?, external_test_id = ?, updated_at = ?, body = ?
            WHERE id = ? AND kind = ? AND version = ?
            "#,
        )
        .bind(job.finished)
        .bind(&job.external_test_id)
        .bind(job.updated_at)
        .bind(job.body.to_string())
        .bind(&job.id)
        .bind(job.kind.as_str())
        .bind(job.version)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_unfinished(&self, kind: JobKind) -> Result<Vec<StoredJob>> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "{} WHERE kind = ? AND finished = 0 ORDER BY created_at ASC, rowid ASC",
            SELECT_COLUMNS
        ))
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_stored).collect()
    }

    async fn find_test_by_external_id(
        &self,
        external_test_id: &str,
    ) -> Result<Option<StoredJob>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "{} WHERE kind = ? AND external_test_id = ?",
            SELECT_COLUMNS
        ))
        .bind(JobKind::Test.as_str())
        .bind(external_test_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(JobRow::into_stored).transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    kind: String,
    version: i64,
    finished: bool,
    external_test_id: Option<String>,
    created_at: i64,
    updated_at: i64,
    body: String,
}

impl JobRow {
    fn into_stored(self) -> Result<StoredJob> {
        Ok(StoredJob {
            kind: self.kind.parse()?,
            body: serde_json::from_str(&self.body)?,
            id: self.id,
            version: self.version,
            finished: self.finished,
            external_test_id: self.external_test_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
