use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::screening::ScreeningRunRow;
use crate::screening::models::{RunBundle, ScreeningRun};

/// Run history filter. `from` is inclusive, `until` exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunWindow {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl RunWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.until.map_or(true, |until| at < until)
    }
}

/// Durable storage for screening runs.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Writes the job posting, candidate documents and run atomically.
    async fn insert_run(&self, bundle: &RunBundle) -> Result<Uuid, StoreError>;
    async fn fetch_run(&self, run_id: Uuid) -> Result<Option<ScreeningRun>, StoreError>;
    /// Newest first.
    async fn list_runs(
        &self,
        user_id: Uuid,
        window: RunWindow,
    ) -> Result<Vec<ScreeningRun>, StoreError>;
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert_run(&self, bundle: &RunBundle) -> Result<Uuid, StoreError> {
        let RunBundle {
            job,
            documents,
            run,
        } = bundle;

        let settings = serde_json::to_value(run.settings)?;
        let provenance = serde_json::to_value(&run.provenance)?;
        let candidates = serde_json::to_value(&run.candidates)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO job_postings (id, user_id, role, description) VALUES ($1, $2, $3, $4)",
        )
        .bind(job.id)
        .bind(run.user_id)
        .bind(&job.role)
        .bind(&job.description)
        .execute(&mut *tx)
        .await?;

        for document in documents {
            sqlx::query(
                r#"
                INSERT INTO candidate_documents
                    (id, job_id, batch_id, file_name, raw_text, email, phone, raw_ref, discovery_index)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(document.id)
            .bind(job.id)
            .bind(run.batch_id)
            .bind(&document.file_name)
            .bind(&document.text)
            .bind(&document.email)
            .bind(&document.phone)
            .bind(&document.raw_ref)
            .bind(i32::try_from(document.discovery_index).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO screening_runs
                (id, user_id, job_id, job_role, batch_id, run_start_time, run_end_time,
                 settings, provenance, candidates)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(run.id)
        .bind(run.user_id)
        .bind(run.job_id)
        .bind(&run.job_role)
        .bind(run.batch_id)
        .bind(run.run_start_time)
        .bind(run.run_end_time)
        .bind(settings)
        .bind(provenance)
        .bind(candidates)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            run_id = %run.id,
            documents = documents.len(),
            finalists = run.candidates.len(),
            "screening run persisted"
        );
        Ok(run.id)
    }

    async fn fetch_run(&self, run_id: Uuid) -> Result<Option<ScreeningRun>, StoreError> {
        let row: Option<ScreeningRunRow> =
            sqlx::query_as("SELECT * FROM screening_runs WHERE id = $1")
                .bind(run_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(ScreeningRun::try_from).transpose()
    }

    async fn list_runs(
        &self,
        user_id: Uuid,
        window: RunWindow,
    ) -> Result<Vec<ScreeningRun>, StoreError> {
        let rows: Vec<ScreeningRunRow> = sqlx::query_as(
            r#"
            SELECT * FROM screening_runs
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR run_start_time >= $2)
              AND ($3::timestamptz IS NULL OR run_start_time < $3)
            ORDER BY run_start_time DESC
            "#,
        )
        .bind(user_id)
        .bind(window.from)
        .bind(window.until)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ScreeningRun::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_window_bounds_are_inclusive_then_exclusive() {
        let day = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let window = RunWindow {
            from: Some(day),
            until: Some(day + Duration::days(1)),
        };
        assert!(window.contains(day));
        assert!(window.contains(day + Duration::hours(23)));
        assert!(!window.contains(day + Duration::days(1)));
        assert!(!window.contains(day - Duration::seconds(1)));
    }

    #[test]
    fn test_open_window_contains_everything() {
        assert!(RunWindow::default().contains(Utc::now()));
    }

    #[test]
    fn test_history_index_covers_the_list_query() {
        let schema = include_str!("../../migrations/20250101000000_screening.sql");
        assert!(schema.contains("ON screening_runs (user_id, run_start_time DESC)"));
    }
}
