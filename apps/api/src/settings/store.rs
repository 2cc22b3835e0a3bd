use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::settings::SettingsRow;
use crate::settings::FunnelSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

impl UpsertOutcome {
    pub fn label(self) -> &'static str {
        match self {
            UpsertOutcome::Created => "created",
            UpsertOutcome::Updated => "updated",
        }
    }
}

/// Per-tenant settings storage.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<FunnelSettings>, StoreError>;
    async fn upsert(
        &self,
        user_id: Uuid,
        settings: &FunnelSettings,
    ) -> Result<UpsertOutcome, StoreError>;
}

pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<FunnelSettings>, StoreError> {
        let row: Option<SettingsRow> =
            sqlx::query_as("SELECT * FROM screening_settings WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(FunnelSettings::from))
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        settings: &FunnelSettings,
    ) -> Result<UpsertOutcome, StoreError> {
        // xmax = 0 only for rows created by this statement
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO screening_settings
                (user_id, phase1_ranking_number, phase2_ranking_number, number_of_questions_to_generate)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                phase1_ranking_number = EXCLUDED.phase1_ranking_number,
                phase2_ranking_number = EXCLUDED.phase2_ranking_number,
                number_of_questions_to_generate = EXCLUDED.number_of_questions_to_generate,
                updated_at = NOW()
            RETURNING (xmax = 0)
            "#,
        )
        .bind(user_id)
        .bind(settings.phase1_width)
        .bind(settings.phase2_width)
        .bind(settings.questions_to_generate)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }
}
