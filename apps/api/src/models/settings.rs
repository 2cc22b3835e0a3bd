use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::settings::FunnelSettings;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SettingsRow {
    pub user_id: Uuid,
    pub phase1_ranking_number: i32,
    pub phase2_ranking_number: i32,
    pub number_of_questions_to_generate: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SettingsRow> for FunnelSettings {
    fn from(row: SettingsRow) -> Self {
        FunnelSettings {
            phase1_width: row.phase1_ranking_number,
            phase2_width: row.phase2_ranking_number,
            questions_to_generate: row.number_of_questions_to_generate,
        }
    }
}
