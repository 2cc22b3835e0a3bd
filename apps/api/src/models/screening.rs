use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::StoreError;
use crate::screening::models::ScreeningRun;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScreeningRunRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub job_id: Uuid,
    pub job_role: String,
    pub batch_id: Uuid,
    pub run_start_time: DateTime<Utc>,
    pub run_end_time: DateTime<Utc>,
    pub settings: Value,
    pub provenance: Value,
    pub candidates: Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ScreeningRunRow> for ScreeningRun {
    type Error = StoreError;

    fn try_from(row: ScreeningRunRow) -> Result<Self, Self::Error> {
        Ok(ScreeningRun {
            id: row.id,
            user_id: row.user_id,
            job_id: row.job_id,
            job_role: row.job_role,
            batch_id: row.batch_id,
            run_start_time: row.run_start_time,
            run_end_time: row.run_end_time,
            settings: serde_json::from_value(row.settings)?,
            provenance: serde_json::from_value(row.provenance)?,
            candidates: serde_json::from_value(row.candidates)?,
        })
    }
}
