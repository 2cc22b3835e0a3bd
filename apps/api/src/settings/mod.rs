// Funnel widths per tenant.
// The resolver only reads; writes go through the settings handlers.

pub mod handlers;
pub mod store;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::FunnelConfig;
use crate::db::StoreError;

pub use store::{PgSettingsStore, SettingsStore, UpsertOutcome};

/// Phase widths for one tenant. Field names match the stored settings documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelSettings {
    /// K1: how many candidates survive the similarity pass.
    #[serde(rename = "phase1_ranking_number")]
    pub phase1_width: i32,
    /// K2: how many candidates survive the detailed assessment.
    #[serde(rename = "phase2_ranking_number")]
    pub phase2_width: i32,
    #[serde(rename = "number_of_questions_to_generate", default)]
    pub questions_to_generate: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Ranking numbers must be positive integers (got phase1={phase1}, phase2={phase2})")]
    NonPositive { phase1: i32, phase2: i32 },

    #[error("Phase 1 ranking number ({phase1}) must be greater than or equal to Phase 2 ({phase2})")]
    Phase1BelowPhase2 { phase1: i32, phase2: i32 },

    #[error("Number of questions to generate must be a positive integer (got {0})")]
    InvalidQuestionCount(i32),
}

impl FunnelSettings {
    pub fn defaults(config: &FunnelConfig) -> Self {
        Self {
            phase1_width: config.default_phase1_width,
            phase2_width: config.default_phase2_width,
            questions_to_generate: None,
        }
    }

    /// Enforces K1 ≥ K2 > 0 and a positive question count when one is given.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let (phase1, phase2) = (self.phase1_width, self.phase2_width);
        if phase1 <= 0 || phase2 <= 0 {
            return Err(SettingsError::NonPositive { phase1, phase2 });
        }
        if phase1 < phase2 {
            return Err(SettingsError::Phase1BelowPhase2 { phase1, phase2 });
        }
        if let Some(count) = self.questions_to_generate {
            if count < 1 {
                return Err(SettingsError::InvalidQuestionCount(count));
            }
        }
        Ok(())
    }

    /// Widths as `usize`, only meaningful after `validate` passed.
    pub fn widths(&self) -> (usize, usize) {
        (self.phase1_width.max(0) as usize, self.phase2_width.max(0) as usize)
    }
}

/// Where the effective settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSource {
    Stored,
    Default,
}

/// Returns the tenant's stored settings, or the configured defaults when none exist.
pub async fn resolve_settings(
    store: &dyn SettingsStore,
    user_id: Uuid,
    defaults: &FunnelConfig,
) -> Result<(FunnelSettings, SettingsSource), StoreError> {
    Ok(match store.get(user_id).await? {
        Some(settings) => (settings, SettingsSource::Stored),
        None => (FunnelSettings::defaults(defaults), SettingsSource::Default),
    })
}
