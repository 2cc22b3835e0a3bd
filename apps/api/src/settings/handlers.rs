use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::activity::{ActivityEvent, ActivityKind};
use crate::errors::AppError;
use crate::settings::{resolve_settings, FunnelSettings, SettingsSource};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub settings: FunnelSettings,
    pub source: SettingsSource,
}

/// GET /api/v1/settings/:user_id
///
/// The tenant's stored widths, or the configured defaults.
pub async fn handle_get_settings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SettingsResponse>, AppError> {
    let (settings, source) =
        resolve_settings(state.settings.as_ref(), user_id, &state.config.funnel).await?;
    Ok(Json(SettingsResponse {
        user_id,
        settings,
        source,
    }))
}

/// PUT /api/v1/settings/:user_id
pub async fn handle_put_settings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(settings): Json<FunnelSettings>,
) -> Result<Json<SettingsResponse>, AppError> {
    settings.validate()?;

    let outcome = state.settings.upsert(user_id, &settings).await?;
    info!(
        user_id = %user_id,
        phase1 = settings.phase1_width,
        phase2 = settings.phase2_width,
        outcome = outcome.label(),
        "screening settings saved"
    );

    state.activity.record(ActivityEvent {
        user_id,
        kind: ActivityKind::SettingsUpdated,
        message: format!(
            "Screening settings {}: phase 1 keeps {}, phase 2 keeps {}",
            outcome.label(),
            settings.phase1_width,
            settings.phase2_width
        ),
    });

    Ok(Json(SettingsResponse {
        user_id,
        settings,
        source: SettingsSource::Stored,
    }))
}
