//! Axum route handlers for the Screening API.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::activity::{ActivityEvent, ActivityKind};
use crate::errors::AppError;
use crate::intake::DocumentBlob;
use crate::screening::models::{FinalistRecord, ScreeningRun};
use crate::screening::pipeline::ScreeningRequest;
use crate::screening::store::RunWindow;
use crate::settings::resolve_settings;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningResponse {
    pub run_id: Uuid,
    pub candidates: Vec<FinalistRecord>,
}

/// A stored run plus its wall-clock duration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    #[serde(flatten)]
    pub run: ScreeningRun,
    /// Seconds between run start and end.
    pub time_taken: f64,
}

impl From<ScreeningRun> for RunView {
    fn from(run: ScreeningRun) -> Self {
        let time_taken = run.time_taken_secs();
        Self { run, time_taken }
    }
}

#[derive(Debug, Deserialize)]
pub struct RunHistoryQuery {
    pub user_id: Uuid,
    /// ISO date (YYYY-MM-DD), inclusive.
    pub start_date: Option<String>,
    /// ISO date (YYYY-MM-DD), inclusive.
    pub end_date: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/screenings
///
/// Multipart form: `user_id`, `job_role`, `job_description` and one or more
/// `files` (PDF, TXT or ZIP). Runs the two-phase funnel and stores the run.
pub async fn handle_create_screening(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ScreeningResponse>, AppError> {
    let request = read_screening_form(multipart).await?;
    let user_id = request.user_id;

    let (settings, source) =
        resolve_settings(state.settings.as_ref(), user_id, &state.config.funnel).await?;
    info!(
        user_id = %user_id,
        phase1 = settings.phase1_width,
        phase2 = settings.phase2_width,
        source = ?source,
        "resolved funnel settings"
    );

    let job_role = request.job_role.clone();
    let run = state
        .engine
        .screen_and_persist(request, settings, state.runs.as_ref())
        .await?;

    state.activity.record(ActivityEvent {
        user_id,
        kind: ActivityKind::ScreeningCompleted,
        message: format!(
            "Screened candidates for '{}': {} finalists in {:.1}s",
            job_role,
            run.candidates.len(),
            run.time_taken_secs()
        ),
    });

    Ok(Json(ScreeningResponse {
        run_id: run.id,
        candidates: run.candidates,
    }))
}

/// GET /api/v1/screenings/:id
pub async fn handle_get_screening(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<RunView>, AppError> {
    let run = state
        .runs
        .fetch_run(run_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Screening run {run_id} not found")))?;
    Ok(Json(run.into()))
}

/// GET /api/v1/screenings?user_id=&start_date=&end_date=
///
/// Newest first. An empty result is a 404.
pub async fn handle_list_screenings(
    State(state): State<AppState>,
    Query(query): Query<RunHistoryQuery>,
) -> Result<Json<Vec<RunView>>, AppError> {
    let window = history_window(query.start_date.as_deref(), query.end_date.as_deref())?;
    let runs = state.runs.list_runs(query.user_id, window).await?;
    if runs.is_empty() {
        return Err(AppError::NotFound(
            "No screening runs found for this user and filters".to_string(),
        ));
    }
    Ok(Json(runs.into_iter().map(RunView::from).collect()))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn read_screening_form(mut multipart: Multipart) -> Result<ScreeningRequest, AppError> {
    let mut user_id = None;
    let mut job_role = None;
    let mut job_description = None;
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => {
                let raw = field.text().await?;
                let parsed = Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::Validation(format!("Invalid user_id: {raw}")))?;
                user_id = Some(parsed);
            }
            "job_role" => job_role = Some(field.text().await?),
            "job_description" => job_description = Some(field.text().await?),
            "files" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| AppError::Validation("Every file needs a file name".to_string()))?;
                let bytes = field.bytes().await?;
                uploads.push(DocumentBlob::new(file_name, bytes));
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown form field");
            }
        }
    }

    let missing = |field: &str| AppError::Validation(format!("Missing form field '{field}'"));
    Ok(ScreeningRequest {
        user_id: user_id.ok_or_else(|| missing("user_id"))?,
        job_role: job_role.ok_or_else(|| missing("job_role"))?,
        job_description: job_description.ok_or_else(|| missing("job_description"))?,
        uploads,
    })
}

/// Turns inclusive calendar dates into a `[from, until)` instant window.
fn history_window(start: Option<&str>, end: Option<&str>) -> Result<RunWindow, AppError> {
    let parse = |raw: &str, field: &str| {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            AppError::Validation(format!("Invalid {field} format. Use ISO format (YYYY-MM-DD)"))
        })
    };
    let start_day = start.map(|raw| parse(raw, "start_date")).transpose()?;
    let end_day = end.map(|raw| parse(raw, "end_date")).transpose()?;

    if let (Some(s), Some(e)) = (start_day, end_day) {
        if s > e {
            return Err(AppError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
    }

    let midnight = |day: NaiveDate| day.and_time(NaiveTime::MIN).and_utc();
    Ok(RunWindow {
        from: start_day.map(midnight),
        until: end_day.map(|day| midnight(day) + Duration::days(1)),
    })
}
