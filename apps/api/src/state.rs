use std::sync::Arc;

use crate::activity::ActivityLog;
use crate::config::Config;
use crate::screening::pipeline::ScreeningEngine;
use crate::screening::store::DocumentStore;
use crate::settings::SettingsStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// The funnel with its process-wide collaborators (encoder, model, blob store).
    pub engine: Arc<ScreeningEngine>,
    pub runs: Arc<dyn DocumentStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub activity: Arc<dyn ActivityLog>,
}
