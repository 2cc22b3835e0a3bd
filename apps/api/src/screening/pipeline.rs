//! Screening pipeline: intake, similarity funnel, detail analysis, assembly.
//!
//! The whole funnel runs under one deadline. Nothing is spawned, so when the
//! deadline fires (or the request future is dropped) every in-flight remote call
//! is abandoned and nothing is persisted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::db::StoreError;
use crate::intake::{DocumentBlob, IntakeError, IntakeNormalizer};
use crate::screening::analyzer::{select_finalists, DetailAnalyzer};
use crate::screening::assembler::{assemble_run, RunParts};
use crate::screening::embedding::EmbeddingError;
use crate::screening::models::{JobPosting, RunBundle, ScreeningRun};
use crate::screening::observer::{Phase, PhaseEvent, PhaseObserver};
use crate::screening::similarity::SimilarityFunnel;
use crate::screening::store::DocumentStore;
use crate::settings::{FunnelSettings, SettingsError};

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Intake(#[from] IntakeError),

    #[error("job description could not be embedded: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("screening did not finish within {secs}s")]
    TimedOut { secs: u64 },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug)]
pub struct ScreeningRequest {
    pub user_id: Uuid,
    pub job_role: String,
    pub job_description: String,
    pub uploads: Vec<DocumentBlob>,
}

pub struct ScreeningEngine {
    intake: IntakeNormalizer,
    similarity: SimilarityFunnel,
    analyzer: DetailAnalyzer,
    observer: Arc<dyn PhaseObserver>,
    timeout: Duration,
}

impl ScreeningEngine {
    pub fn new(
        intake: IntakeNormalizer,
        similarity: SimilarityFunnel,
        analyzer: DetailAnalyzer,
        observer: Arc<dyn PhaseObserver>,
        timeout: Duration,
    ) -> Self {
        Self {
            intake,
            similarity,
            analyzer,
            observer,
            timeout,
        }
    }

    /// Runs the funnel and persists the run in one write. A storage failure fails
    /// the whole request.
    pub async fn screen_and_persist(
        &self,
        request: ScreeningRequest,
        settings: FunnelSettings,
        store: &dyn DocumentStore,
    ) -> Result<ScreeningRun, ScreeningError> {
        let bundle = self.screen(request, settings).await?;
        store.insert_run(&bundle).await?;
        Ok(bundle.run)
    }

    /// Runs the funnel under the configured deadline without persisting anything.
    pub async fn screen(
        &self,
        request: ScreeningRequest,
        settings: FunnelSettings,
    ) -> Result<RunBundle, ScreeningError> {
        settings.validate()?;
        if request.job_role.trim().is_empty() {
            return Err(ScreeningError::InvalidRequest(
                "job_role cannot be empty".to_string(),
            ));
        }
        if request.job_description.trim().is_empty() {
            return Err(ScreeningError::InvalidRequest(
                "job_description cannot be empty".to_string(),
            ));
        }

        tokio::time::timeout(self.timeout, self.run_funnel(request, settings))
            .await
            .map_err(|_| ScreeningError::TimedOut {
                secs: self.timeout.as_secs(),
            })?
    }

    async fn run_funnel(
        &self,
        request: ScreeningRequest,
        settings: FunnelSettings,
    ) -> Result<RunBundle, ScreeningError> {
        let run_start_time = Utc::now();
        let batch_id = Uuid::new_v4();
        let (phase1_width, phase2_width) = settings.widths();
        let ScreeningRequest {
            user_id,
            job_role,
            job_description,
            uploads,
        } = request;

        info!(
            batch_id = %batch_id,
            user_id = %user_id,
            uploads = uploads.len(),
            phase1_width,
            phase2_width,
            "screening started"
        );

        let started = Instant::now();
        let upload_count = uploads.len();
        let intake = self.intake.normalize(batch_id, uploads).await?;
        self.emit(batch_id, Phase::Intake, upload_count, intake.documents.len(), started);

        let job = JobPosting {
            id: Uuid::new_v4(),
            role: job_role,
            description: job_description,
        };
        let job_text = job_text(&job);

        let started = Instant::now();
        let shortlist = self
            .similarity
            .shortlist(&job_text, &intake.documents, phase1_width)
            .await?;
        if shortlist.unscored > 0 {
            info!(batch_id = %batch_id, unscored = shortlist.unscored, "candidates without similarity score");
        }
        self.emit(
            batch_id,
            Phase::Similarity,
            intake.documents.len(),
            shortlist.survivors.len(),
            started,
        );

        let started = Instant::now();
        let analyzed = self
            .analyzer
            .analyze(&job_text, shortlist.survivors.clone())
            .await;
        let finalists = select_finalists(analyzed, phase2_width);
        self.emit(
            batch_id,
            Phase::Analysis,
            shortlist.survivors.len(),
            finalists.len(),
            started,
        );

        let run_end_time = Utc::now();
        let started = Instant::now();
        let finalist_count = finalists.len();
        let bundle = assemble_run(RunParts {
            user_id,
            batch_id,
            job,
            settings,
            run_start_time,
            run_end_time,
            intake,
            shortlist: shortlist.survivors,
            finalists,
        });
        self.emit(
            batch_id,
            Phase::Assembly,
            finalist_count,
            bundle.run.candidates.len(),
            started,
        );

        Ok(bundle)
    }

    fn emit(
        &self,
        batch_id: Uuid,
        phase: Phase,
        input_count: usize,
        output_count: usize,
        started: Instant,
    ) {
        self.observer.phase_completed(&PhaseEvent {
            batch_id,
            phase,
            input_count,
            output_count,
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }
}

/// The text embedded and assessed for the job side.
fn job_text(job: &JobPosting) -> String {
    format!("{}\n\n{}", job.role.trim(), job.description.trim())
}
