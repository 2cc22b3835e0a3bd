//! In-memory fakes for every collaborator trait, shared by unit and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::activity::{ActivityEvent, ActivityLog};
use crate::db::StoreError;
use crate::intake::{BlobStore, DocumentTextExtractor, IntakeNormalizer, ZipArchiveExpander};
use crate::llm_client::LlmError;
use crate::screening::analyzer::DetailAnalyzer;
use crate::screening::assessor::{FitAssessment, LanguageModelService, TechnicalSkills};
use crate::screening::embedding::{EmbeddingEncoder, EmbeddingError, EmbeddingSink};
use crate::screening::models::{CandidateDocument, RunBundle, ScreeningRun};
use crate::screening::observer::{PhaseEvent, PhaseObserver};
use crate::screening::pipeline::ScreeningEngine;
use crate::screening::similarity::SimilarityFunnel;
use crate::screening::store::{DocumentStore, RunWindow};
use crate::settings::{FunnelSettings, SettingsStore, UpsertOutcome};

pub fn document(file_name: &str, discovery_index: usize, text: &str) -> CandidateDocument {
    CandidateDocument {
        id: Uuid::new_v4(),
        file_name: file_name.to_string(),
        text: text.to_string(),
        email: None,
        phone: None,
        raw_ref: None,
        discovery_index,
    }
}

pub fn assessment_reply(fit_score: f64) -> FitAssessment {
    FitAssessment {
        summary: format!("scored {fit_score}"),
        fit_score,
        technical_skills: TechnicalSkills {
            exact_matches: vec!["Rust".to_string()],
            transferable: vec![],
        },
        non_technical_skills: vec![],
        experience_highlights: String::new(),
        education_highlights: String::new(),
        justification: "scripted".to_string(),
        gaps: vec![],
    }
}

/// Builds an engine over real intake code and the given fakes.
pub fn engine(
    encoder: FakeEncoder,
    model: ScriptedModel,
    observer: Arc<dyn PhaseObserver>,
) -> ScreeningEngine {
    let intake = IntakeNormalizer::new(
        Arc::new(DocumentTextExtractor),
        Arc::new(ZipArchiveExpander::new(1024 * 1024)),
        Arc::new(MemoryBlobStore::default()),
        1024 * 1024,
    );
    ScreeningEngine::new(
        intake,
        SimilarityFunnel::new(
            Arc::new(encoder),
            Arc::new(MemoryEmbeddingSink::default()),
            2,
        ),
        DetailAnalyzer::new(Arc::new(model), 4),
        observer,
        Duration::from_secs(60),
    )
}

#[derive(Default)]
pub struct MemoryBlobStore {
    pub objects: Mutex<Vec<(String, Bytes)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("object storage unavailable"));
        }
        self.objects.lock().unwrap().push((key.to_string(), bytes));
        Ok(format!("memory://{key}"))
    }
}

/// Maps exact input texts to vectors. Unknown texts fail to encode.
#[derive(Default)]
pub struct FakeEncoder {
    vectors: HashMap<String, Vec<f32>>,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl EmbeddingEncoder for FakeEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or(EmbeddingError::Api {
                status: 503,
                message: "no vector scripted".to_string(),
            })
    }
}

#[derive(Default)]
pub struct MemoryEmbeddingSink {
    pub stored: Mutex<Vec<(Uuid, Vec<f32>)>>,
    fail: bool,
}

impl MemoryEmbeddingSink {
    pub fn failing() -> Self {
        Self {
            stored: Mutex::default(),
            fail: true,
        }
    }
}

#[async_trait]
impl EmbeddingSink for MemoryEmbeddingSink {
    async fn store(&self, candidate_id: Uuid, embedding: &[f32]) -> Result<()> {
        if self.fail {
            return Err(anyhow!("cache unavailable"));
        }
        self.stored
            .lock()
            .unwrap()
            .push((candidate_id, embedding.to_vec()));
        Ok(())
    }
}

/// Replies keyed by exact document text. Unscripted documents fail.
/// `peak_assessments` records the most assessment calls seen in flight at once.
#[derive(Default)]
pub struct ScriptedModel {
    names: HashMap<String, String>,
    assessments: HashMap<String, FitAssessment>,
    delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    pub peak_assessments: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, document: &str, name: &str) -> Self {
        self.names.insert(document.to_string(), name.to_string());
        self
    }

    pub fn with_assessment(mut self, document: &str, reply: FitAssessment) -> Self {
        self.assessments.insert(document.to_string(), reply);
        self
    }

    pub fn with_delay(mut self, document: &str, delay: Duration) -> Self {
        self.delays.insert(document.to_string(), delay);
        self
    }

    async fn wait(&self, document: &str) {
        if let Some(delay) = self.delays.get(document) {
            tokio::time::sleep(*delay).await;
        }
    }
}

#[async_trait]
impl LanguageModelService for ScriptedModel {
    async fn extract_name(&self, document: &str) -> Result<String, LlmError> {
        self.wait(document).await;
        self.names
            .get(document)
            .cloned()
            .ok_or(LlmError::EmptyContent)
    }

    async fn assess(&self, _job: &str, document: &str) -> Result<FitAssessment, LlmError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_assessments.fetch_max(current, Ordering::SeqCst);
        self.wait(document).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.assessments
            .get(document)
            .cloned()
            .ok_or_else(|| LlmError::Schema("no scripted reply".to_string()))
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    pub runs: Mutex<Vec<RunBundle>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_run(&self, bundle: &RunBundle) -> Result<Uuid, StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        self.runs.lock().unwrap().push(bundle.clone());
        Ok(bundle.run.id)
    }

    async fn fetch_run(&self, run_id: Uuid) -> Result<Option<ScreeningRun>, StoreError> {
        // serialize through JSON like the real store does
        let stored = self
            .runs
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.run.id == run_id)
            .map(|b| b.run.clone());
        match stored {
            Some(run) => Ok(Some(serde_json::from_value(serde_json::to_value(run)?)?)),
            None => Ok(None),
        }
    }

    async fn list_runs(
        &self,
        user_id: Uuid,
        window: RunWindow,
    ) -> Result<Vec<ScreeningRun>, StoreError> {
        let mut runs: Vec<_> = self
            .runs
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.run.clone())
            .filter(|r| r.user_id == user_id && window.contains(r.run_start_time))
            .collect();
        runs.sort_by(|a, b| b.run_start_time.cmp(&a.run_start_time));
        Ok(runs)
    }
}

#[derive(Default)]
pub struct MemorySettingsStore {
    pub rows: Mutex<HashMap<Uuid, FunnelSettings>>,
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<FunnelSettings>, StoreError> {
        Ok(self.rows.lock().unwrap().get(&user_id).copied())
    }

    async fn upsert(
        &self,
        user_id: Uuid,
        settings: &FunnelSettings,
    ) -> Result<UpsertOutcome, StoreError> {
        let previous = self.rows.lock().unwrap().insert(user_id, *settings);
        Ok(match previous {
            Some(_) => UpsertOutcome::Updated,
            None => UpsertOutcome::Created,
        })
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PhaseEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<PhaseEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl PhaseObserver for RecordingObserver {
    fn phase_completed(&self, event: &PhaseEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Default)]
pub struct RecordingActivityLog {
    pub events: Mutex<Vec<ActivityEvent>>,
}

impl ActivityLog for RecordingActivityLog {
    fn record(&self, event: ActivityEvent) {
        self.events.lock().unwrap().push(event);
    }
}
