mod activity;
mod config;
mod db;
mod errors;
mod intake;
mod llm_client;
mod models;
mod routes;
mod screening;
mod settings;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::activity::PgActivityLog;
use crate::config::Config;
use crate::db::create_pool;
use crate::intake::{DocumentTextExtractor, IntakeNormalizer, S3BlobStore, ZipArchiveExpander};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::screening::analyzer::DetailAnalyzer;
use crate::screening::assessor::ClaudeScreeningModel;
use crate::screening::embedding::{HttpEmbeddingEncoder, RedisEmbeddingSink};
use crate::screening::observer::TracingPhaseObserver;
use crate::screening::pipeline::ScreeningEngine;
use crate::screening::similarity::SimilarityFunnel;
use crate::screening::store::PgDocumentStore;
use crate::settings::PgSettingsStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis (embedding cache)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO (raw documents)
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.funnel.llm_max_retries,
    )?;
    info!(
        "LLM client initialized (model: {}, retries: {})",
        llm_client::MODEL,
        config.funnel.llm_max_retries
    );

    let encoder = HttpEmbeddingEncoder::new(&config.embedding_url)?;
    info!("Embedding encoder at {}", config.embedding_url);

    let funnel = &config.funnel;
    let intake = IntakeNormalizer::new(
        Arc::new(DocumentTextExtractor),
        Arc::new(ZipArchiveExpander::new(funnel.max_document_bytes)),
        Arc::new(S3BlobStore::new(s3, config.s3_bucket.clone())),
        funnel.max_document_bytes,
    );
    let similarity = SimilarityFunnel::new(
        Arc::new(encoder),
        Arc::new(RedisEmbeddingSink::new(
            redis,
            funnel.embedding_cache_ttl_secs,
        )),
        funnel.embedding_concurrency,
    );
    let analyzer = DetailAnalyzer::new(
        Arc::new(ClaudeScreeningModel::new(llm)),
        funnel.analysis_concurrency,
    );
    let engine = ScreeningEngine::new(
        intake,
        similarity,
        analyzer,
        Arc::new(TracingPhaseObserver),
        Duration::from_secs(funnel.screening_timeout_secs),
    );
    info!(
        "Screening funnel ready (defaults K1={}, K2={}, analysis concurrency {})",
        funnel.default_phase1_width, funnel.default_phase2_width, funnel.analysis_concurrency
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        engine: Arc::new(engine),
        runs: Arc::new(PgDocumentStore::new(db.clone())),
        settings: Arc::new(PgSettingsStore::new(db.clone())),
        activity: Arc::new(PgActivityLog::new(db)),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "screener-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
