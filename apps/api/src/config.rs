use std::str::FromStr;

use anyhow::{Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    /// Base URL of the text-embeddings service (exposes `POST /embed`).
    pub embedding_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Request body limit for the multipart screening endpoint.
    pub max_upload_bytes: usize,
    pub funnel: FunnelConfig,
}

/// Tunables for the screening funnel. Everything here has a default.
#[derive(Debug, Clone)]
pub struct FunnelConfig {
    /// K1 used when a tenant has no stored settings.
    pub default_phase1_width: i32,
    /// K2 used when a tenant has no stored settings.
    pub default_phase2_width: i32,
    /// Max candidates analyzed by the remote model at the same time.
    pub analysis_concurrency: usize,
    /// Max in-flight embedding requests during phase 1.
    pub embedding_concurrency: usize,
    /// Extra attempts per remote-model call on transient failures.
    pub llm_max_retries: u32,
    /// Deadline for a whole screening request, persistence excluded.
    pub screening_timeout_secs: u64,
    /// Uploads and archive entries above this size are rejected or skipped.
    pub max_document_bytes: usize,
    pub embedding_cache_ttl_secs: u64,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            default_phase1_width: 20,
            default_phase2_width: 10,
            analysis_concurrency: 8,
            embedding_concurrency: 4,
            llm_max_retries: 1,
            screening_timeout_secs: 300,
            max_document_bytes: 10 * 1024 * 1024,
            embedding_cache_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = FunnelConfig::default();
        let funnel = FunnelConfig {
            default_phase1_width: optional_env("DEFAULT_PHASE1_WIDTH", defaults.default_phase1_width)?,
            default_phase2_width: optional_env("DEFAULT_PHASE2_WIDTH", defaults.default_phase2_width)?,
            analysis_concurrency: optional_env("ANALYSIS_CONCURRENCY", defaults.analysis_concurrency)?
                .max(1),
            embedding_concurrency: optional_env(
                "EMBEDDING_CONCURRENCY",
                defaults.embedding_concurrency,
            )?
            .max(1),
            llm_max_retries: optional_env("LLM_MAX_RETRIES", defaults.llm_max_retries)?,
            screening_timeout_secs: optional_env(
                "SCREENING_TIMEOUT_SECS",
                defaults.screening_timeout_secs,
            )?,
            max_document_bytes: optional_env("MAX_DOCUMENT_BYTES", defaults.max_document_bytes)?,
            embedding_cache_ttl_secs: optional_env(
                "EMBEDDING_CACHE_TTL_SECS",
                defaults.embedding_cache_ttl_secs,
            )?,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            embedding_url: require_env("EMBEDDING_URL")?,
            port: optional_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            funnel,
        })
    }
}

#[cfg(test)]
impl Config {
    /// A config for router tests; no external service is contacted with it.
    pub fn test_default() -> Self {
        Config {
            database_url: "postgres://localhost/screener_test".to_string(),
            redis_url: "redis://localhost".to_string(),
            s3_bucket: "screener-test".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            anthropic_api_key: "test".to_string(),
            embedding_url: "http://localhost:8081".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            funnel: FunnelConfig::default(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
