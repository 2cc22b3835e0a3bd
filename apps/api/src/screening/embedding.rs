//! Embedding collaborators: the fixed text encoder and the embedding cache.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

const ENCODER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("embedding service returned no vector")]
    Empty,

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding is not comparable (zero or non-finite vector)")]
    Degenerate,
}

/// A fixed, deterministic text encoder whose vectors are cosine-comparable.
#[async_trait]
pub trait EmbeddingEncoder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Client for a text-embeddings-inference style server (`POST {base}/embed`).
pub struct HttpEmbeddingEncoder {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a str,
    truncate: bool,
}

impl HttpEmbeddingEncoder {
    pub fn new(base_url: &str) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: Client::builder().timeout(ENCODER_TIMEOUT).build()?,
            endpoint: format!("{}/embed", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl EmbeddingEncoder for HttpEmbeddingEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest {
                inputs: text,
                truncate: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let mut vectors: Vec<Vec<f32>> = response.json().await?;
        if vectors.is_empty() {
            return Err(EmbeddingError::Empty);
        }
        Ok(vectors.swap_remove(0))
    }
}

/// Where candidate embeddings are kept for later retrieval. Never on the ranking path.
#[async_trait]
pub trait EmbeddingSink: Send + Sync {
    async fn store(&self, candidate_id: Uuid, embedding: &[f32]) -> Result<()>;
}

/// Stores embeddings as JSON arrays under `embedding:{candidate_id}` with a TTL.
pub struct RedisEmbeddingSink {
    client: redis::Client,
    connection: OnceCell<MultiplexedConnection>,
    ttl_secs: u64,
}

impl RedisEmbeddingSink {
    pub fn new(client: redis::Client, ttl_secs: u64) -> Self {
        Self {
            client,
            connection: OnceCell::new(),
            ttl_secs,
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let connection = self
            .connection
            .get_or_try_init(|| self.client.get_multiplexed_async_connection())
            .await?;
        Ok(connection.clone())
    }
}

pub fn embedding_key(candidate_id: Uuid) -> String {
    format!("embedding:{candidate_id}")
}

#[async_trait]
impl EmbeddingSink for RedisEmbeddingSink {
    async fn store(&self, candidate_id: Uuid, embedding: &[f32]) -> Result<()> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(embedding)?;
        redis::cmd("SET")
            .arg(embedding_key(candidate_id))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<_, ()>(&mut conn)
            .await?;
        debug!(candidate_id = %candidate_id, dims = embedding.len(), "cached embedding");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            embedding_key(id),
            "embedding:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_encoder_endpoint_normalizes_trailing_slash() {
        let encoder = HttpEmbeddingEncoder::new("http://tei:8080/").unwrap();
        assert_eq!(encoder.endpoint, "http://tei:8080/embed");
    }
}
