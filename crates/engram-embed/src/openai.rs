// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible embeddings APIs.
//!
//! Handles request construction, bearer authentication, and error mapping.
//! Output vectors are L2-normalized so that cosine similarity reduces to a
//! dot product downstream. No internal retries: transient failures surface
//! as [`EngramError::Transient`] and retry policy belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use engram_config::EmbedderConfig;
use engram_core::traits::adapter::Adapter;
use engram_core::traits::embedder::Embedder;
use engram_core::types::{AdapterType, HealthStatus};
use engram_core::{l2_normalize, EngramError};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Embedder backed by an OpenAI-style `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    /// Expected output dimension; 0 disables the consistency check and the
    /// zero-vector short circuit produces an empty vector instead.
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Creates a new embedder client.
    ///
    /// `dimension` is the embedding size expected from the configured model;
    /// responses of a different length are rejected so the dimension stays
    /// deterministic across a process run.
    pub fn new(config: &EmbedderConfig, dimension: usize) -> Result<Self, EngramError> {
        let location = config
            .location
            .clone()
            .ok_or_else(|| EngramError::Config("embedder location is required".into()))?;

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| EngramError::Config(format!("invalid embedder api key: {e}")))?;
            headers.insert("authorization", value);
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| EngramError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: location.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension,
        })
    }
}

#[async_trait]
impl Adapter for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedder
    }

    async fn health_check(&self) -> Result<HealthStatus, EngramError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EngramError> {
        Ok(())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngramError> {
        if text.trim().is_empty() {
            // Callers treat zero-vector cosine as 0, so blank text never
            // pays for a round trip.
            return Ok(vec![0.0; self.dimension]);
        }

        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EngramError::Transient {
                message: format!("embedding request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, model = %self.model, "embedding response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("embeddings API returned {status}: {body}");
            return if is_transient_error(status) {
                Err(EngramError::Transient {
                    message,
                    source: None,
                })
            } else {
                Err(EngramError::Embedder {
                    message,
                    source: None,
                })
            };
        }

        let body: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| EngramError::Embedder {
                    message: format!("failed to parse embeddings response: {e}"),
                    source: Some(Box::new(e)),
                })?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EngramError::embedder("embeddings response contained no data"))?;

        if self.dimension > 0 && embedding.len() != self.dimension {
            return Err(EngramError::embedder(format!(
                "embedding dimension {} does not match configured {}",
                embedding.len(),
                self.dimension
            )));
        }

        Ok(l2_normalize(&embedding))
    }
}

/// HTTP status codes that indicate transient failures.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 529)
}
