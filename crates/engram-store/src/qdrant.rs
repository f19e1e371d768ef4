// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Qdrant-backed storage over the HTTP points API.
//!
//! Collection setup is idempotent (create if absent). The neighborhood walk
//! is client-side: Qdrant has no graph primitive, so edges are read out of
//! point payloads and followed with batched retrieves.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use engram_config::StorerConfig;
use engram_core::traits::adapter::Adapter;
use engram_core::traits::storer::Storer;
use engram_core::types::{AdapterType, HealthStatus, Metadata, Record};
use engram_core::EngramError;

use crate::edges::validate_edges;
use crate::{sanitize_edges, BackendError};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Storer backed by a Qdrant collection.
pub struct QdrantStorer {
    client: reqwest::Client,
    base_url: String,
    collection: String,
    vector_size: usize,
    distance: String,
}

/// Qdrant response envelope: `status` is the string "ok" on success or an
/// object carrying an error message.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    status: EnvelopeStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum EnvelopeStatus {
    State(String),
    Error {
        error: String,
    },
    #[default]
    Missing,
}

impl EnvelopeStatus {
    /// The failure message, if the envelope reports one: an explicit error
    /// object, or a state string other than "ok".
    fn error(&self) -> Option<String> {
        match self {
            EnvelopeStatus::Error { error } => Some(error.clone()),
            EnvelopeStatus::State(state) if !state.eq_ignore_ascii_case("ok") => {
                Some(format!("unexpected status {state:?}"))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PointResult {
    id: serde_json::Value,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
    #[serde(default)]
    payload: serde_json::Map<String, serde_json::Value>,
}

impl QdrantStorer {
    /// Connects to Qdrant and ensures the collection exists.
    pub async fn connect(config: &StorerConfig) -> Result<Self, EngramError> {
        let location = config
            .location
            .clone()
            .ok_or_else(|| EngramError::Config("qdrant storer requires a location".into()))?;

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| EngramError::Config(format!("invalid qdrant api key: {e}")))?;
            headers.insert("api-key", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| EngramError::Config(format!("failed to build HTTP client: {e}")))?;

        let storer = Self {
            client,
            base_url: location.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            vector_size: config.vector_size,
            distance: qdrant_distance(&config.distance),
        };

        storer.configure().await?;

        Ok(storer)
    }

    /// Create the collection when it does not exist yet.
    async fn configure(&self) -> Result<(), EngramError> {
        let path = format!("/collections/{}", self.collection);
        match self.do_json::<serde_json::Value>("GET", &path, None).await {
            Ok(_) => return Ok(()),
            Err(EngramError::Storer { source }) if source.to_string().contains("http 404") => {}
            Err(e) => return Err(e),
        }

        debug!(collection = %self.collection, "creating qdrant collection");
        let body = serde_json::json!({
            "vectors": {
                "size": self.vector_size,
                "distance": self.distance,
            }
        });
        self.do_json::<serde_json::Value>("PUT", &path, Some(body))
            .await?;
        Ok(())
    }

    /// Issues a JSON request and decodes the Qdrant envelope.
    async fn do_json<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Envelope<T>, EngramError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = match method {
            "GET" => self.client.get(&url),
            "PUT" => self.client.put(&url),
            _ => self.client.post(&url),
        };
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req.send().await.map_err(|e| EngramError::Transient {
            message: format!("qdrant request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        let payload = response.text().await.map_err(|e| EngramError::Transient {
            message: format!("failed to read qdrant response: {e}"),
            source: Some(Box::new(e)),
        })?;

        if status.as_u16() >= 400 {
            return Err(EngramError::storer(BackendError(format!(
                "qdrant http {}: {payload}",
                status.as_u16()
            ))));
        }

        let envelope: Envelope<T> = serde_json::from_str(&payload)
            .map_err(|e| EngramError::storer(BackendError(format!("qdrant decode: {e}"))))?;

        if let Some(error) = envelope.status.error() {
            return Err(EngramError::storer(BackendError(format!(
                "qdrant error: {error}"
            ))));
        }

        Ok(envelope)
    }

    async fn retrieve_points(&self, ids: &[String]) -> Result<Vec<PointResult>, EngramError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "ids": ids,
            "with_vector": true,
            "with_payload": true,
        });
        let path = format!("/collections/{}/points", self.collection);
        let envelope: Envelope<Vec<PointResult>> =
            self.do_json("POST", &path, Some(body)).await?;
        Ok(envelope.result.unwrap_or_default())
    }
}

#[async_trait]
impl Adapter for QdrantStorer {
    fn name(&self) -> &str {
        "qdrant-storer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storer
    }

    async fn health_check(&self) -> Result<HealthStatus, EngramError> {
        let path = format!("/collections/{}", self.collection);
        match self.do_json::<serde_json::Value>("GET", &path, None).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), EngramError> {
        Ok(())
    }
}

#[async_trait]
impl Storer for QdrantStorer {
    async fn store(
        &self,
        space_id: &str,
        session_id: &str,
        content: &str,
        mut metadata: Metadata,
        vector: Vec<f32>,
    ) -> Result<(), EngramError> {
        sanitize_edges(&mut metadata);

        let body = serde_json::json!({
            "points": [{
                "id": Uuid::new_v4().to_string(),
                "vector": vector,
                "payload": {
                    "session_id": session_id,
                    "content": content,
                    "metadata": metadata,
                    "space_id": space_id,
                    "created_at": Utc::now().to_rfc3339(),
                },
            }]
        });

        let path = format!("/collections/{}/points?wait=true", self.collection);
        self.do_json::<serde_json::Value>("PUT", &path, Some(body))
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        space_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Record>, EngramError> {
        if limit < 1 {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "vector": vector,
            "limit": limit,
            "with_vector": true,
            "with_payload": true,
            "filter": {
                "must": [
                    { "key": "space_id", "match": { "value": space_id } }
                ]
            },
        });

        let path = format!("/collections/{}/points/search", self.collection);
        let envelope: Envelope<Vec<PointResult>> =
            self.do_json("POST", &path, Some(body)).await?;

        Ok(envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .map(point_to_record)
            .collect())
    }

    async fn search_neighborhood(
        &self,
        seed_ids: &[String],
        hops: usize,
        limit: usize,
    ) -> Result<Vec<Record>, EngramError> {
        if limit < 1 || seed_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut visited: HashSet<String> = seed_ids.iter().cloned().collect();
        let mut frontier: Vec<String> = self
            .retrieve_points(seed_ids)
            .await?
            .into_iter()
            .map(point_to_record)
            .flat_map(|rec| record_edge_targets(&rec))
            .collect();
        let mut results = Vec::new();

        for _ in 0..hops {
            let fetch: Vec<String> = frontier
                .into_iter()
                .filter(|id| visited.insert(id.clone()))
                .collect();
            if fetch.is_empty() {
                break;
            }

            let mut next = Vec::new();
            for point in self.retrieve_points(&fetch).await? {
                let record = point_to_record(point);
                next.extend(record_edge_targets(&record));
                results.push(record);
                if results.len() >= limit {
                    return Ok(results);
                }
            }

            frontier = next;
        }

        Ok(results)
    }
}

/// Maps Qdrant's distance names; the config uses lowercase metric names.
fn qdrant_distance(distance: &str) -> String {
    match distance.to_ascii_lowercase().as_str() {
        "euclid" | "euclidean" => "Euclid".to_string(),
        "dot" => "Dot".to_string(),
        _ => "Cosine".to_string(),
    }
}

fn point_to_record(point: PointResult) -> Record {
    let payload = point.payload;

    let id = match point.id {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };

    let created_at = payload
        .get("created_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let metadata = payload
        .get("metadata")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();

    Record {
        id,
        space_id: payload
            .get("space_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        session_id: payload
            .get("session_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        content: payload
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        metadata,
        embedding: point.vector.unwrap_or_default(),
        score: point.score.unwrap_or_default(),
        created_at,
        updated_at: created_at,
    }
}

fn record_edge_targets(record: &Record) -> Vec<String> {
    match record.metadata.get("edges") {
        Some(raw) => validate_edges(raw)
            .into_iter()
            .map(|edge| edge.target)
            .collect(),
        None => Vec::new(),
    }
}
