// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Neo4j-backed storage over the transactional Cypher HTTP endpoint.
//!
//! Records are `Memory` nodes; sanitized edges become typed relationships,
//! so the neighborhood walk is a native variable-length path match. Vector
//! search goes through the database's vector index.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use engram_config::StorerConfig;
use engram_core::traits::adapter::Adapter;
use engram_core::traits::storer::Storer;
use engram_core::types::{AdapterType, HealthStatus, Metadata, Record};
use engram_core::EngramError;

use crate::{sanitize_edges, BackendError};

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Storer backed by a Neo4j database.
pub struct Neo4jStorer {
    client: reqwest::Client,
    base_url: String,
    database: String,
    vector_index: String,
}

#[derive(Debug, Deserialize)]
struct CypherResponse {
    #[serde(default)]
    results: Vec<CypherResult>,
    #[serde(default)]
    errors: Vec<CypherError>,
}

#[derive(Debug, Deserialize)]
struct CypherResult {
    #[serde(default)]
    data: Vec<CypherRow>,
}

#[derive(Debug, Deserialize)]
struct CypherRow {
    #[serde(default)]
    row: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CypherError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl Neo4jStorer {
    /// Connects to Neo4j and ensures the vector index and uniqueness
    /// constraint exist.
    pub async fn connect(config: &StorerConfig) -> Result<Self, EngramError> {
        let location = config
            .location
            .clone()
            .ok_or_else(|| EngramError::Config("neo4j storer requires a location".into()))?;

        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| EngramError::Config(format!("failed to build HTTP client: {e}")))?;

        let storer = Self {
            client,
            base_url: location.trim_end_matches('/').to_string(),
            database: if config.collection.is_empty() {
                "neo4j".to_string()
            } else {
                config.collection.clone()
            },
            vector_index: config.vector_index.clone(),
        };

        storer
            .configure(config.vector_size, &config.distance)
            .await?;

        Ok(storer)
    }

    async fn configure(&self, vector_size: usize, distance: &str) -> Result<(), EngramError> {
        let index = format!(
            "CREATE VECTOR INDEX {} IF NOT EXISTS \
             FOR (m:Memory) ON (m.embedding) \
             OPTIONS {{indexConfig: {{\
             `vector.dimensions`: {vector_size}, \
             `vector.similarity_function`: '{}'\
             }}}}",
            self.vector_index,
            neo4j_similarity(distance),
        );
        let constraint = "CREATE CONSTRAINT memory_id_unique IF NOT EXISTS \
                          FOR (m:Memory) REQUIRE m.id IS UNIQUE";

        self.run(vec![
            statement(&index, json!({})),
            statement(constraint, json!({})),
        ])
        .await?;

        Ok(())
    }

    /// Runs statements in a single implicit transaction.
    async fn run(&self, statements: Vec<serde_json::Value>) -> Result<CypherResponse, EngramError> {
        let url = format!("{}/db/{}/tx/commit", self.base_url, self.database);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "statements": statements }))
            .send()
            .await
            .map_err(|e| EngramError::Transient {
                message: format!("neo4j request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let payload = response.text().await.map_err(|e| EngramError::Transient {
            message: format!("failed to read neo4j response: {e}"),
            source: Some(Box::new(e)),
        })?;

        if status.as_u16() >= 400 {
            return Err(EngramError::storer(BackendError(format!(
                "neo4j http {}: {payload}",
                status.as_u16()
            ))));
        }

        let decoded: CypherResponse = serde_json::from_str(&payload)
            .map_err(|e| EngramError::storer(BackendError(format!("neo4j decode: {e}"))))?;

        if let Some(err) = decoded.errors.first() {
            return Err(EngramError::storer(BackendError(format!(
                "neo4j error {}: {}",
                err.code, err.message
            ))));
        }

        Ok(decoded)
    }
}

fn statement(cypher: &str, parameters: serde_json::Value) -> serde_json::Value {
    json!({ "statement": cypher, "parameters": parameters })
}

#[async_trait]
impl Adapter for Neo4jStorer {
    fn name(&self) -> &str {
        "neo4j-storer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storer
    }

    async fn health_check(&self) -> Result<HealthStatus, EngramError> {
        match self.run(vec![statement("RETURN 1", json!({}))]).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), EngramError> {
        Ok(())
    }
}

#[async_trait]
impl Storer for Neo4jStorer {
    async fn store(
        &self,
        space_id: &str,
        session_id: &str,
        content: &str,
        mut metadata: Metadata,
        vector: Vec<f32>,
    ) -> Result<(), EngramError> {
        let edges = sanitize_edges(&mut metadata);

        let id = Uuid::new_v4().to_string();
        let meta_json = serde_json::Value::Object(metadata).to_string();

        let node = statement(
            "MERGE (m:Memory {id: $id}) \
             SET m.content = $content, \
                 m.space_id = $spaceId, \
                 m.session_id = $sessionId, \
                 m.metadata = $metadata, \
                 m.created_at = datetime(), \
                 m.embedding = $embedding",
            json!({
                "id": id,
                "spaceId": space_id,
                "sessionId": session_id,
                "content": content,
                "metadata": meta_json,
                "embedding": vector,
            }),
        );

        let mut statements = vec![node];
        for edge in &edges {
            // Edge types are normalized to [A-Z0-9_]+, so interpolating
            // them into the relationship pattern is injection-safe.
            let cypher = format!(
                "MATCH (source:Memory {{id: $sourceId}}) \
                 MATCH (target:Memory {{id: $targetId}}) \
                 MERGE (source)-[:{}]->(target)",
                edge.edge_type
            );
            statements.push(statement(
                &cypher,
                json!({ "sourceId": id, "targetId": edge.target }),
            ));
        }

        self.run(statements).await?;
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

        // Over-query the index because the space filter applies after YIELD.
        let query = "CALL db.index.vector.queryNodes($index, $k, $vec) \
                     YIELD node, score \
                     WHERE node.space_id = $spaceId \
                     RETURN node, score \
                     LIMIT $finalLimit";

        let response = self
            .run(vec![statement(
                query,
                json!({
                    "index": self.vector_index,
                    "k": limit * 2,
                    "vec": vector,
                    "spaceId": space_id,
                    "finalLimit": limit,
                }),
            )])
            .await?;

        Ok(rows_to_records(response))
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

        // Variable-length bounds must be literal in the pattern.
        let query = format!(
            "MATCH (start:Memory) \
             WHERE start.id IN $seedIds \
             MATCH (start)-[*1..{hops}]-(neighbor:Memory) \
             WHERE NOT neighbor.id IN $seedIds \
             RETURN DISTINCT neighbor AS node, 0.0 AS score \
             LIMIT $limit"
        );

        let response = self
            .run(vec![statement(
                &query,
                json!({ "seedIds": seed_ids, "limit": limit }),
            )])
            .await?;

        Ok(rows_to_records(response))
    }
}

fn rows_to_records(response: CypherResponse) -> Vec<Record> {
    response
        .results
        .into_iter()
        .flat_map(|result| result.data)
        .filter_map(|row| {
            let mut cells = row.row.into_iter();
            let node = cells.next()?;
            let score = cells.next().and_then(|v| v.as_f64()).unwrap_or_default();
            node_to_record(node, score as f32)
        })
        .collect()
}

/// Maps a node's property map (how the HTTP endpoint serializes nodes in
/// `row` format) to a [`Record`].
fn node_to_record(node: serde_json::Value, score: f32) -> Option<Record> {
    let props = node.as_object()?;

    let metadata = props
        .get("metadata")
        .and_then(|v| v.as_str())
        .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok())
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();

    let embedding = props
        .get("embedding")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_f64())
                .map(|v| v as f32)
                .collect()
        })
        .unwrap_or_default();

    let created_at = props
        .get("created_at")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let prop_str = |key: &str| {
        props
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };

    Some(Record {
        id: prop_str("id"),
        space_id: prop_str("space_id"),
        session_id: prop_str("session_id"),
        content: prop_str("content"),
        metadata,
        embedding,
        score,
        created_at,
        updated_at: created_at,
    })
}

/// Neo4j similarity function names for the configured distance metric.
fn neo4j_similarity(distance: &str) -> &'static str {
    match distance.to_ascii_lowercase().as_str() {
        "euclid" | "euclidean" | "l2" => "euclidean",
        _ => "cosine",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> StorerConfig {
        StorerConfig {
            backend: "neo4j".into(),
            location: Some(base_url.to_string()),
            api_key: None,
            collection: "neo4j".into(),
            vector_index: "memory_embeddings".into(),
            vector_size: 3,
            distance: "cosine".into(),
        }
    }

    fn empty_ok() -> serde_json::Value {
        json!({ "results": [{ "columns": [], "data": [] }], "errors": [] })
    }

    /// Serves exactly the schema-setup commit issued by `connect`.
    async fn mount_setup(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_ok()))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn connect_creates_index_and_constraint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_ok()))
            .expect(1)
            .mount(&server)
            .await;

        Neo4jStorer::connect(&config(&server.uri())).await.unwrap();
    }

    #[tokio::test]
    async fn store_merges_node_and_typed_relationships() {
        let server = MockServer::start().await;
        mount_setup(&server).await;

        // Node statement plus one edge statement in the same commit.
        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .and(body_partial_json(json!({
                "statements": [
                    { "parameters": { "spaceId": "sp", "sessionId": "s1", "content": "user: hi" } },
                    { "parameters": { "targetId": "other-record" } },
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(empty_ok()))
            .expect(1)
            .mount(&server)
            .await;

        let storer = Neo4jStorer::connect(&config(&server.uri())).await.unwrap();

        let mut metadata = Metadata::new();
        metadata.insert(
            "edges".into(),
            json!([{ "target": "other-record", "type": "relates to" }]),
        );

        storer
            .store("sp", "s1", "user: hi", metadata, vec![1.0, 0.0, 0.0])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn search_maps_nodes_and_scores() {
        let server = MockServer::start().await;
        mount_setup(&server).await;

        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .and(body_partial_json(json!({
                "statements": [{ "parameters": { "spaceId": "sp", "finalLimit": 5 } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "columns": ["node", "score"],
                    "data": [{
                        "row": [
                            {
                                "id": "rec-1",
                                "space_id": "sp",
                                "session_id": "s1",
                                "content": "user: hi",
                                "metadata": "{\"source\":\"user\"}",
                                "embedding": [1.0, 0.0, 0.0],
                                "created_at": "2026-07-01T12:00:00Z",
                            },
                            0.87
                        ]
                    }]
                }],
                "errors": []
            })))
            .mount(&server)
            .await;

        let storer = Neo4jStorer::connect(&config(&server.uri())).await.unwrap();
        let records = storer.search("sp", &[1.0, 0.0, 0.0], 5).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "rec-1");
        assert_eq!(records[0].metadata.get("source").unwrap(), "user");
        assert!((records[0].score - 0.87).abs() < 1e-6);
    }

    #[tokio::test]
    async fn cypher_errors_surface_as_storer_errors() {
        let server = MockServer::start().await;
        mount_setup(&server).await;

        Mock::given(method("POST"))
            .and(path("/db/neo4j/tx/commit"))
            .and(body_partial_json(json!({
                "statements": [{ "parameters": { "spaceId": "sp" } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [],
                "errors": [{ "code": "Neo.ClientError", "message": "no such index" }]
            })))
            .mount(&server)
            .await;

        let storer = Neo4jStorer::connect(&config(&server.uri())).await.unwrap();
        let err = storer.search("sp", &[1.0, 0.0, 0.0], 5).await.unwrap_err();
        assert!(err.to_string().contains("no such index"));
    }
}
