// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Postgres + pgvector storage backend.
//!
//! Records live in `messages` with a `vector` column; sanitized edges are
//! materialized as `message_edges` rows so the neighborhood walk can run as
//! a recursive CTE server-side. Schema setup is idempotent.
//!
//! Vectors cross the wire as pgvector text literals (`'[1,2,3]'::vector`),
//! which keeps the driver dependency-free at the cost of a parse on read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::debug;

use engram_config::StorerConfig;
use engram_core::traits::adapter::Adapter;
use engram_core::traits::storer::Storer;
use engram_core::types::{AdapterType, HealthStatus, Metadata, Record};
use engram_core::EngramError;

use crate::edges::sanitize_edges;

/// Storer backed by Postgres with the pgvector extension.
pub struct PostgresStorer {
    pool: PgPool,
}

impl PostgresStorer {
    /// Connects to Postgres and ensures the schema exists.
    pub async fn connect(config: &StorerConfig) -> Result<Self, EngramError> {
        let location = config
            .location
            .as_deref()
            .ok_or_else(|| EngramError::Config("postgres storer requires a location".into()))?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(location)
            .await
            .map_err(EngramError::storer)?;

        let storer = Self { pool };
        storer
            .configure(config.vector_size, &config.vector_index, &config.distance)
            .await?;

        Ok(storer)
    }

    /// Idempotent schema and index setup.
    async fn configure(
        &self,
        vector_size: usize,
        vector_index: &str,
        distance: &str,
    ) -> Result<(), EngramError> {
        let ddl = format!(
            r#"
            CREATE EXTENSION IF NOT EXISTS vector;

            CREATE TABLE IF NOT EXISTS messages (
                id BIGSERIAL PRIMARY KEY,
                session_id TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                embedding VECTOR({vector_size}),
                space_id TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            );

            CREATE TABLE IF NOT EXISTS message_edges (
                source_id BIGINT NOT NULL,
                target_id BIGINT NOT NULL,
                type TEXT NOT NULL,
                PRIMARY KEY (source_id, target_id, type)
            );

            CREATE INDEX IF NOT EXISTS {vector_index}
                ON messages USING hnsw (embedding {opclass});

            CREATE INDEX IF NOT EXISTS messages_space_id_idx ON messages (space_id);
            "#,
            opclass = distance_opclass(distance),
        );

        sqlx::raw_sql(&ddl)
            .execute(&self.pool)
            .await
            .map_err(EngramError::storer)?;

        Ok(())
    }
}

#[async_trait]
impl Adapter for PostgresStorer {
    fn name(&self) -> &str {
        "postgres-storer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storer
    }

    async fn health_check(&self) -> Result<HealthStatus, EngramError> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), EngramError> {
        self.pool.close().await;
        Ok(())
    }
}

#[async_trait]
impl Storer for PostgresStorer {
    async fn store(
        &self,
        space_id: &str,
        session_id: &str,
        content: &str,
        mut metadata: Metadata,
        vector: Vec<f32>,
    ) -> Result<(), EngramError> {
        let edges = sanitize_edges(&mut metadata);

        // Record insert and edge rows commit atomically.
        let mut tx = self.pool.begin().await.map_err(EngramError::storer)?;

        let row = sqlx::query(
            r#"
            INSERT INTO messages (session_id, content, metadata, embedding, space_id)
            VALUES ($1, $2, $3, $4::vector, $5)
            RETURNING id
            "#,
        )
        .bind(session_id)
        .bind(content)
        .bind(serde_json::Value::Object(metadata))
        .bind(format_vector(&vector))
        .bind(space_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(EngramError::storer)?;

        let id: i64 = row.try_get("id").map_err(EngramError::storer)?;

        for edge in &edges {
            // Edge targets referencing non-numeric ids cannot exist in this
            // backend; they are dropped like any other malformed edge.
            let Ok(target) = edge.target.parse::<i64>() else {
                debug!(target = %edge.target, "skipping edge with non-numeric target id");
                continue;
            };

            sqlx::query(
                r#"
                INSERT INTO message_edges (source_id, target_id, type)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(target)
            .bind(&edge.edge_type)
            .execute(&mut *tx)
            .await
            .map_err(EngramError::storer)?;
        }

        tx.commit().await.map_err(EngramError::storer)?;
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

        let rows = sqlx::query(
            r#"
            SELECT
                id,
                session_id,
                content,
                metadata,
                embedding::text AS embedding,
                1 - (embedding <=> $2::vector) AS score,
                space_id,
                created_at,
                updated_at
            FROM messages
            WHERE space_id = $1
            ORDER BY embedding <=> $2::vector
            LIMIT $3
            "#,
        )
        .bind(space_id)
        .bind(format_vector(vector))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(EngramError::storer)?;

        rows.into_iter().map(row_to_record).collect()
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

        let seeds: Vec<i64> = seed_ids.iter().filter_map(|id| id.parse().ok()).collect();
        if seeds.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            WITH RECURSIVE graph_walk AS (
                SELECT id, session_id, content, metadata, embedding, space_id,
                       created_at, updated_at, 0 AS depth
                FROM messages
                WHERE id = ANY($1)

                UNION

                SELECT m.id, m.session_id, m.content, m.metadata, m.embedding,
                       m.space_id, m.created_at, m.updated_at, gw.depth + 1
                FROM messages m
                INNER JOIN message_edges e ON e.target_id = m.id
                INNER JOIN graph_walk gw ON gw.id = e.source_id
                WHERE gw.depth < $2
            )
            SELECT DISTINCT ON (id)
                id, session_id, content, metadata, embedding::text AS embedding,
                0::float8 AS score, space_id, created_at, updated_at
            FROM graph_walk
            WHERE NOT (id = ANY($1))
            LIMIT $3
            "#,
        )
        .bind(&seeds)
        .bind(hops as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(EngramError::storer)?;

        rows.into_iter().map(row_to_record).collect()
    }
}

fn row_to_record(row: sqlx::postgres::PgRow) -> Result<Record, EngramError> {
    let id: i64 = row.try_get("id").map_err(EngramError::storer)?;
    let metadata: serde_json::Value = row.try_get("metadata").map_err(EngramError::storer)?;
    let embedding: Option<String> = row.try_get("embedding").map_err(EngramError::storer)?;
    let score: Option<f64> = row.try_get("score").unwrap_or(None);
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(EngramError::storer)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(EngramError::storer)?;

    Ok(Record {
        id: id.to_string(),
        space_id: row.try_get("space_id").map_err(EngramError::storer)?,
        session_id: row.try_get("session_id").map_err(EngramError::storer)?,
        content: row.try_get("content").map_err(EngramError::storer)?,
        metadata: metadata.as_object().cloned().unwrap_or_default(),
        embedding: embedding.as_deref().map(parse_vector).unwrap_or_default(),
        score: score.unwrap_or_default() as f32,
        created_at,
        updated_at,
    })
}

/// Formats a vector as a pgvector text literal: `[0.1,0.2,...]`.
fn format_vector(vector: &[f32]) -> String {
    let mut out = String::with_capacity(vector.len() * 8 + 2);
    out.push('[');
    for (i, v) in vector.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&v.to_string());
    }
    out.push(']');
    out
}

/// Parses a pgvector text literal back into f32 components.
fn parse_vector(text: &str) -> Vec<f32> {
    text.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

/// pgvector operator class for the configured distance metric.
fn distance_opclass(distance: &str) -> &'static str {
    match distance.to_ascii_lowercase().as_str() {
        "l2" | "euclid" | "euclidean" => "vector_l2_ops",
        "dot" | "ip" | "inner_product" => "vector_ip_ops",
        _ => "vector_cosine_ops",
    }
}
