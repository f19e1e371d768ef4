// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term storage backends for the Engram memory engine.
//!
//! Four backends implement the [`Storer`](engram_core::Storer) contract:
//!
//! - **MemoryStorer**: process-local map, exact cosine scan
//! - **QdrantStorer**: Qdrant points API, client-side edge walk
//! - **PostgresStorer**: pgvector column plus `message_edges` rows and a
//!   recursive-CTE neighborhood walk
//! - **Neo4jStorer**: `Memory` nodes with typed relationships and a native
//!   vector index
//!
//! All backends sanitize `metadata.edges` before storage via [`edges`].

use std::sync::Arc;

use engram_config::StorerConfig;
use engram_core::{EngramError, Storer};

pub mod edges;
pub mod memory;
pub mod neo4j;
pub mod postgres;
pub mod qdrant;

pub use edges::{normalize_relation, sanitize_edges, validate_edges, Edge};
pub use memory::MemoryStorer;
pub use neo4j::Neo4jStorer;
pub use postgres::PostgresStorer;
pub use qdrant::QdrantStorer;

/// String-message error used to box backend failures into
/// [`EngramError::Storer`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(crate) struct BackendError(pub String);

/// Builds the storer named by the configuration.
///
/// Remote backends perform their idempotent setup during connect, so a
/// failure here aborts engine construction.
pub async fn connect(config: &StorerConfig) -> Result<Arc<dyn Storer>, EngramError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStorer::new())),
        "qdrant" => Ok(Arc::new(QdrantStorer::connect(config).await?)),
        "postgres" => Ok(Arc::new(PostgresStorer::connect(config).await?)),
        "neo4j" => Ok(Arc::new(Neo4jStorer::connect(config).await?)),
        other => Err(EngramError::Config(format!(
            "unknown storer backend {other:?}"
        ))),
    }
}
