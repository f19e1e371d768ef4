// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for long-term memory backends.

use async_trait::async_trait;

use crate::error::EngramError;
use crate::traits::adapter::Adapter;
use crate::types::{Metadata, Record};

/// Persists long-term records and serves vector-ranked and graph-expanded
/// retrieval.
///
/// Backends must make collection/index/schema setup idempotent (create if
/// absent) and are expected to sanitize `metadata.edges` before storage.
#[async_trait]
pub trait Storer: Adapter {
    /// Persists one record. The backend assigns the record id and
    /// timestamps, sanitizes edges, and inserts edge rows where the
    /// backend has a native edge representation.
    async fn store(
        &self,
        space_id: &str,
        session_id: &str,
        content: &str,
        metadata: Metadata,
        vector: Vec<f32>,
    ) -> Result<(), EngramError>;

    /// Returns up to `limit` records from the given space in descending raw
    /// similarity. `score` is the cosine (or 1 − cosine-distance) in
    /// [−1, 1]. A limit of zero yields an empty result, not an error.
    async fn search(
        &self,
        space_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Record>, EngramError>;

    /// Graph BFS over `metadata.edges` starting from `seed_ids`. Returns
    /// distinct records within `hops` hops, capped at `limit`; the seed
    /// records themselves are excluded.
    async fn search_neighborhood(
        &self,
        seed_ids: &[String],
        hops: usize,
        limit: usize,
    ) -> Result<Vec<Record>, EngramError>;
}
