// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt-time hybrid retrieval.
//!
//! Fuses semantic similarity with temporal recency, optionally expands the
//! candidate set through the relationship graph, and finishes with
//! MMR selection so the returned window is relevant without being
//! redundant.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use engram_config::MemoryConfig;
use engram_core::types::{Message, Part, Record, Skill};
use engram_core::{Embedder, EngramError, SkillSource, Storer};

use crate::ranking::{fuse_score, normalize_weights, recency_score, select};

/// Candidates fetched per requested result, for downstream selection.
const OVER_FETCH: usize = 4;

/// Hybrid retriever over a space's long-term records and skills.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    storer: Arc<dyn Storer>,
    skills: Option<Arc<dyn SkillSource>>,
    config: MemoryConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        storer: Arc<dyn Storer>,
        skills: Option<Arc<dyn SkillSource>>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            embedder,
            storer,
            skills,
            config,
        }
    }

    /// Runs hybrid search over a space.
    ///
    /// 1. Embeds the query
    /// 2. Over-fetches vector candidates and skills in parallel
    /// 3. Rewrites scores as weighted similarity + recency
    /// 4. Optionally merges graph neighbors of the top candidates
    /// 5. Applies MMR selection and returns prompt-ready messages
    pub async fn search(
        &self,
        space_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<(Vec<Message>, Vec<Skill>), EngramError> {
        let query_vector = self.embedder.embed(query).await?;

        let (candidates, skills) = tokio::join!(
            self.storer
                .search(space_id, &query_vector, limit * OVER_FETCH),
            self.search_skills(space_id, &query_vector, limit),
        );
        let mut candidates = candidates?;
        let skills = skills?;

        let (w_sim, w_rec) =
            normalize_weights(self.config.similarity_weight, self.config.recency_weight);
        let now = Utc::now();

        for record in &mut candidates {
            let recency = recency_score(record.created_at, now, self.config.half_life_hours);
            record.score = fuse_score(f64::from(record.score), recency, w_sim, w_rec) as f32;
        }

        if self.config.hops > 0 {
            self.expand_neighborhood(&mut candidates, limit, w_rec, now)
                .await?;
        }

        let mut selected = select(candidates, limit, self.config.relevance);
        selected.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        debug!(
            space_id,
            returned = selected.len(),
            skills = skills.len(),
            "hybrid search complete"
        );

        Ok((selected.into_iter().map(record_to_message).collect(), skills))
    }

    /// Walks the relationship graph from the top-scored candidates and
    /// merges unseen neighbors.
    ///
    /// Similarity is undefined for graph-walked records beyond the seeds,
    /// so merged neighbors carry a recency-only weighted score.
    async fn expand_neighborhood(
        &self,
        candidates: &mut Vec<Record>,
        limit: usize,
        w_rec: f64,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), EngramError> {
        if candidates.is_empty() {
            return Ok(());
        }

        candidates
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let seeds: Vec<String> = candidates.iter().take(limit).map(|r| r.id.clone()).collect();
        let seen: HashSet<String> = candidates.iter().map(|r| r.id.clone()).collect();

        let neighbors = self
            .storer
            .search_neighborhood(&seeds, self.config.hops, limit)
            .await?;

        let found = neighbors.len();
        for mut neighbor in neighbors {
            if seen.contains(&neighbor.id) {
                continue;
            }
            let recency = recency_score(neighbor.created_at, now, self.config.half_life_hours);
            neighbor.score = (w_rec * recency) as f32;
            candidates.push(neighbor);
        }

        debug!(seeds = seeds.len(), found, "graph expansion complete");
        Ok(())
    }

    async fn search_skills(
        &self,
        space_id: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Skill>, EngramError> {
        match &self.skills {
            Some(source) => source.search_skills(space_id, query_vector, limit).await,
            None => Ok(Vec::new()),
        }
    }
}

/// Maps a long-term record to a prompt-ready message: role from the
/// record's `source` metadata, one text part carrying content and metadata.
fn record_to_message(record: Record) -> Message {
    let role = record.source_role().to_string();
    Message {
        id: record.id,
        session_id: record.session_id,
        role,
        parts: vec![Part {
            part_type: "text".to_string(),
            text: record.content,
            file_field: None,
            meta: Some(record.metadata),
        }],
        embedding: Vec::new(),
    }
}
