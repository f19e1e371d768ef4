// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage backend.
//!
//! Search is an exact O(N) cosine scan over the space-filtered subset;
//! the neighborhood walk follows `metadata.edges` iteratively. Useful for
//! tests, demos, and single-process deployments without persistence.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use engram_core::traits::adapter::Adapter;
use engram_core::traits::skills::SkillSource;
use engram_core::traits::storer::Storer;
use engram_core::types::{AdapterType, HealthStatus, Metadata, Record, Skill};
use engram_core::{cosine_similarity, EngramError};

use crate::edges::{sanitize_edges, validate_edges};

/// Map-backed storer with a side table for skills.
#[derive(Default)]
pub struct MemoryStorer {
    records: RwLock<HashMap<String, Record>>,
    skills: RwLock<HashMap<String, Skill>>,
}

impl MemoryStorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, across all spaces.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Seeds a skill for retrieval. Skills are not distilled; they are
    /// provisioned by the host.
    pub async fn put_skill(&self, skill: Skill) {
        self.skills.write().await.insert(skill.id.clone(), skill);
    }

    /// Ids of all records in insertion-independent order, for tests.
    pub async fn record_ids(&self) -> Vec<String> {
        self.records.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl Adapter for MemoryStorer {
    fn name(&self) -> &str {
        "memory-storer"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storer
    }

    async fn health_check(&self) -> Result<HealthStatus, EngramError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), EngramError> {
        Ok(())
    }
}

#[async_trait]
impl Storer for MemoryStorer {
    async fn store(
        &self,
        space_id: &str,
        session_id: &str,
        content: &str,
        mut metadata: Metadata,
        vector: Vec<f32>,
    ) -> Result<(), EngramError> {
        sanitize_edges(&mut metadata);

        let now = Utc::now();
        let record = Record {
            id: Uuid::new_v4().to_string(),
            space_id: space_id.to_string(),
            session_id: session_id.to_string(),
            content: content.to_string(),
            metadata,
            embedding: vector,
            score: 0.0,
            created_at: now,
            updated_at: now,
        };

        self.records.write().await.insert(record.id.clone(), record);
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

        let records = self.records.read().await;

        let mut candidates: Vec<Record> = records
            .values()
            .filter(|rec| rec.space_id == space_id)
            .map(|rec| {
                let mut rec = rec.clone();
                rec.score = cosine_similarity(vector, &rec.embedding) as f32;
                rec
            })
            .collect();

        candidates
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(limit);

        Ok(candidates)
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

        let records = self.records.read().await;

        let mut visited: HashSet<String> = seed_ids.iter().cloned().collect();
        let mut frontier: Vec<String> = seed_ids
            .iter()
            .filter_map(|id| records.get(id))
            .flat_map(|rec| edge_targets(rec))
            .collect();
        let mut results = Vec::new();

        for _ in 0..hops {
            if frontier.is_empty() {
                break;
            }

            let mut next = Vec::new();
            for id in frontier {
                if !visited.insert(id.clone()) {
                    continue;
                }
                let Some(rec) = records.get(&id) else {
                    continue;
                };
                results.push(rec.clone());
                if results.len() >= limit {
                    return Ok(results);
                }
                next.extend(edge_targets(rec));
            }

            frontier = next;
        }

        Ok(results)
    }
}

/// Targets of a record's sanitized edges.
fn edge_targets(record: &Record) -> Vec<String> {
    match record.metadata.get("edges") {
        Some(raw) => validate_edges(raw)
            .into_iter()
            .map(|edge| edge.target)
            .collect(),
        None => Vec::new(),
    }
}

#[async_trait]
impl SkillSource for MemoryStorer {
    async fn search_skills(
        &self,
        space_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Skill>, EngramError> {
        if limit < 1 {
            return Ok(Vec::new());
        }

        let skills = self.skills.read().await;

        let mut scored: Vec<(f64, Skill)> = skills
            .values()
            .filter(|skill| skill.space_id == space_id)
            .map(|skill| (cosine_similarity(vector, &skill.embedding), skill.clone()))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored.into_iter().map(|(_, skill)| skill).collect())
    }
}
