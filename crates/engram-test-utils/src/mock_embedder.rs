// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic mock embedder for fast, CI-runnable tests.
//!
//! `MockEmbedder` hashes whitespace-separated tokens into a fixed number of
//! buckets and L2-normalizes the counts. Equal texts embed identically
//! (cosine 1.0), overlapping texts score high, and disjoint texts score low,
//! which is enough to exercise dedup thresholds and ranking without a model.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;

use engram_core::traits::adapter::Adapter;
use engram_core::traits::embedder::Embedder;
use engram_core::types::{AdapterType, HealthStatus};
use engram_core::{l2_normalize, EngramError};

/// A mock embedder producing deterministic hashed bag-of-words vectors.
pub struct MockEmbedder {
    dimension: usize,
    /// Exact-string overrides returned verbatim (not normalized).
    fixed: Mutex<HashMap<String, Vec<f32>>>,
    /// When set, every embed call fails with a transient error.
    failing: bool,
}

impl MockEmbedder {
    /// Create a mock embedder with the given output dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fixed: Mutex::new(HashMap::new()),
            failing: false,
        }
    }

    /// Create a mock embedder that fails every call.
    pub fn failing(dimension: usize) -> Self {
        Self {
            dimension,
            fixed: Mutex::new(HashMap::new()),
            failing: true,
        }
    }

    /// Pin an exact input string to a canned vector.
    pub fn set_fixed(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.fixed.lock().unwrap().insert(text.into(), vector);
    }

    fn hashed_vector(&self, text: &str) -> Vec<f32> {
        let mut buckets = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimension;
            buckets[bucket] += 1.0;
        }
        l2_normalize(&buckets)
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(16)
    }
}

#[async_trait]
impl Adapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
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
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngramError> {
        if self.failing {
            return Err(EngramError::Transient {
                message: "mock embedder configured to fail".into(),
                source: None,
            });
        }

        if let Some(vector) = self.fixed.lock().unwrap().get(text) {
            return Ok(vector.clone());
        }

        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        Ok(self.hashed_vector(text))
    }
}
