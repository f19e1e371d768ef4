// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Engram memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use engram_core::EngramError;
use serde::{Deserialize, Serialize};

/// Top-level Engram configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngramConfig {
    /// Memory engine tuning: window size, ranking weights, thresholds.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Long-term storage backend settings.
    #[serde(default)]
    pub storer: StorerConfig,

    /// Remote embedding provider settings.
    #[serde(default)]
    pub embedder: EmbedderConfig,
}

impl EngramConfig {
    /// Validates cross-field constraints that serde defaults cannot express.
    ///
    /// Called at engine construction; a failure here aborts startup.
    pub fn validate(&self) -> Result<(), EngramError> {
        self.storer.validate()?;
        self.memory.validate()
    }
}

/// Memory engine tuning parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Maximum number of messages retained per session buffer.
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Weight of raw semantic similarity in hybrid scoring.
    #[serde(default = "default_similarity_weight")]
    pub similarity_weight: f64,

    /// Weight of exponential recency decay in hybrid scoring.
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,

    /// MMR lambda: 1.0 is pure relevance, 0.0 is pure diversity.
    #[serde(default = "default_relevance")]
    pub relevance: f64,

    /// Hours over which a recency score halves. Also the dedup age cutoff.
    #[serde(default = "default_half_life_hours")]
    pub half_life_hours: f64,

    /// Cosine similarity at or above which a candidate record suppresses a
    /// new store during distillation.
    #[serde(default = "default_rejection_similarity")]
    pub rejection_similarity: f64,

    /// Default result count for long-term search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Graph expansion depth during retrieval; 0 disables the graph walk.
    #[serde(default)]
    pub hops: usize,
}

impl MemoryConfig {
    /// Validates tuning parameters; called at engine construction.
    pub fn validate(&self) -> Result<(), EngramError> {
        if self.window_size == 0 {
            return Err(EngramError::Config(
                "memory.window_size must be at least 1".to_string(),
            ));
        }
        if self.half_life_hours <= 0.0 {
            return Err(EngramError::Config(
                "memory.half_life_hours must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            similarity_weight: default_similarity_weight(),
            recency_weight: default_recency_weight(),
            relevance: default_relevance(),
            half_life_hours: default_half_life_hours(),
            rejection_similarity: default_rejection_similarity(),
            search_limit: default_search_limit(),
            hops: 0,
        }
    }
}

fn default_window_size() -> usize {
    20
}

fn default_similarity_weight() -> f64 {
    1.0
}

fn default_recency_weight() -> f64 {
    0.5
}

fn default_relevance() -> f64 {
    0.7
}

fn default_half_life_hours() -> f64 {
    72.0
}

fn default_rejection_similarity() -> f64 {
    0.97
}

fn default_search_limit() -> usize {
    5
}

/// Long-term storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorerConfig {
    /// Backend name: "memory", "qdrant", "postgres", or "neo4j".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Backend location: base URL or connection string. Unused by "memory".
    #[serde(default)]
    pub location: Option<String>,

    /// API key for backends that require one.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Collection / table namespace / database name, per backend.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Vector index name for backends with named indexes.
    #[serde(default = "default_vector_index")]
    pub vector_index: String,

    /// Embedding dimension. Required for remote backends.
    #[serde(default)]
    pub vector_size: usize,

    /// Distance metric for index creation.
    #[serde(default = "default_distance")]
    pub distance: String,
}

impl StorerConfig {
    /// Validates backend selection and its required fields.
    pub fn validate(&self) -> Result<(), EngramError> {
        match self.backend.as_str() {
            "memory" => Ok(()),
            "qdrant" | "postgres" | "neo4j" => {
                if self.location.as_deref().unwrap_or("").is_empty() {
                    return Err(EngramError::Config(format!(
                        "storer.location is required for the {} backend",
                        self.backend
                    )));
                }
                if self.vector_size == 0 {
                    return Err(EngramError::Config(format!(
                        "storer.vector_size is required for the {} backend",
                        self.backend
                    )));
                }
                Ok(())
            }
            other => Err(EngramError::Config(format!(
                "unknown storer backend {other:?} (expected memory, qdrant, postgres, or neo4j)"
            ))),
        }
    }
}

impl Default for StorerConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            location: None,
            api_key: None,
            collection: default_collection(),
            vector_index: default_vector_index(),
            vector_size: 0,
            distance: default_distance(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_collection() -> String {
    "memories".to_string()
}

fn default_vector_index() -> String {
    "memories_embedding_idx".to_string()
}

fn default_distance() -> String {
    "cosine".to_string()
}

/// Remote embedding provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbedderConfig {
    /// Base URL of the embeddings API.
    #[serde(default)]
    pub location: Option<String>,

    /// API key. `None` requires an environment override at load time.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            location: None,
            api_key: None,
            model: default_embedding_model(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
