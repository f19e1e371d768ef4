// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The public memory API consumed by the agent loop.
//!
//! `MemoryManager` wires the short-term buffer, distiller, and retriever
//! behind the six operations the agent calls: create space/session, append,
//! list, flush, and search. State is scoped to the manager instance, never
//! a process-wide singleton.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use engram_config::MemoryConfig;
use engram_core::types::{InputFile, Message, Part, Skill, Task};
use engram_core::{Embedder, EngramError, SkillSource, Storer};

use crate::buffer::ShortTermBuffer;
use crate::distiller::Distiller;
use crate::retriever::Retriever;
use crate::spaces::SpaceCache;

/// Options for [`MemoryManager::append_short_term`].
#[derive(Debug, Default)]
pub struct AppendOptions {
    /// File attachments, keyed by form field name. Each becomes a `file`
    /// part carrying the filename in its metadata.
    pub files: HashMap<String, InputFile>,
}

/// Options for [`MemoryManager::search_long_term`].
#[derive(Debug, Default)]
pub struct SearchOptions {
    /// Result count; defaults to the configured search limit.
    pub limit: Option<usize>,
    /// Search this space instead of the session's bound space.
    pub space_id: Option<String>,
}

/// Hybrid short/long-term memory for a multi-turn conversational agent.
pub struct MemoryManager {
    buffer: Arc<ShortTermBuffer>,
    distiller: Distiller,
    retriever: Retriever,
    /// Registry of spaces created through this manager: id -> name.
    spaces: RwLock<HashMap<String, String>>,
    space_cache: SpaceCache,
    config: MemoryConfig,
}

impl MemoryManager {
    /// Builds a manager over the given embedder and storer.
    ///
    /// Fails fast on invalid configuration; no public operation panics
    /// after this point.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        storer: Arc<dyn Storer>,
        config: MemoryConfig,
    ) -> Result<Self, EngramError> {
        Self::with_skills(embedder, storer, None, config)
    }

    /// Builds a manager that also serves skills during long-term search.
    pub fn with_skills(
        embedder: Arc<dyn Embedder>,
        storer: Arc<dyn Storer>,
        skills: Option<Arc<dyn SkillSource>>,
        config: MemoryConfig,
    ) -> Result<Self, EngramError> {
        config.validate()?;

        Ok(Self {
            buffer: Arc::new(ShortTermBuffer::new(config.window_size)),
            distiller: Distiller::new(
                embedder.clone(),
                storer.clone(),
                config.rejection_similarity,
                config.half_life_hours,
            ),
            retriever: Retriever::new(embedder, storer, skills, config.clone()),
            spaces: RwLock::new(HashMap::new()),
            space_cache: SpaceCache::new(),
            config,
        })
    }

    /// Creates a durable memory space.
    pub async fn create_space(&self, name: &str) -> Result<String, EngramError> {
        if name.trim().is_empty() {
            return Err(EngramError::InvalidInput("space name must not be empty".into()));
        }

        let space_id = format!("space-{}", Uuid::new_v4());
        self.spaces
            .write()
            .await
            .insert(space_id.clone(), name.to_string());

        info!(space_id, name, "space created");
        Ok(space_id)
    }

    /// Creates a session, optionally bound to a space.
    ///
    /// Sessions without a space participate in short-term memory but do not
    /// contribute to long-term recall.
    pub async fn create_session(&self, space_id: Option<&str>) -> Result<String, EngramError> {
        let space_id = space_id.unwrap_or_default();
        if !space_id.is_empty() && !self.spaces.read().await.contains_key(space_id) {
            return Err(EngramError::SpaceNotFound {
                space_id: space_id.to_string(),
            });
        }

        let session_id = self.buffer.create("", space_id).await;
        self.space_cache.insert(&session_id, space_id).await;

        info!(session_id, space_id, "session created");
        Ok(session_id)
    }

    /// Appends a message to a session's short-term window.
    pub async fn append_short_term(
        &self,
        session_id: &str,
        role: &str,
        mut parts: Vec<Part>,
        options: AppendOptions,
    ) -> Result<(), EngramError> {
        if role.trim().is_empty() {
            return Err(EngramError::InvalidInput("role must not be empty".into()));
        }

        for (field, file) in options.files {
            let mut meta = engram_core::Metadata::new();
            meta.insert("filename".to_string(), serde_json::json!(file.name));
            if let Some(content_type) = file.content_type {
                meta.insert("content_type".to_string(), serde_json::json!(content_type));
            }
            parts.push(Part::file(field, Some(meta)));
        }

        self.buffer.append(session_id, role, parts).await
    }

    /// Returns the most recent short-term messages and the session's open
    /// tasks.
    pub async fn list_short_term(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<(Vec<Message>, Vec<Task>), EngramError> {
        let limit = limit.unwrap_or(self.config.window_size);
        let messages = self.buffer.list(session_id, limit).await?;
        let tasks = self.buffer.tasks(session_id).await?;
        Ok((messages, tasks))
    }

    /// Distills the session's buffered messages into long-term records.
    ///
    /// Non-destructive: the short-term window is retained; use
    /// [`delete_session`](Self::delete_session) to evict it.
    pub async fn flush_to_long_term(&self, session_id: &str) -> Result<(), EngramError> {
        self.distiller.flush(&self.buffer, session_id).await
    }

    /// Hybrid search over the session's space (or an explicit override).
    ///
    /// A session without a space yields empty results rather than an error.
    pub async fn search_long_term(
        &self,
        session_id: &str,
        query: &str,
        options: SearchOptions,
    ) -> Result<(Vec<Message>, Vec<Skill>), EngramError> {
        let space_id = match options.space_id {
            Some(space_id) => space_id,
            None => {
                let buffer = self.buffer.clone();
                let session = session_id.to_string();
                self.space_cache
                    .resolve(session_id, move || async move {
                        buffer.space_of(&session).await
                    })
                    .await?
            }
        };

        if space_id.is_empty() {
            debug!(session_id, "search skipped: session has no space");
            return Ok((Vec::new(), Vec::new()));
        }

        let limit = options.limit.unwrap_or(self.config.search_limit);
        self.retriever.search(&space_id, query, limit).await
    }

    /// Appends an open task to the session.
    pub async fn add_task(
        &self,
        session_id: &str,
        data: serde_json::Value,
    ) -> Result<Task, EngramError> {
        self.buffer.add_task(session_id, data).await
    }

    /// Evicts a session's short-term window and cached space binding.
    pub async fn delete_session(&self, session_id: &str) {
        self.buffer.delete(session_id).await;
        self.space_cache.forget(session_id).await;
        debug!(session_id, "session deleted");
    }
}
