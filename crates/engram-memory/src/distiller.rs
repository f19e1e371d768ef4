// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Distillation of short-term messages into long-term records.
//!
//! Flush is non-destructive: the buffer keeps its window and an explicit
//! session delete evicts it. Running flush twice with no intervening
//! appends produces no new records, because every candidate collides with
//! its own previous write under the near-duplicate rule.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use engram_core::types::Metadata;
use engram_core::{cosine_similarity, l2_normalize, Embedder, EngramError, Storer};

use crate::buffer::ShortTermBuffer;

/// Promotes buffered messages into the long-term store with deduplication.
pub struct Distiller {
    embedder: Arc<dyn Embedder>,
    storer: Arc<dyn Storer>,
    rejection_similarity: f64,
    half_life_hours: f64,
}

impl Distiller {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        storer: Arc<dyn Storer>,
        rejection_similarity: f64,
        half_life_hours: f64,
    ) -> Self {
        Self {
            embedder,
            storer,
            rejection_similarity,
            half_life_hours,
        }
    }

    /// Flushes a session's buffered messages into long-term storage.
    ///
    /// Messages are processed in chronological order. Embedding failures
    /// abort the whole flush; near-duplicate probe failures are treated as
    /// "no candidate"; storage failures are fatal.
    pub async fn flush(
        &self,
        buffer: &ShortTermBuffer,
        session_id: &str,
    ) -> Result<(), EngramError> {
        let (space_id, messages) = buffer.snapshot(session_id).await?;

        if space_id.is_empty() {
            // Sessions without a space participate in short-term memory
            // only; there is nothing to distill into.
            debug!(session_id, "flush skipped: session has no space");
            return Ok(());
        }

        if messages.is_empty() {
            return Ok(());
        }

        let mut stored = 0usize;
        let mut skipped = 0usize;

        for message in &messages {
            let raw = message.flatten_text();
            if raw.trim().is_empty() {
                continue;
            }

            let content = format!("{}: {}", message.role, raw);

            let vector = l2_normalize(&self.embedder.embed(&content).await?);

            if self.is_near_duplicate(&space_id, &vector).await {
                debug!(session_id, space_id, "skipping near-duplicate message");
                skipped += 1;
                continue;
            }

            let mut metadata = Metadata::new();
            metadata.insert("source".to_string(), serde_json::json!(message.role));

            self.storer
                .store(&space_id, session_id, &content, metadata, vector)
                .await?;
            stored += 1;
        }

        debug!(session_id, space_id, stored, skipped, "flush complete");
        Ok(())
    }

    /// True when the closest existing record in the space is both similar
    /// enough and recent enough to suppress a new write.
    async fn is_near_duplicate(&self, space_id: &str, vector: &[f32]) -> bool {
        let candidates = match self.storer.search(space_id, vector, 1).await {
            Ok(candidates) => candidates,
            Err(e) => {
                // A failed probe must not lose the message; store it anyway.
                warn!(space_id, error = %e, "near-duplicate probe failed, storing without dedup");
                return false;
            }
        };

        let Some(existing) = candidates.first() else {
            return false;
        };

        let sim = cosine_similarity(vector, &existing.embedding);
        if sim < self.rejection_similarity {
            return false;
        }

        let age_hours =
            (Utc::now() - existing.created_at).num_milliseconds() as f64 / 3_600_000.0;
        age_hours < self.half_life_hours
    }
}
