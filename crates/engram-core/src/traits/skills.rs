// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Skill retrieval seam.

use async_trait::async_trait;

use crate::error::EngramError;
use crate::types::Skill;

/// Serves durable procedures by similarity to a query vector.
///
/// Skills are retrieved alongside messages with the same query vector and
/// limit; no recency weighting applies.
#[async_trait]
pub trait SkillSource: Send + Sync {
    async fn search_skills(
        &self,
        space_id: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<Skill>, EngramError>;
}
