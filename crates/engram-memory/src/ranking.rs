// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid score fusion and diversity-aware selection.
//!
//! Candidates arrive scored by raw similarity; [`fuse_score`] blends in
//! exponential recency decay, and [`select`] runs Maximal-Marginal-Relevance
//! over the weighted set so near-duplicate memories do not crowd out a
//! limited prompt budget.

use chrono::{DateTime, Utc};

use engram_core::cosine_similarity;
use engram_core::types::Record;

/// Normalizes the (similarity, recency) weight pair to sum to 1.
///
/// A zero sum falls back to an even split.
pub fn normalize_weights(similarity: f64, recency: f64) -> (f64, f64) {
    let sum = similarity + recency;
    if sum == 0.0 {
        return (0.5, 0.5);
    }
    (similarity / sum, recency / sum)
}

/// Exponential decay: 0.5^(age_hours / half_life_hours).
pub fn recency_score(created_at: DateTime<Utc>, now: DateTime<Utc>, half_life_hours: f64) -> f64 {
    let age_hours = (now - created_at).num_milliseconds() as f64 / 3_600_000.0;
    0.5f64.powf(age_hours / half_life_hours)
}

/// Weighted blend of raw similarity and recency.
pub fn fuse_score(raw_similarity: f64, recency: f64, w_sim: f64, w_rec: f64) -> f64 {
    w_sim * raw_similarity + w_rec * recency
}

/// Maximal-Marginal-Relevance selection.
///
/// Picks up to `limit` records maximizing
/// `relevance * score - (1 - relevance) * max_sim_to_selected`. With
/// `relevance == 0` and a non-empty selection, ranking is by `-max_sim`
/// alone (pure diversity). Ties keep the earliest candidate. When the
/// candidate set already fits the limit it is returned unchanged.
pub fn select(records: Vec<Record>, limit: usize, relevance: f64) -> Vec<Record> {
    if records.len() <= limit {
        return records;
    }

    let relevance = relevance.clamp(0.0, 1.0);

    let mut selected: Vec<Record> = Vec::with_capacity(limit);
    let mut remaining = records;

    while selected.len() < limit && !remaining.is_empty() {
        let mut best_idx: Option<usize> = None;
        let mut best = f64::NEG_INFINITY;

        for (i, cand) in remaining.iter().enumerate() {
            let max_sim = selected
                .iter()
                .map(|sel| cosine_similarity(&cand.embedding, &sel.embedding))
                .fold(0.0f64, f64::max);

            let mut current =
                relevance * f64::from(cand.score) - (1.0 - relevance) * max_sim;

            if relevance == 0.0 && !selected.is_empty() {
                current = -max_sim;
            }

            // Strict comparison keeps the earliest candidate on ties.
            if current > best {
                best = current;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(i) => selected.push(remaining.remove(i)),
            None => break,
        }
    }

    selected
}
