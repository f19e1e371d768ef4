// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait.

use async_trait::async_trait;

use crate::error::EngramError;
use crate::traits::adapter::Adapter;

/// Maps text to a fixed-dimension vector.
///
/// The dimension must be stable across a single process run. Empty or
/// whitespace-only text may yield a zero vector; callers must treat
/// zero-vector cosine as 0 rather than erroring. Failures are transient
/// and propagated as-is — retry policy belongs to the caller.
#[async_trait]
pub trait Embedder: Adapter {
    /// Generates an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngramError>;
}
