// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Engram workspace.
//!
//! Provides deterministic mock adapters and fixture builders so engine
//! tests run fast and offline.

pub mod fixtures;
pub mod mock_embedder;

pub use fixtures::{message, record, record_at};
pub use mock_embedder::MockEmbedder;
