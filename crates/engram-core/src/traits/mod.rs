// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for pluggable engine components.

pub mod adapter;
pub mod embedder;
pub mod skills;
pub mod storer;

pub use adapter::Adapter;
pub use embedder::Embedder;
pub use skills::SkillSource;
pub use storer::Storer;
