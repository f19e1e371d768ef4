// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote embedding providers for the Engram memory engine.
//!
//! The engine treats embedding as a strategy behind the
//! [`Embedder`](engram_core::Embedder) trait; this crate provides the
//! OpenAI-compatible HTTP implementation.

pub mod openai;

pub use openai::OpenAiEmbedder;
