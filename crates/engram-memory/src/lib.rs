// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hybrid memory engine for multi-turn conversational agents.
//!
//! Decides what the agent remembers, for how long, and with what priority:
//!
//! - **ShortTermBuffer**: bounded per-session FIFO of messages
//! - **Distiller**: promotes short-term messages into long-term records
//!   with near-duplicate suppression
//! - **Retriever**: prompt-time fusion of similarity, recency, graph
//!   expansion, and MMR selection
//! - **MemoryManager**: the public surface consumed by the agent loop
//!
//! Embedding and storage are strategies behind the `engram-core` traits;
//! see `engram-embed` and `engram-store` for implementations.

pub mod buffer;
pub mod distiller;
pub mod manager;
pub mod ranking;
pub mod retriever;
pub mod spaces;

pub use buffer::ShortTermBuffer;
pub use distiller::Distiller;
pub use manager::{AppendOptions, MemoryManager, SearchOptions};
pub use retriever::Retriever;
pub use spaces::SpaceCache;
