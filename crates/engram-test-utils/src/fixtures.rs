// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared builders for test records and messages.

use chrono::{DateTime, Utc};
use engram_core::types::{Message, Metadata, Part, Record};

/// A record with the given id, content, and embedding in `space_id`,
/// timestamped now.
pub fn record(id: &str, space_id: &str, content: &str, embedding: Vec<f32>) -> Record {
    record_at(id, space_id, content, embedding, Utc::now())
}

/// A record with an explicit creation timestamp, for recency tests.
pub fn record_at(
    id: &str,
    space_id: &str,
    content: &str,
    embedding: Vec<f32>,
    created_at: DateTime<Utc>,
) -> Record {
    Record {
        id: id.to_string(),
        space_id: space_id.to_string(),
        session_id: "test-session".to_string(),
        content: content.to_string(),
        metadata: Metadata::new(),
        embedding,
        score: 0.0,
        created_at,
        updated_at: created_at,
    }
}

/// A single-text-part message.
pub fn message(session_id: &str, role: &str, text: &str) -> Message {
    Message {
        id: String::new(),
        session_id: session_id.to_string(),
        role: role.to_string(),
        parts: vec![Part::text(text)],
        embedding: Vec::new(),
    }
}
