// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Engram memory engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// String-keyed JSON metadata attached to records and message parts.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind the base trait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Embedder,
    Storer,
}

/// One typed fragment of a message.
///
/// The first `text` fragment is canonical for prompt rendering; `file`
/// fragments reference uploaded content by form field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Fragment kind: `"text"` or `"file"`.
    #[serde(rename = "type")]
    pub part_type: String,
    /// Text content; empty for file fragments.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Form field name for file fragments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_field: Option<String>,
    /// Arbitrary fragment metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Metadata>,
}

impl Part {
    /// A plain text fragment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            part_type: "text".to_string(),
            text: text.into(),
            file_field: None,
            meta: None,
        }
    }

    /// A file fragment referencing a named form field.
    pub fn file(field: impl Into<String>, meta: Option<Metadata>) -> Self {
        Self {
            part_type: "file".to_string(),
            text: String::new(),
            file_field: Some(field.into()),
            meta,
        }
    }
}

/// A message in short-term memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Session this message belongs to.
    pub session_id: String,
    /// Role: "user", "assistant", "tool", or "system".
    pub role: String,
    /// Ordered sequence of typed fragments.
    pub parts: Vec<Part>,
    /// Optional embedding vector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl Message {
    /// Concatenates the text of every text fragment, in order.
    pub fn flatten_text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            out.push_str(&part.text);
        }
        out
    }
}

/// A durable long-term memory record.
///
/// Records are immutable once stored except for `updated_at`. `score` is
/// transient: populated by search and rewritten during hybrid ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Unique record identifier.
    pub id: String,
    /// Memory space this record is scoped to.
    pub space_id: String,
    /// Session the record was distilled from.
    pub session_id: String,
    /// Flattened text content, prefixed with the source role.
    pub content: String,
    /// Arbitrary metadata; `edges` holds the sanitized relationship list.
    #[serde(default)]
    pub metadata: Metadata,
    /// Embedding vector (unit-norm or empty).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Transient retrieval score.
    #[serde(default)]
    pub score: f32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Role recorded at distillation time, or "default" when absent.
    pub fn source_role(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("default")
    }
}

/// A durable procedure retrieved alongside messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub space_id: String,
    /// Situation description matched against the query vector.
    pub trigger: String,
    /// Standard operating procedure surfaced into the prompt.
    pub sop: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

/// An open work item surfaced into prompts alongside short-term messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub session_id: String,
    /// Ascending display order within the session.
    pub task_order: i64,
    /// Opaque task payload.
    pub data: serde_json::Value,
    /// "open", "done", etc. The engine does not interpret statuses.
    pub status: String,
}

/// A file attachment supplied with a short-term append.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Original file name.
    pub name: String,
    /// Optional media type hint.
    pub content_type: Option<String>,
}
