// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Engram memory engine.

use thiserror::Error;

/// The primary error type used across all Engram traits and core operations.
#[derive(Debug, Error)]
pub enum EngramError {
    /// Configuration errors (invalid TOML, missing required fields, bad backend name).
    #[error("configuration error: {0}")]
    Config(String),

    /// The referenced session does not exist in the short-term buffer.
    #[error("session {session_id} not found")]
    SessionNotFound { session_id: String },

    /// The referenced memory space does not exist.
    #[error("space {space_id} not found")]
    SpaceNotFound { space_id: String },

    /// Embedding provider errors (API failure, malformed response).
    #[error("embedder error: {message}")]
    Embedder {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (connection, query failure, serialization).
    #[error("storer error: {source}")]
    Storer {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Caller-supplied input was rejected (empty text, dimension mismatch).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transient network-layer failures; the caller decides whether to retry.
    #[error("transient error: {message}")]
    Transient {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },
}

impl EngramError {
    /// Wrap an arbitrary backend error as a `Storer` error.
    pub fn storer<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        EngramError::Storer {
            source: Box::new(source),
        }
    }

    /// Build an `Embedder` error from a message only.
    pub fn embedder(message: impl Into<String>) -> Self {
        EngramError::Embedder {
            message: message.into(),
            source: None,
        }
    }
}
