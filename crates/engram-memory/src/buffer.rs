// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded per-session short-term memory.
//!
//! The buffer is a process-local map of append-only FIFO windows guarded by
//! a reader-writer lock. The write lock is held only across map mutation,
//! never across I/O; flush takes a snapshot under the read lock and works on
//! the copy.

use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use engram_core::types::{Message, Part, Task};
use engram_core::EngramError;

/// Per-session window of recent messages plus open tasks.
#[derive(Debug, Default)]
struct SessionBuffer {
    space_id: String,
    messages: Vec<Message>,
    tasks: Vec<Task>,
    next_task_order: i64,
}

/// Bounded per-session FIFO of messages.
///
/// No ordering is promised across sessions. The buffer is process-local;
/// multi-process deployments treat each process as its own cache layer.
pub struct ShortTermBuffer {
    window_size: usize,
    sessions: RwLock<HashMap<String, SessionBuffer>>,
}

impl ShortTermBuffer {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a session, synthesizing an id when `session_id` is empty.
    ///
    /// Creating an existing session is idempotent: the buffer and its
    /// space binding are left untouched.
    pub async fn create(&self, session_id: &str, space_id: &str) -> String {
        let id = if session_id.is_empty() {
            format!("session-{}", Uuid::new_v4())
        } else {
            session_id.to_string()
        };

        let mut sessions = self.sessions.write().await;
        sessions.entry(id.clone()).or_insert_with(|| SessionBuffer {
            space_id: space_id.to_string(),
            ..SessionBuffer::default()
        });

        id
    }

    /// Appends a message, evicting the oldest past the window.
    pub async fn append(
        &self,
        session_id: &str,
        role: &str,
        parts: Vec<Part>,
    ) -> Result<(), EngramError> {
        if parts.is_empty() {
            return Err(EngramError::InvalidInput(
                "message must contain at least one part".into(),
            ));
        }

        let mut sessions = self.sessions.write().await;
        let buffer = sessions
            .get_mut(session_id)
            .ok_or_else(|| EngramError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        buffer.messages.push(Message {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role: role.to_string(),
            parts,
            embedding: Vec::new(),
        });

        if buffer.messages.len() > self.window_size {
            let excess = buffer.messages.len() - self.window_size;
            buffer.messages.drain(..excess);
        }

        Ok(())
    }

    /// Returns the most recent `min(limit, len)` messages in chronological
    /// order (oldest first within the slice).
    pub async fn list(&self, session_id: &str, limit: usize) -> Result<Vec<Message>, EngramError> {
        let sessions = self.sessions.read().await;
        let buffer = sessions
            .get(session_id)
            .ok_or_else(|| EngramError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        let messages = &buffer.messages;
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    /// Snapshot of the full window and the session's space, for flush.
    ///
    /// Appends landing after the snapshot are not part of that flush and
    /// remain for the next.
    pub async fn snapshot(
        &self,
        session_id: &str,
    ) -> Result<(String, Vec<Message>), EngramError> {
        let sessions = self.sessions.read().await;
        let buffer = sessions
            .get(session_id)
            .ok_or_else(|| EngramError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        Ok((buffer.space_id.clone(), buffer.messages.clone()))
    }

    /// The space a session is bound to; empty for short-term-only sessions.
    pub async fn space_of(&self, session_id: &str) -> Result<String, EngramError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|buffer| buffer.space_id.clone())
            .ok_or_else(|| EngramError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }

    /// Appends an open task and returns it.
    pub async fn add_task(
        &self,
        session_id: &str,
        data: serde_json::Value,
    ) -> Result<Task, EngramError> {
        let mut sessions = self.sessions.write().await;
        let buffer = sessions
            .get_mut(session_id)
            .ok_or_else(|| EngramError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        buffer.next_task_order += 1;
        let task = Task {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            task_order: buffer.next_task_order,
            data,
            status: "open".to_string(),
        };
        buffer.tasks.push(task.clone());

        Ok(task)
    }

    /// Tasks for a session in ascending `task_order`.
    pub async fn tasks(&self, session_id: &str) -> Result<Vec<Task>, EngramError> {
        let sessions = self.sessions.read().await;
        let buffer = sessions
            .get(session_id)
            .ok_or_else(|| EngramError::SessionNotFound {
                session_id: session_id.to_string(),
            })?;

        let mut tasks = buffer.tasks.clone();
        tasks.sort_by_key(|t| t.task_order);
        Ok(tasks)
    }

    /// Evicts a session and everything in it.
    pub async fn delete(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_parts(text: &str) -> Vec<Part> {
        vec![Part::text(text)]
    }

    #[tokio::test]
    async fn append_evicts_oldest_past_window() {
        let buffer = ShortTermBuffer::new(3);
        let session = buffer.create("s1", "sp").await;

        for text in ["A", "B", "C", "D"] {
            buffer.append(&session, "user", text_parts(text)).await.unwrap();
        }

        let messages = buffer.list(&session, 10).await.unwrap();
        let texts: Vec<String> = messages.iter().map(Message::flatten_text).collect();
        assert_eq!(texts, vec!["B", "C", "D"]);
    }

    #[tokio::test]
    async fn list_returns_most_recent_in_chronological_order() {
        let buffer = ShortTermBuffer::new(10);
        let session = buffer.create("s1", "sp").await;

        for text in ["one", "two", "three"] {
            buffer.append(&session, "user", text_parts(text)).await.unwrap();
        }

        let messages = buffer.list(&session, 2).await.unwrap();
        let texts: Vec<String> = messages.iter().map(Message::flatten_text).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }

    #[tokio::test]
    async fn create_synthesizes_id_and_is_idempotent() {
        let buffer = ShortTermBuffer::new(5);

        let generated = buffer.create("", "sp").await;
        assert!(generated.starts_with("session-"));

        let session = buffer.create("fixed", "space-a").await;
        buffer.append(&session, "user", text_parts("hi")).await.unwrap();

        // Re-creating must not clear messages or rebind the space.
        let again = buffer.create("fixed", "space-b").await;
        assert_eq!(again, "fixed");
        assert_eq!(buffer.list("fixed", 10).await.unwrap().len(), 1);
        assert_eq!(buffer.space_of("fixed").await.unwrap(), "space-a");
    }

    #[tokio::test]
    async fn append_to_unknown_session_fails() {
        let buffer = ShortTermBuffer::new(5);
        let err = buffer.append("ghost", "user", text_parts("hi")).await.unwrap_err();
        assert!(matches!(err, EngramError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn append_with_no_parts_is_invalid() {
        let buffer = ShortTermBuffer::new(5);
        let session = buffer.create("s1", "sp").await;
        let err = buffer.append(&session, "user", vec![]).await.unwrap_err();
        assert!(matches!(err, EngramError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn delete_evicts_the_session() {
        let buffer = ShortTermBuffer::new(5);
        let session = buffer.create("s1", "sp").await;
        buffer.delete(&session).await;
        assert!(buffer.list(&session, 10).await.is_err());
    }

    #[tokio::test]
    async fn snapshot_is_a_copy() {
        let buffer = ShortTermBuffer::new(5);
        let session = buffer.create("s1", "sp").await;
        buffer.append(&session, "user", text_parts("hi")).await.unwrap();

        let (space, snapshot) = buffer.snapshot(&session).await.unwrap();
        assert_eq!(space, "sp");
        assert_eq!(snapshot.len(), 1);

        // Appends after the snapshot do not affect the copy.
        buffer.append(&session, "user", text_parts("later")).await.unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn tasks_are_ordered_ascending() {
        let buffer = ShortTermBuffer::new(5);
        let session = buffer.create("s1", "sp").await;

        buffer.add_task(&session, json!({"step": "first"})).await.unwrap();
        buffer.add_task(&session, json!({"step": "second"})).await.unwrap();

        let tasks = buffer.tasks(&session).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].task_order < tasks[1].task_order);
        assert_eq!(tasks[0].data["step"], "first");
        assert_eq!(tasks[0].status, "open");
    }
}
