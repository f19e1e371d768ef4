// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-to-space resolution cache.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::RwLock;

use engram_core::EngramError;

/// Caches `session_id -> space_id` bindings.
///
/// The read lock covers the fast path only; a miss runs the fetch outside
/// any lock, then re-acquires the write lock to install the result. Two
/// racing misses both fetch and the last install wins, which is harmless
/// because the binding is stable for a session's lifetime.
#[derive(Default)]
pub struct SpaceCache {
    inner: RwLock<HashMap<String, String>>,
}

impl SpaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the space for a session, consulting `fetch` on a miss.
    pub async fn resolve<F, Fut>(&self, session_id: &str, fetch: F) -> Result<String, EngramError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, EngramError>>,
    {
        if let Some(space_id) = self.inner.read().await.get(session_id) {
            return Ok(space_id.clone());
        }

        let space_id = fetch().await?;

        self.inner
            .write()
            .await
            .insert(session_id.to_string(), space_id.clone());

        Ok(space_id)
    }

    /// Installs a binding eagerly (e.g. at session creation).
    pub async fn insert(&self, session_id: &str, space_id: &str) {
        self.inner
            .write()
            .await
            .insert(session_id.to_string(), space_id.to_string());
    }

    /// Drops a binding (e.g. at session deletion).
    pub async fn forget(&self, session_id: &str) {
        self.inner.write().await.remove(session_id);
    }
}
