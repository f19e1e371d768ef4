// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the memory engine: buffer, distillation, and
//! hybrid retrieval wired through `MemoryManager` with the in-memory
//! storer and a deterministic mock embedder.

use std::collections::HashMap;
use std::sync::Arc;

use engram_config::MemoryConfig;
use engram_core::types::{InputFile, Part, Skill};
use engram_core::{Embedder, EngramError, Metadata, Storer};
use engram_memory::{AppendOptions, MemoryManager, SearchOptions};
use engram_store::MemoryStorer;
use engram_test_utils::MockEmbedder;

const DIM: usize = 64;

fn text_parts(text: &str) -> Vec<Part> {
    vec![Part::text(text)]
}

fn manager_with(
    storer: Arc<MemoryStorer>,
    config: MemoryConfig,
) -> (MemoryManager, Arc<MockEmbedder>) {
    let embedder = Arc::new(MockEmbedder::new(DIM));
    let manager = MemoryManager::with_skills(
        embedder.clone(),
        storer.clone(),
        Some(storer),
        config,
    )
    .expect("valid config");
    (manager, embedder)
}

/// Window eviction: window 3, append A..D, list returns [B, C, D].
#[tokio::test]
async fn short_term_window_evicts_oldest() {
    let storer = Arc::new(MemoryStorer::new());
    let config = MemoryConfig {
        window_size: 3,
        ..MemoryConfig::default()
    };
    let (manager, _) = manager_with(storer, config);

    let space = manager.create_space("notes").await.unwrap();
    let session = manager.create_session(Some(&space)).await.unwrap();

    for text in ["A", "B", "C", "D"] {
        manager
            .append_short_term(&session, "user", text_parts(text), AppendOptions::default())
            .await
            .unwrap();
    }

    let (messages, _) = manager.list_short_term(&session, Some(10)).await.unwrap();
    let texts: Vec<String> = messages.iter().map(|m| m.flatten_text()).collect();
    assert_eq!(texts, vec!["B", "C", "D"]);
}

/// Dedup on flush: a fresh record with similarity above the rejection
/// threshold suppresses the new write entirely.
#[tokio::test]
async fn flush_skips_near_duplicates_of_fresh_records() {
    let storer = Arc::new(MemoryStorer::new());
    let config = MemoryConfig {
        rejection_similarity: 0.99,
        half_life_hours: 24.0,
        ..MemoryConfig::default()
    };
    let (manager, embedder) = manager_with(storer.clone(), config);

    let space = manager.create_space("dedup").await.unwrap();
    let session = manager.create_session(Some(&space)).await.unwrap();

    // Seed the store with exactly what the distiller would write.
    let vector = embedder.embed("user: hello").await.unwrap();
    storer
        .store(&space, &session, "user: hello", Metadata::new(), vector)
        .await
        .unwrap();
    assert_eq!(storer.len().await, 1);

    manager
        .append_short_term(&session, "user", text_parts("hello"), AppendOptions::default())
        .await
        .unwrap();
    manager.flush_to_long_term(&session).await.unwrap();

    assert_eq!(storer.len().await, 1, "duplicate must not be stored");
}

/// Flushing twice with no intervening appends produces no new records.
#[tokio::test]
async fn flush_is_idempotent_modulo_dedup() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer.clone(), MemoryConfig::default());

    let space = manager.create_space("idem").await.unwrap();
    let session = manager.create_session(Some(&space)).await.unwrap();

    manager
        .append_short_term(&session, "user", text_parts("the sky is blue"), AppendOptions::default())
        .await
        .unwrap();
    manager
        .append_short_term(&session, "assistant", text_parts("noted, sky is blue"), AppendOptions::default())
        .await
        .unwrap();

    manager.flush_to_long_term(&session).await.unwrap();
    let count = storer.len().await;
    assert_eq!(count, 2);

    manager.flush_to_long_term(&session).await.unwrap();
    assert_eq!(storer.len().await, count, "second flush must be a no-op");
}

/// Flush is non-destructive: the short-term window is retained.
#[tokio::test]
async fn flush_retains_the_short_term_buffer() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer, MemoryConfig::default());

    let space = manager.create_space("retain").await.unwrap();
    let session = manager.create_session(Some(&space)).await.unwrap();

    manager
        .append_short_term(&session, "user", text_parts("keep me"), AppendOptions::default())
        .await
        .unwrap();
    manager.flush_to_long_term(&session).await.unwrap();

    let (messages, _) = manager.list_short_term(&session, None).await.unwrap();
    assert_eq!(messages.len(), 1);
}

/// Distilled records carry role-prefixed content and a `source` field.
#[tokio::test]
async fn flush_stores_role_prefixed_content_with_source() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, embedder) = manager_with(storer.clone(), MemoryConfig::default());

    let space = manager.create_space("content").await.unwrap();
    let session = manager.create_session(Some(&space)).await.unwrap();

    manager
        .append_short_term(&session, "assistant", text_parts("rolled back the deploy"), AppendOptions::default())
        .await
        .unwrap();
    manager.flush_to_long_term(&session).await.unwrap();

    let vector = embedder.embed("assistant: rolled back the deploy").await.unwrap();
    let results = storer.search(&space, &vector, 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content, "assistant: rolled back the deploy");
    assert_eq!(results[0].metadata.get("source").unwrap(), "assistant");
    assert_eq!(results[0].session_id, session);
}

/// Whitespace-only messages are skipped during distillation.
#[tokio::test]
async fn flush_skips_blank_messages() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer.clone(), MemoryConfig::default());

    let space = manager.create_space("blank").await.unwrap();
    let session = manager.create_session(Some(&space)).await.unwrap();

    manager
        .append_short_term(&session, "user", text_parts("   "), AppendOptions::default())
        .await
        .unwrap();
    manager.flush_to_long_term(&session).await.unwrap();

    assert!(storer.is_empty().await);
}

/// An embedding failure aborts the whole flush.
#[tokio::test]
async fn flush_aborts_on_embedder_failure() {
    let storer = Arc::new(MemoryStorer::new());
    let manager = MemoryManager::new(
        Arc::new(MockEmbedder::failing(DIM)),
        storer.clone(),
        MemoryConfig::default(),
    )
    .unwrap();

    let space = manager.create_space("fail").await.unwrap();
    let session = manager.create_session(Some(&space)).await.unwrap();

    manager
        .append_short_term(&session, "user", text_parts("doomed"), AppendOptions::default())
        .await
        .unwrap();

    assert!(manager.flush_to_long_term(&session).await.is_err());
    assert!(storer.is_empty().await);
}

/// Cross-space isolation: a search never returns another space's records.
#[tokio::test]
async fn search_is_isolated_per_space() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer, MemoryConfig::default());

    let space_a = manager.create_space("team-a").await.unwrap();
    let space_b = manager.create_space("team-b").await.unwrap();
    let session_a = manager.create_session(Some(&space_a)).await.unwrap();
    let session_b = manager.create_session(Some(&space_b)).await.unwrap();

    manager
        .append_short_term(&session_a, "user", text_parts("alpha launch codes"), AppendOptions::default())
        .await
        .unwrap();
    manager
        .append_short_term(&session_b, "user", text_parts("alpha launch codes"), AppendOptions::default())
        .await
        .unwrap();
    manager.flush_to_long_term(&session_a).await.unwrap();
    manager.flush_to_long_term(&session_b).await.unwrap();

    let (messages, _) = manager
        .search_long_term(&session_a, "alpha launch codes", SearchOptions::default())
        .await
        .unwrap();

    assert!(!messages.is_empty());
    assert!(
        messages.iter().all(|m| m.session_id == session_a),
        "space A search must not surface space B records"
    );
}

/// Recall surfaces what was distilled, ranked against the query.
#[tokio::test]
async fn search_returns_relevant_distilled_messages() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer, MemoryConfig::default());

    let space = manager.create_space("recall").await.unwrap();
    let session = manager.create_session(Some(&space)).await.unwrap();

    manager
        .append_short_term(&session, "user", text_parts("my favorite color is teal"), AppendOptions::default())
        .await
        .unwrap();
    manager
        .append_short_term(&session, "user", text_parts("deploy window opens friday"), AppendOptions::default())
        .await
        .unwrap();
    manager.flush_to_long_term(&session).await.unwrap();

    let (messages, _) = manager
        .search_long_term(
            &session,
            "user: my favorite color is teal",
            SearchOptions {
                limit: Some(1),
                space_id: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(messages.len(), 1);
    assert!(messages[0].flatten_text().contains("teal"));
    assert_eq!(messages[0].role, "user");
}

/// Skills come back alongside messages, scoped to the same space.
#[tokio::test]
async fn search_returns_skills_with_messages() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, embedder) = manager_with(storer.clone(), MemoryConfig::default());

    let space = manager.create_space("skills").await.unwrap();
    let session = manager.create_session(Some(&space)).await.unwrap();

    let trigger = "deploy failed in production";
    storer
        .put_skill(Skill {
            id: "skill-rollback".into(),
            space_id: space.clone(),
            trigger: trigger.into(),
            sop: "1. halt pipeline 2. roll back 3. page on-call".into(),
            embedding: embedder.embed(trigger).await.unwrap(),
        })
        .await;

    let (_, skills) = manager
        .search_long_term(&session, "deploy failed in production", SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(skills.len(), 1);
    assert_eq!(skills[0].id, "skill-rollback");
}

/// Sessions without a space search to empty results, not an error.
#[tokio::test]
async fn search_without_space_is_empty() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer, MemoryConfig::default());

    let session = manager.create_session(None).await.unwrap();
    manager
        .append_short_term(&session, "user", text_parts("ephemeral"), AppendOptions::default())
        .await
        .unwrap();

    // Flush is also a no-op for spaceless sessions.
    manager.flush_to_long_term(&session).await.unwrap();

    let (messages, skills) = manager
        .search_long_term(&session, "ephemeral", SearchOptions::default())
        .await
        .unwrap();
    assert!(messages.is_empty());
    assert!(skills.is_empty());
}

/// An explicit space override searches that space directly.
#[tokio::test]
async fn search_honors_space_override() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer, MemoryConfig::default());

    let space = manager.create_space("shared").await.unwrap();
    let writer = manager.create_session(Some(&space)).await.unwrap();
    let reader = manager.create_session(None).await.unwrap();

    manager
        .append_short_term(&writer, "user", text_parts("the wifi password is hunter2"), AppendOptions::default())
        .await
        .unwrap();
    manager.flush_to_long_term(&writer).await.unwrap();

    let (messages, _) = manager
        .search_long_term(
            &reader,
            "user: the wifi password is hunter2",
            SearchOptions {
                limit: None,
                space_id: Some(space),
            },
        )
        .await
        .unwrap();

    assert!(!messages.is_empty());
}

/// Unknown sessions surface `SessionNotFound` across the API.
#[tokio::test]
async fn unknown_session_errors() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer, MemoryConfig::default());

    let err = manager
        .append_short_term("ghost", "user", text_parts("x"), AppendOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngramError::SessionNotFound { .. }));

    let err = manager.list_short_term("ghost", None).await.unwrap_err();
    assert!(matches!(err, EngramError::SessionNotFound { .. }));

    let err = manager.flush_to_long_term("ghost").await.unwrap_err();
    assert!(matches!(err, EngramError::SessionNotFound { .. }));

    let err = manager
        .search_long_term("ghost", "q", SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngramError::SessionNotFound { .. }));
}

/// Binding a session to an unregistered space is rejected.
#[tokio::test]
async fn unknown_space_is_rejected_at_session_creation() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer, MemoryConfig::default());

    let err = manager.create_session(Some("space-nope")).await.unwrap_err();
    assert!(matches!(err, EngramError::SpaceNotFound { .. }));
}

/// File attachments become `file` parts after the supplied parts.
#[tokio::test]
async fn append_folds_files_into_file_parts() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer, MemoryConfig::default());

    let session = manager.create_session(None).await.unwrap();

    let mut files = HashMap::new();
    files.insert(
        "attachment".to_string(),
        InputFile {
            name: "report.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
        },
    );

    manager
        .append_short_term(
            &session,
            "user",
            text_parts("see the attached report"),
            AppendOptions { files },
        )
        .await
        .unwrap();

    let (messages, _) = manager.list_short_term(&session, None).await.unwrap();
    let parts = &messages[0].parts;
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[1].part_type, "file");
    assert_eq!(parts[1].file_field.as_deref(), Some("attachment"));
    assert_eq!(parts[1].meta.as_ref().unwrap().get("filename").unwrap(), "report.pdf");
}

/// Tasks appear in `list_short_term` ordered by `task_order`.
#[tokio::test]
async fn tasks_surface_with_short_term_listing() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer, MemoryConfig::default());

    let session = manager.create_session(None).await.unwrap();
    manager
        .add_task(&session, serde_json::json!({"todo": "collect logs"}))
        .await
        .unwrap();
    manager
        .add_task(&session, serde_json::json!({"todo": "file ticket"}))
        .await
        .unwrap();

    let (_, tasks) = manager.list_short_term(&session, None).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks[0].task_order < tasks[1].task_order);
    assert_eq!(tasks[0].data["todo"], "collect logs");
}

/// Deleting a session evicts its window; later calls see SessionNotFound.
#[tokio::test]
async fn delete_session_evicts_short_term_state() {
    let storer = Arc::new(MemoryStorer::new());
    let (manager, _) = manager_with(storer, MemoryConfig::default());

    let space = manager.create_space("gone").await.unwrap();
    let session = manager.create_session(Some(&space)).await.unwrap();
    manager
        .append_short_term(&session, "user", text_parts("bye"), AppendOptions::default())
        .await
        .unwrap();

    manager.delete_session(&session).await;

    let err = manager.list_short_term(&session, None).await.unwrap_err();
    assert!(matches!(err, EngramError::SessionNotFound { .. }));
}
