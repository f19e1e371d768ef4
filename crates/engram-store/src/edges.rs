// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relationship edge sanitization.
//!
//! `metadata.edges` is caller-supplied and arrives in whatever shape the
//! agent produced. Sanitization never errors: malformed entries are dropped,
//! types are normalized to `[A-Z0-9_]+`, and duplicates by (target, type)
//! collapse to the first occurrence.

use engram_core::types::Metadata;
use serde::{Deserialize, Serialize};

/// Edge type used when the caller supplied a blank type.
pub const DEFAULT_RELATION: &str = "RELATED";

/// A directed typed relationship from the record under storage to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Id of the record this edge points at.
    pub target: String,
    /// Normalized relation type.
    #[serde(rename = "type")]
    pub edge_type: String,
}

/// Sanitizes `metadata["edges"]` in place and returns the normalized list.
///
/// Entries with a blank target are dropped; blank types normalize to
/// [`DEFAULT_RELATION`]. When nothing survives, the `edges` key is removed
/// from the metadata; otherwise it is replaced with the normalized list.
/// The returned list drives edge-row insertion in backends with a native
/// edge representation.
pub fn sanitize_edges(metadata: &mut Metadata) -> Vec<Edge> {
    let Some(raw) = metadata.get("edges") else {
        return Vec::new();
    };

    let valid = validate_edges(raw);

    if valid.is_empty() {
        metadata.remove("edges");
    } else {
        metadata.insert(
            "edges".to_string(),
            serde_json::to_value(&valid).unwrap_or(serde_json::Value::Null),
        );
    }

    valid
}

/// Parses and normalizes a raw edges value without touching any metadata.
pub fn validate_edges(raw: &serde_json::Value) -> Vec<Edge> {
    let candidates = extract_edges(raw);

    let mut valid = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for edge in candidates {
        let target = edge.target.trim();
        if target.is_empty() {
            continue;
        }

        let edge_type = normalize_relation(&edge.edge_type);

        if !seen.insert(format!("{target}|{edge_type}")) {
            continue;
        }

        valid.push(Edge {
            target: target.to_string(),
            edge_type,
        });
    }

    valid
}

/// Leniently extracts `{target, type}` entries from a raw JSON value.
///
/// Anything that does not round-trip as a list of string-valued maps yields
/// no edges.
fn extract_edges(raw: &serde_json::Value) -> Vec<Edge> {
    let serde_json::Value::Array(items) = raw else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let target = obj.get("target").and_then(|v| v.as_str()).unwrap_or("");
            let edge_type = obj.get("type").and_then(|v| v.as_str()).unwrap_or("");
            Some(Edge {
                target: target.to_string(),
                edge_type: edge_type.to_string(),
            })
        })
        .collect()
}

/// Normalizes a relation type to uppercase snake-case.
///
/// Whitespace runs and any character outside `[A-Z0-9_]` become a single
/// underscore; a blank input maps to [`DEFAULT_RELATION`].
pub fn normalize_relation(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DEFAULT_RELATION.to_string();
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut last_was_sep = false;
    for ch in trimmed.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_uppercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }

    let normalized = out.trim_matches('_').to_string();
    if normalized.is_empty() {
        DEFAULT_RELATION.to_string()
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn duplicate_and_blank_target_entries_collapse() {
        let raw = json!([
            {"target": "x", "type": "relates to"},
            {"target": "x", "type": "RELATES_TO"},
            {"target": "", "type": "Y"},
        ]);
        let edges = validate_edges(&raw);
        assert_eq!(
            edges,
            vec![Edge {
                target: "x".into(),
                edge_type: "RELATES_TO".into()
            }]
        );
    }

    #[test]
    fn normalize_relation_uppercases_and_underscores() {
        assert_eq!(normalize_relation("relates to"), "RELATES_TO");
        assert_eq!(normalize_relation("caused-by"), "CAUSED_BY");
        assert_eq!(normalize_relation("  follows  "), "FOLLOWS");
        assert_eq!(normalize_relation("part  of"), "PART_OF");
        assert_eq!(normalize_relation(""), "RELATED");
        assert_eq!(normalize_relation("   "), "RELATED");
        assert_eq!(normalize_relation("***"), "RELATED");
    }

    #[test]
    fn normalized_types_match_the_allowed_alphabet() {
        for input in ["relates to", "weird!type", "a b c", "x", "LOUD_TYPE"] {
            let normalized = normalize_relation(input);
            assert!(
                normalized
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'),
                "{normalized:?} contains characters outside [A-Z0-9_]"
            );
            assert!(!normalized.is_empty());
        }
    }

    #[test]
    fn sanitize_removes_key_when_nothing_survives() {
        let mut metadata = Metadata::new();
        metadata.insert("edges".into(), json!([{"target": "", "type": "Y"}]));
        metadata.insert("source".into(), json!("user"));

        let edges = sanitize_edges(&mut metadata);
        assert!(edges.is_empty());
        assert!(!metadata.contains_key("edges"));
        assert!(metadata.contains_key("source"));
    }

    #[test]
    fn sanitize_replaces_key_with_normalized_list() {
        let mut metadata = Metadata::new();
        metadata.insert(
            "edges".into(),
            json!([{"target": "a", "type": "depends on"}, {"target": "b"}]),
        );

        let edges = sanitize_edges(&mut metadata);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].edge_type, "DEPENDS_ON");
        assert_eq!(edges[1].edge_type, "RELATED");

        let stored = metadata.get("edges").unwrap();
        assert_eq!(stored[0]["type"], "DEPENDS_ON");
        assert_eq!(stored[1]["target"], "b");
    }

    #[test]
    fn absent_or_malformed_edges_yield_nothing() {
        let mut metadata = Metadata::new();
        assert!(sanitize_edges(&mut metadata).is_empty());

        metadata.insert("edges".into(), json!("not a list"));
        assert!(sanitize_edges(&mut metadata).is_empty());
        assert!(!metadata.contains_key("edges"));

        let mut metadata = Metadata::new();
        metadata.insert("edges".into(), json!([42, "strings", null]));
        assert!(sanitize_edges(&mut metadata).is_empty());
    }

    #[test]
    fn blank_type_defaults_but_is_still_deduped() {
        let raw = json!([
            {"target": "a", "type": ""},
            {"target": "a", "type": "related"},
        ]);
        let edges = validate_edges(&raw);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].edge_type, "RELATED");
    }
}
