// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Engram memory engine.
//!
//! Provides the [`EngramConfig`] model and Figment-based loaders with XDG
//! hierarchy and `ENGRAM_` environment variable overrides.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{EmbedderConfig, EngramConfig, MemoryConfig, StorerConfig};
