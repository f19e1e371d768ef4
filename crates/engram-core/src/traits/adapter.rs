// SPDX-FileCopyrightText: 2026 Engram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by pluggable engine adapters.

use async_trait::async_trait;

use crate::error::EngramError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for Engram adapters (embedders, storers).
///
/// Provides identity, lifecycle, and health check capabilities so the host
/// can probe and shut down adapters uniformly.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the kind of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, EngramError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), EngramError>;
}
