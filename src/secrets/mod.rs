// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Secret Store Gateway
//!
//! Get/put of opaque named secrets. This layer knows nothing about the
//! blockchain; enrollment credentials are stored here under deterministic
//! names by the identity repository.
//!
//! Two error classes matter to callers: a secret that is genuinely absent
//! (`NotFound`, the normal trigger for the enrollment fallback) and a store
//! that cannot answer at all (`Unavailable`, an infrastructure failure that
//! must never be mistaken for "not enrolled").

pub mod file;
pub mod memory;

pub use file::FileSecretStore;
pub use memory::MemorySecretStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from secret store operations.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    /// The named secret does not exist.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// The store could not be reached or could not answer.
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of an idempotent create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The secret was written.
    Created,
    /// A secret with that name already exists; nothing was written.
    AlreadyExists,
}

impl CreateOutcome {
    pub fn created(self) -> bool {
        matches!(self, CreateOutcome::Created)
    }
}

/// A named key/value secret store.
///
/// ## Contract
///
/// - `get` returns `NotFound` for absent names; any other failure is
///   `Unavailable`.
/// - `create` never overwrites: writing to an existing name is a no-op
///   reported as `AlreadyExists`.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Retrieve a secret value by name.
    async fn get(&self, name: &str) -> Result<String, SecretStoreError>;

    /// Create a secret, idempotently.
    async fn create(&self, name: &str, value: &str) -> Result<CreateOutcome, SecretStoreError>;

    /// Probe the store; used by the readiness check.
    async fn health_check(&self) -> Result<(), SecretStoreError>;
}
