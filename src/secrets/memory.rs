// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory secret store for the dev backend and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CreateOutcome, SecretStore, SecretStoreError};

/// Map-backed store. An outage switch lets tests exercise the
/// `Unavailable` error class.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
    unavailable: Mutex<bool>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a store outage; every operation fails until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().expect("outage flag poisoned") = unavailable;
    }

    fn check_available(&self) -> Result<(), SecretStoreError> {
        if *self.unavailable.lock().expect("outage flag poisoned") {
            Err(SecretStoreError::Unavailable(
                "simulated outage".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    /// Number of secrets held; test helper.
    pub fn len(&self) -> usize {
        self.secrets.lock().expect("secret map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, name: &str) -> Result<String, SecretStoreError> {
        self.check_available()?;
        self.secrets
            .lock()
            .expect("secret map poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| SecretStoreError::NotFound(name.to_string()))
    }

    async fn create(&self, name: &str, value: &str) -> Result<CreateOutcome, SecretStoreError> {
        self.check_available()?;
        let mut secrets = self.secrets.lock().expect("secret map poisoned");
        if secrets.contains_key(name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        secrets.insert(name.to_string(), value.to_string());
        Ok(CreateOutcome::Created)
    }

    async fn health_check(&self) -> Result<(), SecretStoreError> {
        self.check_available()
    }
}
