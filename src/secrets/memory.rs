//! In-Memory Secret Store
//!
//! Secret store double keyed by namespace and name, with create/replace
//! semantics matching the Kubernetes API.

use crate::domain::ports::{SecretRecord, SecretStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Secret store backed by process memory
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<BTreeMap<(String, String), SecretRecord>>,
    gets: AtomicU32,
    creates: AtomicU32,
    replaces: AtomicU32,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing secret
    pub fn with_secret(self, secret: SecretRecord) -> Self {
        self.secrets
            .write()
            .insert((secret.namespace.clone(), secret.name.clone()), secret);
        self
    }

    pub fn stored(&self, namespace: &str, name: &str) -> Option<SecretRecord> {
        self.secrets
            .read()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn gets(&self) -> u32 {
        self.gets.load(Ordering::Relaxed)
    }

    /// Successful creates
    pub fn creates(&self) -> u32 {
        self.creates.load(Ordering::Relaxed)
    }

    /// Successful replaces
    pub fn replaces(&self) -> u32 {
        self.replaces.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretRecord>> {
        self.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self.stored(namespace, name))
    }

    async fn create(&self, secret: &SecretRecord) -> Result<()> {
        let key = (secret.namespace.clone(), secret.name.clone());
        let mut secrets = self.secrets.write();
        if secrets.contains_key(&key) {
            return Err(Error::AlreadyExists {
                kind: "Secret".into(),
                name: format!("{}/{}", secret.namespace, secret.name),
            });
        }
        secrets.insert(key, secret.clone());
        self.creates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn replace(&self, secret: &SecretRecord) -> Result<()> {
        let key = (secret.namespace.clone(), secret.name.clone());
        let mut secrets = self.secrets.write();
        match secrets.get_mut(&key) {
            Some(existing) => {
                *existing = secret.clone();
                self.replaces.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(Error::NotFound {
                kind: "Secret".into(),
                name: format!("{}/{}", secret.namespace, secret.name),
            }),
        }
    }
}
