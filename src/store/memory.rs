//! In-process policy store

use super::{concerns_subject, PolicyStore};
use crate::core::policy::Policy;
use crate::error::{Result, WardenError};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::info;

/// Policy store backed by a map behind a read-write lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    policies: RwLock<BTreeMap<String, Policy>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `policies`, validating each one
    pub fn with_policies(policies: impl IntoIterator<Item = Policy>) -> Result<Self> {
        let store = Self::new();
        for policy in policies {
            store.create(policy)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }
}

impl PolicyStore for MemoryStore {
    fn create(&self, policy: Policy) -> Result<()> {
        policy.validate()?;

        let mut policies = self.policies.write();
        if policies.contains_key(&policy.id) {
            return Err(WardenError::Conflict(policy.id));
        }
        info!("Creating policy '{}'", policy.id);
        policies.insert(policy.id.clone(), policy);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Policy> {
        self.policies
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| WardenError::NotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> Result<()> {
        if self.policies.write().remove(id).is_some() {
            info!("Deleted policy '{}'", id);
        }
        Ok(())
    }

    fn find_policies_for_subject(&self, subject: &str) -> Result<Vec<Policy>> {
        Ok(self
            .policies
            .read()
            .values()
            .filter(|policy| concerns_subject(policy, subject))
            .cloned()
            .collect())
    }

    fn list(&self) -> Result<Vec<Policy>> {
        Ok(self.policies.read().values().cloned().collect())
    }
}
