//! Capability catalog
//!
//! Persisted list of capabilities with an enabled flag. The interactive agent
//! only sees the enabled ones.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::capability::CapabilitySet;
use crate::core::{CohortError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
}

impl CatalogEntry {
    /// Disabled entries for every capability in a set
    pub fn from_set(set: &CapabilitySet) -> Vec<Self> {
        set.iter()
            .map(|spec| Self {
                id: spec.id().to_string(),
                name: spec.display_name().to_string(),
                description: spec.description().to_string(),
                enabled: false,
            })
            .collect()
    }
}

#[async_trait]
pub trait CapabilityCatalog: Send + Sync {
    async fn entries(&self) -> Result<Vec<CatalogEntry>>;

    /// Toggle one entry; unknown ids are an error
    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<CatalogEntry>;

    /// Insert entries, keeping existing ones untouched
    async fn seed(&self, entries: Vec<CatalogEntry>) -> Result<()>;

    async fn enabled_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter(|e| e.enabled)
            .map(|e| e.id)
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    entries: RwLock<BTreeMap<String, CatalogEntry>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CapabilityCatalog for InMemoryCatalog {
    async fn entries(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn set_enabled(&self, id: &str, enabled: bool) -> Result<CatalogEntry> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| CohortError::CapabilityNotFound(id.to_string()))?;
        entry.enabled = enabled;
        Ok(entry.clone())
    }

    async fn seed(&self, entries: Vec<CatalogEntry>) -> Result<()> {
        let mut current = self.entries.write().await;
        for entry in entries {
            current.entry(entry.id.clone()).or_insert(entry);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::builtin;

    #[tokio::test]
    async fn test_seed_then_toggle() {
        let catalog = InMemoryCatalog::new();
        let set = builtin::builtin_set().unwrap();
        catalog.seed(CatalogEntry::from_set(&set)).await.unwrap();
        assert_eq!(catalog.entries().await.unwrap().len(), 2);
        assert!(catalog.enabled_ids().await.unwrap().is_empty());

        let entry = catalog.set_enabled(builtin::ECHO_ID, true).await.unwrap();
        assert!(entry.enabled);
        assert_eq!(catalog.enabled_ids().await.unwrap(), vec![builtin::ECHO_ID]);

        // Re-seeding keeps the toggle
        catalog.seed(CatalogEntry::from_set(&set)).await.unwrap();
        assert_eq!(catalog.enabled_ids().await.unwrap(), vec![builtin::ECHO_ID]);
    }

    #[tokio::test]
    async fn test_unknown_toggle() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.set_enabled("ghost", true).await.is_err());
    }
}
