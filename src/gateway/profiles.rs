//! Persona profile stores
//!
//! At most one profile is active at a time; having none is a normal answer.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::{CohortError, Persona, Result};

/// Source of the active persona
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn active_profile(&self) -> Result<Option<Persona>>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct StaticProfileStore {
    active: RwLock<Option<Persona>>,
}

impl StaticProfileStore {
    pub fn new(active: Option<Persona>) -> Self {
        Self {
            active: RwLock::new(active),
        }
    }

    pub fn set_active(&self, persona: Option<Persona>) {
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = persona;
    }
}

#[async_trait]
impl ProfileStore for StaticProfileStore {
    async fn active_profile(&self) -> Result<Option<Persona>> {
        Ok(self
            .active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }
}

/// One record of a profiles file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub role: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfilesFile {
    #[serde(default, rename = "profile")]
    profiles: Vec<ProfileRecord>,
}

/// Store backed by a TOML file of `[[profile]]` tables, re-read on every lookup
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, empty when the file does not exist
    pub async fn records(&self) -> Result<Vec<ProfileRecord>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let file: ProfilesFile = toml::from_str(&content).map_err(|e| {
            CohortError::profile(format!("invalid {}: {}", self.path.display(), e))
        })?;
        Ok(file.profiles)
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn active_profile(&self) -> Result<Option<Persona>> {
        let records = self.records().await?;
        let mut active = records.into_iter().filter(|r| r.active);
        let first = active.next();
        if active.next().is_some() {
            return Err(CohortError::profile(format!(
                "more than one active profile in {}",
                self.path.display()
            )));
        }
        Ok(first.map(|r| Persona::new(r.role, r.name, r.description)))
    }
}
