//! Capability set - the capabilities exposed to one agent
//!
//! Keeps registration order (providers see declarations in that order) and
//! guarantees ids are unique within the set.

use std::collections::HashMap;

use crate::capability::spec::{CapabilityDeclaration, CapabilitySpec};
use crate::core::{CohortError, Result};

/// Named, ordered collection of capabilities
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    name: String,
    specs: Vec<CapabilitySpec>,
    /// Position of each id in `specs`
    index: HashMap<String, usize>,
}

impl CapabilitySet {
    /// Create an empty set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specs: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create a set from specs, rejecting duplicate ids
    pub fn with_specs(
        name: impl Into<String>,
        specs: impl IntoIterator<Item = CapabilitySpec>,
    ) -> Result<Self> {
        let mut set = Self::new(name);
        set.extend(specs)?;
        Ok(set)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a capability
    pub fn register(&mut self, spec: CapabilitySpec) -> Result<()> {
        if self.index.contains_key(spec.id()) {
            return Err(CohortError::DuplicateCapability(spec.id().to_string()));
        }
        self.index.insert(spec.id().to_string(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// Register several capabilities
    pub fn extend(&mut self, specs: impl IntoIterator<Item = CapabilitySpec>) -> Result<()> {
        for spec in specs {
            self.register(spec)?;
        }
        Ok(())
    }

    /// Look a capability up by id
    pub fn get(&self, id: &str) -> Option<&CapabilitySpec> {
        self.index.get(id).map(|&i| &self.specs[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Ids in registration order
    pub fn ids(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilitySpec> {
        self.specs.iter()
    }

    /// Declarations in registration order
    pub fn declarations(&self) -> Vec<CapabilityDeclaration> {
        self.specs.iter().map(CapabilitySpec::declaration).collect()
    }

    /// A new set holding only the given ids, in this set's order
    pub fn filtered<S: AsRef<str>>(&self, ids: &[S]) -> Self {
        let mut subset = Self::new(self.name.clone());
        for spec in &self.specs {
            if ids.iter().any(|id| id.as_ref() == spec.id()) {
                // ids are already unique here
                subset.index.insert(spec.id().to_string(), subset.specs.len());
                subset.specs.push(spec.clone());
            }
        }
        subset
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
