//! Per-platform schema fragments.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::platform::Platform;
use crate::typedef::TypeDef;

/// Location of a native build artifact recorded for the emitters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Artifact path, relative to the plugin source root.
    pub path: String,
}

/// One platform's compiled API description.
///
/// A fragment is produced by a single reflector run over one platform's
/// sources and is immutable thereafter: the linker consumes fragments,
/// it never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// The platform this fragment describes.
    pub platform: Platform,

    types: IndexMap<String, TypeDef>,

    sources: Vec<SourceLocation>,
}

impl Fragment {
    /// An empty fragment for `platform`.
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self { platform, types: IndexMap::new(), sources: Vec::new() }
    }

    /// Add a type definition, rejecting duplicate qualified names.
    pub fn push_type(&mut self, def: TypeDef) -> Result<(), ModelError> {
        if self.types.contains_key(&def.qualified_name) {
            return Err(ModelError::DuplicateType(def.qualified_name));
        }
        self.types.insert(def.qualified_name.clone(), def);
        Ok(())
    }

    /// Record a native build artifact location.
    pub fn push_source(&mut self, path: impl Into<String>) {
        self.sources.push(SourceLocation { path: path.into() });
    }

    /// Type definitions in declaration order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    /// Look up a type definition by qualified name.
    #[must_use]
    pub fn type_def(&self, qualified_name: &str) -> Option<&TypeDef> {
        self.types.get(qualified_name)
    }

    /// Number of type definitions.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Recorded build artifact locations.
    #[must_use]
    pub fn sources(&self) -> &[SourceLocation] {
        &self.sources
    }
}
