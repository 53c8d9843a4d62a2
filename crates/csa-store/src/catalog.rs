//! # YAML Catalog
//!
//! Loads catalog relations from a YAML file:
//!
//! ```yaml
//! catalogs:
//!   - requirement: QUALITY_MGMT
//!     version: "1.0"
//!     relations:
//!       - { measure_code: MG_01, subclause_id: S1, is_primary: true }
//!       - { measure_code: MG_01, subclause_id: S2 }
//! ```
//!
//! A requirement may appear several times with different versions. Repeating
//! the same `(requirement, version)` pair is rejected at load time.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use csa_core::{CatalogRelation, CatalogScope, RequirementCode, RequirementVersion};

use crate::error::StoreError;
use crate::traits::CatalogStore;

/// On-disk document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub catalogs: Vec<CatalogFileEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFileEntry {
    pub requirement: RequirementCode,
    #[serde(default)]
    pub version: RequirementVersion,
    #[serde(default)]
    pub relations: Vec<CatalogRelation>,
}

/// Immutable catalog held in memory after loading a [`CatalogFile`].
#[derive(Debug, Clone, Default)]
pub struct YamlCatalog {
    scopes: HashMap<CatalogScope, Vec<CatalogRelation>>,
}

impl YamlCatalog {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml(&text)?;
        tracing::info!(
            path = %path.display(),
            scopes = catalog.scopes.len(),
            "loaded catalog file"
        );
        Ok(catalog)
    }

    pub fn from_yaml(text: &str) -> Result<Self, StoreError> {
        let file: CatalogFile = serde_yaml::from_str(text)?;
        Self::from_file(file)
    }

    pub fn from_file(file: CatalogFile) -> Result<Self, StoreError> {
        let mut scopes = HashMap::with_capacity(file.catalogs.len());
        for entry in file.catalogs {
            let scope = CatalogScope::new(entry.requirement, entry.version);
            if scopes.contains_key(&scope) {
                return Err(StoreError::CatalogFile(format!(
                    "duplicate catalog entry for {scope}"
                )));
            }
            scopes.insert(scope, entry.relations);
        }
        Ok(Self { scopes })
    }

    /// Scopes present in the file, sorted by requirement then version.
    pub fn scopes(&self) -> Vec<CatalogScope> {
        let mut scopes: Vec<_> = self.scopes.keys().cloned().collect();
        scopes.sort_by(|a, b| {
            a.requirement
                .cmp(&b.requirement)
                .then_with(|| a.version.cmp(&b.version))
        });
        scopes
    }

    pub fn relations(&self, scope: &CatalogScope) -> Option<&[CatalogRelation]> {
        self.scopes.get(scope).map(Vec::as_slice)
    }
}

#[async_trait]
impl CatalogStore for YamlCatalog {
    async fn get_catalog_relations(
        &self,
        scope: &CatalogScope,
    ) -> Result<Vec<CatalogRelation>, StoreError> {
        self.relations(scope)
            .map(<[CatalogRelation]>::to_vec)
            .ok_or_else(|| StoreError::CatalogNotFound(scope.to_string()))
    }
}
