//! Dilemma knowledge base: the selectable ethical dilemmas and, for each,
//! the risks, benefits, alternatives and regulations quoted in the
//! informed-consent document.

use std::path::Path;

use serde::{Deserialize, Serialize};

const BUNDLED_CATALOG: &str = include_str!("../../data/dilemmas.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dilemma {
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default)]
    pub regulations: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Cannot read dilemma catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed dilemma catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate dilemma '{0}' in catalog")]
    Duplicate(String),
}

/// Ordered list of dilemmas. The first entry is the form default.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DilemmaCatalog {
    dilemmas: Vec<Dilemma>,
}

impl DilemmaCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The catalog shipped with the binary.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let dilemmas: Vec<Dilemma> = serde_json::from_str(raw)?;
        for (i, d) in dilemmas.iter().enumerate() {
            if dilemmas[..i].iter().any(|other| other.name == d.name) {
                return Err(CatalogError::Duplicate(d.name.clone()));
            }
        }
        Ok(Self { dilemmas })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Load the configured catalog, or the bundled one when none is configured.
    /// A broken catalog is logged and replaced with an empty one.
    pub fn load_or_empty(path: Option<&Path>) -> Self {
        let loaded = match path {
            Some(p) => Self::load(p),
            None => Self::bundled(),
        };
        match loaded {
            Ok(catalog) => {
                tracing::info!(dilemmas = catalog.len(), "Dilemma catalog loaded");
                catalog
            }
            Err(e) => {
                tracing::error!("Dilemma catalog unavailable: {e}");
                Self::empty()
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Dilemma> {
        self.dilemmas.iter().find(|d| d.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.dilemmas.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn default_name(&self) -> Option<&str> {
        self.dilemmas.first().map(|d| d.name.as_str())
    }

    pub fn dilemmas(&self) -> &[Dilemma] {
        &self.dilemmas
    }

    pub fn len(&self) -> usize {
        self.dilemmas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dilemmas.is_empty()
    }
}
