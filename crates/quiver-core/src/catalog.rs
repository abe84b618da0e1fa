//! Read-only catalog access.
//!
//! The engines never fetch data themselves. Id-based entry points read
//! through [`CatalogSource`]; [`Catalog`] is the in-memory implementation
//! loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::error::TuningError;
use crate::model::{Arrow, Component, ComponentCategory};

/// Lookup seam for arrow and component records.
pub trait CatalogSource {
    fn arrow(&self, id: u64) -> Option<Arrow>;

    fn component(&self, id: u64) -> Option<Component>;

    /// All components, or only those in `category`.
    fn components(&self, category: Option<ComponentCategory>) -> Vec<Component>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub arrows: Vec<Arrow>,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Catalog {
    pub fn new(arrows: Vec<Arrow>, components: Vec<Component>) -> Self {
        Self { arrows, components }
    }

    /// Parse `{ "arrows": [...], "components": [...] }`.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn arrows(&self) -> &[Arrow] {
        &self.arrows
    }
}

impl CatalogSource for Catalog {
    fn arrow(&self, id: u64) -> Option<Arrow> {
        self.arrows.iter().find(|a| a.id == id).cloned()
    }

    fn component(&self, id: u64) -> Option<Component> {
        self.components.iter().find(|c| c.id == id).cloned()
    }

    fn components(&self, category: Option<ComponentCategory>) -> Vec<Component> {
        self.components
            .iter()
            .filter(|c| category.is_none_or(|cat| c.category == cat))
            .cloned()
            .collect()
    }
}
