use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;
use tracing::info;

use super::adapter::SiteAdapter;
use super::sites::{self, TemplateAdapter, TemplateSource};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("source '{0}' is registered twice")]
    Duplicate(String),

    #[error("unknown source '{0}'")]
    Unknown(String),
}

/// Adapters in registration order, with a name lookup.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn SiteAdapter>>,
    by_name: HashMap<String, usize>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enabled built-ins first, in the order given, then configured templates.
    pub fn from_sources(
        enabled: &[String],
        templates: Vec<TemplateSource>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for name in enabled {
            let adapter = sites::builtin(name).ok_or_else(|| RegistryError::Unknown(name.clone()))?;
            registry.register(adapter)?;
        }
        for source in templates {
            registry.register(Arc::new(TemplateAdapter::new(source)))?;
        }
        info!(sources = ?registry.names(), "Site adapters registered");
        Ok(registry)
    }

    pub fn register(&mut self, adapter: Arc<dyn SiteAdapter>) -> Result<(), RegistryError> {
        let name = adapter.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.by_name.insert(name, self.adapters.len());
        self.adapters.push(adapter);
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn SiteAdapter>> {
        self.by_name.get(name).map(|&i| &self.adapters[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SiteAdapter>> {
        self.adapters.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Reads a JSON array of template sources.
pub fn load_template_sources(path: &Path) -> anyhow::Result<Vec<TemplateSource>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sources file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Sources file {} is not a valid source list", path.display()))
}
