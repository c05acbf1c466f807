//! Effect definition loader.

use std::path::Path;

use stats_core::{EffectCatalog, EffectDefinition};

use crate::loaders::{LoadResult, read_file};

/// Loader for effect definitions from RON files.
///
/// Every definition is validated on load; one invalid definition fails the
/// whole file.
pub struct EffectLoader;

impl EffectLoader {
    pub fn load(path: &Path) -> LoadResult<EffectCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<EffectCatalog> {
        let definitions: Vec<EffectDefinition> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse effects RON: {}", e))?;

        let catalog = EffectCatalog::from_definitions(definitions)
            .map_err(|e| anyhow::anyhow!("Invalid effect definition: {}", e))?;
        tracing::debug!(effects = catalog.len(), "loaded effect catalog");
        Ok(catalog)
    }
}
