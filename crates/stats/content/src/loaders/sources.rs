//! Effect source loader.

use std::path::Path;

use serde::{Deserialize, Serialize};
use stats_core::{EffectCatalog, EffectRow, EffectSource};

use crate::loaders::{LoadResult, read_file};

/// Named row set for one kind of effect source (a fire area, a potion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<EffectRow>,
}

impl SourceConfig {
    /// Builds a fresh source instance. Configuration problems are logged by
    /// [`EffectSource::new`] and do not fail the build.
    pub fn build(&self, catalog: &EffectCatalog) -> EffectSource {
        EffectSource::new(self.name.clone(), self.rows.clone(), catalog)
    }
}

/// Loader for effect sources from RON files.
///
/// Example:
/// ```ron
/// [
///     (
///         name: "fire_area",
///         rows: [
///             (effect: Some("burning"), application: OnEnter, removal: OnExit, stacks_to_remove: -1),
///         ],
///     ),
/// ]
/// ```
pub struct SourceLoader;

impl SourceLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<SourceConfig>> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<Vec<SourceConfig>> {
        let sources: Vec<SourceConfig> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse sources RON: {}", e))?;

        for (index, source) in sources.iter().enumerate() {
            if sources[..index].iter().any(|other| other.name == source.name) {
                anyhow::bail!("duplicate source name '{}'", source.name);
            }
        }
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stats_core::{StacksToRemove, Trigger};

    #[test]
    fn rows_default_to_manual_triggers() {
        let sources = SourceLoader::parse(r#"[(name: "altar", rows: [(effect: Some("blessing"))])]"#)
            .expect("valid RON");

        let row = &sources[0].rows[0];
        assert_eq!(row.application, Trigger::Manual);
        assert_eq!(row.removal, Trigger::Manual);
        assert_eq!(row.level, 1.0);
        assert_eq!(row.stacks_to_remove, StacksToRemove::All);
    }

    #[test]
    fn stacks_to_remove_is_an_authored_integer() {
        let sources = SourceLoader::parse(
            r#"[(name: "trap", rows: [(effect: Some("bleed"), stacks_to_remove: 2), (effect: Some("bleed"), stacks_to_remove: -1)])]"#,
        )
        .expect("valid RON");

        assert_eq!(sources[0].rows[0].stacks_to_remove, StacksToRemove::Count(2));
        assert_eq!(sources[0].rows[1].stacks_to_remove, StacksToRemove::All);
    }

    #[test]
    fn duplicate_source_names_are_rejected() {
        assert!(SourceLoader::parse(r#"[(name: "trap"), (name: "trap")]"#).is_err());
    }
}
