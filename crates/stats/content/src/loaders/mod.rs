//! Content loaders for reading stat data from files.
//!
//! Each loader parses one file format into `stats-core` types. Parsing is
//! split from reading so the bundled data in [`crate::bundled`] goes through
//! the same code as files on disk.

pub mod calculations;
pub mod config;
pub mod effects;
pub mod factory;
pub mod sources;

pub use calculations::CalculationLoader;
pub use config::ConfigLoader;
pub use effects::EffectLoader;
pub use factory::{ContentFactory, StatsContent};
pub use sources::{SourceConfig, SourceLoader};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
