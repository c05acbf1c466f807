//! Data-driven stat content and loaders.
//!
//! This crate reads the static inputs of the stat engine from TOML/RON files:
//! - Engine configuration (TOML)
//! - Linear magnitude calculators (RON)
//! - Effect definitions (RON)
//! - Effect source row sets (RON)
//!
//! All loaders use stats-core types directly with serde for deserialization.

#[cfg(feature = "loaders")]
pub mod bundled;
#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    CalculationLoader, ConfigLoader, ContentFactory, EffectLoader, LoadResult, SourceConfig,
    SourceLoader, StatsContent,
};
