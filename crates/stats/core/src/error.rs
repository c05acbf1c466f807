//! Error types for stats-core.
//!
//! Expected conditions (a target without a store, a spec naming an unknown
//! calculator, a handle that no longer resolves) are explicit `Err` values.
//! Nothing on these paths panics.
//!
//! # Error kinds
//!
//! - [`EffectError`]: returned by apply/remove calls; aborts that call only
//! - [`ConfigurationError`]: produced while building an effect source from
//!   its rows; logged and kept as diagnostics, never fatal

use crate::effect::{ActiveEffectHandle, EffectId};
use crate::world::EntityId;

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: the caller may try again later (e.g. a stale handle)
/// - **Validation**: invalid input that should be rejected without retry
/// - **Internal**: unexpected state inconsistency that needs investigation
/// - **Fatal**: the engine cannot continue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all stats-core errors.
pub trait StatsError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Useful for log filtering and for asserting on error kinds in tests.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Failure of a single apply, remove or spec-building call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EffectError {
    /// The target entity has no attribute store (never spawned or destroyed).
    #[error("entity {entity} has no attribute store")]
    InvalidTarget { entity: EntityId },

    /// Malformed modifier or magnitude data.
    #[error("invalid specification for effect '{effect}': {reason}")]
    InvalidSpecification { effect: String, reason: String },

    /// The effect catalog has no definition with this id.
    #[error("unknown effect '{0}'")]
    UnknownEffect(EffectId),

    /// A modifier names a custom calculator that is not registered.
    #[error("unknown magnitude calculator '{0}'")]
    UnknownCalculator(String),

    /// The handle's target or effect no longer resolves.
    #[error("active effect handle {0} is stale")]
    StaleHandle(ActiveEffectHandle),
}

impl EffectError {
    pub fn invalid_spec(effect: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            effect: effect.into(),
            reason: reason.into(),
        }
    }
}

impl StatsError for EffectError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidTarget { .. } => ErrorSeverity::Validation,
            Self::InvalidSpecification { .. } => ErrorSeverity::Validation,
            Self::UnknownEffect(_) => ErrorSeverity::Validation,
            Self::UnknownCalculator(_) => ErrorSeverity::Validation,
            Self::StaleHandle(_) => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTarget { .. } => "EFFECT_INVALID_TARGET",
            Self::InvalidSpecification { .. } => "EFFECT_INVALID_SPECIFICATION",
            Self::UnknownEffect(_) => "EFFECT_UNKNOWN_EFFECT",
            Self::UnknownCalculator(_) => "EFFECT_UNKNOWN_CALCULATOR",
            Self::StaleHandle(_) => "EFFECT_STALE_HANDLE",
        }
    }
}

/// Problems found in an effect source's rows when it is built.
///
/// These degrade or skip the offending row; the source stays usable.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("source '{source_name}' row {row} has no effect class")]
    MissingEffectClass { source_name: String, row: usize },

    #[error("source '{source_name}' row {row} names unknown effect '{effect}'")]
    UnknownEffectClass {
        source_name: String,
        row: usize,
        effect: EffectId,
    },

    /// Several rows share one Infinite effect class. Kept, because removal
    /// through the single tracked handle still behaves predictably.
    #[error("source '{source_name}' lists Infinite effect '{effect}' in rows {rows:?}")]
    DuplicateInfinite {
        source_name: String,
        effect: EffectId,
        rows: Vec<usize>,
    },
}

impl StatsError for ConfigurationError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MissingEffectClass { .. } | Self::UnknownEffectClass { .. } => {
                ErrorSeverity::Validation
            }
            Self::DuplicateInfinite { .. } => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingEffectClass { .. } => "CONFIG_MISSING_EFFECT_CLASS",
            Self::UnknownEffectClass { .. } => "CONFIG_UNKNOWN_EFFECT_CLASS",
            Self::DuplicateInfinite { .. } => "CONFIG_DUPLICATE_INFINITE",
        }
    }
}
