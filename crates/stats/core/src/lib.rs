//! Attribute consistency engine for RPG stat blocks.
//!
//! `stats-core` keeps every entity's attributes inside their bounds while
//! effects modify them. Instant effects write base values; Duration and
//! Infinite effects contribute modifiers that are aggregated into current
//! values and removed exactly by handle. Paired attributes (Health and
//! MaxHealth, say) are clamped at fixed checkpoints so a current value never
//! exceeds its maximum, including after the maximum shrinks.
//!
//! All mutation flows through [`world::StatWorld`]; effect sources in
//! [`source`] drive it from gameplay triggers.
pub mod actor;
pub mod attribute;
pub mod config;
pub mod effect;
pub mod error;
pub mod hooks;
pub mod init;
pub mod magnitude;
pub mod source;
pub mod store;
pub mod tags;
pub mod world;

pub use actor::{ActorStats, StatsEnv};
pub use attribute::{Attribute, AttributeData, AttributeGroup, RoundingPolicy, VALUE_TOLERANCE};
pub use config::EngineConfig;
pub use effect::{
    ActiveEffect, ActiveEffectHandle, ActiveEffects, AttributeBasedFloat, DurationPolicy,
    EffectCatalog, EffectContext, EffectDefinition, EffectId, EffectSpec, HandleAllocator,
    Magnitude, ModifierDef, ModifierOp, ScalableFloat, StackingPolicy, StacksToRemove,
};
pub use error::{ConfigurationError, EffectError, ErrorSeverity, StatsError};
pub use hooks::{ClampEvent, ClampHook, DepletionTracker, ExecuteEvent, HookRegistry, MaxClampEvent};
pub use init::AttributeInitializer;
pub use magnitude::{
    AttributeCapture, CalculatorRegistry, CaptureReader, CaptureSide, LevelProvider,
    LinearCalculation, MagnitudeCalculator,
};
pub use source::{EffectRow, EffectSource, TrackedEffect, TrackedEffects, Trigger};
pub use store::{AttributeChange, AttributeStore, ChangeCallback, PairRegistry, SubscriptionToken};
pub use tags::{GameplayTag, TagContainer, TagRequirements};
pub use world::{EntityId, StatWorld};
