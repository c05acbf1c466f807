//! Effects: authored definitions, leveled specifications and the active
//! instances an entity currently holds.
//!
//! ```text
//! EffectDefinition ──(level, context, calculators)──▶ EffectSpec ──apply──▶ ActiveEffect
//!     (static)                                         (per call)          (Duration/Infinite)
//! ```

mod active;
mod definition;
mod spec;

pub use active::{ActiveEffect, ActiveEffectHandle, ActiveEffects, HandleAllocator, StacksToRemove};
pub use definition::{
    AttributeBasedFloat, DurationPolicy, EffectCatalog, EffectDefinition, EffectId, Magnitude,
    ModifierDef, ModifierOp, ScalableFloat, StackingPolicy,
};
pub use spec::{EffectContext, EffectSpec, ResolvedMagnitude, SpecModifier};
