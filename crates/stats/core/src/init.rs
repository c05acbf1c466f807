//! Default attribute initialization.
//!
//! A fresh stat block is filled by three Instant effects applied to the
//! entity by itself: primary attributes first, then secondary attributes
//! derived from them, then vital values derived from the secondaries. The
//! order matters because each step captures what the previous step wrote.

use std::sync::Arc;

use tracing::debug;

use crate::effect::{EffectContext, EffectDefinition};
use crate::error::EffectError;
use crate::world::{EntityId, StatWorld};

/// The three initialization effects of a character archetype.
#[derive(Clone, Debug)]
pub struct AttributeInitializer {
    pub primary: Arc<EffectDefinition>,
    pub secondary: Arc<EffectDefinition>,
    pub vital: Arc<EffectDefinition>,
}

impl AttributeInitializer {
    /// Level every initialization effect is applied at.
    pub const LEVEL: f32 = 1.0;

    pub fn new(
        primary: Arc<EffectDefinition>,
        secondary: Arc<EffectDefinition>,
        vital: Arc<EffectDefinition>,
    ) -> Self {
        Self {
            primary,
            secondary,
            vital,
        }
    }

    /// Applies primary, secondary and vital effects to `entity` in that order.
    pub fn initialize(&self, world: &mut StatWorld, entity: EntityId) -> Result<(), EffectError> {
        debug_assert!(world.is_alive(entity), "initializing a missing entity {entity}");
        if !world.is_alive(entity) {
            return Err(EffectError::InvalidTarget { entity });
        }

        for definition in [&self.primary, &self.secondary, &self.vital] {
            let context = EffectContext::new().with_instigator(entity);
            world.apply_effect(Arc::clone(definition), Self::LEVEL, context, entity)?;
            debug!(%entity, effect = %definition.id, "applied initialization effect");
        }
        Ok(())
    }
}
