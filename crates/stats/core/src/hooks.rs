//! Clamp hooks: reactions to the clamp checkpoints.
//!
//! Hooks observe clamp events after the store has been written. They receive
//! events by reference and cannot mutate the world; reactions that need to
//! change attributes (a death check applying a "dead" effect, say) record
//! what happened and let the caller act on it afterwards.

use std::sync::{Arc, Mutex, PoisonError};

use crate::attribute::Attribute;
use crate::effect::EffectId;
use crate::store::AttributeChange;
use crate::world::EntityId;

/// A paired current was cut down by its maximum during `pre_change`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClampEvent {
    pub entity: EntityId,
    pub current: Attribute,
    pub max: Attribute,
    pub old_value: f32,
    pub new_value: f32,
}

/// A maximum changed during an Instant/Periodic execution and the paired
/// current's base was pulled back under it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaxClampEvent {
    pub entity: EntityId,
    pub current: Attribute,
    pub max: Attribute,
    pub old_base: f32,
    pub new_base: f32,
}

/// An Instant or Periodic execution finished.
#[derive(Clone, Copy, Debug)]
pub struct ExecuteEvent<'a> {
    pub entity: EntityId,
    pub effect: &'a EffectId,
    /// Every current-value write made by the execution, in order.
    pub changes: &'a [AttributeChange],
}

/// Receiver of clamp checkpoint events.
///
/// Hooks are executed in priority order (lower values first).
pub trait ClampHook: Send + Sync {
    /// Returns the unique name of this hook.
    fn name(&self) -> &'static str;

    /// Returns the priority of this hook. Lower values execute first.
    fn priority(&self) -> i32 {
        0
    }

    fn on_current_clamped_by_max(&self, _event: &ClampEvent) {}

    fn on_max_changed_and_clamped(&self, _event: &MaxClampEvent) {}

    fn on_post_execute(&self, _event: &ExecuteEvent<'_>) {}
}

/// Priority-ordered set of clamp hooks.
#[derive(Clone)]
pub struct HookRegistry {
    hooks: Arc<[Arc<dyn ClampHook>]>,
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl HookRegistry {
    /// Creates a registry. Hooks are sorted by priority (stable for ties).
    pub fn new(mut hooks: Vec<Arc<dyn ClampHook>>) -> Self {
        hooks.sort_by_key(|hook| hook.priority());
        Self {
            hooks: hooks.into(),
        }
    }

    pub fn current_clamped_by_max(&self, event: &ClampEvent) {
        tracing::trace!(
            target: "stats::hooks",
            entity = %event.entity,
            current = %event.current,
            max = %event.max,
            new_value = event.new_value,
            "current clamped by max"
        );
        for hook in self.hooks.iter() {
            hook.on_current_clamped_by_max(event);
        }
    }

    pub fn max_changed_and_clamped(&self, event: &MaxClampEvent) {
        tracing::trace!(
            target: "stats::hooks",
            entity = %event.entity,
            current = %event.current,
            max = %event.max,
            old_base = event.old_base,
            new_base = event.new_base,
            "max changed, current base clamped"
        );
        for hook in self.hooks.iter() {
            hook.on_max_changed_and_clamped(event);
        }
    }

    pub fn post_execute(&self, event: &ExecuteEvent<'_>) {
        for hook in self.hooks.iter() {
            hook.on_post_execute(event);
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Hook names and priorities in execution order (for debugging).
    pub fn hooks(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        self.hooks.iter().map(|hook| (hook.name(), hook.priority()))
    }
}

impl core::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.hooks()).finish()
    }
}

/// Records entities whose watched attribute dropped to zero during an
/// Instant or Periodic execution.
#[derive(Debug)]
pub struct DepletionTracker {
    watched: Vec<Attribute>,
    depleted: Mutex<Vec<(EntityId, Attribute)>>,
}

impl DepletionTracker {
    pub fn new(watched: impl IntoIterator<Item = Attribute>) -> Self {
        Self {
            watched: watched.into_iter().collect(),
            depleted: Mutex::new(Vec::new()),
        }
    }

    /// Watches Health only.
    pub fn health() -> Self {
        Self::new([Attribute::Health])
    }

    /// Drains the recorded depletions.
    pub fn take(&self) -> Vec<(EntityId, Attribute)> {
        let mut depleted = self.depleted.lock().unwrap_or_else(PoisonError::into_inner);
        core::mem::take(&mut *depleted)
    }

    pub fn is_depleted(&self, entity: EntityId) -> bool {
        self.depleted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(recorded, _)| *recorded == entity)
    }
}

impl ClampHook for DepletionTracker {
    fn name(&self) -> &'static str {
        "depletion_tracker"
    }

    fn priority(&self) -> i32 {
        // Runs after hooks that might react to the same execution
        100
    }

    fn on_post_execute(&self, event: &ExecuteEvent<'_>) {
        let mut depleted = self.depleted.lock().unwrap_or_else(PoisonError::into_inner);
        for change in event.changes {
            if self.watched.contains(&change.attribute)
                && change.old_value > 0.0
                && change.new_value <= 0.0
            {
                tracing::debug!(
                    target: "stats::hooks",
                    entity = %event.entity,
                    attribute = %change.attribute,
                    effect = %event.effect,
                    "attribute depleted"
                );
                depleted.push((event.entity, change.attribute));
            }
        }
    }
}
