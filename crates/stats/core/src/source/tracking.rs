//! Handles an effect source applied and may later remove.

use std::collections::BTreeMap;

use crate::effect::{ActiveEffectHandle, EffectId, StacksToRemove};
use crate::world::{EntityId, StatWorld};

/// Removal metadata recorded for one applied handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedEffect {
    pub target: EntityId,
    pub effect: EffectId,
    pub stacks_to_remove: StacksToRemove,
    pub destroy_on_removal: bool,
}

/// `handle → tracked entry` for one source.
#[derive(Clone, Debug, Default)]
pub struct TrackedEffects {
    entries: BTreeMap<ActiveEffectHandle, TrackedEffect>,
}

impl TrackedEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records or refreshes an entry. Re-application that stacks onto an
    /// existing instance returns the same handle and overwrites its metadata.
    pub fn track(&mut self, handle: ActiveEffectHandle, entry: TrackedEffect) {
        self.entries.insert(handle, entry);
    }

    pub fn get(&self, handle: ActiveEffectHandle) -> Option<&TrackedEffect> {
        self.entries.get(&handle)
    }

    pub fn remove(&mut self, handle: ActiveEffectHandle) -> Option<TrackedEffect> {
        self.entries.remove(&handle)
    }

    /// Handles tracked for `(target, effect)`.
    pub fn matching(&self, target: EntityId, effect: &EffectId) -> Vec<ActiveEffectHandle> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.target == target && &entry.effect == effect)
            .map(|(handle, _)| *handle)
            .collect()
    }

    /// Drops entries whose handle no longer resolves in `world`. Returns the
    /// number pruned.
    pub fn prune(&mut self, world: &StatWorld) -> usize {
        let before = self.entries.len();
        self.entries.retain(|handle, entry| {
            let live = world.is_alive(entry.target) && world.has_active_effect(*handle);
            if !live {
                tracing::debug!(
                    target: "stats::source",
                    %handle,
                    entity = %entry.target,
                    effect = %entry.effect,
                    "pruned stale tracked effect"
                );
            }
            live
        });
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActiveEffectHandle, &TrackedEffect)> {
        self.entries.iter().map(|(handle, entry)| (*handle, entry))
    }
}
