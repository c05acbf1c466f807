//! Effect sources: objects that apply and remove effects on targets in
//! response to triggers (an area being entered or left, a pickup, a trap).
//!
//! A source is configured with rows. Each row names an effect class, the
//! trigger that applies it, the trigger that removes it, and what happens to
//! the source afterwards. Non-instant applications whose removal trigger is
//! not `Manual` are tracked by handle, so removal takes off exactly what this
//! source put on.
//!
//! ```text
//! on_trigger_enter(target)  ─▶ apply rows with application = OnEnter
//!                           ─▶ remove rows with removal    = OnEnter
//! on_trigger_exit(target)   ─▶ apply rows with application = OnExit
//!                           ─▶ remove rows with removal    = OnExit
//! ```

mod tracking;

pub use tracking::{TrackedEffect, TrackedEffects};

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::effect::{ActiveEffectHandle, EffectCatalog, EffectContext, EffectDefinition, EffectId, StacksToRemove};
use crate::error::{ConfigurationError, EffectError, StatsError};
use crate::magnitude::LevelProvider;
use crate::world::{EntityId, StatWorld};

/// Event that applies or removes a row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Trigger {
    OnEnter,
    OnExit,
    /// Only through explicit `apply_to_target` / `remove_from_target` calls.
    #[default]
    Manual,
}

/// One configured effect of a source.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EffectRow {
    pub effect: Option<EffectId>,
    pub application: Trigger,
    pub removal: Trigger,
    pub level: f32,
    pub stacks_to_remove: StacksToRemove,
    /// Destroy the source after a successful application.
    pub destroy_on_apply: bool,
    /// Destroy the source after a removal that took off at least one stack.
    pub destroy_on_removal: bool,
}

impl Default for EffectRow {
    fn default() -> Self {
        Self {
            effect: None,
            application: Trigger::Manual,
            removal: Trigger::Manual,
            level: 1.0,
            stacks_to_remove: StacksToRemove::All,
            destroy_on_apply: false,
            destroy_on_removal: false,
        }
    }
}

impl EffectRow {
    pub fn new(effect: impl Into<EffectId>) -> Self {
        Self {
            effect: Some(effect.into()),
            ..Self::default()
        }
    }

    pub fn applied_on(mut self, trigger: Trigger) -> Self {
        self.application = trigger;
        self
    }

    pub fn removed_on(mut self, trigger: Trigger) -> Self {
        self.removal = trigger;
        self
    }

    pub fn at_level(mut self, level: f32) -> Self {
        self.level = level;
        self
    }

    pub fn removing(mut self, stacks: StacksToRemove) -> Self {
        self.stacks_to_remove = stacks;
        self
    }

    pub fn destroying_on_apply(mut self) -> Self {
        self.destroy_on_apply = true;
        self
    }

    pub fn destroying_on_removal(mut self) -> Self {
        self.destroy_on_removal = true;
        self
    }
}

#[derive(Clone, Debug)]
struct ResolvedRow {
    row: EffectRow,
    /// `None` when the row's effect class is missing or unknown.
    definition: Option<Arc<EffectDefinition>>,
}

/// An object that applies effects on triggers and tracks what it applied.
#[derive(Debug)]
pub struct EffectSource {
    name: String,
    rows: Vec<ResolvedRow>,
    instigator: Option<EntityId>,
    source_object: Option<Arc<dyn LevelProvider>>,
    tracked: TrackedEffects,
    diagnostics: Vec<ConfigurationError>,
    destroyed: bool,
}

impl EffectSource {
    /// Resolves rows against `catalog`.
    ///
    /// Rows with a missing or unknown effect class are kept but skipped at
    /// trigger time. Several rows sharing one Infinite class are allowed.
    /// Every problem is logged and available from [`diagnostics`](Self::diagnostics).
    pub fn new(name: impl Into<String>, rows: Vec<EffectRow>, catalog: &EffectCatalog) -> Self {
        let name = name.into();
        let mut diagnostics = Vec::new();
        let mut infinite_rows: BTreeMap<EffectId, Vec<usize>> = BTreeMap::new();

        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| {
                let definition = match &row.effect {
                    None => {
                        diagnostics.push(ConfigurationError::MissingEffectClass {
                            source_name: name.clone(),
                            row: index,
                        });
                        None
                    }
                    Some(effect) => match catalog.get(effect) {
                        Some(definition) => {
                            if definition.duration.is_infinite() {
                                infinite_rows.entry(effect.clone()).or_default().push(index);
                            }
                            Some(Arc::clone(definition))
                        }
                        None => {
                            diagnostics.push(ConfigurationError::UnknownEffectClass {
                                source_name: name.clone(),
                                row: index,
                                effect: effect.clone(),
                            });
                            None
                        }
                    },
                };
                ResolvedRow { row, definition }
            })
            .collect();

        for (effect, rows) in infinite_rows {
            if rows.len() > 1 {
                diagnostics.push(ConfigurationError::DuplicateInfinite {
                    source_name: name.clone(),
                    effect,
                    rows,
                });
            }
        }

        for diagnostic in &diagnostics {
            warn!(
                target: "stats::source",
                code = diagnostic.error_code(),
                "{diagnostic}"
            );
        }

        Self {
            name,
            rows,
            instigator: None,
            source_object: None,
            tracked: TrackedEffects::new(),
            diagnostics,
            destroyed: false,
        }
    }

    /// Entity credited as the source of applied effects.
    pub fn with_instigator(mut self, instigator: EntityId) -> Self {
        self.instigator = Some(instigator);
        self
    }

    /// Level provider consulted by level-scaled magnitudes.
    pub fn with_source_object(mut self, source_object: Arc<dyn LevelProvider>) -> Self {
        self.source_object = Some(source_object);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> impl Iterator<Item = &EffectRow> {
        self.rows.iter().map(|resolved| &resolved.row)
    }

    pub fn diagnostics(&self) -> &[ConfigurationError] {
        &self.diagnostics
    }

    pub fn tracked(&self) -> &TrackedEffects {
        &self.tracked
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Marks the source destroyed and forgets its tracked handles. The
    /// effects themselves stay on their targets.
    pub fn destroy(&mut self) {
        if !self.destroyed {
            debug!(target: "stats::source", source = %self.name, "source destroyed");
        }
        self.destroyed = true;
        self.tracked.clear();
    }

    // ========================================================================
    // Triggers
    // ========================================================================

    pub fn on_trigger_enter(&mut self, world: &mut StatWorld, target: EntityId) {
        self.handle_trigger(world, target, Trigger::OnEnter);
    }

    pub fn on_trigger_exit(&mut self, world: &mut StatWorld, target: EntityId) {
        self.handle_trigger(world, target, Trigger::OnExit);
    }

    /// Applies matching rows, then removes matching rows. A failing row is
    /// logged and skipped; destroying the source stops further rows.
    fn handle_trigger(&mut self, world: &mut StatWorld, target: EntityId, trigger: Trigger) {
        for index in 0..self.rows.len() {
            if self.destroyed {
                return;
            }
            if self.rows[index].row.application != trigger {
                continue;
            }
            if let Err(err) = self.apply_to_target(world, target, index) {
                warn!(
                    target: "stats::source",
                    source = %self.name,
                    row = index,
                    %trigger,
                    code = err.error_code(),
                    "skipped row: {err}"
                );
            }
        }

        for index in 0..self.rows.len() {
            if self.destroyed {
                return;
            }
            if self.rows[index].row.removal == trigger {
                self.remove_from_target(world, target, index);
            }
        }
    }

    // ========================================================================
    // Rows
    // ========================================================================

    fn resolved(&self, row: usize) -> Result<(&EffectRow, Arc<EffectDefinition>), EffectError> {
        let resolved = self
            .rows
            .get(row)
            .ok_or_else(|| EffectError::invalid_spec(&self.name, format!("no row {row}")))?;
        match (&resolved.row.effect, &resolved.definition) {
            (_, Some(definition)) => Ok((&resolved.row, Arc::clone(definition))),
            (Some(effect), None) => Err(EffectError::UnknownEffect(effect.clone())),
            (None, None) => Err(EffectError::invalid_spec(
                &self.name,
                format!("row {row} has no effect class"),
            )),
        }
    }

    /// Applies one row's effect to `target`.
    ///
    /// Returns the handle of a non-instant application. A destroyed source
    /// applies nothing.
    pub fn apply_to_target(
        &mut self,
        world: &mut StatWorld,
        target: EntityId,
        row: usize,
    ) -> Result<Option<ActiveEffectHandle>, EffectError> {
        if self.destroyed {
            debug!(target: "stats::source", source = %self.name, row, "source destroyed; apply ignored");
            return Ok(None);
        }

        let (config, definition) = self.resolved(row)?;
        let config = config.clone();

        let mut context = EffectContext::new().with_causer(self.name.clone());
        if let Some(instigator) = self.instigator {
            context = context.with_instigator(instigator);
        }
        if let Some(source_object) = &self.source_object {
            context = context.with_source_object(Arc::clone(source_object));
        }

        let handle = world.apply_effect(Arc::clone(&definition), config.level, context, target)?;
        debug!(
            target: "stats::source",
            source = %self.name,
            effect = %definition.id,
            entity = %target,
            handle = ?handle,
            "applied row"
        );

        if let Some(handle) = handle {
            if config.removal != Trigger::Manual {
                self.tracked.track(
                    handle,
                    TrackedEffect {
                        target,
                        effect: definition.id.clone(),
                        stacks_to_remove: config.stacks_to_remove,
                        destroy_on_removal: config.destroy_on_removal,
                    },
                );
            }
        }

        if config.destroy_on_apply {
            self.destroy();
        }
        Ok(handle)
    }

    /// Removes what this source applied for one row's effect class on
    /// `target`, using the removal metadata recorded at application.
    ///
    /// Returns the number of stacks removed. Entries that no longer resolve
    /// are pruned without error.
    pub fn remove_from_target(&mut self, world: &mut StatWorld, target: EntityId, row: usize) -> u32 {
        if self.destroyed {
            return 0;
        }
        let Some(effect) = self.rows.get(row).and_then(|resolved| resolved.row.effect.clone()) else {
            return 0;
        };

        let mut removed = 0;
        let mut destroy_after = false;
        if world.is_alive(target) {
            for handle in self.tracked.matching(target, &effect) {
                let Some(entry) = self.tracked.get(handle) else {
                    continue;
                };
                let (stacks, destroy_on_removal) = (entry.stacks_to_remove, entry.destroy_on_removal);
                let count = world.remove_by_handle(handle, stacks);
                removed += count;
                destroy_after |= count > 0 && destroy_on_removal;
            }
        }

        let pruned = self.tracked.prune(world);
        debug!(
            target: "stats::source",
            source = %self.name,
            %effect,
            entity = %target,
            removed,
            pruned,
            "removed row"
        );

        if removed > 0 && destroy_after {
            self.destroy();
        }
        removed
    }

    /// Drops every tracked entry that no longer resolves.
    pub fn prune_stale(&mut self, world: &StatWorld) -> usize {
        self.tracked.prune(world)
    }
}
