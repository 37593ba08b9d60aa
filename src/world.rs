//! Self-contained stat world.
//!
//! [`StatsWorld`] bundles an [`OwnerRegistry`], a [`StatsEngine`] and
//! [`StatEventBuffers`] behind one handle-based API, for hosts that do not
//! bring their own owner storage.

use crate::config::StatsConfig;
use crate::engine::StatsEngine;
use crate::error::ModifierRejected;
use crate::events::StatEventBuffers;
use crate::graph::ObserverGraph;
use crate::handle::{OwnerKey, StatHandle, StatModifierHandle};
use crate::modifier::StatModifierValue;
use crate::stat::{ModifierTriggerEvent, Stat, StatChangeEvent, StatValues};
use crate::storage::{OwnerRegistry, StatReader, StatsStorage};

/// Owners, stats and modifiers with propagation built in.
///
/// Change events from every operation accumulate until
/// [`take_change_events`](Self::take_change_events) drains them.
///
/// # Examples
///
/// ```rust
/// use statgraph::modifier::BasicModifier;
/// use statgraph::StatsWorld;
///
/// let mut world = StatsWorld::<BasicModifier>::new();
/// let owner = world.create_owner();
/// let health = world.create_stat(owner, 100.0, true).unwrap();
/// let armor = world.create_stat(owner, 0.0, true).unwrap();
///
/// world
///     .add_stat_modifier(armor, BasicModifier::SetFromStat { stat: health, factor: 0.1 })
///     .unwrap();
/// assert_eq!(world.stat_value(armor), Some(10.0));
///
/// world.take_change_events();
/// world.try_set_stat_base_value(health, 200.0);
/// assert_eq!(world.stat_value(armor), Some(20.0));
/// assert_eq!(world.take_change_events().len(), 2);
/// ```
pub struct StatsWorld<M: StatModifierValue> {
    storage: OwnerRegistry<M>,
    engine: StatsEngine<M>,
    events: StatEventBuffers,
}

impl<M: StatModifierValue> StatsWorld<M> {
    /// Create an empty world with default capacities.
    pub fn new() -> Self {
        Self::with_config(StatsConfig::default())
    }

    /// Create an empty world sized from `config`.
    pub fn with_config(config: StatsConfig) -> Self {
        Self {
            engine: StatsEngine::with_config(&config),
            storage: OwnerRegistry::with_config(config),
            events: StatEventBuffers::new(),
        }
    }

    /// Create an owner with empty buffers.
    pub fn create_owner(&mut self) -> OwnerKey {
        self.storage.create_owner()
    }

    /// Destroy an owner, detaching it from stats on other owners.
    pub fn destroy_owner(&mut self, owner: OwnerKey) -> bool {
        self.engine
            .destroy_owner(&mut self.storage, owner, &mut self.events)
    }

    /// `true` if `owner` is live.
    pub fn contains_owner(&self, owner: OwnerKey) -> bool {
        self.storage.contains_owner(owner)
    }

    /// Append a stat to `owner`. `None` if the owner is not live.
    pub fn create_stat(
        &mut self,
        owner: OwnerKey,
        base_value: f32,
        produce_change_events: bool,
    ) -> Option<StatHandle> {
        self.engine
            .create_stat(&mut self.storage, owner, base_value, produce_change_events)
    }

    /// Attach a modifier to `stat`. See [`StatsEngine::add_stat_modifier`].
    pub fn add_stat_modifier(
        &mut self,
        stat: StatHandle,
        modifier: M,
    ) -> Result<StatModifierHandle, ModifierRejected> {
        self.engine
            .add_stat_modifier(&mut self.storage, stat, modifier, &mut self.events)
    }

    /// Detach a modifier. `false` if it does not exist.
    pub fn remove_stat_modifier(&mut self, modifier: StatModifierHandle) -> bool {
        self.engine
            .remove_stat_modifier(&mut self.storage, modifier, &mut self.events)
    }

    /// Detach every modifier of `stat`, returning how many were removed.
    pub fn remove_all_stat_modifiers(&mut self, stat: StatHandle) -> usize {
        self.engine
            .remove_all_stat_modifiers(&mut self.storage, stat, &mut self.events)
    }

    pub fn try_set_stat_base_value(&mut self, stat: StatHandle, base_value: f32) -> bool {
        self.engine
            .try_set_stat_base_value(&mut self.storage, stat, base_value, &mut self.events)
    }

    pub fn try_add_stat_base_value(&mut self, stat: StatHandle, amount: f32) -> bool {
        self.engine
            .try_add_stat_base_value(&mut self.storage, stat, amount, &mut self.events)
    }

    pub fn try_multiply_stat_base_value(&mut self, stat: StatHandle, factor: f32) -> bool {
        self.engine
            .try_multiply_stat_base_value(&mut self.storage, stat, factor, &mut self.events)
    }

    /// Set a base value without recomputing until [`update_dirty_stats`](Self::update_dirty_stats).
    pub fn try_set_stat_base_value_deferred(&mut self, stat: StatHandle, base_value: f32) -> bool {
        self.engine
            .try_set_stat_base_value_deferred(&mut self.storage, stat, base_value)
    }

    /// Add to a base value without recomputing until [`update_dirty_stats`](Self::update_dirty_stats).
    pub fn try_add_stat_base_value_deferred(&mut self, stat: StatHandle, amount: f32) -> bool {
        self.engine
            .try_add_stat_base_value_deferred(&mut self.storage, stat, amount)
    }

    /// Queue `stat` for the next [`update_dirty_stats`](Self::update_dirty_stats).
    pub fn mark_dirty(&mut self, stat: StatHandle) {
        self.engine.mark_dirty(stat);
    }

    /// Recompute everything changed through the deferred setters.
    pub fn update_dirty_stats(&mut self) -> usize {
        self.engine
            .update_dirty_stats(&mut self.storage, &mut self.events)
    }

    pub fn try_set_produce_change_events(&mut self, stat: StatHandle, produce: bool) -> bool {
        self.engine
            .try_set_produce_change_events(&mut self.storage, stat, produce)
    }

    /// A copy of the stat behind `stat`.
    pub fn try_get_stat(&self, stat: StatHandle) -> Option<Stat> {
        self.storage.try_get_stat(stat).copied()
    }

    pub fn try_get_stat_values(&self, stat: StatHandle) -> Option<StatValues> {
        self.storage.try_get_stat_values(stat)
    }

    /// Current value of `stat`.
    pub fn stat_value(&self, stat: StatHandle) -> Option<f32> {
        self.storage.try_get_stat(stat).map(Stat::value)
    }

    /// The modifier behind `modifier`.
    pub fn try_get_stat_modifier(&self, modifier: StatModifierHandle) -> Option<&M> {
        let stat = modifier.affected_stat;
        self.storage
            .owner(stat.owner)?
            .modifier(stat.index, modifier.modifier_id)
    }

    /// Append handles to every modifier of `stat`, in application order.
    pub fn stat_modifiers(&self, stat: StatHandle, out: &mut Vec<StatModifierHandle>) {
        if let Some(owner) = self.storage.owner(stat.owner) {
            out.extend(
                owner
                    .modifiers_of(stat.index)
                    .map(|entry| StatModifierHandle::new(stat, entry.id)),
            );
        }
    }

    /// Append every observer entry of `stat`, duplicates included.
    pub fn stat_observers(&self, stat: StatHandle, out: &mut Vec<StatHandle>) {
        if let Some(owner) = self.storage.owner(stat.owner) {
            out.extend(owner.observers_of(stat.index).map(|entry| entry.observer));
        }
    }

    /// Drain recorded change events.
    pub fn take_change_events(&mut self) -> Vec<StatChangeEvent> {
        std::mem::take(&mut self.events.change_events)
    }

    /// Drain recorded modifier trigger events.
    pub fn take_trigger_events(&mut self) -> Vec<ModifierTriggerEvent> {
        std::mem::take(&mut self.events.trigger_events)
    }

    /// Start or stop recording modifier trigger events.
    pub fn set_trigger_events_enabled(&mut self, enabled: bool) {
        self.events.record_triggers = enabled;
    }

    /// Snapshot of every observer edge in the world.
    pub fn observer_graph(&self) -> ObserverGraph {
        ObserverGraph::from_storage(&self.storage, &self.storage.owner_keys())
    }

    /// The underlying owner storage.
    pub fn storage(&self) -> &OwnerRegistry<M> {
        &self.storage
    }

    /// Check every owner's buffers.
    ///
    /// # Panics
    ///
    /// Panics if any buffer is corrupted.
    pub fn debug_validate_invariants(&self) {
        for key in self.storage.owner_keys() {
            if let Some(owner) = self.storage.owner(key) {
                owner.debug_validate_invariants();
            }
        }
    }
}

impl<M: StatModifierValue> Default for StatsWorld<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::BasicModifier;

    #[test]
    fn test_modifier_lookup() {
        let mut world = StatsWorld::<BasicModifier>::new();
        let owner = world.create_owner();
        let stat = world.create_stat(owner, 1.0, false).unwrap();
        let first = world.add_stat_modifier(stat, BasicModifier::Add(2.0)).unwrap();
        let second = world.add_stat_modifier(stat, BasicModifier::Multiply(3.0)).unwrap();

        assert_eq!(world.try_get_stat_modifier(second), Some(&BasicModifier::Multiply(3.0)));

        let mut handles = Vec::new();
        world.stat_modifiers(stat, &mut handles);
        assert_eq!(handles, vec![first, second]);

        world.remove_stat_modifier(first);
        assert!(world.try_get_stat_modifier(first).is_none());
        assert_eq!(world.stat_value(stat), Some(3.0));
    }

    #[test]
    fn test_trigger_events_toggle() {
        let mut world = StatsWorld::<BasicModifier>::new();
        let owner = world.create_owner();
        let stat = world.create_stat(owner, 1.0, false).unwrap();
        world.add_stat_modifier(stat, BasicModifier::Add(1.0)).unwrap();
        assert!(world.take_trigger_events().is_empty());

        world.set_trigger_events_enabled(true);
        world.try_add_stat_base_value(stat, 1.0);
        let triggers = world.take_trigger_events();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].base_value, 2.0);
        assert_eq!(world.stat_value(stat), Some(3.0));
    }

    #[test]
    fn test_produce_change_events_toggle() {
        let mut world = StatsWorld::<BasicModifier>::new();
        let owner = world.create_owner();
        let stat = world.create_stat(owner, 1.0, false).unwrap();
        world.try_set_stat_base_value(stat, 2.0);
        assert!(world.take_change_events().is_empty());

        assert!(world.try_set_produce_change_events(stat, true));
        world.try_multiply_stat_base_value(stat, 4.0);
        let events = world.take_change_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].delta(), 6.0);
    }
}
