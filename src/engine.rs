//! Dependency engine.
//!
//! [`StatsEngine`] implements every operation that changes stats:
//! creating them, attaching and detaching modifiers, changing base values
//! and propagating the results.
//!
//! ## Propagation
//!
//! Recompute runs a FIFO worklist seeded with the changed stat. Each popped
//! stat is re-evaluated from its base value and modifiers. When its value
//! changes bit-for-bit, every observer not already queued is appended.
//! The worklist drains because modifiers that would close a loop are
//! refused when they are added; recompute itself never checks for cycles.
//!
//! ## Scratch state
//!
//! The engine owns the worklist, the queued/visited set and the
//! observed-stat buffer and reuses them across calls. Every top-level
//! operation clears what it uses before starting.

use crate::config::StatsConfig;
use crate::error::ModifierRejected;
use crate::events::StatEventSink;
use crate::handle::{OwnerKey, StatHandle, StatModifierHandle};
use crate::modifier::{ModifierStack, StatModifierValue};
use crate::stat::{ModifierTriggerEvent, Stat, StatChangeEvent, StatModifier, StatObserver};
use crate::storage::StatsStorage;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, trace};

/// Runs stat operations against a [`StatsStorage`].
///
/// The engine holds no stat data, only reusable scratch lists and the set
/// of stats waiting for a deferred update. One engine can serve any number
/// of storages, but calls must not interleave.
///
/// # Examples
///
/// ```rust
/// use statgraph::modifier::BasicModifier;
/// use statgraph::storage::{OwnerRegistry, StatsStorage};
/// use statgraph::StatsEngine;
///
/// let mut storage = OwnerRegistry::<BasicModifier>::new();
/// let mut engine = StatsEngine::new();
/// let owner = storage.create_owner();
///
/// let strength = engine.create_stat(&mut storage, owner, 10.0, false).unwrap();
/// let attack = engine.create_stat(&mut storage, owner, 50.0, false).unwrap();
/// engine
///     .add_stat_modifier(
///         &mut storage,
///         attack,
///         BasicModifier::AddFromStat { stat: strength, factor: 2.0 },
///         &mut (),
///     )
///     .unwrap();
/// assert_eq!(storage.try_get_stat(attack).unwrap().value(), 70.0);
///
/// engine.try_set_stat_base_value(&mut storage, strength, 20.0, &mut ());
/// assert_eq!(storage.try_get_stat(attack).unwrap().value(), 90.0);
/// ```
pub struct StatsEngine<M: StatModifierValue> {
    worklist: VecDeque<StatHandle>,
    queued: HashSet<StatHandle>,
    observed: Vec<StatHandle>,
    dirty: Vec<StatHandle>,
    dirty_set: HashSet<StatHandle>,
    stack: M::Stack,
}

impl<M: StatModifierValue> StatsEngine<M> {
    /// Create an engine with default scratch capacities.
    pub fn new() -> Self {
        Self::with_config(&StatsConfig::default())
    }

    /// Create an engine with scratch capacities from `config`.
    pub fn with_config(config: &StatsConfig) -> Self {
        let capacity = config.worklist_capacity;
        Self {
            worklist: VecDeque::with_capacity(capacity),
            queued: HashSet::with_capacity(capacity),
            observed: Vec::with_capacity(capacity),
            dirty: Vec::with_capacity(capacity),
            dirty_set: HashSet::with_capacity(capacity),
            stack: M::Stack::default(),
        }
    }

    /// Append a stat to `owner` with `value == base_value` and no modifiers.
    ///
    /// Returns `None` if `owner` has no buffers.
    pub fn create_stat<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        owner: OwnerKey,
        base_value: f32,
        produce_change_events: bool,
    ) -> Option<StatHandle> {
        let index = storage
            .owner_mut(owner)?
            .push_stat(base_value, produce_change_events)?;
        Some(StatHandle::new(owner, index))
    }

    /// Set the base value and recompute. `false` if the stat does not exist.
    pub fn try_set_stat_base_value<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        stat: StatHandle,
        base_value: f32,
        sink: &mut impl StatEventSink,
    ) -> bool {
        self.update_base_value(storage, stat, sink, |_| base_value)
    }

    /// Add to the base value and recompute. `false` if the stat does not exist.
    pub fn try_add_stat_base_value<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        stat: StatHandle,
        amount: f32,
        sink: &mut impl StatEventSink,
    ) -> bool {
        self.update_base_value(storage, stat, sink, |base| base + amount)
    }

    /// Multiply the base value and recompute. `false` if the stat does not exist.
    pub fn try_multiply_stat_base_value<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        stat: StatHandle,
        factor: f32,
        sink: &mut impl StatEventSink,
    ) -> bool {
        self.update_base_value(storage, stat, sink, |base| base * factor)
    }

    /// Set the base value and queue the stat for [`update_dirty_stats`](Self::update_dirty_stats).
    pub fn try_set_stat_base_value_deferred<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        stat: StatHandle,
        base_value: f32,
    ) -> bool {
        if !write_base_value(storage, stat, |_| base_value) {
            return false;
        }
        self.mark_dirty(stat);
        true
    }

    /// Add to the base value and queue the stat for [`update_dirty_stats`](Self::update_dirty_stats).
    pub fn try_add_stat_base_value_deferred<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        stat: StatHandle,
        amount: f32,
    ) -> bool {
        if !write_base_value(storage, stat, |base| base + amount) {
            return false;
        }
        self.mark_dirty(stat);
        true
    }

    /// Queue `stat` for the next [`update_dirty_stats`](Self::update_dirty_stats).
    pub fn mark_dirty(&mut self, stat: StatHandle) {
        if self.dirty_set.insert(stat) {
            self.dirty.push(stat);
        }
    }

    /// Number of stats waiting for a deferred update.
    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Recompute every dirty stat and its observers in one pass.
    ///
    /// Returns the number of stat evaluations performed.
    pub fn update_dirty_stats<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        sink: &mut impl StatEventSink,
    ) -> usize {
        self.worklist.clear();
        self.queued.clear();
        for stat in self.dirty.drain(..) {
            if self.queued.insert(stat) {
                self.worklist.push_back(stat);
            }
        }
        self.dirty_set.clear();
        self.run_worklist(storage, sink)
    }

    /// Enable or disable change events for a stat. `false` if it does not exist.
    pub fn try_set_produce_change_events<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        stat: StatHandle,
        produce_change_events: bool,
    ) -> bool {
        match stat_mut(storage, stat) {
            Some(stat) => {
                stat.produce_change_events = produce_change_events;
                true
            }
            None => false,
        }
    }

    /// Attach `modifier` to `affected` and recompute it.
    ///
    /// The modifier is appended after the stat's existing modifiers, and an
    /// observer entry pointing at `affected` is added to every stat it reads.
    ///
    /// # Errors
    ///
    /// - [`ModifierRejected::InvalidStat`] if `affected` or a read stat does not exist.
    /// - [`ModifierRejected::SelfObservation`] if the modifier reads `affected`.
    /// - [`ModifierRejected::WouldCreateCycle`] if a read stat already
    ///   depends on `affected`.
    pub fn add_stat_modifier<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        affected: StatHandle,
        modifier: M,
        sink: &mut impl StatEventSink,
    ) -> Result<StatModifierHandle, ModifierRejected> {
        if let Err(rejection) = self.check_modifier(&*storage, affected, &modifier) {
            debug!(stat = %affected, %rejection, "modifier rejected");
            return Err(rejection);
        }

        let owner = storage
            .owner_mut(affected.owner)
            .ok_or(ModifierRejected::InvalidStat(affected))?;
        let id = owner.next_modifier_id();
        let stat = owner
            .stats
            .get_mut(affected.index as usize)
            .ok_or(ModifierRejected::InvalidStat(affected))?;
        owner
            .modifiers
            .add(&mut stat.modifiers, StatModifier { id, modifier });

        for &observed in &self.observed {
            push_observer(storage, observed, affected);
        }

        self.recompute(storage, affected, sink);
        Ok(StatModifierHandle::new(affected, id))
    }

    /// Detach a modifier and its observer entries, then recompute the stat.
    ///
    /// Returns `false` if the modifier does not exist.
    pub fn remove_stat_modifier<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        handle: StatModifierHandle,
        sink: &mut impl StatEventSink,
    ) -> bool {
        if !self.detach_modifier(storage, handle) {
            return false;
        }
        self.recompute(storage, handle.affected_stat, sink);
        true
    }

    /// Detach every modifier of `stat` and recompute it once.
    ///
    /// Returns the number of modifiers removed.
    pub fn remove_all_stat_modifiers<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        stat: StatHandle,
        sink: &mut impl StatEventSink,
    ) -> usize {
        let ids: Vec<u32> = match storage.owner(stat.owner) {
            Some(owner) => owner.modifiers_of(stat.index).map(|entry| entry.id).collect(),
            None => return 0,
        };
        let removed = ids
            .into_iter()
            .filter(|id| self.detach_modifier(storage, StatModifierHandle::new(stat, *id)))
            .count();
        if removed > 0 {
            self.recompute(storage, stat, sink);
        }
        removed
    }

    /// Recompute `stat` and everything that transitively observes it.
    ///
    /// Returns the number of stat evaluations performed. Stale handles met
    /// along the way are skipped.
    pub fn recompute<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        stat: StatHandle,
        sink: &mut impl StatEventSink,
    ) -> usize {
        self.worklist.clear();
        self.queued.clear();
        self.queued.insert(stat);
        self.worklist.push_back(stat);
        self.run_worklist(storage, sink)
    }

    /// Remove an owner and everything pointing into it.
    ///
    /// Observer entries the owner's modifiers left on other owners are
    /// removed first. Stats on other owners that observed the removed stats
    /// are then recomputed; their modifiers now read a stale handle.
    ///
    /// Returns `false` if the owner has no buffers.
    pub fn destroy_owner<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        owner: OwnerKey,
        sink: &mut impl StatEventSink,
    ) -> bool {
        let Some(buffers) = storage.remove_owner(owner) else {
            return false;
        };

        for (index, stat) in buffers.stats.iter().enumerate() {
            let handle = StatHandle::new(owner, index as u32);
            for (_, entry) in buffers.modifiers.iter(&stat.modifiers) {
                self.observed.clear();
                entry.modifier.observed_stats(&mut self.observed);
                for &observed in self.observed.iter().filter(|h| h.owner != owner) {
                    remove_observer(storage, observed, handle);
                }
            }
        }

        self.worklist.clear();
        self.queued.clear();
        for stat in &buffers.stats {
            for entry in buffers.observers.iter(&stat.observers) {
                if entry.observer.owner != owner && self.queued.insert(entry.observer) {
                    self.worklist.push_back(entry.observer);
                }
            }
        }
        debug!(
            %owner,
            stats = buffers.stats.len(),
            dependants = self.worklist.len(),
            "destroyed stat owner"
        );
        self.run_worklist(storage, sink);
        true
    }

    /// Validate a modifier before anything is written.
    fn check_modifier<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &S,
        affected: StatHandle,
        modifier: &M,
    ) -> Result<(), ModifierRejected> {
        if !storage.stat_exists(affected) {
            return Err(ModifierRejected::InvalidStat(affected));
        }
        self.observed.clear();
        modifier.observed_stats(&mut self.observed);
        for &observed in &self.observed {
            if observed == affected {
                return Err(ModifierRejected::SelfObservation(affected));
            }
            if !storage.stat_exists(observed) {
                return Err(ModifierRejected::InvalidStat(observed));
            }
        }
        match self.find_cycle(storage, affected) {
            Some(observed) => Err(ModifierRejected::WouldCreateCycle { affected, observed }),
            None => Ok(()),
        }
    }

    /// Breadth-first walk over the observers of `affected`, with the edges
    /// the pending modifier would add already in place.
    ///
    /// Visiting a stat in `self.observed` follows its simulated edge back to
    /// `affected`; reaching `affected` means the modifier closes a loop. The
    /// read stat that closed it is returned.
    fn find_cycle<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &S,
        affected: StatHandle,
    ) -> Option<StatHandle> {
        self.worklist.clear();
        self.queued.clear();
        let mut closing = None;

        enqueue_observers(storage, affected, &mut self.worklist, &mut self.queued);
        while let Some(current) = self.worklist.pop_front() {
            if current == affected {
                return closing;
            }
            if closing.is_none() && self.observed.contains(&current) && self.queued.insert(affected)
            {
                closing = Some(current);
                self.worklist.push_back(affected);
            }
            enqueue_observers(storage, current, &mut self.worklist, &mut self.queued);
        }
        None
    }

    /// Remove a modifier and its observer entries without recomputing.
    fn detach_modifier<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        handle: StatModifierHandle,
    ) -> bool {
        let Some(removed) = take_modifier(storage, handle) else {
            return false;
        };
        self.observed.clear();
        removed.modifier.observed_stats(&mut self.observed);
        for &observed in &self.observed {
            if !remove_observer(storage, observed, handle.affected_stat) {
                trace!(%observed, "observed stat already gone while removing modifier");
            }
        }
        true
    }

    fn update_base_value<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        stat: StatHandle,
        sink: &mut impl StatEventSink,
        update: impl FnOnce(f32) -> f32,
    ) -> bool {
        if !write_base_value(storage, stat, update) {
            return false;
        }
        self.recompute(storage, stat, sink);
        true
    }

    fn run_worklist<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &mut S,
        sink: &mut impl StatEventSink,
    ) -> usize {
        let mut evaluated = 0;
        while let Some(handle) = self.worklist.pop_front() {
            self.queued.remove(&handle);
            let Some(previous) = storage.try_get_stat(handle).copied() else {
                trace!(stat = %handle, "skipping stale stat");
                continue;
            };

            let value = self.evaluate(&*storage, handle, &previous, sink);
            evaluated += 1;
            if value.to_bits() == previous.value.to_bits() {
                continue;
            }

            let Some(stat) = stat_mut(storage, handle) else {
                continue;
            };
            stat.value = value;
            let current = *stat;
            trace!(stat = %handle, from = previous.value, to = value, "stat changed");

            if current.produce_change_events {
                sink.on_stat_changed(StatChangeEvent {
                    stat: handle,
                    previous,
                    current,
                });
            }
            enqueue_observers(&*storage, handle, &mut self.worklist, &mut self.queued);
        }
        evaluated
    }

    fn evaluate<S: StatsStorage<Modifier = M>>(
        &mut self,
        storage: &S,
        handle: StatHandle,
        stat: &Stat,
        sink: &mut impl StatEventSink,
    ) -> f32 {
        self.stack.reset(stat.base_value);
        if let Some(owner) = storage.owner(handle.owner) {
            for (_, entry) in owner.modifiers.iter(&stat.modifiers) {
                entry.modifier.apply(storage, &mut self.stack);
                sink.on_modifier_triggered(ModifierTriggerEvent {
                    modifier: StatModifierHandle::new(handle, entry.id),
                    base_value: stat.base_value,
                });
            }
        }
        self.stack.finalize()
    }
}

impl<M: StatModifierValue> Default for StatsEngine<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn stat_mut<S: StatsStorage>(storage: &mut S, stat: StatHandle) -> Option<&mut Stat> {
    storage.owner_mut(stat.owner)?.stats.get_mut(stat.index as usize)
}

fn write_base_value<S: StatsStorage>(
    storage: &mut S,
    stat: StatHandle,
    update: impl FnOnce(f32) -> f32,
) -> bool {
    match stat_mut(storage, stat) {
        Some(stat) => {
            stat.base_value = update(stat.base_value);
            true
        }
        None => false,
    }
}

fn enqueue_observers<S: StatsStorage>(
    storage: &S,
    stat: StatHandle,
    worklist: &mut VecDeque<StatHandle>,
    queued: &mut HashSet<StatHandle>,
) {
    let Some(owner) = storage.owner(stat.owner) else {
        return;
    };
    for entry in owner.observers_of(stat.index) {
        if queued.insert(entry.observer) {
            worklist.push_back(entry.observer);
        }
    }
}

fn push_observer<S: StatsStorage>(storage: &mut S, observed: StatHandle, observer: StatHandle) {
    let Some(owner) = storage.owner_mut(observed.owner) else {
        return;
    };
    if let Some(stat) = owner.stats.get_mut(observed.index as usize) {
        owner
            .observers
            .add(&mut stat.observers, StatObserver { observer });
    }
}

/// Remove the first observer entry on `observed` that points at `observer`.
fn remove_observer<S: StatsStorage>(storage: &mut S, observed: StatHandle, observer: StatHandle) -> bool {
    let Some(owner) = storage.owner_mut(observed.owner) else {
        return false;
    };
    let Some(stat) = owner.stats.get_mut(observed.index as usize) else {
        return false;
    };
    match owner
        .observers
        .position(&stat.observers, |entry| entry.observer == observer)
    {
        Some(index) => owner.observers.remove_at(&mut stat.observers, index).is_ok(),
        None => false,
    }
}

fn take_modifier<S: StatsStorage>(
    storage: &mut S,
    handle: StatModifierHandle,
) -> Option<StatModifier<S::Modifier>> {
    let affected = handle.affected_stat;
    let owner = storage.owner_mut(affected.owner)?;
    let stat = owner.stats.get_mut(affected.index as usize)?;
    let mut cursor = owner.modifiers.cursor(&stat.modifiers);
    while let Some(element) = cursor.next(&owner.modifiers) {
        let matches = owner
            .modifiers
            .get_element(element)
            .is_some_and(|entry| entry.id == handle.modifier_id);
        if matches {
            return cursor.remove_current(&mut owner.modifiers, &mut stat.modifiers);
        }
    }
    None
}
