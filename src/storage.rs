//! Per-owner buffers and the host-facing storage interface.
//!
//! The engine never owns stat data. It works on whatever implements
//! [`StatsStorage`]: a host can back owners with its own entity storage,
//! or use the bundled [`OwnerRegistry`].

use crate::compact_list::CompactList;
use crate::config::StatsConfig;
use crate::handle::{OwnerKey, StatHandle};
use crate::linked_list::CompactLinkedList;
use crate::modifier::StatModifierValue;
use crate::pool::{FreeRangesPool, ObjectPool};
use crate::stat::{Stat, StatModifier, StatObserver, StatValues};

/// Read-only access to other stats, used by modifiers during recompute.
///
/// Reading never triggers a recompute.
pub trait StatReader {
    /// Values of `stat`, or `None` if it does not exist.
    fn try_get_stat_values(&self, stat: StatHandle) -> Option<StatValues>;
}

/// The stat, modifier and observer buffers belonging to one owner.
#[derive(Debug, Clone)]
pub struct OwnerStats<M> {
    pub(crate) stats: Vec<Stat>,
    pub(crate) modifiers: CompactLinkedList<StatModifier<M>>,
    pub(crate) observers: CompactList<StatObserver>,
    modifier_id_counter: u32,
    observer_list_capacity: usize,
}

impl<M> OwnerStats<M> {
    /// Empty buffers with default capacities.
    pub fn new() -> Self {
        Self::with_config(&StatsConfig::default())
    }

    /// Empty buffers sized from `config`.
    pub fn with_config(config: &StatsConfig) -> Self {
        Self {
            stats: Vec::with_capacity(config.stat_capacity),
            modifiers: CompactLinkedList::with_capacity(config.modifier_capacity),
            observers: CompactList::with_capacity(config.observer_capacity),
            modifier_id_counter: 0,
            observer_list_capacity: config.observer_list_capacity,
        }
    }

    /// Number of stats on this owner.
    pub fn stat_count(&self) -> usize {
        self.stats.len()
    }

    /// The stat at `index`.
    pub fn stat(&self, index: u32) -> Option<&Stat> {
        self.stats.get(index as usize)
    }

    /// All stats, by index.
    pub fn stats(&self) -> &[Stat] {
        &self.stats
    }

    /// Modifiers of the stat at `index`, in application order.
    pub fn modifiers_of(&self, index: u32) -> impl Iterator<Item = &StatModifier<M>> + '_ {
        self.stat(index)
            .map(|stat| self.modifiers.iter(&stat.modifiers))
            .into_iter()
            .flatten()
            .map(|(_, modifier)| modifier)
    }

    /// The modifier with `id` on the stat at `index`.
    pub fn modifier(&self, index: u32, id: u32) -> Option<&M> {
        self.modifiers_of(index)
            .find(|entry| entry.id == id)
            .map(|entry| &entry.modifier)
    }

    /// Observer entries recorded on the stat at `index`.
    pub fn observers_of(&self, index: u32) -> impl Iterator<Item = &StatObserver> + '_ {
        self.stat(index)
            .map(|stat| self.observers.iter(&stat.observers))
            .into_iter()
            .flatten()
    }

    /// Check the packed buffers against the stats that reference them.
    ///
    /// # Panics
    ///
    /// Panics if any buffer is corrupted.
    pub fn debug_validate_invariants(&self) {
        let modifier_lists: Vec<_> = self.stats.iter().map(|stat| stat.modifiers).collect();
        let observer_lists: Vec<_> = self.stats.iter().map(|stat| stat.observers).collect();
        self.modifiers.debug_validate_invariants(&modifier_lists);
        self.observers.debug_validate_invariants(&observer_lists);
    }

    pub(crate) fn push_stat(&mut self, base_value: f32, produce_change_events: bool) -> Option<u32> {
        let index = u32::try_from(self.stats.len()).ok()?;
        let observers = self.observers.create(self.observer_list_capacity);
        self.stats
            .push(Stat::new(base_value, observers, produce_change_events));
        Some(index)
    }

    pub(crate) fn next_modifier_id(&mut self) -> u32 {
        self.modifier_id_counter += 1;
        self.modifier_id_counter
    }
}

impl<M> Default for OwnerStats<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner buffer provider the engine runs against.
///
/// The engine resolves one owner at a time and never holds two owners
/// borrowed at once, so implementations need no interior locking.
pub trait StatsStorage {
    /// Modifier type stored in every owner's buffers.
    type Modifier: StatModifierValue;

    /// Buffers of `owner`, if it currently has them.
    fn owner(&self, owner: OwnerKey) -> Option<&OwnerStats<Self::Modifier>>;

    /// Mutable buffers of `owner`, if it currently has them.
    fn owner_mut(&mut self, owner: OwnerKey) -> Option<&mut OwnerStats<Self::Modifier>>;

    /// Detach and return the buffers of `owner`.
    fn remove_owner(&mut self, owner: OwnerKey) -> Option<OwnerStats<Self::Modifier>>;

    /// Keys of every owner that has buffers.
    fn owner_keys(&self) -> Vec<OwnerKey>;

    /// The stat behind `stat`, if it exists.
    fn try_get_stat(&self, stat: StatHandle) -> Option<&Stat> {
        self.owner(stat.owner)?.stat(stat.index)
    }

    /// `true` if `stat` names an existing stat.
    fn stat_exists(&self, stat: StatHandle) -> bool {
        self.try_get_stat(stat).is_some()
    }
}

impl<S: StatsStorage> StatReader for S {
    fn try_get_stat_values(&self, stat: StatHandle) -> Option<StatValues> {
        self.try_get_stat(stat).map(Stat::values)
    }
}

/// Bundled [`StatsStorage`] that keeps owners in a versioned pool.
///
/// Keys of destroyed owners go stale instead of aliasing new owners.
///
/// # Examples
///
/// ```rust
/// use statgraph::modifier::BasicModifier;
/// use statgraph::storage::{OwnerRegistry, StatsStorage};
///
/// let mut registry = OwnerRegistry::<BasicModifier>::new();
/// let owner = registry.create_owner();
/// assert!(registry.owner(owner).is_some());
///
/// registry.remove_owner(owner);
/// assert!(registry.owner(owner).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct OwnerRegistry<M, P = FreeRangesPool<OwnerStats<M>>> {
    pool: P,
    config: StatsConfig,
    _modifier: std::marker::PhantomData<M>,
}

impl<M> OwnerRegistry<M> {
    /// Registry backed by a [`FreeRangesPool`].
    pub fn new() -> Self {
        Self::with_config(StatsConfig::default())
    }

    /// Registry backed by a [`FreeRangesPool`], sizing new owners from `config`.
    pub fn with_config(config: StatsConfig) -> Self {
        Self::with_pool(FreeRangesPool::new(), config)
    }
}

impl<M> Default for OwnerRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M, P: ObjectPool<OwnerStats<M>>> OwnerRegistry<M, P> {
    /// Registry backed by a caller-chosen pool.
    pub fn with_pool(pool: P, config: StatsConfig) -> Self {
        Self {
            pool,
            config,
            _modifier: std::marker::PhantomData,
        }
    }

    /// Allocate empty buffers for a new owner.
    pub fn create_owner(&mut self) -> OwnerKey {
        let buffers = OwnerStats::with_config(&self.config);
        OwnerKey::new(self.pool.add_object(buffers))
    }

    /// `true` if `owner` is live.
    pub fn contains_owner(&self, owner: OwnerKey) -> bool {
        self.pool.contains(owner.pool_handle())
    }

    /// Number of live owners.
    pub fn owner_count(&self) -> usize {
        self.pool.len()
    }

    /// The configuration new owners are created with.
    pub fn config(&self) -> &StatsConfig {
        &self.config
    }
}

impl<M: StatModifierValue, P: ObjectPool<OwnerStats<M>>> StatsStorage for OwnerRegistry<M, P> {
    type Modifier = M;

    fn owner(&self, owner: OwnerKey) -> Option<&OwnerStats<M>> {
        self.pool.try_get_object(owner.pool_handle())
    }

    fn owner_mut(&mut self, owner: OwnerKey) -> Option<&mut OwnerStats<M>> {
        self.pool.try_get_object_mut(owner.pool_handle())
    }

    fn remove_owner(&mut self, owner: OwnerKey) -> Option<OwnerStats<M>> {
        self.pool.remove_object(owner.pool_handle())
    }

    fn owner_keys(&self) -> Vec<OwnerKey> {
        self.pool.handles().into_iter().map(OwnerKey::new).collect()
    }
}
