//! Versioned object pools.
//!
//! Both pools hand out [`PoolHandle`]s made of a slot index and a version.
//! A slot's stored version is `0` when it was never used, positive while it
//! holds an object and negative once that object was removed. Adding into a
//! slot sets `version = -stored + 1`, so live versions only ever grow and a
//! handle from an earlier occupant can never match again.
//!
//! - [`Pool`] finds a free slot with a linear scan from index 0.
//! - [`FreeRangesPool`] keeps a sorted list of free `(start, len)` ranges and
//!   allocates from the first one, coalescing neighbours on free.

use serde::{Deserialize, Serialize};

/// Handle to an object stored in a [`Pool`] or [`FreeRangesPool`].
///
/// # Examples
///
/// ```rust
/// use statgraph::pool::{ObjectPool, Pool};
///
/// let mut pool = Pool::new();
/// let handle = pool.add_object("sword");
/// assert_eq!(pool.try_get_object(handle), Some(&"sword"));
///
/// assert!(pool.try_remove_object(handle));
/// assert!(!pool.try_remove_object(handle));
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct PoolHandle {
    /// Slot index.
    pub index: u32,
    /// Version of the slot when the handle was issued.
    pub version: i32,
}

impl PoolHandle {
    /// Create a handle from raw parts.
    pub const fn new(index: u32, version: i32) -> Self {
        Self { index, version }
    }
}

impl std::fmt::Display for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.version)
    }
}

/// A contiguous run of free slots in a [`FreeRangesPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRange {
    /// First free slot.
    pub start: usize,
    /// Number of free slots.
    pub len: usize,
}

impl FreeRange {
    fn end(self) -> usize {
        self.start + self.len
    }
}

/// Common interface of the versioned pools.
pub trait ObjectPool<T> {
    /// Store `value` and return its handle.
    fn add_object(&mut self, value: T) -> PoolHandle;

    /// Borrow the object behind `handle`, or `None` if the handle is stale.
    fn try_get_object(&self, handle: PoolHandle) -> Option<&T>;

    /// Mutably borrow the object behind `handle`, or `None` if the handle is stale.
    fn try_get_object_mut(&mut self, handle: PoolHandle) -> Option<&mut T>;

    /// Remove and return the object behind `handle`.
    fn remove_object(&mut self, handle: PoolHandle) -> Option<T>;

    /// Remove the object behind `handle`, reporting whether anything was removed.
    fn try_remove_object(&mut self, handle: PoolHandle) -> bool {
        self.remove_object(handle).is_some()
    }

    /// `true` if `handle` refers to a live object.
    fn contains(&self, handle: PoolHandle) -> bool {
        self.try_get_object(handle).is_some()
    }

    /// Number of live objects.
    fn len(&self) -> usize;

    /// `true` if no object is live.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, live or not.
    fn slot_count(&self) -> usize;

    /// Grow or shrink the slot buffer to `slot_count` slots.
    ///
    /// # Panics
    ///
    /// Panics if shrinking would drop a live object.
    fn resize(&mut self, slot_count: usize);

    /// Handles of every live object, in slot order.
    fn handles(&self) -> Vec<PoolHandle>;
}

#[derive(Debug, Clone)]
struct PoolSlot<T> {
    version: i32,
    value: Option<T>,
}

impl<T> PoolSlot<T> {
    fn vacant() -> Self {
        Self {
            version: 0,
            value: None,
        }
    }

    fn is_free(&self) -> bool {
        self.version <= 0
    }

    fn matches(&self, handle: PoolHandle) -> bool {
        handle.version > 0 && self.version == handle.version
    }

    /// Occupy the slot and return the new version.
    fn occupy(&mut self, value: T) -> i32 {
        debug_assert!(self.is_free(), "occupying a live slot");
        self.version = -self.version + 1;
        self.value = Some(value);
        self.version
    }

    fn release(&mut self) -> Option<T> {
        self.version = -self.version;
        self.value.take()
    }
}

fn slot_index(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

/// Pool that finds free slots by scanning from index 0.
///
/// Allocation is O(slot count) but needs no auxiliary bookkeeping.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<PoolSlot<T>>,
    live: usize,
}

impl<T> Pool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty pool with `capacity` never-used slots.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self {
            slots: Vec::with_capacity(capacity),
            live: 0,
        };
        pool.resize(capacity);
        pool
    }

    /// Iterate over live objects with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (PoolHandle::new(slot_index(index), slot.version), value))
        })
    }

    /// Check that live counts and versions agree.
    ///
    /// # Panics
    ///
    /// Panics if the pool is corrupted.
    pub fn debug_validate_invariants(&self) {
        let live = self
            .slots
            .iter()
            .filter(|slot| {
                assert_eq!(slot.version > 0, slot.value.is_some(), "version/value mismatch");
                slot.version > 0
            })
            .count();
        assert_eq!(live, self.live, "live count mismatch");
    }

    fn slot(&self, handle: PoolHandle) -> Option<&PoolSlot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.matches(handle))
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObjectPool<T> for Pool<T> {
    fn add_object(&mut self, value: T) -> PoolHandle {
        let index = match self.slots.iter().position(PoolSlot::is_free) {
            Some(index) => index,
            None => {
                self.slots.push(PoolSlot::vacant());
                self.slots.len() - 1
            }
        };
        let version = self.slots[index].occupy(value);
        self.live += 1;
        PoolHandle::new(slot_index(index), version)
    }

    fn try_get_object(&self, handle: PoolHandle) -> Option<&T> {
        self.slot(handle).and_then(|slot| slot.value.as_ref())
    }

    fn try_get_object_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.matches(handle))
            .and_then(|slot| slot.value.as_mut())
    }

    fn remove_object(&mut self, handle: PoolHandle) -> Option<T> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.matches(handle))?;
        let value = slot.release();
        self.live -= 1;
        value
    }

    fn len(&self) -> usize {
        self.live
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn resize(&mut self, slot_count: usize) {
        if slot_count < self.slots.len() {
            assert!(
                self.slots[slot_count..].iter().all(PoolSlot::is_free),
                "cannot shrink pool below a live object"
            );
            self.slots.truncate(slot_count);
        } else {
            self.slots.resize_with(slot_count, PoolSlot::vacant);
        }
    }

    fn handles(&self) -> Vec<PoolHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

/// Pool that tracks free slots as sorted, coalesced ranges.
///
/// Allocation cost depends on the number of free ranges rather than the
/// slot count.
///
/// # Examples
///
/// ```rust
/// use statgraph::pool::{FreeRangesPool, ObjectPool};
///
/// let mut pool = FreeRangesPool::new();
/// let a = pool.add_object(1);
/// let b = pool.add_object(2);
/// let c = pool.add_object(3);
///
/// pool.remove_object(a);
/// pool.remove_object(b);
/// // Slots 0 and 1 were merged into one free range.
/// assert_eq!(pool.free_ranges().len(), 1);
///
/// let d = pool.add_object(4);
/// assert_eq!(d.index, 0);
/// assert!(pool.contains(c));
/// ```
#[derive(Debug, Clone)]
pub struct FreeRangesPool<T> {
    slots: Vec<PoolSlot<T>>,
    free_ranges: Vec<FreeRange>,
    live: usize,
}

impl<T> FreeRangesPool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty pool with `capacity` never-used slots.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut pool = Self {
            slots: Vec::with_capacity(capacity),
            free_ranges: Vec::new(),
            live: 0,
        };
        pool.resize(capacity);
        pool
    }

    /// Sorted list of free ranges.
    pub fn free_ranges(&self) -> &[FreeRange] {
        &self.free_ranges
    }

    /// Iterate over live objects with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (PoolHandle::new(slot_index(index), slot.version), value))
        })
    }

    /// Check that the free ranges describe exactly the free slots.
    ///
    /// # Panics
    ///
    /// Panics if the range bookkeeping disagrees with the slot versions.
    pub fn debug_validate_invariants(&self) {
        let mut covered = vec![false; self.slots.len()];
        let mut previous_end = None;
        for range in &self.free_ranges {
            assert!(range.len > 0, "empty free range");
            if let Some(end) = previous_end {
                assert!(range.start > end, "free ranges overlap or touch");
            }
            for index in range.start..range.end() {
                assert!(self.slots[index].is_free(), "live slot inside free range");
                covered[index] = true;
            }
            previous_end = Some(range.end());
        }
        for (index, slot) in self.slots.iter().enumerate() {
            assert_eq!(slot.is_free(), covered[index], "slot {index} bookkeeping");
        }
        assert_eq!(
            self.slots.iter().filter(|slot| !slot.is_free()).count(),
            self.live
        );
    }

    fn take_free_index(&mut self) -> Option<usize> {
        let first = self.free_ranges.first_mut()?;
        let index = first.start;
        first.start += 1;
        first.len -= 1;
        if first.len == 0 {
            self.free_ranges.remove(0);
        }
        Some(index)
    }

    fn release_range(&mut self, freed: FreeRange) {
        let position = self
            .free_ranges
            .partition_point(|range| range.start < freed.start);
        let merges_prev = position > 0 && self.free_ranges[position - 1].end() == freed.start;
        let merges_next = self
            .free_ranges
            .get(position)
            .is_some_and(|next| freed.end() == next.start);

        match (merges_prev, merges_next) {
            (true, true) => {
                let next = self.free_ranges.remove(position);
                self.free_ranges[position - 1].len += freed.len + next.len;
            }
            (true, false) => self.free_ranges[position - 1].len += freed.len,
            (false, true) => {
                let next = &mut self.free_ranges[position];
                next.start = freed.start;
                next.len += freed.len;
            }
            (false, false) => self.free_ranges.insert(position, freed),
        }
    }
}

impl<T> Default for FreeRangesPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObjectPool<T> for FreeRangesPool<T> {
    fn add_object(&mut self, value: T) -> PoolHandle {
        let index = match self.take_free_index() {
            Some(index) => index,
            None => {
                self.slots.push(PoolSlot::vacant());
                self.slots.len() - 1
            }
        };
        let version = self.slots[index].occupy(value);
        self.live += 1;
        PoolHandle::new(slot_index(index), version)
    }

    fn try_get_object(&self, handle: PoolHandle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.matches(handle))
            .and_then(|slot| slot.value.as_ref())
    }

    fn try_get_object_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.matches(handle))
            .and_then(|slot| slot.value.as_mut())
    }

    fn remove_object(&mut self, handle: PoolHandle) -> Option<T> {
        let index = handle.index as usize;
        let slot = self.slots.get_mut(index).filter(|slot| slot.matches(handle))?;
        let value = slot.release();
        self.live -= 1;
        self.release_range(FreeRange {
            start: index,
            len: 1,
        });
        value
    }

    fn len(&self) -> usize {
        self.live
    }

    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn resize(&mut self, slot_count: usize) {
        let old_count = self.slots.len();
        if slot_count < old_count {
            assert!(
                self.slots[slot_count..].iter().all(PoolSlot::is_free),
                "cannot shrink pool below a live object"
            );
            self.slots.truncate(slot_count);
            self.free_ranges.retain_mut(|range| {
                range.len = range.len.min(slot_count.saturating_sub(range.start));
                range.start < slot_count && range.len > 0
            });
        } else if slot_count > old_count {
            self.slots.resize_with(slot_count, PoolSlot::vacant);
            self.release_range(FreeRange {
                start: old_count,
                len: slot_count - old_count,
            });
        }
    }

    fn handles(&self) -> Vec<PoolHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions_grow<P: ObjectPool<u32> + Default>() {
        let mut pool = P::default();
        let mut previous = pool.add_object(0);
        for cycle in 1..10 {
            assert!(pool.try_remove_object(previous));
            let next = pool.add_object(cycle);
            assert_eq!(next.index, previous.index);
            assert!(next.version > previous.version);
            assert!(!pool.contains(previous));
            assert_eq!(pool.try_get_object(next), Some(&cycle));
            previous = next;
        }
    }

    #[test]
    fn test_pool_version_monotonicity() {
        versions_grow::<Pool<u32>>();
    }

    #[test]
    fn test_free_ranges_pool_version_monotonicity() {
        versions_grow::<FreeRangesPool<u32>>();
    }

    #[test]
    fn test_pool_reuses_lowest_free_slot() {
        let mut pool = Pool::new();
        let handles: Vec<_> = (0..4).map(|i| pool.add_object(i)).collect();
        pool.remove_object(handles[2]);
        pool.remove_object(handles[1]);

        let reused = pool.add_object(10);
        assert_eq!(reused.index, 1);
        assert_eq!(pool.len(), 3);
        pool.debug_validate_invariants();
    }

    #[test]
    fn test_stale_handles_never_match() {
        let mut pool = Pool::new();
        let handle = pool.add_object("a");

        assert!(pool.try_get_object(PoolHandle::new(handle.index, 0)).is_none());
        assert!(pool.try_get_object(PoolHandle::new(7, 1)).is_none());
        assert!(!pool.try_remove_object(PoolHandle::new(handle.index, -1)));
        assert!(pool.contains(handle));
    }

    #[test]
    fn test_free_ranges_coalesce_both_sides() {
        let mut pool = FreeRangesPool::new();
        let handles: Vec<_> = (0..5).map(|i| pool.add_object(i)).collect();

        pool.remove_object(handles[1]);
        pool.remove_object(handles[3]);
        assert_eq!(pool.free_ranges().len(), 2);

        pool.remove_object(handles[2]);
        assert_eq!(pool.free_ranges(), &[FreeRange { start: 1, len: 3 }]);
        pool.debug_validate_invariants();
    }

    #[test]
    fn test_free_ranges_pool_allocates_from_first_range() {
        let mut pool = FreeRangesPool::new();
        let handles: Vec<_> = (0..4).map(|i| pool.add_object(i)).collect();
        pool.remove_object(handles[3]);
        pool.remove_object(handles[0]);

        assert_eq!(pool.add_object(9).index, 0);
        assert_eq!(pool.add_object(9).index, 3);
        assert_eq!(pool.add_object(9).index, 4);
        assert!(pool.free_ranges().is_empty());
        pool.debug_validate_invariants();
    }

    #[test]
    fn test_resize_grows_free_range() {
        let mut pool: FreeRangesPool<u8> = FreeRangesPool::with_capacity(2);
        assert_eq!(pool.free_ranges(), &[FreeRange { start: 0, len: 2 }]);

        pool.resize(5);
        assert_eq!(pool.free_ranges(), &[FreeRange { start: 0, len: 5 }]);

        pool.add_object(1);
        pool.resize(3);
        assert_eq!(pool.free_ranges(), &[FreeRange { start: 1, len: 2 }]);
        pool.debug_validate_invariants();
    }

    #[test]
    #[should_panic(expected = "cannot shrink pool")]
    fn test_resize_below_live_object_panics() {
        let mut pool = Pool::new();
        pool.add_object(1);
        pool.resize(0);
    }
}
