//! Contiguous sub-lists packed into one shared buffer.
//!
//! A [`CompactList`] hosts any number of sub-lists. Each sub-list owns a
//! contiguous run of slots described by a [`PackedListRange`]. Slots inside
//! a range's capacity are flagged occupied so other sub-lists never claim
//! them.
//!
//! Growing a sub-list releases its run, scans the buffer for the first free
//! run large enough (extending the tail when there is none) and moves the
//! elements there. That scan is O(buffer length); growth doubles capacity,
//! so it stays rare compared to reads.
//!
//! Any call that can grow a sub-list takes its range by `&mut` and updates
//! it in place. Copies of the range taken before such a call are stale.

use crate::error::PackedListError;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Location of one sub-list inside a [`CompactList`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedListRange {
    start: usize,
    len: usize,
    capacity: usize,
}

impl PackedListRange {
    /// Offset of the first slot in the shared buffer.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the sub-list holds no element.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of reserved slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn check(&self, index: usize) -> Result<usize, PackedListError> {
        if index < self.len {
            Ok(self.start + index)
        } else {
            Err(PackedListError::IndexOutOfRange {
                index,
                len: self.len,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CompactSlot<T> {
    value: T,
    occupied: bool,
}

/// Shared buffer of contiguous, relocatable sub-lists.
///
/// # Examples
///
/// ```rust
/// use statgraph::compact_list::CompactList;
///
/// let mut buffer = CompactList::new();
/// let mut a = buffer.create(2);
/// let mut b = buffer.create(2);
///
/// buffer.add(&mut a, 1);
/// buffer.add(&mut b, 10);
/// buffer.add(&mut a, 2);
/// buffer.add(&mut a, 3); // grows `a`, which relocates it
///
/// assert_eq!(buffer.iter(&a).copied().collect::<Vec<_>>(), vec![1, 2, 3]);
/// assert_eq!(buffer.iter(&b).copied().collect::<Vec<_>>(), vec![10]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompactList<T> {
    slots: Vec<CompactSlot<T>>,
}

impl<T: Copy + Default> CompactList<T> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Create an empty buffer that can hold `capacity` slots without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Total number of slots in the shared buffer.
    pub fn buffer_len(&self) -> usize {
        self.slots.len()
    }

    /// Reserve a new, empty sub-list with room for `capacity` elements.
    pub fn create(&mut self, capacity: usize) -> PackedListRange {
        let start = self.find_free_run(capacity);
        self.mark(start, capacity, true);
        PackedListRange {
            start,
            len: 0,
            capacity,
        }
    }

    /// Append `value`, doubling the capacity when the sub-list is full.
    pub fn add(&mut self, range: &mut PackedListRange, value: T) {
        if range.len == range.capacity {
            let grown = (range.capacity * 2).max(1);
            self.set_capacity(range, grown);
        }
        self.slots[range.start + range.len].value = value;
        range.len += 1;
    }

    /// Remove the element at `index`, shifting later elements left.
    pub fn remove_at(
        &mut self,
        range: &mut PackedListRange,
        index: usize,
    ) -> Result<T, PackedListError> {
        let slot = range.check(index)?;
        let value = self.slots[slot].value;
        let end = range.start + range.len;
        self.slots.copy_within(slot + 1..end, slot);
        range.len -= 1;
        Ok(value)
    }

    /// Remove the element at `index` by moving the last element into its place.
    pub fn remove_at_swap_back(
        &mut self,
        range: &mut PackedListRange,
        index: usize,
    ) -> Result<T, PackedListError> {
        let slot = range.check(index)?;
        let last = range.start + range.len - 1;
        let value = self.slots[slot].value;
        self.slots[slot].value = self.slots[last].value;
        range.len -= 1;
        Ok(value)
    }

    /// Borrow the element at `index`.
    pub fn get(&self, range: &PackedListRange, index: usize) -> Result<&T, PackedListError> {
        let slot = range.check(index)?;
        Ok(&self.slots[slot].value)
    }

    /// Mutably borrow the element at `index`.
    pub fn get_mut(
        &mut self,
        range: &PackedListRange,
        index: usize,
    ) -> Result<&mut T, PackedListError> {
        let slot = range.check(index)?;
        Ok(&mut self.slots[slot].value)
    }

    /// Overwrite the element at `index`.
    pub fn set(
        &mut self,
        range: &PackedListRange,
        index: usize,
        value: T,
    ) -> Result<(), PackedListError> {
        *self.get_mut(range, index)? = value;
        Ok(())
    }

    /// Index of the first element matching `predicate`.
    pub fn position(
        &self,
        range: &PackedListRange,
        mut predicate: impl FnMut(&T) -> bool,
    ) -> Option<usize> {
        self.iter(range).position(|value| predicate(value))
    }

    /// Iterate over the elements of one sub-list in order.
    pub fn iter<'a>(&'a self, range: &PackedListRange) -> impl Iterator<Item = &'a T> + 'a {
        self.slots[range.start..range.start + range.len]
            .iter()
            .map(|slot| &slot.value)
    }

    /// Move the sub-list to a run of `new_capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `new_capacity` is below the current length.
    pub fn set_capacity(&mut self, range: &mut PackedListRange, new_capacity: usize) {
        assert!(
            new_capacity >= range.len,
            "cannot set capacity {} below length {}",
            new_capacity,
            range.len
        );
        if new_capacity == range.capacity {
            return;
        }

        self.mark(range.start, range.capacity, false);
        let new_start = self.find_free_run(new_capacity);
        if new_start != range.start && range.len > 0 {
            self.slots
                .copy_within(range.start..range.start + range.len, new_start);
        }
        self.mark(new_start, new_capacity, true);

        trace!(
            from = range.start,
            to = new_start,
            capacity = new_capacity,
            "relocated packed sub-list"
        );
        range.start = new_start;
        range.capacity = new_capacity;
    }

    /// Drop every element, keeping the reserved capacity.
    pub fn clear(&mut self, range: &mut PackedListRange) {
        range.len = 0;
    }

    /// Release the sub-list's slots and reset the range to empty.
    pub fn free(&mut self, range: &mut PackedListRange) {
        self.mark(range.start, range.capacity, false);
        *range = PackedListRange::default();
    }

    /// Check that `ranges` are reserved and do not overlap.
    ///
    /// # Panics
    ///
    /// Panics on overlapping ranges or unreserved slots.
    pub fn debug_validate_invariants(&self, ranges: &[PackedListRange]) {
        let mut owners = vec![None; self.slots.len()];
        for (which, range) in ranges.iter().enumerate() {
            assert!(range.len <= range.capacity, "length above capacity");
            for slot in range.start..range.start + range.capacity {
                assert!(self.slots[slot].occupied, "slot {slot} not reserved");
                assert!(owners[slot].is_none(), "slot {slot} shared by two ranges");
                owners[slot] = Some(which);
            }
        }
    }

    /// First offset of a free run of `len` slots, growing the buffer if needed.
    fn find_free_run(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let mut run_start = 0;
        let mut run_len = 0;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.occupied {
                run_start = index + 1;
                run_len = 0;
            } else {
                run_len += 1;
                if run_len == len {
                    return run_start;
                }
            }
        }
        // `run_start` now begins the free tail (or equals the buffer length).
        let end = run_start + len;
        if self.slots.len() < end {
            self.slots.resize_with(end, CompactSlot::default);
        }
        run_start
    }

    fn mark(&mut self, start: usize, len: usize, occupied: bool) {
        for slot in &mut self.slots[start..start + len] {
            slot.occupied = occupied;
        }
    }
}
