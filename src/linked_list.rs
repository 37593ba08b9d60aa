//! Non-contiguous, index-stable sub-lists packed into one shared buffer.
//!
//! The buffer starts with a prefix of *pinned* slots, one per list that has
//! at least one element. A list's first element always lives in its pinned
//! slot, so the index a [`LinkedListHandle`] stores never moves. Every
//! later element is appended after the prefix and chained through `next`.
//!
//! ```text
//!   index:   0          1          2         3         4
//!          ┌─────────┬──────────┬─────────┬─────────┬─────────┐
//!          │ Pinned  │  Vacant  │ Pinned  │ Linked  │ Linked  │
//!          │ a0 → 4  │          │ b0 → 3  │ b1 → ∅  │ a1 → ∅  │
//!          └─────────┴──────────┴─────────┴─────────┴─────────┘
//!          ◄──────── pinned prefix ───────►
//! ```
//!
//! Removing a linked element physically removes it and decrements every
//! `next` above its position, which costs a full buffer pass. Removing a
//! list's last element turns its pinned slot `Vacant` for reuse. Removing a
//! first element that has a successor copies the successor into the pinned
//! slot.
//!
//! The pinned prefix must stay contiguous at index 0: the free-slot scan
//! stops at the first linked element it meets. Only this module inserts
//! into the buffer, and it only ever inserts pinned slots at the boundary.

use crate::error::PackedListError;
use serde::{Deserialize, Serialize};

/// Handle to one list inside a [`CompactLinkedList`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedListHandle {
    first: Option<usize>,
    len: usize,
}

impl LinkedListHandle {
    /// Buffer index of the pinned first element.
    pub fn first_element_index(&self) -> Option<usize> {
        self.first
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if the list holds no element.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Clone)]
struct LinkedNode<T> {
    value: T,
    next: Option<usize>,
}

#[derive(Debug, Clone)]
enum LinkedSlot<T> {
    /// Pinned slot not used by any list.
    Vacant,
    /// First element of a list.
    Pinned(LinkedNode<T>),
    /// Any later element.
    Linked(LinkedNode<T>),
}

impl<T> LinkedSlot<T> {
    fn node(&self) -> Option<&LinkedNode<T>> {
        match self {
            LinkedSlot::Pinned(node) | LinkedSlot::Linked(node) => Some(node),
            LinkedSlot::Vacant => None,
        }
    }

    fn node_mut(&mut self) -> Option<&mut LinkedNode<T>> {
        match self {
            LinkedSlot::Pinned(node) | LinkedSlot::Linked(node) => Some(node),
            LinkedSlot::Vacant => None,
        }
    }
}

/// Shared buffer of index-stable linked lists.
///
/// # Examples
///
/// ```rust
/// use statgraph::linked_list::{CompactLinkedList, LinkedListHandle};
///
/// let mut buffer = CompactLinkedList::new();
/// let mut list = LinkedListHandle::default();
///
/// let first = buffer.add(&mut list, "e1");
/// buffer.add(&mut list, "e2");
/// buffer.add(&mut list, "e3");
///
/// assert_eq!(buffer.remove_at(&mut list, 1), Ok("e2"));
/// assert_eq!(list.first_element_index(), Some(first));
/// let values: Vec<_> = buffer.iter(&list).map(|(_, v)| *v).collect();
/// assert_eq!(values, vec!["e1", "e3"]);
/// ```
#[derive(Debug, Clone)]
pub struct CompactLinkedList<T> {
    slots: Vec<LinkedSlot<T>>,
}

impl<T> CompactLinkedList<T> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Create an empty buffer with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Total number of slots, pinned and linked.
    pub fn buffer_len(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots in the pinned prefix, vacant ones included.
    pub fn pinned_slot_count(&self) -> usize {
        self.slots
            .iter()
            .take_while(|slot| !matches!(slot, LinkedSlot::Linked(_)))
            .count()
    }

    /// Append `value` to the list and return its buffer index.
    pub fn add(&mut self, handle: &mut LinkedListHandle, value: T) -> usize {
        match handle.first {
            None => {
                let index = self.claim_pinned_slot();
                self.slots[index] = LinkedSlot::Pinned(LinkedNode { value, next: None });
                handle.first = Some(index);
                handle.len = 1;
                index
            }
            Some(first) => {
                let last = self.last_index(first);
                let index = self.slots.len();
                self.slots
                    .push(LinkedSlot::Linked(LinkedNode { value, next: None }));
                self.node_mut(last).next = Some(index);
                handle.len += 1;
                index
            }
        }
    }

    /// Remove the `index_in_list`-th element of the list.
    pub fn remove_at(
        &mut self,
        handle: &mut LinkedListHandle,
        index_in_list: usize,
    ) -> Result<T, PackedListError> {
        let (prev, current) = self.locate(handle, index_in_list)?;
        Ok(self.remove_element(handle, prev, current).0)
    }

    /// Borrow the `index_in_list`-th element of the list.
    pub fn get(&self, handle: &LinkedListHandle, index_in_list: usize) -> Result<&T, PackedListError> {
        let (_, current) = self.locate(handle, index_in_list)?;
        Ok(&self.node(current).value)
    }

    /// Borrow the element stored at buffer index `element_index`.
    pub fn get_element(&self, element_index: usize) -> Option<&T> {
        self.slots
            .get(element_index)
            .and_then(LinkedSlot::node)
            .map(|node| &node.value)
    }

    /// Mutably borrow the element stored at buffer index `element_index`.
    pub fn get_element_mut(&mut self, element_index: usize) -> Option<&mut T> {
        self.slots
            .get_mut(element_index)
            .and_then(LinkedSlot::node_mut)
            .map(|node| &mut node.value)
    }

    /// Iterate over `(element_index, &value)` in list order.
    pub fn iter<'a>(&'a self, handle: &LinkedListHandle) -> LinkedIter<'a, T> {
        LinkedIter {
            list: self,
            next: handle.first,
        }
    }

    /// Start a cursor that can remove elements while iterating.
    pub fn cursor(&self, handle: &LinkedListHandle) -> LinkedListCursor {
        LinkedListCursor {
            prev: None,
            current: None,
            next: handle.first,
        }
    }

    /// Remove every element of the list.
    pub fn clear(&mut self, handle: &mut LinkedListHandle) {
        while let Some(last) = handle.len.checked_sub(1) {
            if self.remove_at(handle, last).is_err() {
                break;
            }
        }
    }

    /// Check the pinned prefix and that `handles` reach every element once.
    ///
    /// `handles` must cover every live list in the buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is corrupted.
    pub fn debug_validate_invariants(&self, handles: &[LinkedListHandle]) {
        let prefix = self.pinned_slot_count();
        assert!(
            self.slots[prefix..]
                .iter()
                .all(|slot| matches!(slot, LinkedSlot::Linked(_))),
            "pinned slot found after a linked element"
        );

        let mut seen = vec![false; self.slots.len()];
        let mut pinned = 0;
        for handle in handles {
            let Some(first) = handle.first else {
                assert_eq!(handle.len, 0, "empty handle with non-zero length");
                continue;
            };
            assert!(
                matches!(self.slots[first], LinkedSlot::Pinned(_)),
                "first element {first} is not pinned"
            );
            pinned += 1;
            let mut count = 0;
            for (index, _) in self.iter(handle) {
                assert!(!seen[index], "element {index} reachable twice");
                seen[index] = true;
                count += 1;
            }
            assert_eq!(count, handle.len, "list length mismatch");
        }

        let occupied = self
            .slots
            .iter()
            .filter(|slot| !matches!(slot, LinkedSlot::Vacant))
            .count();
        assert_eq!(occupied, seen.iter().filter(|s| **s).count(), "orphaned elements");
        assert_eq!(
            pinned,
            self.slots
                .iter()
                .filter(|slot| matches!(slot, LinkedSlot::Pinned(_)))
                .count()
        );
    }

    fn node(&self, index: usize) -> &LinkedNode<T> {
        match self.slots.get(index).and_then(LinkedSlot::node) {
            Some(node) => node,
            None => panic!("linked list corrupted: slot {index} holds no element"),
        }
    }

    fn node_mut(&mut self, index: usize) -> &mut LinkedNode<T> {
        match self.slots.get_mut(index).and_then(LinkedSlot::node_mut) {
            Some(node) => node,
            None => panic!("linked list corrupted: slot {index} holds no element"),
        }
    }

    fn last_index(&self, first: usize) -> usize {
        let mut index = first;
        while let Some(next) = self.node(index).next {
            index = next;
        }
        index
    }

    /// Buffer indices of the element before `index_in_list` and of the element itself.
    fn locate(
        &self,
        handle: &LinkedListHandle,
        index_in_list: usize,
    ) -> Result<(Option<usize>, usize), PackedListError> {
        let out_of_range = PackedListError::IndexOutOfRange {
            index: index_in_list,
            len: handle.len,
        };
        let mut current = match handle.first {
            Some(first) if index_in_list < handle.len => first,
            _ => return Err(out_of_range),
        };
        let mut prev = None;
        for _ in 0..index_in_list {
            prev = Some(current);
            current = self.node(current).next.ok_or(out_of_range)?;
        }
        Ok((prev, current))
    }

    /// Reuse a vacant pinned slot or open a new one at the end of the prefix.
    fn claim_pinned_slot(&mut self) -> usize {
        let mut boundary = self.slots.len();
        for (index, slot) in self.slots.iter().enumerate() {
            match slot {
                LinkedSlot::Vacant => return index,
                LinkedSlot::Pinned(_) => {}
                LinkedSlot::Linked(_) => {
                    boundary = index;
                    break;
                }
            }
        }
        self.slots.insert(boundary, LinkedSlot::Vacant);
        for node in self.slots.iter_mut().filter_map(LinkedSlot::node_mut) {
            if let Some(next) = node.next.as_mut() {
                if *next >= boundary {
                    *next += 1;
                }
            }
        }
        boundary
    }

    /// Physically remove the linked element at `index` and patch links above it.
    fn take_linked(&mut self, index: usize) -> LinkedNode<T> {
        let mut node = match self.slots.remove(index) {
            LinkedSlot::Linked(node) => node,
            _ => panic!("linked list corrupted: slot {index} is not a linked element"),
        };
        for link in self
            .slots
            .iter_mut()
            .filter_map(LinkedSlot::node_mut)
            .map(|node| &mut node.next)
            .chain(std::iter::once(&mut node.next))
        {
            if let Some(next) = link.as_mut() {
                if *next > index {
                    *next -= 1;
                }
            }
        }
        node
    }

    /// Remove `current` (whose predecessor is `prev`).
    ///
    /// Returns the value and the buffer index now holding the element that
    /// followed it.
    fn remove_element(
        &mut self,
        handle: &mut LinkedListHandle,
        prev: Option<usize>,
        current: usize,
    ) -> (T, Option<usize>) {
        let next = self.node(current).next;
        match prev {
            None => match next {
                None => {
                    let old = std::mem::replace(&mut self.slots[current], LinkedSlot::Vacant);
                    handle.first = None;
                    handle.len = 0;
                    match old {
                        LinkedSlot::Pinned(node) => (node.value, None),
                        _ => panic!("linked list corrupted: first element {current} is not pinned"),
                    }
                }
                Some(successor) => {
                    let promoted = self.take_linked(successor);
                    let old = std::mem::replace(
                        &mut self.slots[current],
                        LinkedSlot::Pinned(promoted),
                    );
                    handle.len -= 1;
                    match old {
                        LinkedSlot::Pinned(node) => (node.value, Some(current)),
                        _ => panic!("linked list corrupted: first element {current} is not pinned"),
                    }
                }
            },
            Some(prev) => {
                self.node_mut(prev).next = next;
                let removed = self.take_linked(current);
                handle.len -= 1;
                let following = next.map(|n| if n > current { n - 1 } else { n });
                (removed.value, following)
            }
        }
    }
}

impl<T> Default for CompactLinkedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over one list of a [`CompactLinkedList`].
pub struct LinkedIter<'a, T> {
    list: &'a CompactLinkedList<T>,
    next: Option<usize>,
}

impl<'a, T> Iterator for LinkedIter<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        let node = self.list.node(index);
        self.next = node.next;
        Some((index, &node.value))
    }
}

/// Stateful cursor over one list that supports removing the current element.
///
/// The cursor does not borrow the buffer, so the buffer can be mutated
/// between steps through [`LinkedListCursor::remove_current`].
///
/// # Examples
///
/// ```rust
/// use statgraph::linked_list::{CompactLinkedList, LinkedListHandle};
///
/// let mut buffer = CompactLinkedList::new();
/// let mut list = LinkedListHandle::default();
/// for value in 1..=5 {
///     buffer.add(&mut list, value);
/// }
///
/// let mut cursor = buffer.cursor(&list);
/// while let Some(index) = cursor.next(&buffer) {
///     if buffer.get_element(index).is_some_and(|v| v % 2 == 1) {
///         cursor.remove_current(&mut buffer, &mut list);
///     }
/// }
/// let values: Vec<_> = buffer.iter(&list).map(|(_, v)| *v).collect();
/// assert_eq!(values, vec![2, 4]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LinkedListCursor {
    prev: Option<usize>,
    current: Option<usize>,
    next: Option<usize>,
}

impl LinkedListCursor {
    /// Advance and return the buffer index of the new current element.
    pub fn next<T>(&mut self, list: &CompactLinkedList<T>) -> Option<usize> {
        let index = self.next?;
        if let Some(current) = self.current {
            self.prev = Some(current);
        }
        self.current = Some(index);
        self.next = list.node(index).next;
        Some(index)
    }

    /// Buffer index of the current element.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// Remove the current element. The next call to [`next`](Self::next)
    /// yields the element that followed it.
    pub fn remove_current<T>(
        &mut self,
        list: &mut CompactLinkedList<T>,
        handle: &mut LinkedListHandle,
    ) -> Option<T> {
        let current = self.current.take()?;
        let (value, following) = list.remove_element(handle, self.prev, current);
        if let Some(prev) = self.prev.as_mut() {
            if *prev > current {
                *prev -= 1;
            }
        }
        self.next = following;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(buffer: &CompactLinkedList<u32>, handle: &LinkedListHandle) -> Vec<u32> {
        buffer.iter(handle).map(|(_, value)| *value).collect()
    }

    #[test]
    fn test_first_elements_are_pinned() {
        let mut buffer = CompactLinkedList::new();
        let mut a = LinkedListHandle::default();
        let mut b = LinkedListHandle::default();

        buffer.add(&mut a, 1);
        buffer.add(&mut a, 2);
        buffer.add(&mut b, 10);

        // b's first element opened a new pinned slot ahead of a's second element.
        assert_eq!(a.first_element_index(), Some(0));
        assert_eq!(b.first_element_index(), Some(1));
        assert_eq!(buffer.pinned_slot_count(), 2);
        assert_eq!(values(&buffer, &a), vec![1, 2]);
        buffer.debug_validate_invariants(&[a, b]);
    }

    #[test]
    fn test_remove_middle_keeps_indices() {
        let mut buffer = CompactLinkedList::new();
        let mut list = LinkedListHandle::default();
        let mut other = LinkedListHandle::default();
        let e1 = buffer.add(&mut list, 1);
        buffer.add(&mut other, 100);
        buffer.add(&mut list, 2);
        buffer.add(&mut list, 3);
        let other_first = other.first_element_index();

        assert_eq!(buffer.remove_at(&mut list, 1), Ok(2));

        assert_eq!(list.first_element_index(), Some(e1));
        assert_eq!(other.first_element_index(), other_first);
        assert_eq!(values(&buffer, &list), vec![1, 3]);
        assert_eq!(values(&buffer, &other), vec![100]);
        buffer.debug_validate_invariants(&[list, other]);
    }

    #[test]
    fn test_remove_first_promotes_successor() {
        let mut buffer = CompactLinkedList::new();
        let mut list = LinkedListHandle::default();
        let first = buffer.add(&mut list, 1);
        buffer.add(&mut list, 2);
        buffer.add(&mut list, 3);

        assert_eq!(buffer.remove_at(&mut list, 0), Ok(1));

        assert_eq!(list.first_element_index(), Some(first));
        assert_eq!(buffer.get_element(first), Some(&2));
        assert_eq!(values(&buffer, &list), vec![2, 3]);
        assert_eq!(buffer.buffer_len(), 2);
        buffer.debug_validate_invariants(&[list]);
    }

    #[test]
    fn test_vacant_slot_is_reused() {
        let mut buffer = CompactLinkedList::new();
        let mut a = LinkedListHandle::default();
        let mut b = LinkedListHandle::default();
        let mut c = LinkedListHandle::default();
        buffer.add(&mut a, 1);
        buffer.add(&mut b, 2);
        buffer.add(&mut b, 3);

        buffer.remove_at(&mut a, 0).unwrap();
        assert!(a.is_empty());
        assert_eq!(a.first_element_index(), None);

        buffer.add(&mut c, 4);
        assert_eq!(c.first_element_index(), Some(0));
        assert_eq!(b.first_element_index(), Some(1));
        assert_eq!(values(&buffer, &b), vec![2, 3]);
        buffer.debug_validate_invariants(&[a, b, c]);
    }

    #[test]
    fn test_out_of_range() {
        let mut buffer: CompactLinkedList<u32> = CompactLinkedList::new();
        let mut list = LinkedListHandle::default();
        assert_eq!(
            buffer.remove_at(&mut list, 0),
            Err(PackedListError::IndexOutOfRange { index: 0, len: 0 })
        );
        buffer.add(&mut list, 1);
        assert!(buffer.get(&list, 1).is_err());
        assert_eq!(buffer.get(&list, 0), Ok(&1));
    }

    #[test]
    fn test_cursor_removes_first_and_later_elements() {
        let mut buffer = CompactLinkedList::new();
        let mut list = LinkedListHandle::default();
        let mut other = LinkedListHandle::default();
        for value in 1..=3 {
            buffer.add(&mut list, value);
            buffer.add(&mut other, value * 10);
        }

        let mut cursor = buffer.cursor(&list);
        let mut visited = Vec::new();
        while let Some(index) = cursor.next(&buffer) {
            let value = *buffer.get_element(index).unwrap();
            visited.push(value);
            if value != 3 {
                cursor.remove_current(&mut buffer, &mut list);
            }
        }

        assert_eq!(visited, vec![1, 2, 3]);
        assert_eq!(values(&buffer, &list), vec![3]);
        assert_eq!(values(&buffer, &other), vec![10, 20, 30]);
        buffer.debug_validate_invariants(&[list, other]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = CompactLinkedList::new();
        let mut list = LinkedListHandle::default();
        for value in 0..4 {
            buffer.add(&mut list, value);
        }
        buffer.clear(&mut list);
        assert!(list.is_empty());
        assert_eq!(buffer.buffer_len(), 1);
        assert_eq!(buffer.pinned_slot_count(), 1);
    }
}
