use statgraph::*;

fn linked_values(list: &CompactLinkedList<u32>, handle: &LinkedListHandle) -> Vec<u32> {
    list.iter(handle).map(|(_, value)| *value).collect()
}

fn packed_values(list: &CompactList<u32>, range: &PackedListRange) -> Vec<u32> {
    list.iter(range).copied().collect()
}

/// Removing a middle element keeps the head in place and the tail reachable,
/// and leaves other lists' heads where they were.
#[test]
fn test_linked_list_index_stability() {
    let mut list = CompactLinkedList::new();
    let mut a = LinkedListHandle::default();
    let mut b = LinkedListHandle::default();

    let e1 = list.add(&mut a, 1);
    list.add(&mut a, 2);
    list.add(&mut a, 3);
    list.add(&mut b, 10);
    list.add(&mut b, 11);

    let a_head = a.first_element_index();
    let b_head = b.first_element_index();
    assert_eq!(a_head, Some(e1));

    assert_eq!(list.remove_at(&mut a, 1), Ok(2));
    assert_eq!(a.first_element_index(), a_head);
    assert_eq!(b.first_element_index(), b_head);
    assert_eq!(list.get_element(e1), Some(&1));
    assert_eq!(linked_values(&list, &a), vec![1, 3]);
    assert_eq!(linked_values(&list, &b), vec![10, 11]);

    let follow: Vec<usize> = list.iter(&a).map(|(index, _)| index).collect();
    assert_eq!(follow[0], e1);
    assert_eq!(list.get_element(follow[1]), Some(&3));
    list.debug_validate_invariants(&[a, b]);
}

/// A list emptied and refilled reclaims a vacant pinned slot.
#[test]
fn test_linked_list_pinned_slot_reuse() {
    let mut list = CompactLinkedList::new();
    let mut a = LinkedListHandle::default();
    let mut b = LinkedListHandle::default();
    let mut c = LinkedListHandle::default();

    list.add(&mut a, 1);
    list.add(&mut b, 2);
    list.add(&mut b, 3);
    let b_head = b.first_element_index();
    list.clear(&mut a);
    assert!(a.is_empty());
    assert_eq!(list.pinned_slot_count(), 2);

    list.add(&mut c, 4);
    assert_eq!(list.pinned_slot_count(), 2);
    assert_eq!(b.first_element_index(), b_head);
    assert_eq!(linked_values(&list, &b), vec![2, 3]);
    assert_eq!(linked_values(&list, &c), vec![4]);
    list.debug_validate_invariants(&[a, b, c]);
}

/// Removing while iterating with a cursor visits every element once.
#[test]
fn test_linked_list_cursor_removal() {
    let mut list = CompactLinkedList::new();
    let mut handle = LinkedListHandle::default();
    for value in 0..6 {
        list.add(&mut handle, value);
    }

    let mut cursor = list.cursor(&handle);
    let mut seen = Vec::new();
    while let Some(index) = cursor.next(&list) {
        let value = *list.get_element(index).unwrap();
        seen.push(value);
        if value % 2 == 0 {
            assert_eq!(cursor.remove_current(&mut list, &mut handle), Some(value));
        }
    }

    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(linked_values(&list, &handle), vec![1, 3, 5]);
    list.debug_validate_invariants(&[handle]);
}

/// Growing one sub-list relocates it intact and leaves its neighbour alone.
#[test]
fn test_compact_list_relocation() {
    let mut list = CompactList::new();
    let mut x = list.create(2);
    let mut y = list.create(2);
    list.add(&mut x, 1);
    list.add(&mut x, 2);
    list.add(&mut y, 10);
    list.add(&mut y, 20);
    let x_start = x.start();

    list.add(&mut x, 3);
    assert_ne!(x.start(), x_start);
    assert!(x.capacity() >= 3);
    assert_eq!(packed_values(&list, &x), vec![1, 2, 3]);
    assert_eq!(packed_values(&list, &y), vec![10, 20]);

    // The old run of x is free again and fits a new list.
    let mut z = list.create(2);
    assert_eq!(z.start(), x_start);
    list.add(&mut z, 7);
    assert_eq!(packed_values(&list, &y), vec![10, 20]);
    list.debug_validate_invariants(&[x, y, z]);
}

/// Indexing past the length reports the sub-list length.
#[test]
fn test_compact_list_out_of_range() {
    let mut list = CompactList::new();
    let mut range = list.create(0);
    list.add(&mut range, 5_u32);

    assert_eq!(
        list.get(&range, 1),
        Err(PackedListError::IndexOutOfRange { index: 1, len: 1 })
    );
    assert!(list.set(&range, 0, 6).is_ok());
    assert_eq!(list.remove_at_swap_back(&mut range, 0), Ok(6));
    assert!(range.is_empty());
}

/// Both pools hand out fresh versions through the shared trait.
#[test]
fn test_pools_through_trait() {
    fn exercise<P: ObjectPool<&'static str>>(mut pool: P) {
        let first = pool.add_object("first");
        let second = pool.add_object("second");
        assert!(pool.try_remove_object(first));
        assert!(!pool.try_remove_object(first));

        let third = pool.add_object("third");
        assert_eq!(third.index, first.index);
        assert!(third.version > first.version);
        assert_eq!(pool.try_get_object(first), None);
        assert_eq!(pool.try_get_object(third), Some(&"third"));
        assert_eq!(pool.handles(), vec![third, second]);
        assert_eq!(pool.len(), 2);
    }

    exercise(Pool::new());
    exercise(FreeRangesPool::new());
}
