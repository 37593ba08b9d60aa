//! Handle types.
//!
//! Stats are addressed by the owner that holds their buffers plus their
//! index in that owner's stat list. Modifiers are addressed by the stat
//! they affect plus an ID that is unique within the owner.

use crate::pool::PoolHandle;
use serde::{Deserialize, Serialize};

/// Opaque key of an owner of stat buffers.
///
/// [`OwnerRegistry`](crate::storage::OwnerRegistry) issues keys backed by a
/// versioned pool slot, so a key outlives the owner it named without ever
/// aliasing a later owner.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct OwnerKey(pub PoolHandle);

impl OwnerKey {
    /// Wrap a pool handle.
    pub const fn new(handle: PoolHandle) -> Self {
        Self(handle)
    }

    /// The pool handle behind this key.
    pub const fn pool_handle(self) -> PoolHandle {
        self.0
    }
}

impl std::fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "owner({})", self.0)
    }
}

/// Identifies one stat: `(owner, index)`.
///
/// The handle stays valid across recomputes. It becomes stale when the
/// owner is destroyed.
///
/// # Examples
///
/// ```rust
/// use statgraph::{OwnerKey, StatHandle};
///
/// let handle = StatHandle::new(OwnerKey::default(), 3);
/// assert_eq!(handle.index, 3);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct StatHandle {
    /// Owner holding the stat buffers.
    pub owner: OwnerKey,
    /// Index in the owner's stat list.
    pub index: u32,
}

impl StatHandle {
    /// Create a stat handle.
    pub const fn new(owner: OwnerKey, index: u32) -> Self {
        Self { owner, index }
    }
}

impl std::fmt::Display for StatHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.owner, self.index)
    }
}

/// Identifies one modifier independently of where it sits in storage.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct StatModifierHandle {
    /// The stat the modifier is attached to.
    pub affected_stat: StatHandle,
    /// Owner-unique modifier ID.
    pub modifier_id: u32,
}

impl StatModifierHandle {
    /// Create a modifier handle.
    pub const fn new(affected_stat: StatHandle, modifier_id: u32) -> Self {
        Self {
            affected_stat,
            modifier_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_handle_display() {
        let owner = OwnerKey::new(PoolHandle::new(2, 5));
        let handle = StatHandle::new(owner, 7);
        assert_eq!(handle.to_string(), "owner(2v5)#7");
    }

    #[test]
    fn test_handles_compare_by_owner_then_index() {
        let first = OwnerKey::new(PoolHandle::new(0, 1));
        let second = OwnerKey::new(PoolHandle::new(1, 1));
        assert!(StatHandle::new(first, 9) < StatHandle::new(second, 0));
        assert!(StatHandle::new(first, 0) < StatHandle::new(first, 1));
    }
}
