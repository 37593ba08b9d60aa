//! Error types.
//!
//! Stale handles are not errors in this crate: lookups return `None` and
//! mutators return `false`. The enums here cover the two cases a caller
//! has to branch on explicitly.

use crate::handle::StatHandle;
use thiserror::Error;

/// Reasons a modifier can be refused by [`StatsEngine::add_stat_modifier`].
///
/// Rejection leaves every buffer untouched.
///
/// # Examples
///
/// ```rust
/// use statgraph::{ModifierRejected, OwnerKey, StatHandle};
///
/// let stat = StatHandle::new(OwnerKey::default(), 0);
/// let err = ModifierRejected::SelfObservation(stat);
/// assert!(err.to_string().contains("observe itself"));
/// ```
///
/// [`StatsEngine::add_stat_modifier`]: crate::engine::StatsEngine::add_stat_modifier
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ModifierRejected {
    /// The affected stat, or one of the stats the modifier reads, does not exist.
    #[error("Stat {0} does not exist")]
    InvalidStat(StatHandle),

    /// The modifier reads the stat it is attached to.
    #[error("Stat {0} cannot observe itself")]
    SelfObservation(StatHandle),

    /// `observed` already depends (transitively) on `affected`.
    ///
    /// Accepting the modifier would make recompute loop forever.
    #[error("Modifier on {affected} observing {observed} would create a cycle")]
    WouldCreateCycle {
        /// Stat the modifier would be attached to.
        affected: StatHandle,
        /// Observed stat that closes the loop.
        observed: StatHandle,
    },
}

/// Errors reported by the packed-list containers.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PackedListError {
    /// An index outside `[0, len)` was used on a sub-list.
    #[error("Index {index} out of range for sub-list of length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Length of the sub-list at the time of the call.
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::OwnerKey;

    #[test]
    fn test_cycle_error_display() {
        let owner = OwnerKey::default();
        let err = ModifierRejected::WouldCreateCycle {
            affected: StatHandle::new(owner, 1),
            observed: StatHandle::new(owner, 2),
        };
        let display = err.to_string();
        assert!(display.contains("cycle"));
        assert!(display.contains("#1"));
        assert!(display.contains("#2"));
    }

    #[test]
    fn test_index_error_display() {
        let err = PackedListError::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(
            err.to_string(),
            "Index 4 out of range for sub-list of length 2"
        );
    }
}
