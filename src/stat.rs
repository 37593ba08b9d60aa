//! Stat records and the edges between them.

use crate::compact_list::PackedListRange;
use crate::handle::{StatHandle, StatModifierHandle};
use crate::linked_list::LinkedListHandle;
use serde::{Deserialize, Serialize};

/// One stat: a base value, the computed value and its modifier/observer lists.
///
/// `value` is only written by recompute. It always equals the base value
/// run through the stat's modifiers in list order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    /// Value before modifiers.
    pub base_value: f32,
    pub(crate) value: f32,
    pub(crate) modifiers: LinkedListHandle,
    pub(crate) observers: PackedListRange,
    /// Report a [`StatChangeEvent`] whenever `value` changes.
    pub produce_change_events: bool,
}

impl Stat {
    pub(crate) fn new(base_value: f32, observers: PackedListRange, produce_change_events: bool) -> Self {
        Self {
            base_value,
            value: base_value,
            modifiers: LinkedListHandle::default(),
            observers,
            produce_change_events,
        }
    }

    /// The computed value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Number of modifiers attached to this stat.
    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }

    /// Number of observer entries recorded on this stat.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Base and computed value.
    pub fn values(&self) -> StatValues {
        StatValues {
            value: self.value,
            base_value: self.base_value,
        }
    }
}

/// The two numbers modifier code may read from another stat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatValues {
    /// Computed value.
    pub value: f32,
    /// Base value.
    pub base_value: f32,
}

/// A user modifier stored in its owner's modifier buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct StatModifier<M> {
    /// Owner-unique ID.
    pub id: u32,
    /// The computation.
    pub modifier: M,
}

/// Back-edge stored on an observed stat: `observer` must recompute when it changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatObserver {
    /// The stat whose modifiers read the observed stat.
    pub observer: StatHandle,
}

/// Reported when a stat that produces change events gets a new value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatChangeEvent {
    /// The stat that changed.
    pub stat: StatHandle,
    /// The stat before recompute.
    pub previous: Stat,
    /// The stat after recompute.
    pub current: Stat,
}

impl StatChangeEvent {
    /// `current.value - previous.value`.
    pub fn delta(&self) -> f32 {
        self.current.value - self.previous.value
    }
}

/// Reported for every modifier applied during recompute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModifierTriggerEvent {
    /// The modifier that was applied.
    pub modifier: StatModifierHandle,
    /// Base value of the affected stat at the time.
    pub base_value: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stat_value_equals_base() {
        let stat = Stat::new(42.0, PackedListRange::default(), true);
        assert_eq!(stat.value(), 42.0);
        assert_eq!(stat.modifier_count(), 0);
        assert_eq!(stat.observer_count(), 0);
        assert_eq!(
            stat.values(),
            StatValues {
                value: 42.0,
                base_value: 42.0
            }
        );
    }

    #[test]
    fn test_change_event_delta() {
        let previous = Stat::new(10.0, PackedListRange::default(), true);
        let mut current = previous;
        current.value = 25.0;
        let event = StatChangeEvent {
            stat: StatHandle::default(),
            previous,
            current,
        };
        assert_eq!(event.delta(), 15.0);
    }
}
