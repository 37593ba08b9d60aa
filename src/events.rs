//! Event sinks fed by recompute.

use crate::stat::{ModifierTriggerEvent, StatChangeEvent};

/// Receives the events recompute produces.
///
/// Both methods default to doing nothing, and `()` implements the trait,
/// so callers that do not care about events can pass `&mut ()`.
pub trait StatEventSink {
    /// A stat that opted into change events got a new value.
    fn on_stat_changed(&mut self, _event: StatChangeEvent) {}

    /// A modifier was applied.
    fn on_modifier_triggered(&mut self, _event: ModifierTriggerEvent) {}
}

impl StatEventSink for () {}

impl StatEventSink for Vec<StatChangeEvent> {
    fn on_stat_changed(&mut self, event: StatChangeEvent) {
        self.push(event);
    }
}

/// Append-only event lists.
///
/// Trigger events are only recorded when `record_triggers` is set, since
/// every recompute of a stat with modifiers produces them.
#[derive(Debug, Clone, Default)]
pub struct StatEventBuffers {
    /// Change events, in the order stats were recomputed.
    pub change_events: Vec<StatChangeEvent>,
    /// Modifier trigger events, in application order.
    pub trigger_events: Vec<ModifierTriggerEvent>,
    /// Whether `trigger_events` is filled.
    pub record_triggers: bool,
}

impl StatEventBuffers {
    /// Empty buffers that record change events only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every recorded event.
    pub fn clear(&mut self) {
        self.change_events.clear();
        self.trigger_events.clear();
    }
}

impl StatEventSink for StatEventBuffers {
    fn on_stat_changed(&mut self, event: StatChangeEvent) {
        self.change_events.push(event);
    }

    fn on_modifier_triggered(&mut self, event: ModifierTriggerEvent) {
        if self.record_triggers {
            self.trigger_events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::StatModifierHandle;

    #[test]
    fn test_triggers_recorded_only_when_enabled() {
        let event = ModifierTriggerEvent {
            modifier: StatModifierHandle::default(),
            base_value: 1.0,
        };
        let mut buffers = StatEventBuffers::new();
        buffers.on_modifier_triggered(event);
        assert!(buffers.trigger_events.is_empty());

        buffers.record_triggers = true;
        buffers.on_modifier_triggered(event);
        assert_eq!(buffers.trigger_events, vec![event]);

        buffers.clear();
        assert!(buffers.trigger_events.is_empty());
    }
}
