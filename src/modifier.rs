//! Modifier computations.
//!
//! A modifier declares which stats it reads via
//! [`StatModifierValue::observed_stats`] and contributes to an accumulator
//! (the [`ModifierStack`]) in [`StatModifierValue::apply`]. Recompute seeds
//! the stack with the stat's base value, applies every modifier in list
//! order and writes [`ModifierStack::finalize`] back as the stat's value.
//!
//! The declared stats must cover every stat `apply` reads, otherwise the
//! engine records no observer edge and the stat will not recompute when
//! the read stat changes.

use crate::handle::StatHandle;
use crate::storage::StatReader;
use serde::{Deserialize, Serialize};

/// Accumulator a stat's modifiers write into during recompute.
pub trait ModifierStack: Default {
    /// Start a new recompute from `base_value`.
    fn reset(&mut self, base_value: f32);

    /// The stat's new value.
    fn finalize(&self) -> f32;
}

/// A computation attached to a stat.
///
/// # Examples
///
/// ```rust
/// use statgraph::modifier::{BasicModifierStack, ModifierStack, StatModifierValue};
/// use statgraph::{StatHandle, StatReader, StatValues};
///
/// /// Doubles the value, reads nothing.
/// #[derive(Clone)]
/// struct Double;
///
/// impl StatModifierValue for Double {
///     type Stack = BasicModifierStack;
///
///     fn observed_stats(&self, _observed: &mut Vec<StatHandle>) {}
///
///     fn apply(&self, _stats: &dyn StatReader, stack: &mut BasicModifierStack) {
///         stack.value *= 2.0;
///     }
/// }
/// ```
pub trait StatModifierValue {
    /// Accumulator type shared by every modifier of this type.
    type Stack: ModifierStack;

    /// Push every stat this modifier reads onto `observed`.
    fn observed_stats(&self, observed: &mut Vec<StatHandle>);

    /// Contribute to `stack`, reading other stats through `stats`.
    fn apply(&self, stats: &dyn StatReader, stack: &mut Self::Stack);
}

/// Running value: seeded with the base value, updated by each modifier in turn.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BasicModifierStack {
    /// Current value.
    pub value: f32,
}

impl ModifierStack for BasicModifierStack {
    fn reset(&mut self, base_value: f32) {
        self.value = base_value;
    }

    fn finalize(&self) -> f32 {
        self.value
    }
}

/// Built-in modifiers applied to a [`BasicModifierStack`].
///
/// Variants that read a stat leave the value unchanged when that stat no
/// longer exists.
///
/// # Examples
///
/// ```rust
/// use statgraph::modifier::BasicModifier;
/// use statgraph::{StatsWorld, StatHandle};
///
/// let mut world = StatsWorld::<BasicModifier>::new();
/// let owner = world.create_owner();
/// let health = world.create_stat(owner, 100.0, false).unwrap();
///
/// world.add_stat_modifier(health, BasicModifier::Add(20.0)).unwrap();
/// world.add_stat_modifier(health, BasicModifier::Multiply(1.5)).unwrap();
/// assert_eq!(world.stat_value(health), Some(180.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BasicModifier {
    /// `value + amount`.
    Add(f32),
    /// `value * factor`.
    Multiply(f32),
    /// `value + stat.value * factor`.
    AddFromStat {
        /// Stat to read.
        stat: StatHandle,
        /// Scale applied to the read value.
        factor: f32,
    },
    /// `value * (stat.value * factor)`.
    MultiplyFromStat {
        /// Stat to read.
        stat: StatHandle,
        /// Scale applied to the read value.
        factor: f32,
    },
    /// `stat.value * factor`, discarding the running value.
    SetFromStat {
        /// Stat to read.
        stat: StatHandle,
        /// Scale applied to the read value.
        factor: f32,
    },
    /// Clamp to optional bounds.
    Clamp {
        /// Lower bound (inclusive).
        min: Option<f32>,
        /// Upper bound (inclusive).
        max: Option<f32>,
    },
}

impl BasicModifier {
    /// The stat this modifier reads, if any.
    pub fn observed_stat(&self) -> Option<StatHandle> {
        match self {
            BasicModifier::AddFromStat { stat, .. }
            | BasicModifier::MultiplyFromStat { stat, .. }
            | BasicModifier::SetFromStat { stat, .. } => Some(*stat),
            BasicModifier::Add(_) | BasicModifier::Multiply(_) | BasicModifier::Clamp { .. } => None,
        }
    }
}

impl StatModifierValue for BasicModifier {
    type Stack = BasicModifierStack;

    fn observed_stats(&self, observed: &mut Vec<StatHandle>) {
        observed.extend(self.observed_stat());
    }

    fn apply(&self, stats: &dyn StatReader, stack: &mut BasicModifierStack) {
        let read = |stat: &StatHandle, factor: &f32| {
            stats
                .try_get_stat_values(*stat)
                .map(|values| values.value * factor)
        };
        match self {
            BasicModifier::Add(amount) => stack.value += amount,
            BasicModifier::Multiply(factor) => stack.value *= factor,
            BasicModifier::AddFromStat { stat, factor } => {
                if let Some(amount) = read(stat, factor) {
                    stack.value += amount;
                }
            }
            BasicModifier::MultiplyFromStat { stat, factor } => {
                if let Some(scale) = read(stat, factor) {
                    stack.value *= scale;
                }
            }
            BasicModifier::SetFromStat { stat, factor } => {
                if let Some(value) = read(stat, factor) {
                    stack.value = value;
                }
            }
            BasicModifier::Clamp { min, max } => {
                if let Some(min) = min {
                    stack.value = stack.value.max(*min);
                }
                if let Some(max) = max {
                    stack.value = stack.value.min(*max);
                }
            }
        }
    }
}

impl std::fmt::Display for BasicModifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BasicModifier::Add(amount) => write!(f, "+{:.2}", amount),
            BasicModifier::Multiply(factor) => write!(f, "×{:.2}", factor),
            BasicModifier::AddFromStat { stat, factor } => write!(f, "+{} × {:.2}", stat, factor),
            BasicModifier::MultiplyFromStat { stat, factor } => {
                write!(f, "×({} × {:.2})", stat, factor)
            }
            BasicModifier::SetFromStat { stat, factor } => write!(f, "={} × {:.2}", stat, factor),
            BasicModifier::Clamp { min, max } => match (min, max) {
                (Some(min), Some(max)) => write!(f, "clamp({:.2}, {:.2})", min, max),
                (Some(min), None) => write!(f, "clamp_min({:.2})", min),
                (None, Some(max)) => write!(f, "clamp_max({:.2})", max),
                (None, None) => write!(f, "clamp(none)"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::OwnerKey;
    use crate::stat::StatValues;
    use std::collections::HashMap;

    struct MapReader(HashMap<StatHandle, f32>);

    impl StatReader for MapReader {
        fn try_get_stat_values(&self, stat: StatHandle) -> Option<StatValues> {
            self.0.get(&stat).map(|value| StatValues {
                value: *value,
                base_value: *value,
            })
        }
    }

    fn run(modifiers: &[BasicModifier], base: f32, reader: &MapReader) -> f32 {
        let mut stack = BasicModifierStack::default();
        stack.reset(base);
        for modifier in modifiers {
            modifier.apply(reader, &mut stack);
        }
        stack.finalize()
    }

    #[test]
    fn test_modifiers_apply_in_order() {
        let reader = MapReader(HashMap::new());
        let add_then_mul = [BasicModifier::Add(20.0), BasicModifier::Multiply(1.5)];
        let mul_then_add = [BasicModifier::Multiply(1.5), BasicModifier::Add(20.0)];

        assert_eq!(run(&add_then_mul, 100.0, &reader), 180.0);
        assert_eq!(run(&mul_then_add, 100.0, &reader), 170.0);
    }

    #[test]
    fn test_stat_reading_modifiers() {
        let strength = StatHandle::new(OwnerKey::default(), 0);
        let reader = MapReader(HashMap::from([(strength, 10.0)]));

        let scaled = [BasicModifier::AddFromStat {
            stat: strength,
            factor: 2.0,
        }];
        assert_eq!(run(&scaled, 50.0, &reader), 70.0);

        let set = [BasicModifier::SetFromStat {
            stat: strength,
            factor: 0.5,
        }];
        assert_eq!(run(&set, 50.0, &reader), 5.0);
    }

    #[test]
    fn test_missing_stat_leaves_value_unchanged() {
        let reader = MapReader(HashMap::new());
        let missing = StatHandle::new(OwnerKey::default(), 9);
        let modifiers = [
            BasicModifier::SetFromStat {
                stat: missing,
                factor: 1.0,
            },
            BasicModifier::MultiplyFromStat {
                stat: missing,
                factor: 1.0,
            },
        ];
        assert_eq!(run(&modifiers, 12.0, &reader), 12.0);
    }

    #[test]
    fn test_clamp() {
        let reader = MapReader(HashMap::new());
        let cap = [BasicModifier::Clamp {
            min: Some(0.0),
            max: Some(100.0),
        }];
        assert_eq!(run(&cap, 150.0, &reader), 100.0);
        assert_eq!(run(&cap, -5.0, &reader), 0.0);
        assert_eq!(run(&cap, 50.0, &reader), 50.0);
    }

    #[test]
    fn test_observed_stats() {
        let stat = StatHandle::new(OwnerKey::default(), 3);
        let mut observed = Vec::new();
        BasicModifier::Add(1.0).observed_stats(&mut observed);
        assert!(observed.is_empty());

        BasicModifier::MultiplyFromStat { stat, factor: 1.0 }.observed_stats(&mut observed);
        assert_eq!(observed, vec![stat]);
    }

    #[test]
    fn test_display() {
        assert_eq!(BasicModifier::Add(20.0).to_string(), "+20.00");
        assert_eq!(BasicModifier::Multiply(1.5).to_string(), "×1.50");
        assert_eq!(
            BasicModifier::Clamp {
                min: None,
                max: Some(0.75)
            }
            .to_string(),
            "clamp_max(0.75)"
        );
    }
}
