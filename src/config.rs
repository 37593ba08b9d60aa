//! Buffer sizing configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes.

use serde::{Deserialize, Serialize};

/// Initial capacities for owner buffers and engine scratch lists.
///
/// # Examples
///
/// ```rust
/// use statgraph::StatsConfig;
///
/// let config = StatsConfig {
///     stat_capacity: 32,
///     ..StatsConfig::default()
/// };
/// assert_eq!(config.observer_list_capacity, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Stats reserved per owner.
    pub stat_capacity: usize,
    /// Modifier slots reserved per owner.
    pub modifier_capacity: usize,
    /// Observer slots reserved per owner.
    pub observer_capacity: usize,
    /// Observer slots a new stat reserves up front. `0` defers the
    /// reservation to the first observer.
    pub observer_list_capacity: usize,
    /// Entries reserved in the engine's worklist and scratch lists.
    pub worklist_capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            stat_capacity: 8,
            modifier_capacity: 8,
            observer_capacity: 8,
            observer_list_capacity: 0,
            worklist_capacity: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: StatsConfig =
            serde_json::from_str(r#"{ "observer_list_capacity": 2 }"#).unwrap();
        assert_eq!(config.observer_list_capacity, 2);
        assert_eq!(config.stat_capacity, StatsConfig::default().stat_capacity);
        assert_eq!(config.worklist_capacity, 32);
    }
}
