//! # statgraph - Incremental Stat Dependency Engine
//!
//! A stat engine for games where stats read other stats:
//! - **Incremental** propagation (only what observes a change recomputes)
//! - **Cycle-free** by construction (looping modifiers are refused on add)
//! - **Compact** per-owner buffers (no per-stat heap allocation)
//! - **Host-agnostic** storage (bring your own owner buffers, or use the bundled pool)
//!
//! ## Core Concepts
//!
//! ### Stats, Modifiers and Observers
//!
//! ```text
//! [base value] → [modifier] → [modifier] → … → [value]
//!                     │
//!                     └── reads other stats ── observer edge ──┐
//!                                                              ▼
//!                                          recomputes when they change
//! ```
//!
//! 1. A **Stat** has a base value and a computed value
//! 2. **Modifiers** run in order over a running value and may read other stats
//! 3. Every stat a modifier reads records the modified stat as an **Observer**
//! 4. Changing a stat recomputes it and walks its observers breadth-first
//!
//! ### Key Features
//!
//! - **Generational handles**: destroyed owners never alias new ones
//! - **Change events**: opt-in per stat, with previous and current values
//! - **Batched updates**: defer recompute and settle many changes in one pass
//! - **Diagnostics**: snapshot the observer edges into a petgraph graph
//!
//! ## Example
//!
//! ```rust
//! use statgraph::modifier::BasicModifier;
//! use statgraph::*;
//!
//! let mut world = StatsWorld::<BasicModifier>::new();
//! let hero = world.create_owner();
//! let health = world.create_stat(hero, 100.0, true).unwrap();
//!
//! let bonus = world.add_stat_modifier(health, BasicModifier::Add(20.0)).unwrap();
//! world.add_stat_modifier(health, BasicModifier::Multiply(1.5)).unwrap();
//! assert_eq!(world.stat_value(health), Some(180.0)); // (100 + 20) * 1.5
//!
//! world.remove_stat_modifier(bonus);
//! assert_eq!(world.stat_value(health), Some(150.0));
//! ```
//!
//! ## Modules
//!
//! - [`handle`] - Owner, stat and modifier handles
//! - [`pool`] - Generational object pools
//! - [`compact_list`] - Relocatable contiguous sub-lists
//! - [`linked_list`] - Index-linked sub-lists with pinned heads
//! - [`stat`] - Stat records and events
//! - [`modifier`] - Modifier traits and built-in modifiers
//! - [`storage`] - Per-owner buffers and the storage interface
//! - [`engine`] - Add/remove/recompute operations
//! - [`events`] - Event sinks
//! - [`world`] - Self-contained world facade
//! - [`graph`] - Observer graph diagnostics
//! - [`config`] - Buffer sizing
//! - [`error`] - Error types

pub mod compact_list;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod graph;
pub mod handle;
pub mod linked_list;
pub mod modifier;
pub mod pool;
pub mod stat;
pub mod storage;
pub mod world;

// Re-export main types for convenience
pub use config::StatsConfig;
pub use engine::StatsEngine;
pub use error::{ModifierRejected, PackedListError};
pub use handle::{OwnerKey, StatHandle, StatModifierHandle};
pub use world::StatsWorld;

// Re-export stat records and events
pub use events::{StatEventBuffers, StatEventSink};
pub use stat::{ModifierTriggerEvent, Stat, StatChangeEvent, StatModifier, StatObserver, StatValues};

// Re-export storage and buffer types
pub use compact_list::{CompactList, PackedListRange};
pub use linked_list::{CompactLinkedList, LinkedListCursor, LinkedListHandle};
pub use pool::{FreeRangesPool, ObjectPool, Pool, PoolHandle};
pub use storage::{OwnerRegistry, OwnerStats, StatReader, StatsStorage};
