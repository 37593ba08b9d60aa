//! Observer graph snapshot.
//!
//! Provides the `ObserverGraph` type, a petgraph view of the observer
//! entries stored across owners. The engine never builds one; it exists
//! to inspect and verify a storage from the outside.

use crate::handle::{OwnerKey, StatHandle};
use crate::storage::StatsStorage;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

/// A directed graph of observer entries.
///
/// Nodes are `StatHandle`s. Every observer entry becomes one edge from
/// the observed stat to the observer, so two modifiers reading the same
/// stat show up as two parallel edges.
///
/// # Examples
///
/// ```rust
/// use statgraph::graph::ObserverGraph;
/// use statgraph::modifier::BasicModifier;
/// use statgraph::StatsWorld;
///
/// let mut world = StatsWorld::<BasicModifier>::new();
/// let owner = world.create_owner();
/// let strength = world.create_stat(owner, 10.0, false).unwrap();
/// let attack = world.create_stat(owner, 0.0, false).unwrap();
/// world
///     .add_stat_modifier(attack, BasicModifier::AddFromStat { stat: strength, factor: 1.0 })
///     .unwrap();
///
/// let graph = world.observer_graph();
/// assert_eq!(graph.edge_count(strength, attack), 1);
/// assert_eq!(graph.propagation_order().unwrap(), vec![strength, attack]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObserverGraph {
    graph: DiGraph<StatHandle, ()>,
    node_map: HashMap<StatHandle, NodeIndex>,
}

impl ObserverGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every stat and observer entry of `owners`.
    ///
    /// Observers living on owners outside `owners` still get a node, so
    /// cross-owner edges are kept.
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage to read
    /// * `owners` - Owners whose stats are added; stale keys are skipped
    pub fn from_storage<S: StatsStorage>(storage: &S, owners: &[OwnerKey]) -> Self {
        let mut graph = Self::new();
        for &key in owners {
            let Some(owner) = storage.owner(key) else {
                continue;
            };
            for index in 0..owner.stat_count() as u32 {
                let stat = StatHandle::new(key, index);
                graph.add_node(stat);
                for entry in owner.observers_of(index) {
                    graph.add_edge(stat, entry.observer);
                }
            }
        }
        graph
    }

    /// Add a node for `stat` if it doesn't exist.
    ///
    /// # Returns
    ///
    /// The node index for this stat.
    pub fn add_node(&mut self, stat: StatHandle) -> NodeIndex {
        if let Some(&index) = self.node_map.get(&stat) {
            index
        } else {
            let index = self.graph.add_node(stat);
            self.node_map.insert(stat, index);
            index
        }
    }

    /// Add an edge saying `observer` must recompute when `observed` changes.
    pub fn add_edge(&mut self, observed: StatHandle, observer: StatHandle) {
        let from = self.add_node(observed);
        let to = self.add_node(observer);
        self.graph.add_edge(from, to, ());
    }

    /// `true` if the graph has a node for `stat`.
    pub fn contains_node(&self, stat: StatHandle) -> bool {
        self.node_map.contains_key(&stat)
    }

    /// Every stat in the graph.
    pub fn nodes(&self) -> Vec<StatHandle> {
        self.graph
            .node_indices()
            .map(|index| self.graph[index])
            .collect()
    }

    /// Total number of edges.
    pub fn total_edges(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of edges from `observed` to `observer`.
    pub fn edge_count(&self, observed: StatHandle, observer: StatHandle) -> usize {
        match (self.node_map.get(&observed), self.node_map.get(&observer)) {
            (Some(&from), Some(&to)) => self.graph.edges_connecting(from, to).count(),
            _ => 0,
        }
    }

    /// Direct observers of `stat`, one per edge.
    pub fn observers(&self, stat: StatHandle) -> Vec<StatHandle> {
        let Some(&index) = self.node_map.get(&stat) else {
            return Vec::new();
        };
        self.out_neighbors(index)
            .into_iter()
            .map(|neighbor| self.graph[neighbor])
            .collect()
    }

    /// Every stat that recomputes, directly or not, when `stat` changes.
    ///
    /// Stats appear once each, in breadth-first order; `stat` itself is
    /// excluded unless it sits on a cycle.
    pub fn transitive_observers(&self, stat: StatHandle) -> Vec<StatHandle> {
        let Some(&start) = self.node_map.get(&stat) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start]);
        let mut found = Vec::new();

        while let Some(node) = queue.pop_front() {
            for neighbor in self.out_neighbors(node) {
                if visited.insert(neighbor) {
                    found.push(self.graph[neighbor]);
                    queue.push_back(neighbor);
                }
            }
        }
        found
    }

    /// Outgoing neighbors in edge insertion order, one per edge.
    fn out_neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect();
        // petgraph walks edges newest first.
        neighbors.reverse();
        neighbors
    }

    /// Check the graph for cycles.
    ///
    /// # Errors
    ///
    /// Returns the cycle path, closed by repeating its first stat.
    pub fn detect_cycles(&self) -> Result<(), Vec<StatHandle>> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node in self.graph.node_indices() {
            if !visited.contains(&node) {
                let mut path = Vec::new();
                if let Some(cycle) = self.dfs_cycle_detect(node, &mut visited, &mut rec_stack, &mut path)
                {
                    return Err(cycle);
                }
            }
        }
        Ok(())
    }

    fn dfs_cycle_detect(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        rec_stack: &mut HashSet<NodeIndex>,
        path: &mut Vec<StatHandle>,
    ) -> Option<Vec<StatHandle>> {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(self.graph[node]);

        for neighbor in self.graph.neighbors_directed(node, Direction::Outgoing) {
            if !visited.contains(&neighbor) {
                if let Some(cycle) = self.dfs_cycle_detect(neighbor, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(&neighbor) {
                let closing = self.graph[neighbor];
                let start = path.iter().position(|stat| *stat == closing).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(closing);
                return Some(cycle);
            }
        }

        rec_stack.remove(&node);
        path.pop();
        None
    }

    /// Order in which a change to every stat at once would settle:
    /// each stat comes after everything it reads.
    ///
    /// # Errors
    ///
    /// Returns the cycle path if the graph is not acyclic.
    pub fn propagation_order(&self) -> Result<Vec<StatHandle>, Vec<StatHandle>> {
        self.detect_cycles()?;
        toposort(&self.graph, None)
            .map(|indices| indices.into_iter().map(|index| self.graph[index]).collect())
            .map_err(|cycle| vec![self.graph[cycle.node_id()]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(index: u32) -> StatHandle {
        StatHandle::new(OwnerKey::default(), index)
    }

    #[test]
    fn test_parallel_edges_are_counted() {
        let mut graph = ObserverGraph::new();
        graph.add_edge(stat(0), stat(1));
        graph.add_edge(stat(0), stat(1));
        graph.add_edge(stat(0), stat(2));

        assert_eq!(graph.edge_count(stat(0), stat(1)), 2);
        assert_eq!(graph.edge_count(stat(1), stat(0)), 0);
        assert_eq!(graph.total_edges(), 3);
        assert_eq!(graph.observers(stat(0)), vec![stat(1), stat(1), stat(2)]);
    }

    #[test]
    fn test_transitive_observers() {
        let mut graph = ObserverGraph::new();
        graph.add_edge(stat(0), stat(1));
        graph.add_edge(stat(1), stat(2));
        graph.add_edge(stat(0), stat(2));
        graph.add_node(stat(3));

        assert_eq!(graph.transitive_observers(stat(0)), vec![stat(1), stat(2)]);
        assert!(graph.transitive_observers(stat(3)).is_empty());
        assert!(graph.transitive_observers(stat(9)).is_empty());
    }

    #[test]
    fn test_cycle_path() {
        let mut graph = ObserverGraph::new();
        graph.add_edge(stat(0), stat(1));
        graph.add_edge(stat(1), stat(2));
        graph.add_edge(stat(2), stat(1));

        let cycle = graph.detect_cycles().unwrap_err();
        assert_eq!(cycle, vec![stat(1), stat(2), stat(1)]);
        assert!(graph.propagation_order().is_err());
    }

    #[test]
    fn test_propagation_order() {
        let mut graph = ObserverGraph::new();
        graph.add_edge(stat(1), stat(2));
        graph.add_edge(stat(0), stat(1));

        let order = graph.propagation_order().unwrap();
        let position = |s| order.iter().position(|x| *x == s).unwrap();
        assert!(position(stat(0)) < position(stat(1)));
        assert!(position(stat(1)) < position(stat(2)));
    }
}
