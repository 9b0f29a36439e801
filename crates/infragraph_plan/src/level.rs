//! Topological leveling.
//!
//! Level 0 holds every node without dependencies; level `k` holds the
//! nodes whose dependencies all sit in levels `0..k`. Membership inside a
//! level carries no order.

use crate::graph::InfraGraph;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// No further level can be extracted while nodes remain
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dependency cycle detected among nodes: {}", .remaining.join(", "))]
pub struct CycleError {
    /// Nodes that could not be leveled, sorted by name
    pub remaining: Vec<String>,
}

/// An unordered group of node names at the same dependency depth.
///
/// Equality is set equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopoLevel(IndexSet<String>);

impl TopoLevel {
    /// Create an empty level
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    /// Check membership
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Member names, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Member names sorted, for stable rendering
    #[must_use]
    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.iter().collect();
        names.sort_unstable();
        names
    }

    /// Number of members
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if level is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for TopoLevel {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for TopoLevel {
    /// `{a, b, c}` with members sorted
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.sorted().join(", "))
    }
}

/// Ordered sequence of levels; level `i` only depends on levels `< i`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopologicalOrder(Vec<TopoLevel>);

impl TopologicalOrder {
    /// Create an empty order
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next level
    pub fn add_level(&mut self, level: TopoLevel) {
        self.0.push(level);
    }

    /// Levels in execution order
    #[must_use]
    pub fn levels(&self) -> &[TopoLevel] {
        &self.0
    }

    /// Index of the level holding `name`
    #[must_use]
    pub fn level_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|level| level.contains(name))
    }

    /// Number of levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of leveled nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.0.iter().map(TopoLevel::len).sum()
    }

    /// Iterate over levels
    pub fn iter(&self) -> std::slice::Iter<'_, TopoLevel> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a TopologicalOrder {
    type Item = &'a TopoLevel;
    type IntoIter = std::slice::Iter<'a, TopoLevel>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for TopologicalOrder {
    /// One level per line
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, level) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", level)?;
        }
        Ok(())
    }
}

/// Compute the topological levels of `graph`.
///
/// Tracks the number of unsatisfied edges per node. Placing a level
/// satisfies every edge whose dependee is in it; nodes whose count drops
/// to zero form the next level. Repeated edges count separately and are
/// satisfied together, so they never change the result.
///
/// # Errors
///
/// Returns [`CycleError`] if nodes remain but none is free of
/// unsatisfied dependencies.
pub fn level(graph: &InfraGraph) -> Result<TopologicalOrder, CycleError> {
    let n = graph.node_count();
    let mut pending = vec![0usize; n];
    let mut waiting_on: Vec<Vec<usize>> = vec![Vec::new(); n];

    for edge in graph.edges() {
        pending[edge.dependent.index()] += 1;
        waiting_on[edge.dependee.index()].push(edge.dependent.index());
    }

    let mut current: Vec<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut placed = vec![false; n];
    let mut placed_count = 0;
    let mut order = TopologicalOrder::new();

    while placed_count < n {
        if current.is_empty() {
            let mut remaining: Vec<String> = graph
                .indices()
                .filter(|i| !placed[i.index()])
                .map(|i| graph.node(i).name.clone())
                .collect();
            remaining.sort_unstable();
            tracing::debug!(remaining = remaining.len(), "leveling stalled on a cycle");
            return Err(CycleError { remaining });
        }

        let mut next = Vec::new();
        for &i in &current {
            placed[i] = true;
            for &dependent in &waiting_on[i] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    next.push(dependent);
                }
            }
        }
        placed_count += current.len();

        let level: TopoLevel = graph
            .indices()
            .filter(|i| current.contains(&i.index()))
            .map(|i| graph.node(i).name.clone())
            .collect();
        tracing::debug!(level = order.len(), size = level.len(), "extracted topological level");
        order.add_level(level);

        current = next;
    }

    Ok(order)
}
