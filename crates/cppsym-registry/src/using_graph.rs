//! Using-directive graph.
//!
//! Uses `petgraph::DiGraph` with one node per scope that declares or is
//! nominated by a `using namespace` directive, and one edge per directive
//! from the declaring scope to the nominated namespace.

use cppsym_core::SymbolId;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Default, Clone)]
pub struct UsingGraph {
    graph: DiGraph<SymbolId, ()>,
    nodes: FxHashMap<SymbolId, NodeIndex>,
}

impl UsingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, scope: SymbolId) -> NodeIndex {
        if let Some(&node) = self.nodes.get(&scope) {
            return node;
        }
        let node = self.graph.add_node(scope);
        self.nodes.insert(scope, node);
        node
    }

    /// Add a `using namespace target` directive to `scope`.
    ///
    /// Returns `false` if the same directive was already present.
    pub fn add(&mut self, scope: SymbolId, target: SymbolId) -> bool {
        let from = self.node(scope);
        let to = self.node(target);

        // Avoid duplicate using edges
        if self.graph.edges(from).any(|edge| edge.target() == to) {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Remove the directive `scope -> target`, if present.
    pub fn remove(&mut self, scope: SymbolId, target: SymbolId) -> bool {
        let (Some(&from), Some(&to)) = (self.nodes.get(&scope), self.nodes.get(&target)) else {
            return false;
        };
        match self.graph.find_edge(from, to) {
            Some(edge) => {
                self.graph.remove_edge(edge);
                true
            }
            None => false,
        }
    }

    /// Namespaces nominated by directives declared directly in `scope`, in
    /// declaration order.
    pub fn targets(&self, scope: SymbolId) -> Vec<SymbolId> {
        let Some(&from) = self.nodes.get(&scope) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self
            .graph
            .edges(from)
            .map(|edge| (edge.id().index(), self.graph[edge.target()]))
            .collect();
        edges.sort_by_key(|(index, _)| *index);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    pub fn has_directives(&self, scope: SymbolId) -> bool {
        self.nodes
            .get(&scope)
            .is_some_and(|&from| self.graph.edges(from).next().is_some())
    }

    /// Every namespace reachable from `scope` by following directives
    /// transitively, excluding `scope` itself.
    pub fn reachable(&self, scope: SymbolId) -> FxHashSet<SymbolId> {
        let mut reached = FxHashSet::default();
        let Some(&start) = self.nodes.get(&scope) else {
            return reached;
        };
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(node) = bfs.next(&self.graph) {
            if node != start {
                reached.insert(self.graph[node]);
            }
        }
        reached
    }

    pub fn directive_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> SymbolId {
        SymbolId::new(n)
    }

    #[test]
    fn directives_keep_declaration_order() {
        let mut graph = UsingGraph::new();
        graph.add(id(1), id(3));
        graph.add(id(1), id(2));
        assert_eq!(graph.targets(id(1)), vec![id(3), id(2)]);
    }

    #[test]
    fn duplicate_directive_ignored() {
        let mut graph = UsingGraph::new();
        assert!(graph.add(id(1), id(2)));
        assert!(!graph.add(id(1), id(2)));
        assert_eq!(graph.directive_count(), 1);
    }

    #[test]
    fn remove_directive() {
        let mut graph = UsingGraph::new();
        graph.add(id(1), id(2));
        assert!(graph.remove(id(1), id(2)));
        assert!(!graph.has_directives(id(1)));
        assert!(!graph.remove(id(1), id(2)));
    }

    #[test]
    fn reachable_is_transitive_and_cycle_safe() {
        let mut graph = UsingGraph::new();
        graph.add(id(1), id(2));
        graph.add(id(2), id(3));
        graph.add(id(3), id(1));
        let reached = graph.reachable(id(1));
        assert!(reached.contains(&id(2)));
        assert!(reached.contains(&id(3)));
        assert!(!reached.contains(&id(1)));
    }
}
