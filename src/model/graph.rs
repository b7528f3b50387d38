use std::hash::Hash;

/// Abstract graph consumed by the pathfinder.
///
/// The search only ever needs two topology queries: the node at the end of an
/// edge, and the edges leaving a node. Edge length, costs, blocked ranges and
/// targets are supplied separately as functions, so the same graph type can
/// serve several searches with different constraints.
pub trait Graph {
    type Node;
    type Edge: Clone + Eq + Hash;

    /// Node at the end of the given edge.
    fn edge_end(&self, edge: &Self::Edge) -> Self::Node;

    /// Edges that can be taken after reaching the given node.
    fn adjacent_edges(&self, node: &Self::Node) -> Vec<Self::Edge>;
}
