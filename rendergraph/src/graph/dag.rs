//! Dependency graph container with reachability culling.
//!
//! Nodes and edges live in dense vectors and are addressed by index, so the
//! whole graph is dropped or cleared in one step at the end of a frame.

use std::fmt::Write as _;

/// Index of a node in a [`Dag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of an edge in a [`Dag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u32);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A directed edge and its payload.
#[derive(Debug, Clone)]
pub struct Edge<E> {
    from: NodeId,
    to: NodeId,
    payload: E,
}

impl<E> Edge<E> {
    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}

#[derive(Debug, Clone)]
struct NodeEntry<N> {
    payload: N,
    incoming: Vec<EdgeId>,
    outgoing: Vec<EdgeId>,
    target: bool,
    culled: bool,
}

/// Directed acyclic graph of typed nodes and typed edges.
///
/// Acyclicity is not checked; callers only ever connect new nodes to existing
/// ones, which cannot close a cycle.
#[derive(Debug, Clone)]
pub struct Dag<N, E> {
    nodes: Vec<NodeEntry<N>>,
    edges: Vec<Edge<E>>,
}

impl<N, E> Default for Dag<N, E> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl<N, E> Dag<N, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every node and edge, keeping the allocations.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    pub fn add_node(&mut self, payload: N) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeEntry {
            payload,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            target: false,
            culled: false,
        });
        id
    }

    /// Connect `from` to `to`.
    ///
    /// # Panics
    ///
    /// Panics if either node does not exist.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, payload: E) -> EdgeId {
        assert!(
            from.index() < self.nodes.len() && to.index() < self.nodes.len(),
            "edge {from:?} -> {to:?} references a missing node"
        );
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge { from, to, payload });
        self.nodes[from.index()].outgoing.push(id);
        self.nodes[to.index()].incoming.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &N {
        &self.nodes[id.index()].payload
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut N {
        &mut self.nodes[id.index()].payload
    }

    pub fn edge(&self, id: EdgeId) -> &Edge<E> {
        &self.edges[id.index()]
    }

    pub fn incoming_edges(&self, id: NodeId) -> &[EdgeId] {
        &self.nodes[id.index()].incoming
    }

    pub fn outgoing_edges(&self, id: NodeId) -> &[EdgeId] {
        &self.nodes[id.index()].outgoing
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Mark a node as a graph output. Outputs and everything they depend on
    /// survive [`cull`](Self::cull).
    pub fn mark_target(&mut self, id: NodeId) {
        self.nodes[id.index()].target = true;
    }

    pub fn is_target(&self, id: NodeId) -> bool {
        self.nodes[id.index()].target
    }

    pub fn is_culled(&self, id: NodeId) -> bool {
        self.nodes[id.index()].culled
    }

    /// Returns true if neither endpoint of the edge is culled.
    pub fn is_edge_live(&self, id: EdgeId) -> bool {
        let edge = &self.edges[id.index()];
        !self.is_culled(edge.from) && !self.is_culled(edge.to)
    }

    /// Mark every node that no target can reach backward as culled.
    ///
    /// Returns the number of culled nodes.
    pub fn cull(&mut self) -> usize {
        let mut stack = Vec::new();
        for (index, node) in self.nodes.iter_mut().enumerate() {
            node.culled = !node.target;
            if node.target {
                stack.push(index);
            }
        }

        while let Some(index) = stack.pop() {
            for i in 0..self.nodes[index].incoming.len() {
                let edge = self.nodes[index].incoming[i];
                let from = self.edges[edge.index()].from.index();
                if self.nodes[from].culled {
                    self.nodes[from].culled = false;
                    stack.push(from);
                }
            }
        }

        self.nodes.iter().filter(|node| node.culled).count()
    }

    /// Render the graph in Graphviz DOT syntax.
    ///
    /// `node_attrs` and `edge_attrs` return attribute lists without brackets,
    /// e.g. `label="gbuffer", shape=box`. Culled nodes are drawn dashed.
    pub fn to_graphviz(
        &self,
        name: &str,
        node_attrs: impl Fn(NodeId, &N) -> String,
        edge_attrs: impl Fn(&E) -> String,
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{name}\" {{");
        let _ = writeln!(out, "  rankdir=LR;");
        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId(index as u32);
            let style = if node.culled { ", style=dashed" } else { "" };
            let _ = writeln!(out, "  n{index} [{}{style}];", node_attrs(id, &node.payload));
        }
        for edge in &self.edges {
            let _ = writeln!(
                out,
                "  n{} -> n{} [{}];",
                edge.from.0,
                edge.to.0,
                edge_attrs(&edge.payload)
            );
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a -> b -> c, d -> b, e (isolated)
    fn sample() -> (Dag<&'static str, ()>, [NodeId; 5]) {
        let mut dag = Dag::new();
        let a = dag.add_node("a");
        let b = dag.add_node("b");
        let c = dag.add_node("c");
        let d = dag.add_node("d");
        let e = dag.add_node("e");
        dag.add_edge(a, b, ());
        dag.add_edge(b, c, ());
        dag.add_edge(d, b, ());
        (dag, [a, b, c, d, e])
    }

    #[test]
    fn test_edge_queries() {
        let (dag, [a, b, c, d, _]) = sample();
        assert_eq!(dag.incoming_edges(b).len(), 2);
        assert_eq!(dag.outgoing_edges(b).len(), 1);
        let edge = dag.edge(dag.outgoing_edges(b)[0]);
        assert_eq!((edge.from(), edge.to()), (b, c));
        assert!(dag.incoming_edges(a).is_empty());
        assert_eq!(dag.outgoing_edges(d).len(), 1);
    }

    #[test]
    fn test_cull_without_targets_culls_everything() {
        let (mut dag, _) = sample();
        assert_eq!(dag.cull(), 5);
    }

    #[test]
    fn test_cull_keeps_ancestors_of_targets() {
        let (mut dag, [a, b, c, d, e]) = sample();
        dag.mark_target(c);
        assert_eq!(dag.cull(), 1);
        for id in [a, b, c, d] {
            assert!(!dag.is_culled(id));
        }
        assert!(dag.is_culled(e));
    }

    #[test]
    fn test_cull_drops_descendants_of_targets() {
        let (mut dag, [a, b, c, d, _]) = sample();
        dag.mark_target(b);
        dag.cull();
        assert!(!dag.is_culled(a));
        assert!(!dag.is_culled(d));
        assert!(dag.is_culled(c));
        let into_c = dag.incoming_edges(c)[0];
        assert!(!dag.is_edge_live(into_c));
    }

    #[test]
    fn test_graphviz_marks_culled_nodes() {
        let (mut dag, [_, _, c, _, _]) = sample();
        dag.mark_target(c);
        dag.cull();
        let dot = dag.to_graphviz("frame", |_, name| format!("label=\"{name}\""), |_| String::new());
        assert!(dot.starts_with("digraph \"frame\" {"));
        assert!(dot.contains("n0 -> n1"));
        assert!(dot.contains("n4 [label=\"e\", style=dashed];"));
        assert!(dot.contains("n2 [label=\"c\"];"));
    }

    #[test]
    #[should_panic(expected = "references a missing node")]
    fn test_edge_to_missing_node_panics() {
        let mut dag: Dag<(), ()> = Dag::new();
        let a = dag.add_node(());
        dag.add_edge(a, NodeId(7), ());
    }
}
