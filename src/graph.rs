//! Dense undirected simple graph for the matching engine (C2).
//!
//! Immutable once constructed, per `spec.md` §4.2: built from `n` and an edge
//! list, exposing edge-by-index, edge-by-endpoints, adjacency list, and a dense
//! adjacency matrix. Grounded on the teacher's `complete_graph.rs`, which keeps
//! the analogous "graph the matching engine consults" as a plain struct with a
//! `Vec` per vertex rather than a general-purpose graph crate; this crate makes
//! the same choice instead of taking on `petgraph` as a runtime dependency (it
//! remains a dev-dependency for cross-checking in tests, see `DESIGN.md`).

use crate::util::{EdgeIndex, VertexIndex, Weight, NO_EDGE};
use std::collections::HashMap;

/// a dense undirected simple graph with `n` vertices and `m` indexed edges,
/// as consumed by the matching engine (C3).
#[derive(Debug, Clone)]
pub struct Graph {
    n: usize,
    /// `edges[e] = (u, v)`, `u < v` not required, but `u != v` always
    edges: Vec<(VertexIndex, VertexIndex)>,
    /// per-edge cost, aligned with `edges`
    costs: Vec<Weight>,
    /// `adj_list[v]` lists the neighbours of `v`
    adj_list: Vec<Vec<VertexIndex>>,
    /// `adj_matrix[u * n + v]` is `true` iff `u` and `v` are adjacent
    adj_matrix: Vec<bool>,
    /// `edge_index[(min(u,v), max(u,v))] = e`
    edge_index: HashMap<(VertexIndex, VertexIndex), EdgeIndex>,
}

impl Graph {
    /// build the graph from `n` vertices and a list of `(u, v, cost)` edges.
    ///
    /// Panics if any edge is a self-loop or a duplicate; those represent the
    /// caller misusing the matching engine's input contract (`spec.md` §3
    /// invariant that edge indices and adjacency agree), not a runtime condition
    /// an SLC instance can legitimately produce, since C4/C5 never emit
    /// self-loops or parallel undirected edges into the matching subproblem.
    pub fn new(n: usize, edges: &[(VertexIndex, VertexIndex, Weight)]) -> Self {
        let mut adj_list = vec![Vec::new(); n];
        let mut adj_matrix = vec![false; n * n];
        let mut edge_index = HashMap::with_capacity(edges.len());
        let mut stored_edges = Vec::with_capacity(edges.len());
        let mut costs = Vec::with_capacity(edges.len());
        for &(u, v, cost) in edges {
            let (u, v) = (u as usize, v as usize);
            assert!(u != v, "self-loop at vertex {u} is not allowed in a matching graph");
            assert!(u < n && v < n, "edge ({u}, {v}) out of range for {n} vertices");
            let key = (u.min(v) as VertexIndex, u.max(v) as VertexIndex);
            assert!(!edge_index.contains_key(&key), "duplicate edge ({u}, {v})");
            let index = stored_edges.len() as EdgeIndex;
            edge_index.insert(key, index);
            stored_edges.push((u as VertexIndex, v as VertexIndex));
            costs.push(cost);
            adj_list[u].push(v as VertexIndex);
            adj_list[v].push(u as VertexIndex);
            adj_matrix[u * n + v] = true;
            adj_matrix[v * n + u] = true;
        }
        Self {
            n,
            edges: stored_edges,
            costs,
            adj_list,
            adj_matrix,
            edge_index,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.n
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edge(&self, e: EdgeIndex) -> (VertexIndex, VertexIndex) {
        self.edges[e as usize]
    }

    pub fn cost(&self, e: EdgeIndex) -> Weight {
        self.costs[e as usize]
    }

    /// `NO_EDGE` if `u` and `v` are not adjacent, symmetric and total over adjacent pairs
    pub fn edge_index(&self, u: VertexIndex, v: VertexIndex) -> EdgeIndex {
        let key = (u.min(v), u.max(v));
        *self.edge_index.get(&key).unwrap_or(&NO_EDGE)
    }

    pub fn adj_list(&self, u: VertexIndex) -> &[VertexIndex] {
        &self.adj_list[u as usize]
    }

    pub fn adjacent(&self, u: VertexIndex, v: VertexIndex) -> bool {
        self.adj_matrix[u as usize * self.n + v as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        Graph::new(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)])
    }

    #[test]
    fn edge_lookup_is_symmetric_and_total() {
        let g = triangle();
        assert_eq!(g.edge(g.edge_index(0, 1)), (0, 1));
        assert_eq!(g.edge_index(0, 1), g.edge_index(1, 0));
        assert_eq!(g.edge_index(0, 0), NO_EDGE);
    }

    #[test]
    fn adjacency_matches_edge_index() {
        let g = triangle();
        for u in 0..g.num_vertices() {
            for v in 0..g.num_vertices() {
                if u == v {
                    continue;
                }
                assert_eq!(g.adjacent(u, v), g.edge_index(u, v) != NO_EDGE);
            }
        }
    }

    #[test]
    fn adj_list_contains_every_neighbour() {
        let g = triangle();
        for v in 0..3 {
            assert_eq!(g.adj_list(v).len(), 2);
        }
    }

    #[test]
    #[should_panic(expected = "self-loop")]
    fn rejects_self_loop() {
        Graph::new(2, &[(0, 0, 1.0)]);
    }

    #[test]
    #[should_panic(expected = "duplicate edge")]
    fn rejects_duplicate_edge() {
        Graph::new(2, &[(0, 1, 1.0), (1, 0, 2.0)]);
    }

    /// cross-checks `adj_list` against an independently-built `petgraph`
    /// graph over the same edge list, so the dense adjacency representation
    /// above is validated against a general-purpose graph crate rather than
    /// only against itself.
    #[test]
    fn adj_list_matches_petgraph_neighbors() {
        use petgraph::graph::UnGraph;
        let raw_edges = [(0u32, 1u32), (1, 2), (2, 3), (3, 0), (0, 2)];
        let g = Graph::new(4, &raw_edges.iter().map(|&(u, v)| (u as usize, v as usize, 1.0)).collect::<Vec<_>>());
        let pg = UnGraph::<(), ()>::from_edges(raw_edges.iter().copied());
        for v in 0..4u32 {
            let mut ours: Vec<u32> = g.adj_list(v as usize).iter().map(|&u| u as u32).collect();
            let mut theirs: Vec<u32> = pg.neighbors(v.into()).map(|n| n.index() as u32).collect();
            ours.sort_unstable();
            theirs.sort_unstable();
            assert_eq!(ours, theirs, "adjacency mismatch at vertex {v}");
        }
    }
}
