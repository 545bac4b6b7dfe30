//! Route Constructor (C6): synthesizes a depot-rooted closed walk from the
//! LP's solution multigraph, per `spec.md` §4.6.
//!
//! The solution graph has equal in- and out-degree at every vertex by
//! construction of the symmetry constraint (C5); this module just needs to
//! walk it. Grounded on the teacher's `union_find.rs`-style preference for a
//! plain, allocation-light traversal rather than reaching for `petgraph`'s
//! graph-algorithm layer (`petgraph` stays a dev-only cross-check dependency,
//! see `DESIGN.md`).

use crate::lp::SolutionGraph;
use crate::util::{SlcError, SlcResult, VertexIndex};
use std::collections::HashMap;

/// one traversal in the final route: a directed edge plus whether it was
/// serviced (vs. a deadhead pass-through).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteStep {
    pub from: VertexIndex,
    pub to: VertexIndex,
    pub service: bool,
}

/// an ordered sequence of directed edges forming a closed walk starting and
/// ending at the depot (`spec.md` §4.6, §6 "Outputs").
#[derive(Debug, Clone)]
pub struct Route {
    pub steps: Vec<RouteStep>,
    pub depot: VertexIndex,
}

impl Route {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// builds the closed walk via Hierholzer's algorithm: repeatedly follow
/// unused edges until closing a sub-cycle, splicing sub-cycles into the
/// primary walk at their shared vertex (`spec.md` §4.6).
///
/// Fails with [`SlcError::NotEulerian`] if some vertex's in-degree and
/// out-degree (counting edge multiplicity) disagree; `spec.md` notes this
/// "should not happen given C5's post-repair" so it signals a bug upstream
/// rather than bad caller input.
pub fn construct(solution: &SolutionGraph, depot: VertexIndex, num_vertices: usize) -> SlcResult<Route> {
    let mut out_degree = vec![0usize; num_vertices];
    let mut in_degree = vec![0usize; num_vertices];
    // `remaining[v]` is the list of not-yet-walked outgoing copies from `v`,
    // each `(to, service)`, in the order `SolutionGraph::edges` pushed them.
    let mut remaining: Vec<Vec<(VertexIndex, bool)>> = vec![Vec::new(); num_vertices];

    for edge in &solution.edges {
        let count = edge.count.max(1) as usize; // service edges carry count==1 implicitly
        out_degree[edge.from as usize] += count;
        in_degree[edge.to as usize] += count;
        for _ in 0..count {
            remaining[edge.from as usize].push((edge.to, edge.service));
        }
    }

    for v in 0..num_vertices {
        if out_degree[v] != in_degree[v] {
            return Err(SlcError::NotEulerian {
                vertex: v as VertexIndex,
                in_degree: in_degree[v],
                out_degree: out_degree[v],
            });
        }
    }

    let total_edges: usize = remaining.iter().map(|v| v.len()).sum();
    if total_edges == 0 {
        return Ok(Route { steps: Vec::new(), depot });
    }

    // Hierholzer's: a stack-based walk. `cursor[v]` indexes the next untried
    // outgoing edge from `v`, consumed in order (not removed eagerly) so the
    // walk is O(n + m) rather than O(m^2) from repeated Vec::remove calls.
    //
    // Each stack entry carries the edge used to *arrive* at that vertex (`None`
    // only for the depot at the bottom of the stack). An edge is only recorded
    // into `circuit` when its destination vertex is popped — i.e. once every
    // outgoing edge from it has been exhausted — so a sub-cycle discovered
    // while backtracking through an already-visited vertex is spliced into the
    // walk at the point where that vertex is popped, not appended after the
    // point where the walk had already moved past it. Reversing the pop order
    // at the end restores forward traversal order (`spec.md` §4.6).
    let mut cursor: HashMap<VertexIndex, usize> = HashMap::new();
    let mut stack: Vec<(VertexIndex, Option<(VertexIndex, VertexIndex, bool)>)> = vec![(depot, None)];
    let mut circuit = Vec::with_capacity(total_edges);

    while let Some(&(v, arrived_via)) = stack.last() {
        let idx = *cursor.entry(v).or_insert(0);
        if idx < remaining[v as usize].len() {
            let (to, service) = remaining[v as usize][idx];
            cursor.insert(v, idx + 1);
            stack.push((to, Some((v, to, service))));
        } else {
            stack.pop();
            if let Some(edge) = arrived_via {
                circuit.push(edge);
            }
        }
    }

    debug_assert_eq!(circuit.len(), total_edges, "Hierholzer's must consume every edge when the graph is Eulerian and connected");
    circuit.reverse();
    let steps = circuit
        .into_iter()
        .map(|(from, to, service)| RouteStep { from, to, service })
        .collect();
    Ok(Route { steps, depot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::SelectedEdge;

    fn solution(edges: Vec<SelectedEdge>) -> SolutionGraph {
        SolutionGraph { edges, objective: 0.0 }
    }

    #[test]
    fn triangle_cycle_services_every_edge_once() {
        let sol = solution(vec![
            SelectedEdge { from: 0, to: 1, service: true, count: 1 },
            SelectedEdge { from: 1, to: 2, service: true, count: 1 },
            SelectedEdge { from: 2, to: 0, service: true, count: 1 },
        ]);
        let route = construct(&sol, 0, 3).unwrap();
        assert_eq!(route.steps.len(), 3);
        assert_eq!(route.steps[0].from, 0);
        assert_eq!(route.steps.last().unwrap().to, 0);
        assert!(route.steps.iter().all(|s| s.service));
    }

    #[test]
    fn path_with_deadhead_bridge_round_trips() {
        // service 0->1, deadhead 1->2, service 2->3, deadhead 3->2->1->0
        let sol = solution(vec![
            SelectedEdge { from: 0, to: 1, service: true, count: 1 },
            SelectedEdge { from: 1, to: 2, service: false, count: 1 },
            SelectedEdge { from: 2, to: 3, service: true, count: 1 },
            SelectedEdge { from: 3, to: 2, service: false, count: 1 },
            SelectedEdge { from: 2, to: 1, service: false, count: 1 },
            SelectedEdge { from: 1, to: 0, service: false, count: 1 },
        ]);
        let route = construct(&sol, 0, 4).unwrap();
        assert_eq!(route.steps.first().unwrap(), &RouteStep { from: 0, to: 1, service: true });
        assert_eq!(route.steps.last().unwrap(), &RouteStep { from: 1, to: 0, service: false });
        assert_eq!(route.steps.len(), 6);
        let serviced: Vec<_> = route.steps.iter().filter(|s| s.service).collect();
        assert_eq!(serviced.len(), 2);
    }

    #[test]
    fn multiplicity_two_bridge_is_walked_twice() {
        let sol = solution(vec![
            SelectedEdge { from: 0, to: 1, service: true, count: 1 },
            SelectedEdge { from: 1, to: 0, service: false, count: 1 },
            SelectedEdge { from: 0, to: 2, service: true, count: 1 },
            SelectedEdge { from: 2, to: 0, service: false, count: 1 },
        ]);
        let route = construct(&sol, 0, 3).unwrap();
        assert_eq!(route.steps.len(), 4);
        assert_eq!(route.steps.first().unwrap().from, 0);
        assert_eq!(route.steps.last().unwrap().to, 0);
    }

    #[test]
    fn splices_a_side_trip_at_its_branch_point() {
        // required triangle 0-1-2-0 plus a deadhead side-trip 1<->3 attached at
        // vertex 1: the DFS reaches vertex 1, takes the 1->2->0 branch first
        // (consuming it before backtracking), so the 1->3->1 side-trip can only
        // be spliced in once the walk backtracks through vertex 1 a second time.
        let sol = solution(vec![
            SelectedEdge { from: 0, to: 1, service: true, count: 1 },
            SelectedEdge { from: 1, to: 2, service: true, count: 1 },
            SelectedEdge { from: 2, to: 0, service: true, count: 1 },
            SelectedEdge { from: 1, to: 3, service: false, count: 1 },
            SelectedEdge { from: 3, to: 1, service: false, count: 1 },
        ]);
        let route = construct(&sol, 0, 4).unwrap();
        assert_eq!(route.steps.len(), 5);
        assert_eq!(route.steps.first().unwrap().from, 0);
        assert_eq!(route.steps.last().unwrap().to, 0);
        for pair in route.steps.windows(2) {
            assert_eq!(pair[0].to, pair[1].from, "route must be edge-consecutive: {:?}", route.steps);
        }
        let serviced: Vec<_> = route.steps.iter().filter(|s| s.service).map(|s| (s.from, s.to)).collect();
        assert_eq!(serviced.len(), 3);
        assert!(serviced.contains(&(0, 1)));
        assert!(serviced.contains(&(1, 2)));
        assert!(serviced.contains(&(2, 0)));
    }

    #[test]
    fn imbalanced_degree_is_not_eulerian() {
        let sol = solution(vec![
            SelectedEdge { from: 0, to: 1, service: true, count: 1 },
            SelectedEdge { from: 1, to: 2, service: true, count: 1 },
        ]);
        let err = construct(&sol, 0, 3).unwrap_err();
        assert!(matches!(err, SlcError::NotEulerian { .. }));
    }

    #[test]
    fn empty_solution_is_a_trivial_route() {
        let sol = solution(vec![]);
        let route = construct(&sol, 0, 1).unwrap();
        assert!(route.is_empty());
    }
}
