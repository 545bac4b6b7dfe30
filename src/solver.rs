//! Top-level solver facade (§6 "Inputs to the solver"/"Outputs").
//!
//! Wires the six components together exactly as `spec.md` §2's control-flow
//! paragraph describes: the coverage graph (C4) is built from the caller's
//! instance, the LP (C5) builds and solves over it — invoking the matching
//! engine (C3) during connectivity repair — and the route constructor (C6)
//! walks the resulting solution graph into a depot-rooted closed walk.
//! Grounded on the teacher's `mwpm_solver.rs`, which plays the same
//! "one-call facade over the primal/dual modules" role for MWPM.

use crate::config::SolverConfig;
use crate::coverage::{CoverageGraph, InputEdge, StaticEdgeCost};
use crate::lp::{self, SolutionGraph};
use crate::route::{self, Route};
use crate::util::{SlcResult, VertexIndex};

/// everything the solver needs about one problem instance (`spec.md` §6):
/// vertex count, depot, the raw undirected edges tagged required/non-required,
/// and the cost oracle. Vertex coordinates are accepted by the external
/// contract but "unused by the core" (§6), so they have no place here; a
/// caller-side adapter is responsible for carrying them through to whatever
/// downstream trajectory layer the route feeds.
pub struct SlcInstance {
    pub num_vertices: usize,
    pub depot: VertexIndex,
    pub edges: Vec<InputEdge>,
    pub oracle: StaticEdgeCost,
    pub config: SolverConfig,
}

/// the solver's output (`spec.md` §6 "Outputs"): the solution multigraph,
/// the route walked over it, and the total objective value.
pub struct SlcSolution {
    pub solution_graph: SolutionGraph,
    pub route: Route,
    pub objective: crate::util::Weight,
}

/// runs the full SLC pipeline over `instance`: build the coverage graph,
/// solve the LP (repairing connectivity as needed), and construct the
/// Eulerian route. Blocking and synchronous throughout (`spec.md` §5).
pub fn solve(instance: &SlcInstance) -> SlcResult<SlcSolution> {
    log::debug!(
        "building coverage graph: {} vertices, {} input edges, depot {}",
        instance.num_vertices,
        instance.edges.len(),
        instance.depot
    );
    let coverage = CoverageGraph::build(instance.num_vertices, instance.depot, &instance.edges, &instance.oracle)?;

    let resolved = instance.config.resolved(instance.num_vertices);
    let solution_graph = lp::solve(&coverage, &resolved)?;
    log::debug!(
        "LP solved: {} selected edges, objective {}",
        solution_graph.edges.len(),
        solution_graph.objective
    );

    let route = route::construct(&solution_graph, instance.depot, instance.num_vertices)?;
    log::debug!("route constructed: {} steps", route.steps.len());

    Ok(SlcSolution { objective: solution_graph.objective, solution_graph, route })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::InputEdge;

    #[test]
    fn triangle_scenario_end_to_end() {
        // spec.md §8 scenario 1: triangle, all required, unit cost.
        let edges = vec![
            InputEdge { u: 0, v: 1, required: true },
            InputEdge { u: 1, v: 2, required: true },
            InputEdge { u: 0, v: 2, required: true },
        ];
        let oracle = StaticEdgeCost::new(vec![(1.0, 1.0); 3], vec![(1.0, 1.0); 3]);
        let instance = SlcInstance {
            num_vertices: 3,
            depot: 0,
            edges,
            oracle,
            config: SolverConfig::default(),
        };
        let solution = solve(&instance).unwrap();
        assert_eq!(solution.objective, 3.0);
        assert_eq!(solution.route.steps.len(), 3);
        assert_eq!(solution.route.depot, 0);
    }

    #[test]
    fn single_required_edge_services_out_and_back() {
        let edges = vec![InputEdge { u: 0, v: 1, required: true }];
        let oracle = StaticEdgeCost::new(vec![(1.0, 1.0)], vec![(1.0, 1.0)]);
        let instance = SlcInstance {
            num_vertices: 2,
            depot: 0,
            edges,
            oracle,
            config: SolverConfig::default(),
        };
        let solution = solve(&instance).unwrap();
        assert_eq!(solution.route.steps.len(), 2);
    }

    #[test]
    fn path_with_one_deadhead_scenario_end_to_end() {
        // spec.md §8 scenario 2.
        let edges = vec![
            InputEdge { u: 0, v: 1, required: true },
            InputEdge { u: 2, v: 3, required: true },
            InputEdge { u: 1, v: 2, required: false },
        ];
        let oracle = StaticEdgeCost::new(vec![(1.0, 1.0); 2], vec![(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]);
        let instance = SlcInstance {
            num_vertices: 4,
            depot: 0,
            edges,
            oracle,
            config: SolverConfig::default(),
        };
        let solution = solve(&instance).unwrap();
        assert_eq!(solution.objective, 6.0);
        let serviced: Vec<_> = solution.solution_graph.edges.iter().filter(|e| e.service).collect();
        assert_eq!(serviced.len(), 2);
    }

    #[test]
    fn disconnected_required_edges_scenario_end_to_end() {
        // spec.md §8 scenario 5: the LP's connectivity repair forces a bridge
        // that the route then walks twice.
        let edges = vec![
            InputEdge { u: 0, v: 1, required: true },
            InputEdge { u: 2, v: 3, required: true },
            InputEdge { u: 1, v: 2, required: false },
        ];
        let oracle = StaticEdgeCost::new(vec![(1.0, 1.0); 2], vec![(1.0, 1.0); 3]);
        let instance = SlcInstance {
            num_vertices: 4,
            depot: 0,
            edges,
            oracle,
            config: SolverConfig::default(),
        };
        let solution = solve(&instance).unwrap();
        assert!(!solution.route.steps.is_empty());
        assert_eq!(solution.route.steps.first().map(|s| s.from), Some(0));
        assert_eq!(solution.route.steps.last().map(|s| s.to), Some(0));
    }
}
