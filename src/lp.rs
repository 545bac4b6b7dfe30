//! Mixed-integer LP formulation selecting service orientation and deadhead
//! flow (C5), per `spec.md` §4.5.
//!
//! The "external LP solver" of §4.5/§6 is concretely `good_lp` with the
//! `highs` backend (see `DESIGN.md`): `highs` is the one backend in the
//! retrieval pack capable of mixed-integer programs, which this formulation
//! needs for its binary service-orientation variables.

use crate::config::ResolvedConfig;
use crate::coverage::CoverageGraph;
use crate::graph::Graph;
use crate::heap::BinaryHeap;
use crate::matching::BlossomMatcher;
use crate::util::{SlcError, SlcResult, VertexIndex, Weight};
use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel, Variable};
use std::collections::HashMap;

/// one directed traversal actually selected by the LP, with its multiplicity
/// (always 1 for service edges, a non-negative integer count for deadhead).
#[derive(Debug, Clone, Copy)]
pub struct SelectedEdge {
    pub from: VertexIndex,
    pub to: VertexIndex,
    pub service: bool,
    pub count: u32,
}

/// the LP's output: a directed multigraph (in-degree == out-degree at every
/// vertex, by construction of the symmetry constraint) and its objective.
pub struct SolutionGraph {
    pub edges: Vec<SelectedEdge>,
    pub objective: Weight,
}

/// solves the coverage LP over `coverage`, repairing connectivity by adding
/// bridging deadhead traversals (found via a minimum-cost T-join over the
/// matching engine, C3) until the induced subgraph is connected or the
/// configured repair bound is exhausted.
pub fn solve(coverage: &CoverageGraph, config: &ResolvedConfig) -> SlcResult<SolutionGraph> {
    let required_edges: Vec<usize> = coverage
        .edges()
        .iter()
        .filter(|e| e.required)
        .map(|e| e.input_edge)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    // `forced[(u, v)]` is the number of extra deadhead traversals the
    // connectivity-repair loop has pinned onto directed edge `(u, v)` so far.
    let mut forced: HashMap<(VertexIndex, VertexIndex), u32> = HashMap::new();

    for attempt in 0..=config.max_connectivity_repairs {
        let built = build_and_solve(coverage, &required_edges, &forced)?;
        let components = required_components(coverage, &built.edges, &required_edges);
        if components.len() <= 1 {
            return Ok(built);
        }
        if attempt == config.max_connectivity_repairs {
            return Err(SlcError::NumericalFailure {
                reason: format!(
                    "connectivity repair did not converge after {} attempts ({} required components remain)",
                    config.max_connectivity_repairs,
                    components.len()
                ),
            });
        }
        let bridge = minimum_cost_bridging(coverage, &components, config)?;
        for (u, v) in bridge {
            *forced.entry((u, v)).or_insert(0) += 1;
        }
    }
    unreachable!("loop always returns or errors within max_connectivity_repairs + 1 attempts")
}

/// builds one LP instance over `coverage` — binary service variables, integer
/// deadhead variables, service and flow-balance (symmetry) constraints, plus
/// any `forced` lower bounds pinned by a previous connectivity-repair
/// iteration — and solves it once.
fn build_and_solve(
    coverage: &CoverageGraph,
    required_edges: &[usize],
    forced: &HashMap<(VertexIndex, VertexIndex), u32>,
) -> SlcResult<SolutionGraph> {
    let mut vars = ProblemVariables::new();
    let mut service_vars: HashMap<(usize, bool), Variable> = HashMap::new();
    let mut deadhead_vars: HashMap<(VertexIndex, VertexIndex), Variable> = HashMap::new();
    let mut objective = Expression::from(0.0);

    for edge in coverage.edges() {
        let key = (edge.from, edge.to);
        if edge.required {
            let var = vars.add(variable().binary());
            objective += var * edge.service_cost;
            service_vars.insert((edge.input_edge, edge.from < edge.to), var);
        }
        let dh_var = vars.add(variable().integer().min(0));
        objective += dh_var * edge.deadhead_cost;
        deadhead_vars.insert(key, dh_var);
    }

    let problem = vars.minimise(objective.clone());
    let mut model = problem.using(good_lp::default_solver);

    // service constraint: exactly one orientation serviced per required edge
    for &input_edge in required_edges {
        let (fwd, rev) = coverage.directed_pair(input_edge);
        let fwd_var = *service_vars.get(&(input_edge, fwd.from < fwd.to)).expect("service var must exist");
        let rev_var = *service_vars.get(&(input_edge, rev.from < rev.to)).expect("service var must exist");
        model = model.with(constraint!(fwd_var + rev_var == 1.0));
    }

    // symmetry / flow balance: in-degree == out-degree at every vertex
    for v in 0..coverage.num_vertices() {
        let mut outgoing = Expression::from(0.0);
        let mut incoming = Expression::from(0.0);
        for edge in coverage.edges() {
            let dh_var = deadhead_vars[&(edge.from, edge.to)];
            let term: Expression = if edge.required {
                let svc_var = service_vars[&(edge.input_edge, edge.from < edge.to)];
                Expression::from(svc_var) + dh_var
            } else {
                Expression::from(dh_var)
            };
            if edge.from as usize == v {
                outgoing += term;
            } else if edge.to as usize == v {
                incoming += term;
            }
        }
        model = model.with(constraint!(outgoing == incoming));
    }

    // forced lower bounds from a prior connectivity-repair iteration
    for (&(u, v), &count) in forced {
        if let Some(&dh_var) = deadhead_vars.get(&(u, v)) {
            model = model.with(constraint!(dh_var >= count as f64));
        }
    }

    let solution = model.solve().map_err(|err| match err {
        good_lp::ResolutionError::Infeasible => SlcError::LPInfeasible,
        good_lp::ResolutionError::Unbounded => SlcError::LPUnbounded,
        other => SlcError::NumericalFailure { reason: other.to_string() },
    })?;

    let mut edges = Vec::new();
    for edge in coverage.edges() {
        if edge.required {
            let svc_var = service_vars[&(edge.input_edge, edge.from < edge.to)];
            if solution.value(svc_var) > 0.5 {
                edges.push(SelectedEdge { from: edge.from, to: edge.to, service: true, count: 1 });
            }
        }
        let dh_var = deadhead_vars[&(edge.from, edge.to)];
        let count = solution.value(dh_var).round();
        if count > 0.5 {
            edges.push(SelectedEdge { from: edge.from, to: edge.to, service: false, count: count as u32 });
        }
    }
    let objective_value = solution.eval(objective);
    Ok(SolutionGraph { edges, objective: objective_value })
}

/// connected components of the induced undirected subgraph, restricted to
/// the set of vertices incident on at least one required edge (`spec.md`
/// §4.5: "the induced service+deadhead subgraph is inspected for
/// connectivity among required-edge endpoints").
fn required_components(
    coverage: &CoverageGraph,
    selected: &[SelectedEdge],
    required_edges: &[usize],
) -> Vec<Vec<VertexIndex>> {
    let mut required_vertices: std::collections::BTreeSet<VertexIndex> = std::collections::BTreeSet::new();
    for &input_edge in required_edges {
        let (fwd, _) = coverage.directed_pair(input_edge);
        required_vertices.insert(fwd.from);
        required_vertices.insert(fwd.to);
    }

    let mut adjacency: HashMap<VertexIndex, Vec<VertexIndex>> = HashMap::new();
    for edge in selected {
        adjacency.entry(edge.from).or_default().push(edge.to);
        adjacency.entry(edge.to).or_default().push(edge.from);
    }

    let mut visited = std::collections::HashSet::new();
    let mut components = Vec::new();
    for &start in &required_vertices {
        if visited.contains(&start) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(v) = stack.pop() {
            component.push(v);
            for &next in adjacency.get(&v).into_iter().flatten() {
                if required_vertices.contains(&next) && visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        components.push(component);
    }
    components
}

/// finds a minimum-cost set of bridging directed edges, one per pair in a
/// minimum-cost perfect matching (via C3) over one representative vertex per
/// disconnected component, each pair joined by its Dijkstra shortest path
/// over deadhead costs (`spec.md` §4.5: "the MCPM engine is used during the
/// connectivity-repair loop to compute a minimum-cost T-join").
fn minimum_cost_bridging(
    coverage: &CoverageGraph,
    components: &[Vec<VertexIndex>],
    config: &ResolvedConfig,
) -> SlcResult<Vec<(VertexIndex, VertexIndex)>> {
    let mut representatives: Vec<VertexIndex> = components.iter().map(|c| c[0]).collect();
    if representatives.len() % 2 != 0 {
        // pad with the depot so the T-join has an even number of terminals;
        // if the depot is already a representative this is a harmless no-op
        // duplicate that the matching engine still pairs validly.
        representatives.push(coverage.depot());
    }

    let mut distances = vec![vec![0.0; representatives.len()]; representatives.len()];
    let mut paths: HashMap<(usize, usize), Vec<(VertexIndex, VertexIndex)>> = HashMap::new();
    for (i, &source) in representatives.iter().enumerate() {
        let (dist, prev) = dijkstra(coverage, source);
        for (j, &target) in representatives.iter().enumerate() {
            if i == j {
                continue;
            }
            distances[i][j] = dist[target as usize];
            paths.insert((i, j), reconstruct_path(source, target, &prev)?);
        }
    }

    let k = representatives.len();
    let mut complete_edges = Vec::new();
    for i in 0..k {
        for j in (i + 1)..k {
            complete_edges.push((i as VertexIndex, j as VertexIndex, distances[i][j]));
        }
    }
    let complete_graph = Graph::new(k, &complete_edges);
    let costs: Vec<Weight> = complete_edges.iter().map(|e| e.2).collect();
    let mut matcher = BlossomMatcher::with_epsilon(k, complete_edges.len(), k.max(1).pow(3).max(64), config.epsilon);
    let (matched, _) = matcher
        .solve_minimum_cost_perfect_matching(&complete_graph, &costs)
        .map_err(|_| SlcError::NoPerfectMatching)?;

    let mut bridge = Vec::new();
    for e in matched {
        let (i, j) = complete_graph.edge(e);
        let path = paths.get(&(i as usize, j as usize)).expect("path must have been recorded");
        bridge.extend(path.iter().copied());
    }
    Ok(bridge)
}

/// single-source shortest paths over the coverage graph's undirected
/// skeleton (C1's addressable heap drives the usual Dijkstra relaxation
/// loop), weighted by the cheaper deadhead direction per edge.
fn dijkstra(coverage: &CoverageGraph, source: VertexIndex) -> (Vec<Weight>, Vec<Option<(VertexIndex, VertexIndex)>>) {
    let n = coverage.num_vertices();
    let mut adjacency: Vec<Vec<(VertexIndex, Weight)>> = vec![Vec::new(); n];
    for &(u, v, cost) in coverage.raw_edges() {
        adjacency[u as usize].push((v, cost));
        adjacency[v as usize].push((u, cost));
    }

    let mut dist = vec![Weight::INFINITY; n];
    let mut prev: Vec<Option<(VertexIndex, VertexIndex)>> = vec![None; n];
    let mut heap = BinaryHeap::new(n);
    dist[source as usize] = 0.0;
    heap.insert(0.0, source as usize);
    let mut settled = vec![false; n];

    while let Some(u) = heap.delete_min() {
        if settled[u] {
            continue;
        }
        settled[u] = true;
        for &(v, cost) in &adjacency[u] {
            let candidate = dist[u] + cost;
            if candidate < dist[v as usize] {
                dist[v as usize] = candidate;
                prev[v as usize] = Some((u as VertexIndex, v));
                if heap.contains(v as usize) {
                    heap.update(v as usize, candidate);
                } else {
                    heap.insert(candidate, v as usize);
                }
            }
        }
    }
    (dist, prev)
}

/// reconstructs the Dijkstra shortest path from `source` to `target` over
/// `prev`. `target` can be genuinely unreachable from `source` in the raw
/// input graph (two required components with no connecting edge at all, not
/// merely disconnected in the current LP solution); that is valid, if
/// pathological, caller input, so it is reported as
/// [`SlcError::NumericalFailure`] rather than panicking (`spec.md` §7).
fn reconstruct_path(
    source: VertexIndex,
    target: VertexIndex,
    prev: &[Option<(VertexIndex, VertexIndex)>],
) -> SlcResult<Vec<(VertexIndex, VertexIndex)>> {
    let mut path = Vec::new();
    let mut cur = target;
    while cur != source {
        let (u, v) = prev[cur as usize].ok_or_else(|| SlcError::NumericalFailure {
            reason: format!(
                "no path from vertex {source} to vertex {target}; the required edges are not connected in the input graph"
            ),
        })?;
        path.push((u, v));
        cur = u;
    }
    path.reverse();
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{InputEdge, StaticEdgeCost};

    #[test]
    fn triangle_all_required_services_every_edge() {
        let inputs = [
            InputEdge { u: 0, v: 1, required: true },
            InputEdge { u: 1, v: 2, required: true },
            InputEdge { u: 0, v: 2, required: true },
        ];
        let oracle = StaticEdgeCost::new(vec![(1.0, 1.0); 3], vec![(1.0, 1.0); 3]);
        let coverage = CoverageGraph::build(3, 0, &inputs, &oracle).unwrap();
        let config = ResolvedConfig {
            epsilon: crate::util::EPSILON,
            max_matching_iterations: 64,
            max_connectivity_repairs: 3,
        };
        let solution = solve(&coverage, &config).unwrap();
        let serviced: Vec<_> = solution.edges.iter().filter(|e| e.service).collect();
        assert_eq!(serviced.len(), 3);
        assert_eq!(solution.objective, 3.0);
    }

    #[test]
    fn disconnected_required_edges_trigger_a_bridge() {
        let inputs = [
            InputEdge { u: 0, v: 1, required: true },
            InputEdge { u: 2, v: 3, required: true },
            InputEdge { u: 1, v: 2, required: false },
        ];
        let oracle = StaticEdgeCost::new(vec![(1.0, 1.0); 2], vec![(1.0, 1.0); 3]);
        let coverage = CoverageGraph::build(4, 0, &inputs, &oracle).unwrap();
        let config = ResolvedConfig {
            epsilon: crate::util::EPSILON,
            max_matching_iterations: 64,
            max_connectivity_repairs: 4,
        };
        let solution = solve(&coverage, &config).unwrap();
        let bridge_uses: u32 = solution
            .edges
            .iter()
            .filter(|e| !e.service && ((e.from == 1 && e.to == 2) || (e.from == 2 && e.to == 1)))
            .map(|e| e.count)
            .sum();
        assert!(bridge_uses >= 2, "expected the bridge to be traversed at least twice, got {bridge_uses}");
    }

    #[test]
    fn required_components_with_no_connecting_edge_at_all_is_a_numerical_failure() {
        // two required edges with no edge of any kind joining their vertex
        // sets: connectivity repair cannot bridge a gap the raw input graph
        // doesn't have, so this must surface as an error, not panic.
        let inputs = [
            InputEdge { u: 0, v: 1, required: true },
            InputEdge { u: 2, v: 3, required: true },
        ];
        let oracle = StaticEdgeCost::new(vec![(1.0, 1.0); 2], vec![(1.0, 1.0); 2]);
        let coverage = CoverageGraph::build(4, 0, &inputs, &oracle).unwrap();
        let config = ResolvedConfig {
            epsilon: crate::util::EPSILON,
            max_matching_iterations: 64,
            max_connectivity_repairs: 4,
        };
        let result = solve(&coverage, &config);
        match result {
            Err(SlcError::NumericalFailure { .. }) => {}
            Err(other) => panic!("expected NumericalFailure, got a different error: {other}"),
            Ok(_) => panic!("expected NumericalFailure, the two required edges share no connecting edge at all"),
        }
    }
}
