//! Directed coverage multigraph of service and deadhead edges (C4).
//!
//! Built from a raw undirected input graph plus a pluggable [`EdgeCost`]
//! oracle, per `spec.md` §4.4. Each undirected input edge becomes either one
//! required pair of mirrored service-or-deadhead directed copies (if
//! `required`), or one pair of deadhead-only directed copies (if not).

use crate::util::{SlcError, SlcResult, VertexIndex, Weight};
use std::cell::Cell;

/// an undirected segment of the raw input graph, before it is expanded into
/// directed coverage edges.
#[derive(Debug, Clone, Copy)]
pub struct InputEdge {
    pub u: VertexIndex,
    pub v: VertexIndex,
    pub required: bool,
}

/// caller-supplied costs for one undirected segment; `spec.md` §4.4/§6:
/// "`serviceCost(edge) → (fwd, rev)` and `deadheadCost(edge) → (fwd, rev)`".
/// `turnCost` is out of scope for this core and is always treated as zero
/// (`spec.md` §4.4: "accepted but passed through as zero when absent").
pub trait EdgeCost {
    /// cost to traverse the edge while servicing it, `(u -> v, v -> u)`.
    /// Only called for `required` edges.
    fn service_cost(&self, edge: &InputEdge) -> (Weight, Weight);
    /// cost to traverse the edge without servicing it, `(u -> v, v -> u)`.
    fn deadhead_cost(&self, edge: &InputEdge) -> (Weight, Weight);
}

/// default [`EdgeCost`] implementation: costs are supplied directly per edge
/// at construction time rather than computed from geometry or a callback
/// (`spec.md` §4.4 specifies the oracle only as a trait boundary; this is the
/// one first-party implementation needed to run the core end to end — a
/// caller may supply any other [`EdgeCost`] implementor to
/// [`CoverageGraph::build`] instead).
///
/// Costs are consulted in the same order [`CoverageGraph::build`] walks its
/// input edges (`service[i]`/`deadhead[i]` aligned positionally with the
/// `i`-th required / `i`-th overall input edge), so the two internal
/// [`Cell`] cursors advance one call per edge rather than indexing by an
/// edge identity the trait's `&InputEdge` parameter doesn't carry.
pub struct StaticEdgeCost {
    service: Vec<(Weight, Weight)>,
    deadhead: Vec<(Weight, Weight)>,
    service_cursor: Cell<usize>,
    deadhead_cursor: Cell<usize>,
}

impl StaticEdgeCost {
    pub fn new(service: Vec<(Weight, Weight)>, deadhead: Vec<(Weight, Weight)>) -> Self {
        Self {
            service,
            deadhead,
            service_cursor: Cell::new(0),
            deadhead_cursor: Cell::new(0),
        }
    }
}

impl EdgeCost for StaticEdgeCost {
    /// returns `(NaN, NaN)` once the supplied `service` list is exhausted;
    /// [`CoverageGraph::build`]'s per-edge [`check_cost`] rejects non-finite
    /// costs as [`SlcError::InvalidInput`], so a caller-supplied cost list
    /// that is too short for its required-edge count surfaces as an error
    /// rather than an out-of-bounds panic.
    fn service_cost(&self, _edge: &InputEdge) -> (Weight, Weight) {
        let i = self.service_cursor.get();
        self.service_cursor.set(i + 1);
        self.service.get(i).copied().unwrap_or((Weight::NAN, Weight::NAN))
    }

    /// same exhaustion behaviour as [`Self::service_cost`], over `deadhead`.
    fn deadhead_cost(&self, _edge: &InputEdge) -> (Weight, Weight) {
        let i = self.deadhead_cursor.get();
        self.deadhead_cursor.set(i + 1);
        self.deadhead.get(i).copied().unwrap_or((Weight::NAN, Weight::NAN))
    }
}

/// one directed traversal option in the coverage multigraph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageEdge {
    pub from: VertexIndex,
    pub to: VertexIndex,
    pub required: bool,
    pub service_cost: Weight,
    pub deadhead_cost: Weight,
    /// index into the undirected input edge list this copy was derived from;
    /// used by the LP (C5) to tie `x^+`/`x^-`/`y^+`/`y^-` variables back to a
    /// single service/symmetry constraint per undirected edge.
    pub input_edge: usize,
}

/// the directed multigraph C5 builds its LP over: for each undirected input
/// edge, one mirrored pair of directed [`CoverageEdge`]s in each feasible
/// role (service, if required; deadhead, always).
pub struct CoverageGraph {
    n: usize,
    edges: Vec<CoverageEdge>,
    depot: VertexIndex,
    /// the raw undirected edges the directed copies were derived from, with
    /// the cheaper of the two deadhead directions; used by the LP's
    /// connectivity-repair loop (C5) to run Dijkstra when it needs a bridging
    /// path between disconnected required components.
    raw_edges: Vec<(VertexIndex, VertexIndex, Weight)>,
}

impl CoverageGraph {
    /// builds the coverage graph from `n` vertices, a depot, the raw
    /// undirected edges, and a pluggable cost oracle (`spec.md` §4.4/§6: "a
    /// pluggable EdgeCost oracle" — any [`EdgeCost`] implementor may be
    /// passed, not only [`StaticEdgeCost`]). Costs must be finite and
    /// non-negative (`spec.md` §6); violations, including an oracle that runs
    /// out of costs before every edge is consulted, are reported as
    /// [`SlcError::InvalidInput`] rather than panicking, since they can
    /// originate directly from caller-supplied data.
    pub fn build<C: EdgeCost>(n: usize, depot: VertexIndex, inputs: &[InputEdge], oracle: &C) -> SlcResult<Self> {
        if depot as usize >= n {
            return Err(SlcError::InvalidInput {
                reason: format!("depot {depot} out of range for {n} vertices"),
            });
        }

        let mut edges = Vec::with_capacity(inputs.len() * 2);
        for (i, input) in inputs.iter().enumerate() {
            if input.u as usize >= n || input.v as usize >= n {
                return Err(SlcError::InvalidInput {
                    reason: format!("edge ({}, {}) out of range for {n} vertices", input.u, input.v),
                });
            }
            if input.u == input.v {
                return Err(SlcError::InvalidInput {
                    reason: format!("self-loop at vertex {} is not a valid coverage edge", input.u),
                });
            }
            let (dh_fwd, dh_rev) = oracle.deadhead_cost(input);
            check_cost(dh_fwd)?;
            check_cost(dh_rev)?;

            if input.required {
                let (svc_fwd, svc_rev) = oracle.service_cost(input);
                check_cost(svc_fwd)?;
                check_cost(svc_rev)?;
                edges.push(CoverageEdge {
                    from: input.u,
                    to: input.v,
                    required: true,
                    service_cost: svc_fwd,
                    deadhead_cost: dh_fwd,
                    input_edge: i,
                });
                edges.push(CoverageEdge {
                    from: input.v,
                    to: input.u,
                    required: true,
                    service_cost: svc_rev,
                    deadhead_cost: dh_rev,
                    input_edge: i,
                });
            } else {
                edges.push(CoverageEdge {
                    from: input.u,
                    to: input.v,
                    required: false,
                    service_cost: 0.0,
                    deadhead_cost: dh_fwd,
                    input_edge: i,
                });
                edges.push(CoverageEdge {
                    from: input.v,
                    to: input.u,
                    required: false,
                    service_cost: 0.0,
                    deadhead_cost: dh_rev,
                    input_edge: i,
                });
            }
        }

        let raw_edges = inputs
            .iter()
            .zip(edges.chunks(2))
            .map(|(input, pair)| (input.u, input.v, pair[0].deadhead_cost.min(pair[1].deadhead_cost)))
            .collect();

        Ok(Self { n, edges, depot, raw_edges })
    }

    /// the undirected skeleton of the coverage graph, with the cheaper of the
    /// two deadhead directions per edge; used to find bridging paths during
    /// connectivity repair (C5).
    pub fn raw_edges(&self) -> &[(VertexIndex, VertexIndex, Weight)] {
        &self.raw_edges
    }

    pub fn num_vertices(&self) -> usize {
        self.n
    }

    pub fn depot(&self) -> VertexIndex {
        self.depot
    }

    pub fn edges(&self) -> &[CoverageEdge] {
        &self.edges
    }

    /// the two directed copies (`+`, then `-`) derived from undirected input
    /// edge `i`, in the order `CoverageGraph::build` pushed them.
    pub fn directed_pair(&self, input_edge: usize) -> (&CoverageEdge, &CoverageEdge) {
        let pos = self.edges.iter().position(|e| e.input_edge == input_edge).expect("input_edge out of range");
        (&self.edges[pos], &self.edges[pos + 1])
    }
}

fn check_cost(cost: Weight) -> SlcResult<()> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(SlcError::InvalidInput {
            reason: format!("edge cost {cost} must be finite and non-negative"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_all_required_builds_six_directed_edges() {
        let inputs = [
            InputEdge { u: 0, v: 1, required: true },
            InputEdge { u: 1, v: 2, required: true },
            InputEdge { u: 0, v: 2, required: true },
        ];
        let oracle = StaticEdgeCost::new(vec![(1.0, 1.0); 3], vec![(1.0, 1.0); 3]);
        let graph = CoverageGraph::build(3, 0, &inputs, &oracle).unwrap();
        assert_eq!(graph.edges().len(), 6);
        assert!(graph.edges().iter().all(|e| e.required));
    }

    #[test]
    fn non_required_edge_has_no_service_cost() {
        let inputs = [InputEdge { u: 1, v: 2, required: false }];
        let oracle = StaticEdgeCost::new(vec![], vec![(1.0, 1.0)]);
        let graph = CoverageGraph::build(3, 0, &inputs, &oracle).unwrap();
        assert!(graph.edges().iter().all(|e| !e.required && e.service_cost == 0.0));
    }

    #[test]
    fn rejects_negative_cost() {
        let inputs = [InputEdge { u: 0, v: 1, required: true }];
        let oracle = StaticEdgeCost::new(vec![(-1.0, 1.0)], vec![(1.0, 1.0)]);
        assert!(matches!(
            CoverageGraph::build(2, 0, &inputs, &oracle),
            Err(SlcError::InvalidInput { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_depot() {
        let inputs = [InputEdge { u: 0, v: 1, required: true }];
        let oracle = StaticEdgeCost::new(vec![(1.0, 1.0)], vec![(1.0, 1.0)]);
        assert!(matches!(
            CoverageGraph::build(2, 5, &inputs, &oracle),
            Err(SlcError::InvalidInput { .. })
        ));
    }

    #[test]
    fn rejects_an_oracle_that_runs_out_of_service_costs() {
        let inputs = [
            InputEdge { u: 0, v: 1, required: true },
            InputEdge { u: 1, v: 2, required: true },
        ];
        // only one service cost for two required edges
        let oracle = StaticEdgeCost::new(vec![(1.0, 1.0)], vec![(1.0, 1.0); 2]);
        assert!(matches!(
            CoverageGraph::build(3, 0, &inputs, &oracle),
            Err(SlcError::InvalidInput { .. })
        ));
    }

    /// a unit-cost oracle that is not [`StaticEdgeCost`], proving
    /// [`CoverageGraph::build`] is generic over any [`EdgeCost`] implementor
    /// rather than hardwired to the one first-party oracle (`spec.md` §4.4:
    /// "a pluggable EdgeCost oracle").
    struct UnitCost;

    impl EdgeCost for UnitCost {
        fn service_cost(&self, _edge: &InputEdge) -> (Weight, Weight) {
            (1.0, 1.0)
        }
        fn deadhead_cost(&self, _edge: &InputEdge) -> (Weight, Weight) {
            (1.0, 1.0)
        }
    }

    #[test]
    fn build_accepts_a_non_static_edge_cost_oracle() {
        let inputs = [
            InputEdge { u: 0, v: 1, required: true },
            InputEdge { u: 1, v: 2, required: false },
        ];
        let graph = CoverageGraph::build(3, 0, &inputs, &UnitCost).unwrap();
        assert_eq!(graph.edges().len(), 4);
        assert!(graph.edges().iter().all(|e| e.deadhead_cost == 1.0));
    }
}
