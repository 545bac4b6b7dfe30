//! Single-robot Line Coverage (SLC) core: a Rural-Postman-flavoured solver
//! that produces a minimum-cost closed walk servicing every required edge of
//! an undirected graph, starting and ending at a depot.
//!
//! The six components named in `spec.md` §2 map onto this crate's modules:
//!
//! | Component | Module |
//! |---|---|
//! | C1 BinaryHeap | [`heap`] |
//! | C2 Graph (matching view) | [`graph`] |
//! | C3 Matching Engine | [`matching`] |
//! | C4 Coverage Graph | [`coverage`] |
//! | C5 LP Formulation | [`lp`] |
//! | C6 Route Constructor | [`route`] |
//!
//! [`solver::solve`] is the single public entry point that wires all six
//! together; [`config::SolverConfig`] carries the tunable knobs (`spec.md`
//! §§4.3, 4.5, 7), and [`util::SlcError`] is the crate-wide error type every
//! fallible operation returns instead of panicking.

pub mod config;
pub mod coverage;
pub mod graph;
pub mod heap;
pub mod lp;
pub mod matching;
pub mod route;
pub mod solver;
pub mod util;

pub use config::SolverConfig;
pub use coverage::{CoverageGraph, EdgeCost, InputEdge, StaticEdgeCost};
pub use route::{Route, RouteStep};
pub use solver::{solve, SlcInstance, SlcSolution};
pub use util::{SlcError, SlcResult, VertexIndex, Weight};
