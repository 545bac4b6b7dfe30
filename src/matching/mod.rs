//! Maximum cardinality matching and minimum-cost perfect matching on a general
//! (non-bipartite) undirected graph (C3), via Edmonds' blossom algorithm with
//! primal-dual updates, exactly as `spec.md` §4.3 describes.
//!
//! Split the way the teacher splits its matching engine into a state module
//! (`complete_graph.rs`-style plain data) and a solver module carrying the
//! algorithm, rather than one large file.

mod solver;
mod state;

pub use solver::BlossomMatcher;
