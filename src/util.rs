//! Shared index types, numerical tolerance, and the crate-wide error type.
//!
//! Mirrors the teacher crate's convention of collecting the index/weight
//! type aliases in one `util` module so every other module imports them with
//! `use crate::util::*;` instead of repeating primitive types.

use serde::{Deserialize, Serialize};

cfg_if::cfg_if! {
    if #[cfg(feature = "u32_index")] {
        /// vertex index, `[0, n)` for a graph of `n` vertices
        pub type VertexIndex = u32;
        /// edge index into a graph's edge list, `[0, m)`
        pub type EdgeIndex = u32;
    } else {
        pub type VertexIndex = usize;
        pub type EdgeIndex = usize;
    }
}

/// edge/route cost; always finite and non-negative at the boundary (`spec.md` §6)
pub type Weight = f64;

/// absolute tolerance used by every floating-point comparison in the matching engine.
///
/// `spec.md` §4.3 requires a single consistent epsilon for `GREATER`/`NearZero`; this
/// is that one value, used nowhere else so there is never a second tolerance to drift
/// out of sync with it.
pub const EPSILON: Weight = 1e-10;

/// `a - b > EPSILON`, the one comparison predicate the matching engine may use to
/// decide slack/dual sign, per `spec.md` §4.3.
#[inline]
pub fn greater(a: Weight, b: Weight) -> bool {
    greater_eps(a, b, EPSILON)
}

/// `|x| < EPSILON`
#[inline]
pub fn near_zero(x: Weight) -> bool {
    near_zero_eps(x, EPSILON)
}

/// `greater`/`near_zero` parameterized by an explicit tolerance, so a
/// [`crate::config::SolverConfig`] override actually reaches every comparison
/// the matching engine makes instead of only the compile-time default
/// (`spec.md` §4.3: "implementers must use one consistent ε everywhere").
#[inline]
pub fn greater_eps(a: Weight, b: Weight, eps: Weight) -> bool {
    a - b > eps
}

#[inline]
pub fn near_zero_eps(x: Weight, eps: Weight) -> bool {
    x.abs() < eps
}

/// sentinel absent-index value returned by lookups such as `Graph::edge_index`
/// (`spec.md` §4.2: "returns a sentinel absent-value if not adjacent")
pub const NO_EDGE: EdgeIndex = EdgeIndex::MAX;

/// sentinel for "no predecessor" / "no mate" slots in the matching engine's arrays
pub const NONE: isize = -1;

/// the crate-wide error type; every fallible public entry point returns `Result<_, SlcError>`
/// instead of panicking, per `spec.md` §7.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SlcError {
    /// `SolveMinimumCostPerfectMatching` was asked for a perfect matching on a graph
    /// that has none (`spec.md` §4.3, §7).
    #[error("graph admits no perfect matching")]
    NoPerfectMatching,

    /// the primal-dual loop exceeded its iteration safety bound, or the LP backend
    /// reported numerical trouble, or primal/dual objectives disagreed beyond tolerance
    /// at termination (`spec.md` §9, Open Question 1).
    #[error("numerical failure: {reason}")]
    NumericalFailure { reason: String },

    /// the LP backend reported the relaxation is infeasible.
    #[error("LP relaxation is infeasible")]
    LPInfeasible,

    /// the LP backend reported the relaxation is unbounded.
    #[error("LP relaxation is unbounded")]
    LPUnbounded,

    /// the Euler constructor (C6) was handed a multigraph with imbalanced
    /// in/out-degrees; `spec.md` §4.6 notes this "should not happen given C5's
    /// post-repair" so it indicates a bug upstream rather than a user input error.
    #[error("vertex {vertex} has in-degree {in_degree} != out-degree {out_degree}, graph is not Eulerian")]
    NotEulerian {
        vertex: VertexIndex,
        in_degree: usize,
        out_degree: usize,
    },

    /// negative costs, a malformed edge list, or a missing/out-of-range depot.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}

pub type SlcResult<T> = Result<T, SlcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greater_respects_epsilon() {
        assert!(!greater(1.0, 1.0));
        assert!(!greater(1.0 + EPSILON / 2.0, 1.0));
        assert!(greater(1.0 + EPSILON * 10.0, 1.0));
    }

    #[test]
    fn near_zero_respects_epsilon() {
        assert!(near_zero(0.0));
        assert!(near_zero(EPSILON / 2.0));
        assert!(!near_zero(EPSILON * 10.0));
    }
}
