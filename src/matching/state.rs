//! The matching engine's arena-allocated state, exactly as `spec.md` §3 names it:
//! a flat integer-index space `[0, 2n)` where `[0, n)` are original vertices and
//! `[n, 2n)` are blossom pseudo-vertices recycled through a free-list, per the
//! design note in `spec.md` §9 ("Blossoms as arena-allocated nodes").

use crate::util::{Weight, NONE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Unlabeled = 0,
    Odd = 1,
    Even = 2,
}

/// per-instance matching state, reinitialized at the start of every
/// `SolveMinimumCostPerfectMatching`/`SolveMaximumMatching` call (`spec.md` §3,
/// "Lifecycle").
pub struct MatchingState {
    pub n: usize,
    pub cap: usize,

    pub outer: Vec<usize>,
    pub deep: Vec<Vec<usize>>,
    pub shallow: Vec<Vec<usize>>,
    pub tip: Vec<usize>,
    pub active: Vec<bool>,
    pub label: Vec<Label>,
    pub forest: Vec<isize>,
    pub root: Vec<isize>,
    pub mate: Vec<isize>,
    pub blocked: Vec<bool>,
    pub dual: Vec<Weight>,
    pub slack: Vec<Weight>,
    pub free: Vec<usize>,
}

impl MatchingState {
    pub fn new(n: usize, m: usize) -> Self {
        let cap = 2 * n;
        let mut state = Self {
            n,
            cap,
            outer: vec![0; cap],
            deep: vec![Vec::new(); cap],
            shallow: vec![Vec::new(); cap],
            tip: vec![0; cap],
            active: vec![false; cap],
            label: vec![Label::Unlabeled; cap],
            forest: vec![NONE; cap],
            root: vec![NONE; cap],
            mate: vec![NONE; cap],
            blocked: vec![false; cap],
            dual: vec![0.0; cap],
            slack: vec![0.0; m],
            free: Vec::with_capacity(n),
        };
        state.clear();
        state
    }

    /// reset every array to the empty-matching, no-blossoms starting point, the
    /// arena's equivalent of the teacher's `clear()` pattern (`complete_graph.rs`,
    /// `union_find.rs`) used to reuse allocations across calls (`spec.md` §5).
    pub fn clear(&mut self) {
        for v in 0..self.n {
            self.outer[v] = v;
            self.deep[v] = vec![v];
            self.shallow[v] = Vec::new();
            self.tip[v] = v;
            self.active[v] = true;
            self.label[v] = Label::Unlabeled;
            self.forest[v] = NONE;
            self.root[v] = NONE;
            self.mate[v] = NONE;
            self.blocked[v] = false;
            self.dual[v] = 0.0;
        }
        self.free.clear();
        for b in self.n..self.cap {
            self.active[b] = false;
            self.deep[b] = Vec::new();
            self.shallow[b] = Vec::new();
            self.dual[b] = 0.0;
            self.blocked[b] = false;
            self.free.push(b);
        }
        // recycle blossom indices in increasing order so that the lowest free
        // index is always handed out first; this keeps runs deterministic given
        // a deterministic heuristic tie-break (`spec.md` §5 "Ordering guarantees").
        self.free.reverse();
    }

    pub fn alloc_blossom(&mut self) -> usize {
        self.free.pop().expect("blossom pseudo-vertex arena exhausted")
    }

    pub fn free_blossom(&mut self, b: usize) {
        debug_assert!(b >= self.n, "only pseudo-vertices are recycled");
        self.active[b] = false;
        self.deep[b].clear();
        self.shallow[b].clear();
        self.free.push(b);
    }

    /// every currently live top-level (outer) id: original vertices not absorbed
    /// into any blossom, plus the active blossom ids that still name themselves.
    pub fn outer_ids(&self) -> Vec<usize> {
        (0..self.cap).filter(|&id| self.active[id] && self.outer[id] == id).collect()
    }

    pub fn is_perfect(&self) -> bool {
        self.outer_ids().iter().all(|&id| self.mate[id] != NONE)
    }
}
