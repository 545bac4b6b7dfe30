//! The primal-dual blossom algorithm itself (`spec.md` §4.3).

use super::state::{Label, MatchingState};
use crate::graph::Graph;
use crate::heap::BinaryHeap;
use crate::util::{EdgeIndex, SlcError, SlcResult, Weight, EPSILON, NONE};
use std::collections::VecDeque;

/// owns the matching arena and runs the algorithm over a caller-supplied,
/// non-owning [`Graph`] reference passed to each solve call (`spec.md` §9: "the
/// matching engine holds a non-owning reference to its input graph").
pub struct BlossomMatcher {
    state: MatchingState,
    max_iterations: usize,
    epsilon: Weight,
}

impl BlossomMatcher {
    pub fn new(n: usize, m: usize, max_iterations: usize) -> Self {
        Self::with_epsilon(n, m, max_iterations, EPSILON)
    }

    /// same as [`Self::new`] but with an explicit tolerance instead of
    /// [`crate::util::EPSILON`], threaded from a [`crate::config::ResolvedConfig`]
    /// so a caller override actually reaches every slack/dual comparison.
    pub fn with_epsilon(n: usize, m: usize, max_iterations: usize, epsilon: Weight) -> Self {
        Self {
            state: MatchingState::new(n, m),
            max_iterations,
            epsilon,
        }
    }

    #[inline]
    fn greater(&self, a: Weight, b: Weight) -> bool {
        crate::util::greater_eps(a, b, self.epsilon)
    }

    #[inline]
    fn near_zero(&self, x: Weight) -> bool {
        crate::util::near_zero_eps(x, self.epsilon)
    }

    /// grows an alternating forest from every unmatched vertex and augments along
    /// any found augmenting path until none remains; ignores edge costs. Never
    /// fails (`spec.md` §4.3).
    pub fn solve_maximum_matching(&mut self, graph: &Graph) -> Vec<EdgeIndex> {
        self.state.clear();
        // every edge tight, nothing blocked: this degenerates the primal-dual
        // machinery into plain unweighted blossom-augmenting search.
        for slack in self.state.slack.iter_mut() {
            *slack = 0.0;
        }
        self.grow_phase(graph);
        self.finalize_matching(graph);
        self.collect_matched_edges(graph)
    }

    /// runs the full primal-dual loop of `spec.md` §4.3 until the matching is
    /// perfect among tight edges, or fails with [`SlcError::NoPerfectMatching`] /
    /// [`SlcError::NumericalFailure`].
    pub fn solve_minimum_cost_perfect_matching(
        &mut self,
        graph: &Graph,
        costs: &[Weight],
    ) -> SlcResult<(Vec<EdgeIndex>, Weight)> {
        assert_eq!(costs.len(), graph.num_edges(), "one cost per edge required");
        if graph.num_vertices() % 2 != 0 {
            return Err(SlcError::NoPerfectMatching);
        }
        // up-front feasibility check: spec.md §4.3 "fails once, up front ... when
        // a preliminary maximum-matching pass does not match every vertex."
        let max_matching = self.solve_maximum_matching(graph);
        if max_matching.len() * 2 != graph.num_vertices() {
            return Err(SlcError::NoPerfectMatching);
        }

        self.state.clear();
        self.state.slack.copy_from_slice(costs);

        let mut iterations = 0usize;
        while !self.state.is_perfect() {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(SlcError::NumericalFailure {
                    reason: format!("primal-dual loop exceeded safety bound of {} iterations", self.max_iterations),
                });
            }
            self.heuristic_phase(graph);
            if self.state.is_perfect() {
                break;
            }
            self.grow_phase(graph);
            if self.state.is_perfect() {
                break;
            }
            self.update_dual_costs(graph)?;
            self.reset_phase();
        }

        self.finalize_matching(graph);
        let matched_edges = self.collect_matched_edges(graph);
        let primal_objective: Weight = matched_edges.iter().map(|&e| costs[e as usize]).sum();
        let dual_objective = self.dual_objective();
        if !near_value(primal_objective, dual_objective) {
            return Err(SlcError::NumericalFailure {
                reason: format!(
                    "primal objective {primal_objective} does not match dual objective {dual_objective} within tolerance"
                ),
            });
        }
        Ok((matched_edges, primal_objective))
    }

    // ---- phase 1: Heuristic ----------------------------------------------------

    fn heuristic_phase(&mut self, graph: &Graph) {
        let outer_ids = self.state.outer_ids();
        let index_of: std::collections::HashMap<usize, usize> =
            outer_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); outer_ids.len()];
        for e in 0..graph.num_edges() {
            if !self.near_zero(self.state.slack[e]) {
                continue;
            }
            let (u, v) = graph.edge(e as EdgeIndex);
            let (ou, ov) = (self.state.outer[u as usize], self.state.outer[v as usize]);
            if ou == ov || self.state.blocked[ou] || self.state.blocked[ov] {
                continue;
            }
            let (iu, iv) = (index_of[&ou], index_of[&ov]);
            neighbors[iu].push(iv);
            neighbors[iv].push(iu);
        }

        let mut heap = BinaryHeap::new(outer_ids.len());
        for (i, &id) in outer_ids.iter().enumerate() {
            if self.state.mate[id] == NONE {
                heap.insert(neighbors[i].len() as Weight, i);
            }
        }
        while let Some(i) = heap.delete_min() {
            let id = outer_ids[i];
            if self.state.mate[id] != NONE {
                continue;
            }
            let mut best: Option<usize> = None;
            for &j in &neighbors[i] {
                let neighbor_id = outer_ids[j];
                if self.state.mate[neighbor_id] != NONE {
                    continue;
                }
                if best.map_or(true, |b| neighbors[j].len() < neighbors[b].len()) {
                    best = Some(j);
                }
            }
            if let Some(j) = best {
                let neighbor_id = outer_ids[j];
                self.state.mate[id] = neighbor_id as isize;
                self.state.mate[neighbor_id] = id as isize;
            }
        }
    }

    // ---- phase 2: Grow ----------------------------------------------------------

    /// builds an alternating forest and augments/contracts until no more tight
    /// edges advance it; may internally augment (and "restart Grow", per
    /// `spec.md` §4.3) any number of times.
    fn grow_phase(&mut self, graph: &Graph) {
        loop {
            self.init_forest();
            let mut queue: VecDeque<usize> =
                self.state.outer_ids().into_iter().filter(|&id| self.state.mate[id] == NONE).collect();
            let mut augmented = false;
            'scan: while let Some(u) = queue.pop_front() {
                if self.state.outer[u] != u || self.state.label[u] != Label::Even {
                    continue;
                }
                let deep_u = self.state.deep[u].clone();
                for &w in &deep_u {
                    let incident: Vec<_> = graph.adj_list(w).to_vec();
                    for x in incident {
                        let e = graph.edge_index(w, x);
                        if !self.near_zero(self.state.slack[e as usize]) {
                            continue;
                        }
                        let ox = self.state.outer[x as usize];
                        if ox == u {
                            continue;
                        }
                        match self.state.label[ox] {
                            Label::Unlabeled => {
                                self.state.label[ox] = Label::Odd;
                                self.state.forest[ox] = u as isize;
                                self.state.root[ox] = self.state.root[u];
                                let partner = self.state.mate[ox];
                                debug_assert!(partner != NONE, "non-root unlabeled vertex must be matched");
                                let partner = partner as usize;
                                self.state.label[partner] = Label::Even;
                                self.state.forest[partner] = ox as isize;
                                self.state.root[partner] = self.state.root[u];
                                queue.push_back(partner);
                            }
                            Label::Even => {
                                if self.state.root[ox] != self.state.root[u] {
                                    self.augment(u, ox);
                                    augmented = true;
                                    break 'scan;
                                } else if ox != u {
                                    let new_id = self.contract(u, ox);
                                    queue.push_back(new_id);
                                    break;
                                }
                            }
                            Label::Odd => {}
                        }
                    }
                    if augmented {
                        break;
                    }
                    if self.state.outer[u] != u {
                        // u was just absorbed into a blossom; stop scanning its old deep list
                        break;
                    }
                }
            }
            if augmented {
                continue;
            }
            break;
        }
    }

    fn init_forest(&mut self) {
        for id in self.state.outer_ids() {
            self.state.label[id] = if self.state.mate[id] == NONE { Label::Even } else { Label::Unlabeled };
            self.state.forest[id] = NONE;
            self.state.root[id] = if self.state.mate[id] == NONE { id as isize } else { NONE };
        }
    }

    // ---- blossom contraction ----------------------------------------------------

    /// contracts the odd cycle discovered between two even vertices `u` and `v`
    /// in the same tree into a fresh pseudo-vertex, per `spec.md` §4.3 "Blossom
    /// contraction".
    fn contract(&mut self, u: usize, v: usize) -> usize {
        let mut visited = vec![false; self.state.cap];
        let mut path_u = Vec::new();
        let mut cur = u;
        loop {
            visited[cur] = true;
            path_u.push(cur);
            let parent = self.state.forest[cur];
            if parent < 0 {
                break;
            }
            cur = parent as usize;
        }
        let mut path_v = Vec::new();
        let mut cur = v;
        let tip;
        loop {
            if visited[cur] {
                tip = cur;
                break;
            }
            path_v.push(cur);
            cur = self.state.forest[cur] as usize;
        }
        // trim path_u down to the tip (inclusive)
        let tip_pos = path_u.iter().position(|&x| x == tip).expect("tip must lie on u's path");
        path_u.truncate(tip_pos + 1);

        let new_id = self.state.alloc_blossom();
        let mut shallow = Vec::with_capacity(path_u.len() + path_v.len());
        shallow.extend(path_u.iter().rev()); // tip, ..., u
        shallow.extend(path_v.iter()); // v, ..., child-of-tip
        debug_assert!(shallow.len() % 2 == 1 && shallow.len() >= 3, "blossom must be an odd cycle of length >= 3");

        let mut deep = Vec::new();
        for &x in &shallow {
            deep.extend(self.state.deep[x].iter().copied());
        }
        for &w in &deep {
            self.state.outer[w] = new_id;
        }
        for &x in &shallow {
            self.state.outer[x] = new_id;
        }
        self.state.deep[new_id] = deep;
        self.state.shallow[new_id] = shallow;
        self.state.tip[new_id] = tip;
        self.state.active[new_id] = true;
        self.state.label[new_id] = Label::Even;
        self.state.forest[new_id] = self.state.forest[tip];
        self.state.root[new_id] = self.state.root[tip];
        self.state.mate[new_id] = self.state.mate[tip];
        self.state.dual[new_id] = 0.0;
        self.state.blocked[new_id] = false;
        new_id
    }

    // ---- blossom expansion --------------------------------------------------

    /// `spec.md` §4.3 "Blossom expansion": restores matching through `u`'s odd
    /// circuit. The minimum-indexed-adjacent-pair tie-break is load-bearing
    /// (`spec.md` §9, Open Question 2) so both endpoints of a symmetric
    /// expansion agree on the same crossing edge.
    fn expand(&mut self, graph: &Graph, u: usize, expand_blocked: bool) {
        let mate_u = self.state.mate[u];
        if mate_u == NONE {
            return;
        }
        let v = self.state.outer[mate_u as usize];
        let (p, q) = self.min_indexed_adjacent_pair(graph, &self.state.deep[u].clone(), &self.state.deep[v].clone());
        self.state.mate[u] = q as isize;
        self.state.mate[v] = p as isize;

        if u < self.state.n || (self.state.blocked[u] && !expand_blocked) {
            return;
        }

        let mut shallow = self.state.shallow[u].clone();
        let pivot = shallow
            .iter()
            .position(|&x| self.state.deep[x].contains(&p))
            .expect("p must lie in one of u's sub-blossoms");
        shallow.rotate_left(pivot);

        let x0 = shallow[0];
        self.state.mate[x0] = q as isize;
        let mut i = 1;
        while i + 1 < shallow.len() {
            let (a, b) = (shallow[i], shallow[i + 1]);
            self.state.mate[a] = b as isize;
            self.state.mate[b] = a as isize;
            i += 2;
        }

        for &x in &shallow {
            self.state.outer[x] = x;
            for &w in &self.state.deep[x].clone() {
                self.state.outer[w] = x;
            }
        }
        self.state.free_blossom(u);

        for x in shallow {
            self.expand(graph, x, expand_blocked);
        }
    }

    fn min_indexed_adjacent_pair(&self, graph: &Graph, deep_a: &[usize], deep_b: &[usize]) -> (usize, usize) {
        let mut best: Option<(EdgeIndex, usize, usize)> = None;
        for &p in deep_a {
            for &q in deep_b {
                if !graph.adjacent(p, q) {
                    continue;
                }
                let e = graph.edge_index(p, q);
                if best.map_or(true, |(be, _, _)| e < be) {
                    best = Some((e, p, q));
                }
            }
        }
        let (_, p, q) = best.expect("u and v must be adjacent through some pair of original vertices");
        (p, q)
    }

    /// expand every remaining active, mated pseudo-vertex so the matching is
    /// fully readable at the original-vertex level, per `spec.md` §4.3 "Retrieve
    /// matching".
    fn finalize_matching(&mut self, graph: &Graph) {
        loop {
            let pending: Vec<usize> = (self.state.n..self.state.cap)
                .filter(|&id| self.state.active[id] && self.state.outer[id] == id)
                .collect();
            if pending.is_empty() {
                break;
            }
            for id in pending {
                if self.state.active[id] && self.state.outer[id] == id {
                    if self.state.mate[id] == NONE {
                        self.destroy_blossom(id);
                    } else {
                        self.expand(graph, id, true);
                    }
                }
            }
        }
    }

    fn collect_matched_edges(&self, graph: &Graph) -> Vec<EdgeIndex> {
        let mut edges = Vec::new();
        for v in 0..self.state.n {
            let m = self.state.mate[v];
            if m >= 0 && (m as usize) > v {
                edges.push(graph.edge_index(v, m as usize));
            }
        }
        edges
    }

    // ---- augmenting ----------------------------------------------------------

    fn augment(&mut self, u: usize, v: usize) {
        self.flip_path_to_root(u);
        self.flip_path_to_root(v);
        self.state.mate[u] = v as isize;
        self.state.mate[v] = u as isize;
    }

    fn flip_path_to_root(&mut self, start: usize) {
        let mut cur = start;
        loop {
            let parent = self.state.forest[cur];
            if parent < 0 {
                break;
            }
            let parent = parent as usize;
            self.state.mate[cur] = parent as isize;
            self.state.mate[parent] = cur as isize;
            let grandparent = self.state.forest[parent];
            if grandparent < 0 {
                break;
            }
            cur = grandparent as usize;
        }
    }

    // ---- blossom teardown (Reset only; no rematching) ------------------------

    fn destroy_blossom(&mut self, b: usize) {
        let shallow = self.state.shallow[b].clone();
        for x in shallow {
            for w in self.state.deep[x].clone() {
                self.state.outer[w] = x;
            }
            self.state.outer[x] = x;
            if x >= self.state.n && !self.state.blocked[x] {
                self.destroy_blossom(x);
            }
        }
        self.state.free_blossom(b);
    }

    // ---- phase 3: UpdateDualCosts --------------------------------------------

    fn update_dual_costs(&mut self, graph: &Graph) -> SlcResult<()> {
        let mut e1: Option<Weight> = None;
        let mut e2: Option<Weight> = None;
        let mut e3: Option<Weight> = None;

        for id in self.state.outer_ids() {
            if id >= self.state.n && self.state.label[id] == Label::Odd {
                e3 = Some(e3.map_or(self.state.dual[id], |cur| cur.min(self.state.dual[id])));
            }
        }
        for e in 0..graph.num_edges() {
            let (u, v) = graph.edge(e as EdgeIndex);
            let (ou, ov) = (self.state.outer[u as usize], self.state.outer[v as usize]);
            if ou == ov {
                continue;
            }
            let (lu, lv) = (self.state.label[ou], self.state.label[ov]);
            let slack = self.state.slack[e];
            match (lu, lv) {
                (Label::Even, Label::Unlabeled) | (Label::Unlabeled, Label::Even) => {
                    e1 = Some(e1.map_or(slack, |cur| cur.min(slack)));
                }
                (Label::Even, Label::Even) => {
                    e2 = Some(e2.map_or(slack, |cur| cur.min(slack)));
                }
                _ => {}
            }
        }

        let mut candidates = Vec::new();
        if let Some(e1) = e1 {
            candidates.push(e1);
        }
        if let Some(e2) = e2 {
            candidates.push(e2 / 2.0);
        }
        if let Some(e3) = e3 {
            candidates.push(e3);
        }
        let delta = candidates.into_iter().fold(None, |acc: Option<Weight>, x| Some(acc.map_or(x, |a| a.min(x))));
        let delta = delta.ok_or_else(|| SlcError::NumericalFailure {
            reason: "no dual-update candidate available; primal-dual loop is stuck".to_string(),
        })?;
        debug_assert!(delta >= -self.epsilon, "dual step must be non-negative");
        let delta = delta.max(0.0);

        for id in self.state.outer_ids() {
            match self.state.label[id] {
                Label::Even => self.state.dual[id] += delta,
                Label::Odd => self.state.dual[id] -= delta,
                Label::Unlabeled => {}
            }
        }
        for e in 0..graph.num_edges() {
            let (u, v) = graph.edge(e as EdgeIndex);
            let (ou, ov) = (self.state.outer[u as usize], self.state.outer[v as usize]);
            if ou == ov {
                continue;
            }
            let du = label_delta(self.state.label[ou], delta);
            let dv = label_delta(self.state.label[ov], delta);
            self.state.slack[e] -= du + dv;
            debug_assert!(self.greater(self.state.slack[e], -self.epsilon) || self.near_zero(self.state.slack[e]));
        }

        // mark newly-positive blossom duals as blocked
        for id in self.state.outer_ids() {
            if id < self.state.n {
                continue;
            }
            if !self.state.blocked[id] && self.greater(self.state.dual[id], 0.0) {
                self.state.blocked[id] = true;
            }
        }
        // unblock any blossom whose dual returned to zero
        let to_unblock: Vec<usize> = self
            .state
            .outer_ids()
            .into_iter()
            .filter(|&id| id >= self.state.n && self.state.blocked[id] && self.near_zero(self.state.dual[id]))
            .collect();
        for id in to_unblock {
            self.state.blocked[id] = false;
            if self.state.mate[id] == NONE {
                self.destroy_blossom(id);
            } else {
                self.expand(graph, id, false);
            }
        }
        Ok(())
    }

    // ---- phase 4: Reset -------------------------------------------------------

    fn reset_phase(&mut self) {
        let destroyable: Vec<usize> = (self.state.n..self.state.cap)
            .filter(|&id| self.state.active[id] && self.state.outer[id] == id && !self.state.blocked[id])
            .collect();
        for id in destroyable {
            if self.state.active[id] && self.state.outer[id] == id {
                self.destroy_blossom(id);
            }
        }
    }

    fn dual_objective(&self) -> Weight {
        let mut total = 0.0;
        for v in 0..self.state.n {
            total += self.state.dual[v];
        }
        for b in self.state.n..self.state.cap {
            if self.state.active[b] && self.state.blocked[b] {
                total += self.state.dual[b];
            }
        }
        total
    }
}

fn label_delta(label: Label, delta: Weight) -> Weight {
    match label {
        Label::Even => delta,
        Label::Odd => -delta,
        Label::Unlabeled => 0.0,
    }
}

fn near_value(a: Weight, b: Weight) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= 1e-6 * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn matcher(n: usize, m: usize) -> BlossomMatcher {
        BlossomMatcher::new(n, m, (n.max(1)).pow(3).max(64))
    }

    #[test]
    fn triangle_has_no_perfect_matching() {
        let g = Graph::new(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]);
        let mut m = matcher(3, 3);
        let result = m.solve_minimum_cost_perfect_matching(&g, &[1.0, 1.0, 1.0]);
        assert_eq!(result, Err(SlcError::NoPerfectMatching));
    }

    #[test]
    fn k4_min_cost_matching_is_seven() {
        // vertices 0..4, edges by index: 0:(0,1) 1:(0,2) 2:(0,3) 3:(1,2) 4:(1,3) 5:(2,3)
        let edges = [(0, 1, 0.0), (0, 2, 0.0), (0, 3, 0.0), (1, 2, 0.0), (1, 3, 0.0), (2, 3, 0.0)];
        let g = Graph::new(4, &edges);
        let costs = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut m = matcher(4, 6);
        let (matched, objective) = m.solve_minimum_cost_perfect_matching(&g, &costs).unwrap();
        assert_eq!(matched.len(), 2);
        assert_eq!(objective, 7.0);
    }

    #[test]
    fn max_matching_on_path_is_perfect() {
        let g = Graph::new(4, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]);
        let mut m = matcher(4, 3);
        let matched = m.solve_maximum_matching(&g);
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn odd_blossom_is_contracted_and_terminates() {
        // 5-cycle 0-1-2-3-4-0, plus vertex 5 joined to 0 and 2 by cost-10 edges.
        let edges = [
            (0, 1, 1.0),
            (1, 2, 1.0),
            (2, 3, 1.0),
            (3, 4, 1.0),
            (4, 0, 1.0),
            (5, 0, 10.0),
            (5, 2, 10.0),
        ];
        let g = Graph::new(6, &edges);
        let costs: Vec<_> = edges.iter().map(|e| e.2).collect();
        let mut m = matcher(6, edges.len());
        let (matched, objective) = m.solve_minimum_cost_perfect_matching(&g, &costs).unwrap();
        assert_eq!(matched.len(), 3);
        assert!(objective.is_finite());
    }
}
