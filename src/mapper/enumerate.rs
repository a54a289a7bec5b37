// SPDX-License-Identifier: Apache-2.0

//! Per-node cut enumeration.
//!
//! Each logic node goes through four steps:
//!
//! 1. init: clear the store; in constrained rounds re-insert the previous
//!    best cut so the store can never end up empty;
//! 2. choice harvest: pull the committed cuts of every node in the sibling
//!    chain, rephased to this node;
//! 3. pairwise merge: merge every combination of fanin cuts, compute the
//!    function, score and insert;
//! 4. finalize: commit the best cut and the cut list, then release fanins.

use super::{LeafRefs, Mapper, NO_REQUIRED, Round};
use crate::cut::{Cut, CutUnit};
use crate::graph::{NodeKind, NodeRef, Operand};
use crate::library::{AREA_UNIT, EDGE_UNIT, REF_UNIT};
use crate::params::FunctionMode;
use crate::store::Insert;
use crate::truth::FUNC_VAR0;

/// Outcome of offering one candidate cut to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Candidate {
    Kept,
    Rejected,
    /// The store is full and cannot be improved on the primary cost; stop
    /// enumerating this node.
    Stop,
}

impl Mapper {
    pub(super) fn map_node(&mut self, node: NodeRef, round: &Round) {
        match self.graph.kind(node) {
            NodeKind::Const0 | NodeKind::Ci => self.map_source(node),
            NodeKind::Co => {
                let driver = self.graph.output_driver(node).node;
                self.arrival[node.id] = self.arrival[driver.id];
                self.release(driver);
            }
            NodeKind::Buf | NodeKind::And | NodeKind::Xor | NodeKind::Mux => {
                self.map_logic(node, round)
            }
        }
    }

    fn trivial_func(&self) -> Option<u32> {
        self.funcs.as_ref().map(|_| FUNC_VAR0)
    }

    fn map_source(&mut self, node: NodeRef) {
        let old = self.cuts[node.id].take();
        self.arena.recycle_list(old);
        let trivial = Cut::trivial(node, self.trivial_func());
        self.cuts[node.id] = Some(self.arena.store_cut(&trivial));
        self.arrival[node.id] = 0;
        self.area[node.id] = 0;
        self.edge[node.id] = 0;
    }

    fn map_logic(&mut self, node: NodeRef, round: &Round) {
        let required = self.required[node.id];
        debug_assert!(
            !round.constrained || self.map_refs[node.id] == 0 || required != NO_REQUIRED,
            "required time unset at mapped node {}",
            node.id
        );
        self.store.reset(round.cmp);

        // Init.
        if let Some(prev) = self.best[node.id].take() {
            if round.constrained {
                let unit = self.score(self.arena.load_cut(prev));
                if unit.arrival > required {
                    log::warn!(
                        "{}: node {} cannot meet its required time ({} > {})",
                        round.name,
                        node.id,
                        unit.arrival,
                        required
                    );
                    self.required_violations += 1;
                }
                self.store.try_insert(unit);
            }
            self.arena.recycle(prev);
        }
        let old = self.cuts[node.id].take();
        self.arena.recycle_list(old);

        // Choice harvest. Required times from the last mapping apply in every
        // round.
        let chain: Vec<NodeRef> = self.graph.siblings(node).collect();
        let phase = self.graph.node(node).phase;
        for &sibling in &chain {
            let toggle = self.graph.node(sibling).phase != phase;
            let harvested: Vec<Cut> = self
                .arena
                .list(self.cuts[sibling.id])
                .map(|h| self.arena.load_cut(h))
                .filter(|c| !c.useless && !c.is_trivial_for(sibling))
                .collect();
            for mut cut in harvested {
                cut.compl ^= toggle;
                self.consider(node, cut, true, false);
            }
        }

        // Pairwise merge.
        let fanins: Vec<Operand> = self.graph.node(node).fanins().to_vec();
        let mut lists = std::mem::take(&mut self.fanin_cuts);
        for (list, fanin) in lists.iter_mut().zip(&fanins) {
            list.clear();
            list.extend(
                self.arena
                    .list(self.cuts[fanin.node.id])
                    .map(|h| self.arena.load_cut(h))
                    .filter(|c| !c.useless),
            );
        }
        self.merge_fanins(node, &fanins, &lists, round);
        self.fanin_cuts = lists;

        // Finalize.
        self.commit(node, round);
        for fanin in &fanins {
            self.release(fanin.node);
        }
        for &sibling in &chain {
            self.release(sibling);
        }
    }

    /// Runs every fanin cut combination through `try_merge`, skipping those
    /// whose signatures already show more than K leaves.
    fn merge_fanins(
        &mut self,
        node: NodeRef,
        fanins: &[Operand],
        lists: &[Vec<Cut>; 3],
        round: &Round,
    ) {
        let kind = self.graph.kind(node);
        let k = self.params.lut_size;
        let sigs: Vec<Vec<u64>> = lists
            .iter()
            .map(|l| l.iter().map(Cut::signature).collect())
            .collect();
        let fits = |sig: u64| sig.count_ones() as usize <= k;
        match fanins.len() {
            1 => {
                for c0 in &lists[0] {
                    if self.try_merge(kind, node, fanins, &[c0], round) == Candidate::Stop {
                        return;
                    }
                }
            }
            2 => {
                for (c0, s0) in lists[0].iter().zip(&sigs[0]) {
                    for (c1, s1) in lists[1].iter().zip(&sigs[1]) {
                        if !fits(s0 | s1) {
                            continue;
                        }
                        if self.try_merge(kind, node, fanins, &[c0, c1], round) == Candidate::Stop {
                            return;
                        }
                    }
                }
            }
            3 => {
                for (c0, s0) in lists[0].iter().zip(&sigs[0]) {
                    for (c1, s1) in lists[1].iter().zip(&sigs[1]) {
                        if !fits(s0 | s1) {
                            continue;
                        }
                        for (c2, s2) in lists[2].iter().zip(&sigs[2]) {
                            if !fits(s0 | s1 | s2) {
                                continue;
                            }
                            let outcome = self.try_merge(kind, node, fanins, &[c0, c1, c2], round);
                            if outcome == Candidate::Stop {
                                return;
                            }
                        }
                    }
                }
            }
            n => unreachable!("logic node {} with {} fanins", node.id, n),
        }
    }

    fn try_merge(
        &mut self,
        kind: NodeKind,
        node: NodeRef,
        fanins: &[Operand],
        children: &[&Cut],
        round: &Round,
    ) -> Candidate {
        let Some(mut cut) = Cut::merge(children, self.params.lut_size) else {
            return Candidate::Rejected;
        };
        let minimize = self.params.minimizes_support();
        let dsd = self.params.functions == FunctionMode::Dsd;
        if let Some(funcs) = self.funcs.as_mut() {
            cut.sort_leaves();
            let pairs: Vec<(&Cut, bool)> = children
                .iter()
                .zip(fanins)
                .map(|(c, f)| (*c, f.negated))
                .collect();
            let (func, compl) = funcs.compose(kind, &pairs, &cut);
            cut.func = Some(func);
            cut.compl = compl;
            if minimize {
                funcs.minimize_support(&mut cut);
            }
            if dsd {
                let func = cut.func.unwrap_or(func);
                if funcs.dsd_cost(func).is_none() {
                    return Candidate::Rejected;
                }
            }
        }
        self.consider(node, cut, round.constrained, self.params.early_stop)
    }

    /// Scores `cut` and offers it to the store. With `admit`, a cut arriving
    /// after the node's required time is rejected.
    fn consider(&mut self, node: NodeRef, cut: Cut, admit: bool, early_stop: bool) -> Candidate {
        self.considered += 1;
        let unit = self.score(cut);
        if admit && unit.arrival > self.required[node.id] {
            return Candidate::Rejected;
        }
        if early_stop && self.store.cannot_improve(&unit) {
            return Candidate::Stop;
        }
        match self.store.try_insert(unit) {
            Insert::Kept => {
                self.kept += 1;
                Candidate::Kept
            }
            Insert::Worse | Insert::Dominated => Candidate::Rejected,
        }
    }

    /// Base area of a LUT implementing `cut`, in area units.
    pub(super) fn cut_area(&mut self, cut: &Cut) -> u64 {
        if self.params.functions == FunctionMode::Dsd {
            if let (Some(funcs), Some(func)) = (self.funcs.as_mut(), cut.func) {
                if let Some(gates) = funcs.dsd_cost(func) {
                    return AREA_UNIT * gates as u64;
                }
            }
        }
        self.timing.lut_area(cut.len())
    }

    /// Arrival, area flow, edge flow and average reference pressure of `cut`
    /// against the current attribute vectors.
    pub(super) fn score(&mut self, cut: Cut) -> CutUnit {
        let mut unit = CutUnit::new(cut);
        let n = cut.len();
        let mut arrival = 0u32;
        let mut area = self.cut_area(&cut);
        let mut edge = EDGE_UNIT * n as u64;
        let mut refs = 0u64;
        for (pos, leaf) in cut.leaves().iter().enumerate() {
            let id = leaf.node.id;
            let leaf_arrival = self.arrival[id].saturating_add(self.timing.pin_delay(n, pos));
            arrival = arrival.max(leaf_arrival);
            if self.main_run && self.map_refs[id] == 0 {
                area = area.saturating_add(self.area[id]);
                edge = edge.saturating_add(self.edge[id]);
            } else {
                let share = match self.leaf_refs {
                    LeafRefs::Mapped if self.map_refs[id] > 0 => {
                        REF_UNIT * self.map_refs[id] as u64
                    }
                    _ => self.est_refs[id].max(1),
                };
                area = area.saturating_add(REF_UNIT.saturating_mul(self.area[id]) / share);
                edge = edge.saturating_add(REF_UNIT.saturating_mul(self.edge[id]) / share);
            }
            refs += if self.main_run {
                REF_UNIT * self.map_refs[id] as u64
            } else {
                self.est_refs[id]
            };
        }
        unit.arrival = arrival;
        unit.area = area;
        unit.edge = edge;
        unit.ave_refs = refs * EDGE_UNIT / n.max(1) as u64;
        unit
    }

    /// Commits the store: the first unit becomes the best cut, all units plus
    /// the trivial cut become the node's cut list.
    fn commit(&mut self, node: NodeRef, round: &Round) {
        assert!(
            !self.store.is_empty(),
            "{}: no cut survived at node {}",
            round.name,
            node.id
        );
        let required = self.required[node.id];
        let units: Vec<CutUnit> = self.store.units().to_vec();
        let best = &units[0];
        self.best[node.id] = Some(self.arena.store_cut(&best.cut));
        self.arrival[node.id] = best.arrival;
        self.area[node.id] = best.area;
        self.edge[node.id] = best.edge;

        let mut handles = Vec::with_capacity(units.len() + 1);
        for unit in &units {
            let mut cut = unit.cut;
            cut.useless = round.constrained && unit.arrival > required;
            handles.push(self.arena.store_cut(&cut));
        }
        let trivial = Cut::trivial(node, self.trivial_func());
        handles.push(self.arena.store_cut(&trivial));
        for pair in handles.windows(2) {
            self.arena.entry_mut(pair[0]).set_next(Some(pair[1]));
        }
        self.cuts[node.id] = handles.first().copied();
        log::trace!(
            "node {}: best {:?} arrival {} area {} ({} cuts)",
            node.id,
            best.cut,
            best.arrival,
            best.area,
            units.len()
        );
    }

    /// Drops one structural reference to `node`, freeing its cut list on the
    /// last one.
    pub(super) fn release(&mut self, node: NodeRef) {
        if self.graph.decrement_reference(node) == 0 && !self.params.keep_cuts {
            let list = self.cuts[node.id].take();
            self.arena.recycle_list(list);
        }
    }
}
