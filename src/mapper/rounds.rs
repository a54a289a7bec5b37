// SPDX-License-Identifier: Apache-2.0

//! Round schedule and the mapping derived after each round.

use serde::Serialize;

use super::{Mapper, NO_REQUIRED, RoundStats};
use crate::cut::Cut;
use crate::graph::NodeRef;
use crate::library::{REF_UNIT, area_units_to_area, ticks_to_delay};
use crate::store::CutCmp;

/// One sweep over the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Round {
    pub name: &'static str,
    pub cmp: CutCmp,
    /// Candidates must meet the node's required time; the global required
    /// time is frozen from the first constrained round on.
    pub constrained: bool,
    /// Leaves outside the current mapping are charged their full area flow.
    pub main_run: bool,
    pub leaf_refs: LeafRefs,
}

/// What a leaf's area and edge flow is divided by when it is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LeafRefs {
    /// The damped reference estimate, refreshed after every round.
    Estimated,
    /// The leaf's fanout in the previous mapping, when it has one.
    Mapped,
}

impl Round {
    pub const DELAY1: Round = Round {
        name: "delay1",
        cmp: CutCmp::Delay,
        constrained: false,
        main_run: false,
        leaf_refs: LeafRefs::Estimated,
    };
    pub const DELAY2: Round = Round {
        name: "delay2",
        cmp: CutCmp::Delay2,
        constrained: false,
        main_run: false,
        leaf_refs: LeafRefs::Estimated,
    };
    pub const AREA1: Round = Round {
        name: "area1",
        cmp: CutCmp::Area,
        constrained: true,
        main_run: false,
        leaf_refs: LeafRefs::Estimated,
    };
    pub const AREA2: Round = Round {
        name: "area2",
        cmp: CutCmp::Area,
        constrained: true,
        main_run: true,
        leaf_refs: LeafRefs::Mapped,
    };
    pub const AREA3: Round = Round {
        name: "area3",
        cmp: CutCmp::Area2,
        constrained: true,
        main_run: true,
        leaf_refs: LeafRefs::Estimated,
    };

    pub fn default_schedule(delay_only: bool) -> Vec<Round> {
        if delay_only {
            vec![Round::DELAY1, Round::DELAY2]
        } else {
            vec![
                Round::DELAY1,
                Round::DELAY2,
                Round::AREA1,
                Round::AREA2,
                Round::AREA3,
            ]
        }
    }
}

/// Best cuts and per-node flows of one finished round.
struct MappingSnapshot {
    best: Vec<Option<Cut>>,
    arrival: Vec<u32>,
    area: Vec<u64>,
    edge: Vec<u64>,
}

impl Mapper {
    /// Sweeps the whole graph once with `round`'s settings and derives the
    /// resulting mapping. A constrained round whose mapping comes out larger
    /// than the previous round's keeps the previous best cuts.
    ///
    /// # Panics
    ///
    /// A constrained round needs required times, so it panics if no round has
    /// run before it.
    pub fn perform_round(&mut self, round: Round) -> RoundStats {
        if round.constrained {
            assert!(
                self.mapped_once,
                "constrained round {} needs a previous mapping for required times",
                round.name
            );
            if !self.required_frozen {
                self.required_frozen = true;
                log::debug!(
                    "freezing global required time at {}",
                    ticks_to_delay(self.global_required)
                );
            }
        }
        let previous = round.constrained.then(|| self.snapshot());
        self.main_run = round.main_run;
        self.leaf_refs = round.leaf_refs;
        self.considered = 0;
        self.kept = 0;
        self.graph.reset_references();
        for node in self.graph.topo_order() {
            self.map_node(node, &round);
        }
        let mut stats = self.compute_mapping(&round);
        let last_area = self.history.last().map(|r| r.area_units);
        if let (Some(saved), Some(last_area)) = (previous, last_area) {
            if stats.area_units > last_area {
                log::debug!(
                    "{}: area {} above the previous {}, keeping the previous mapping",
                    round.name,
                    stats.area_units,
                    last_area
                );
                self.restore(saved);
                stats = self.compute_mapping(&round);
            }
        }
        self.refresh_est_refs();
        log::info!(
            "{}: delay {:.2} area {:.2} luts {} edges {} ({} of {} cuts kept)",
            stats.name,
            stats.delay,
            stats.area,
            stats.luts,
            stats.edges,
            stats.cuts_kept,
            stats.cuts_considered
        );
        let (inserted, evicted) = self.store.counters();
        log::debug!(
            "{}: arena holds {} records in {} pages; store kept {} and evicted {} cuts so far",
            round.name,
            self.arena.live_records(),
            self.arena.page_count(),
            inserted,
            evicted
        );
        self.history.push(stats.clone());
        stats
    }

    fn snapshot(&self) -> MappingSnapshot {
        MappingSnapshot {
            best: self
                .best
                .iter()
                .map(|h| h.map(|h| self.arena.load_cut(h)))
                .collect(),
            arrival: self.arrival.clone(),
            area: self.area.clone(),
            edge: self.edge.clone(),
        }
    }

    /// Puts back the best cuts and flows of `saved`; the cut lists of the
    /// last sweep stay.
    fn restore(&mut self, saved: MappingSnapshot) {
        for (slot, cut) in self.best.iter_mut().zip(saved.best) {
            let Some(cut) = cut else { continue };
            if let Some(handle) = slot.take() {
                self.arena.recycle(handle);
            }
            *slot = Some(self.arena.store_cut(&cut));
        }
        self.arrival = saved.arrival;
        self.area = saved.area;
        self.edge = saved.edge;
    }

    /// `est' = (est + REF_UNIT * map_refs) / 2`, never below 1.
    fn refresh_est_refs(&mut self) {
        for (est, refs) in self.est_refs.iter_mut().zip(&self.map_refs) {
            *est = ((*est + REF_UNIT * *refs as u64) / 2).max(1);
        }
    }

    /// Walks the committed best cuts from the outputs down, setting mapping
    /// reference counts and required times, and sums up the mapping.
    fn compute_mapping(&mut self, round: &Round) -> RoundStats {
        self.map_refs.fill(0);
        self.required.fill(NO_REQUIRED);

        let outputs: Vec<NodeRef> = self.graph.outputs().to_vec();
        let max_arrival = outputs
            .iter()
            .map(|co| self.arrival[co.id])
            .max()
            .unwrap_or(0);
        if !self.required_frozen {
            self.global_required = max_arrival.max(self.delay_target);
        }
        let global = self.global_required;
        for co in &outputs {
            let driver = self.graph.output_driver(*co).node;
            self.required[co.id] = global;
            self.map_refs[driver.id] += 1;
            self.required[driver.id] = self.required[driver.id].min(global);
        }

        let mut area = 0u64;
        let mut edges = 0u64;
        let mut luts = 0usize;
        for node in self.graph.reverse_topo_order() {
            if !self.graph.kind(node).is_logic() || self.map_refs[node.id] == 0 {
                continue;
            }
            let handle = self.best[node.id].unwrap_or_else(|| {
                panic!("mapped node {} has no best cut after {}", node.id, round.name)
            });
            let cut = self.arena.load_cut(handle);
            let size = cut.len();
            luts += 1;
            edges += size as u64;
            area += self.cut_area(&cut);
            let required = self.required[node.id];
            for (pos, leaf) in cut.leaves().iter().enumerate() {
                let id = leaf.node.id;
                self.map_refs[id] += 1;
                let leaf_required = required.saturating_sub(self.timing.pin_delay(size, pos));
                self.required[id] = self.required[id].min(leaf_required);
            }
        }
        self.mapped_once = true;

        RoundStats {
            name: round.name.to_string(),
            luts,
            edges,
            area: area_units_to_area(area),
            delay: ticks_to_delay(max_arrival),
            area_units: area,
            delay_ticks: max_arrival,
            cuts_considered: self.considered,
            cuts_kept: self.kept,
        }
    }
}
