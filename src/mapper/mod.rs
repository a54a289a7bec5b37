// SPDX-License-Identifier: Apache-2.0

//! Delay-oriented LUT mapping with area recovery.
//!
//! A `Mapper` owns the subject graph, the cut arena and one attribute vector
//! per node property. Each round sweeps the graph in topological order,
//! enumerating and ranking cuts per node (see `enumerate`), then derives the
//! mapping, reference counts and required times from the committed best cuts
//! (see `rounds`).

mod enumerate;
mod rounds;

pub use rounds::{LeafRefs, Round};

use serde::Serialize;

use crate::arena::{CutArena, CutHandle};
use crate::cut::Cut;
use crate::error::MapError;
use crate::graph::{NodeRef, SubjectGraph};
use crate::library::{LutLibrary, LutTiming, REF_UNIT, checked_ticks, ticks_to_delay};
use crate::params::{FunctionMode, MAX_CUTS, MAX_LUT_SIZE, MapParams};
use crate::store::{CutCmp, CutStore};
use crate::truth::FuncTable;

/// Totals of the mapping derived at the end of one round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundStats {
    pub name: String,
    pub luts: usize,
    pub edges: u64,
    /// Area in library units.
    pub area: f64,
    /// Largest output arrival in library delay units.
    pub delay: f64,
    #[serde(skip)]
    pub area_units: u64,
    #[serde(skip)]
    pub delay_ticks: u32,
    pub cuts_considered: usize,
    pub cuts_kept: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapStats {
    pub lut_size: usize,
    pub functions: FunctionMode,
    pub luts: usize,
    pub edges: u64,
    pub area: f64,
    pub delay: f64,
    pub global_required: f64,
    pub required_violations: usize,
    pub distinct_functions: usize,
    pub rounds: Vec<RoundStats>,
}

pub struct Mapper {
    graph: SubjectGraph,
    params: MapParams,
    library: LutLibrary,
    timing: LutTiming,
    arena: CutArena,
    funcs: Option<FuncTable>,
    store: CutStore,

    best: Vec<Option<CutHandle>>,
    cuts: Vec<Option<CutHandle>>,
    map_refs: Vec<u32>,
    est_refs: Vec<u64>,
    required: Vec<u32>,
    arrival: Vec<u32>,
    area: Vec<u64>,
    edge: Vec<u64>,

    delay_target: u32,
    global_required: u32,
    required_frozen: bool,
    mapped_once: bool,
    main_run: bool,
    leaf_refs: LeafRefs,
    required_violations: usize,
    considered: usize,
    kept: usize,
    history: Vec<RoundStats>,
    fanin_cuts: [Vec<Cut>; 3],
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("nodes", &self.graph.len())
            .field("params", &self.params)
            .field("rounds", &self.history.len())
            .finish()
    }
}

/// Unset required time.
const NO_REQUIRED: u32 = u32::MAX;

impl Mapper {
    /// Checks the configuration against the graph and library and sets up
    /// the per-node state. Nothing is mapped yet.
    pub fn new(
        graph: SubjectGraph,
        library: &LutLibrary,
        params: MapParams,
    ) -> Result<Self, MapError> {
        let k = params.lut_size;
        if k > MAX_LUT_SIZE {
            return Err(MapError::LutSizeTooLarge { requested: k });
        }
        let min_k = graph.max_fanin_arity().max(2);
        if k < min_k {
            return Err(MapError::LutSizeTooSmall {
                requested: k,
                required: min_k,
            });
        }
        if params.num_cuts > MAX_CUTS {
            return Err(MapError::TooManyCuts {
                requested: params.num_cuts,
            });
        }
        if params.num_cuts < 2 {
            return Err(MapError::TooFewCuts {
                requested: params.num_cuts,
            });
        }
        if library.lut_max < k {
            return Err(MapError::LibraryTooSmall {
                lut_size: k,
                library_max: library.lut_max,
            });
        }
        let delay_target = match params.delay_target {
            Some(t) => checked_ticks(t).ok_or(MapError::InvalidDelayTarget(t))?,
            None => 0,
        };
        graph.validate()?;

        let n = graph.len();
        let est_refs = graph
            .fanout_counts()
            .into_iter()
            .map(|c| REF_UNIT * c as u64)
            .collect();
        let funcs = params.functions.tracks_functions().then(|| FuncTable::new(k));
        log::debug!(
            "mapper over {} nodes ({} inputs, {} outputs, choices: {}), K={} N={} {:?}",
            n,
            graph.inputs().len(),
            graph.outputs().len(),
            graph.has_choices(),
            k,
            params.num_cuts,
            params.functions
        );
        Ok(Mapper {
            timing: library.timing(k),
            library: library.clone(),
            arena: CutArena::new(),
            funcs,
            store: CutStore::new(params.num_cuts - 1, CutCmp::Delay),
            best: vec![None; n],
            cuts: vec![None; n],
            map_refs: vec![0; n],
            est_refs,
            required: vec![NO_REQUIRED; n],
            arrival: vec![0; n],
            area: vec![0; n],
            edge: vec![0; n],
            delay_target,
            global_required: 0,
            required_frozen: false,
            mapped_once: false,
            main_run: false,
            leaf_refs: LeafRefs::Estimated,
            required_violations: 0,
            considered: 0,
            kept: 0,
            history: Vec::new(),
            fanin_cuts: Default::default(),
            graph,
            params,
        })
    }

    /// Runs the default round schedule and returns the final statistics.
    pub fn perform(&mut self) -> MapStats {
        for round in Round::default_schedule(self.params.delay_only) {
            self.perform_round(round);
        }
        self.stats()
    }

    pub fn stats(&self) -> MapStats {
        let last = self.history.last();
        MapStats {
            lut_size: self.params.lut_size,
            functions: self.params.functions,
            luts: last.map_or(0, |r| r.luts),
            edges: last.map_or(0, |r| r.edges),
            area: last.map_or(0.0, |r| r.area),
            delay: last.map_or(0.0, |r| r.delay),
            global_required: ticks_to_delay(self.global_required),
            required_violations: self.required_violations,
            distinct_functions: self.funcs.as_ref().map_or(0, |f| f.len()),
            rounds: self.history.clone(),
        }
    }

    pub fn graph(&self) -> &SubjectGraph {
        &self.graph
    }

    pub fn params(&self) -> &MapParams {
        &self.params
    }

    pub fn library(&self) -> &LutLibrary {
        &self.library
    }

    pub fn timing(&self) -> &LutTiming {
        &self.timing
    }

    pub fn funcs(&self) -> Option<&FuncTable> {
        self.funcs.as_ref()
    }

    pub fn arena(&self) -> &CutArena {
        &self.arena
    }

    pub fn round_history(&self) -> &[RoundStats] {
        &self.history
    }

    /// The committed best cut of `node`, if it is a mapped-able logic node
    /// that has been processed.
    pub fn best_cut(&self, node: NodeRef) -> Option<Cut> {
        self.best[node.id].map(|h| self.arena.load_cut(h))
    }

    /// The node's committed cut list (best-ranked first, trivial cut last).
    /// Lists are released after their last use unless `keep_cuts` is set.
    pub fn cuts(&self, node: NodeRef) -> Vec<Cut> {
        self.arena
            .list(self.cuts[node.id])
            .map(|h| self.arena.load_cut(h))
            .collect()
    }

    /// Arrival time in ticks.
    pub fn arrival(&self, node: NodeRef) -> u32 {
        self.arrival[node.id]
    }

    /// Required time in ticks; `None` for nodes outside the current mapping.
    pub fn required(&self, node: NodeRef) -> Option<u32> {
        match self.required[node.id] {
            NO_REQUIRED => None,
            r => Some(r),
        }
    }

    pub fn global_required(&self) -> u32 {
        self.global_required
    }

    pub fn map_refs(&self, node: NodeRef) -> u32 {
        self.map_refs[node.id]
    }

    pub fn est_refs(&self, node: NodeRef) -> u64 {
        self.est_refs[node.id]
    }

    pub fn area_flow(&self, node: NodeRef) -> u64 {
        self.area[node.id]
    }

    pub fn edge_flow(&self, node: NodeRef) -> u64 {
        self.edge[node.id]
    }

    pub fn required_violations(&self) -> usize {
        self.required_violations
    }

    /// Logic nodes covered by a LUT in the current mapping, in topological
    /// order.
    pub fn mapped_nodes(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.graph
            .topo_order()
            .filter(|n| self.graph.kind(*n).is_logic() && self.map_refs[n.id] > 0)
    }

    /// Drops the leaves `cut`'s function does not depend on. Always `false`
    /// in structural mode.
    pub fn minimize_support(&mut self, cut: &mut Cut) -> bool {
        match self.funcs.as_mut() {
            Some(funcs) => funcs.minimize_support(cut),
            None => false,
        }
    }
}
