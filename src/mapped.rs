// SPDX-License-Identifier: Apache-2.0

//! The LUT network read back from a finished mapping.

use std::collections::HashMap;

use serde::Serialize;

use crate::graph::{NodeKind, NodeRef, SubjectGraph};
use crate::library::LutLibrary;
use crate::mapper::Mapper;
use crate::sim::gate_word;
use crate::truth::TruthTable;
use crate::truth::table::word_count;

#[derive(Debug, Clone, PartialEq)]
pub struct MappedLut {
    pub root: NodeRef,
    pub leaves: Vec<NodeRef>,
    /// Function of the root over `leaves`, leaf `i` being variable `i`.
    pub truth: TruthTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedOutput {
    pub name: String,
    pub driver: NodeRef,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedStats {
    pub luts: usize,
    pub area: f64,
    pub edges: usize,
    /// Longest input-to-output delay in library units.
    pub depth: f64,
}

#[derive(Debug, Clone)]
pub struct MappedNetwork {
    node_count: usize,
    pub inputs: Vec<NodeRef>,
    pub input_names: Vec<String>,
    pub outputs: Vec<MappedOutput>,
    /// In topological order of their roots.
    pub luts: Vec<MappedLut>,
    library: LutLibrary,
}

impl MappedNetwork {
    /// Reads one LUT per mapped node from `mapper`.
    ///
    /// With tracked functions the table comes from the interned function of
    /// the best cut; in structural mode it is recovered by simulating the
    /// root's cone down to the leaves, following choice siblings where the
    /// root's own cone is not bounded by them.
    pub fn from_mapper(mapper: &Mapper) -> Result<Self, String> {
        let graph = mapper.graph();
        let mut luts = Vec::new();
        for root in mapper.mapped_nodes() {
            let cut = mapper
                .best_cut(root)
                .ok_or_else(|| format!("mapped node {} has no best cut", root.id))?;
            let leaves: Vec<NodeRef> = cut.leaves().iter().map(|l| l.node).collect();
            let truth = match mapper.funcs() {
                Some(funcs) => funcs
                    .cut_table(&cut)
                    .ok_or_else(|| format!("cut of node {} has no function", root.id))?
                    .shrink(leaves.len()),
                None => cone_truth(graph, root, &leaves).ok_or_else(|| {
                    format!(
                        "cone of node {} is not bounded by leaves {:?}",
                        root.id,
                        leaves.iter().map(|l| l.id).collect::<Vec<_>>()
                    )
                })?,
            };
            luts.push(MappedLut {
                root,
                leaves,
                truth,
            });
        }
        let outputs = graph
            .outputs()
            .iter()
            .enumerate()
            .map(|(i, co)| {
                let driver = graph.output_driver(*co);
                MappedOutput {
                    name: graph.output_name(i).to_string(),
                    driver: driver.node,
                    negated: driver.negated,
                }
            })
            .collect();
        log::debug!("read back {} LUTs", luts.len());
        Ok(MappedNetwork {
            node_count: graph.len(),
            inputs: graph.inputs().to_vec(),
            input_names: (0..graph.inputs().len())
                .map(|i| graph.input_name(i).to_string())
                .collect(),
            outputs,
            luts,
            library: mapper.library().clone(),
        })
    }

    /// Evaluates 64 input patterns at once; returns one word per output.
    pub fn simulate(&self, input_words: &[u64]) -> Vec<u64> {
        assert_eq!(input_words.len(), self.inputs.len(), "expected one word per input");
        let mut values = vec![0u64; self.node_count];
        for (ci, word) in self.inputs.iter().zip(input_words) {
            values[ci.id] = *word;
        }
        for lut in &self.luts {
            let mut out = 0u64;
            for bit in 0..64 {
                let index = lut
                    .leaves
                    .iter()
                    .enumerate()
                    .fold(0usize, |acc, (i, leaf)| {
                        acc | ((((values[leaf.id] >> bit) & 1) as usize) << i)
                    });
                if lut.truth.get_bit(index) {
                    out |= 1 << bit;
                }
            }
            values[lut.root.id] = out;
        }
        self.outputs
            .iter()
            .map(|o| {
                let v = values[o.driver.id];
                if o.negated { !v } else { v }
            })
            .collect()
    }

    pub fn stats(&self) -> MappedStats {
        let mut arrival: HashMap<NodeRef, f64> = HashMap::new();
        let mut area = 0.0;
        let mut edges = 0;
        for lut in &self.luts {
            let size = lut.leaves.len();
            area += self.library.area(size);
            edges += size;
            let at = lut
                .leaves
                .iter()
                .enumerate()
                .map(|(pin, leaf)| {
                    arrival.get(leaf).copied().unwrap_or(0.0) + self.library.delay(size, pin)
                })
                .fold(0.0, f64::max);
            arrival.insert(lut.root, at);
        }
        let depth = self
            .outputs
            .iter()
            .map(|o| arrival.get(&o.driver).copied().unwrap_or(0.0))
            .fold(0.0, f64::max);
        MappedStats {
            luts: self.luts.len(),
            area,
            edges,
            depth,
        }
    }
}

/// Function of `root` over `leaves`, found by simulating its cone.
fn cone_truth(graph: &SubjectGraph, root: NodeRef, leaves: &[NodeRef]) -> Option<TruthTable> {
    let n = leaves.len();
    let mut memo: HashMap<NodeRef, Option<Vec<u64>>> = HashMap::new();
    for (i, leaf) in leaves.iter().enumerate() {
        memo.insert(*leaf, Some(TruthTable::var(n, i).words().to_vec()));
    }
    let min_leaf = leaves.iter().map(|l| l.id).min().unwrap_or(0);
    let words = cone_value(graph, root, min_leaf, word_count(n), &mut memo)?;
    Some(TruthTable::from_words(n, &words))
}

fn cone_value(
    graph: &SubjectGraph,
    node: NodeRef,
    min_leaf: usize,
    width: usize,
    memo: &mut HashMap<NodeRef, Option<Vec<u64>>>,
) -> Option<Vec<u64>> {
    if let Some(known) = memo.get(&node) {
        return known.clone();
    }
    let value = match graph.kind(node) {
        NodeKind::Const0 => Some(vec![0; width]),
        NodeKind::Ci | NodeKind::Co => None,
        // Every non-leaf node of a bounded cone lies above some leaf.
        _ if node.id < min_leaf => None,
        kind => structural_value(graph, node, kind, min_leaf, width, memo).or_else(|| {
            let phase = graph.node(node).phase;
            let chain: Vec<NodeRef> = graph.siblings(node).collect();
            chain.into_iter().find_map(|s| {
                let toggle = graph.node(s).phase != phase;
                let v = cone_value(graph, s, min_leaf, width, memo)?;
                Some(if toggle { v.iter().map(|w| !w).collect() } else { v })
            })
        }),
    };
    memo.insert(node, value.clone());
    value
}

fn structural_value(
    graph: &SubjectGraph,
    node: NodeRef,
    kind: NodeKind,
    min_leaf: usize,
    width: usize,
    memo: &mut HashMap<NodeRef, Option<Vec<u64>>>,
) -> Option<Vec<u64>> {
    let fanins = graph.node(node).fanins().to_vec();
    let mut args: Vec<Vec<u64>> = Vec::with_capacity(fanins.len());
    for f in &fanins {
        let v = cone_value(graph, f.node, min_leaf, width, memo)?;
        args.push(if f.negated { v.iter().map(|w| !w).collect() } else { v });
    }
    let mut out = vec![0u64; width];
    let mut word_args = [0u64; 3];
    for (w, slot) in out.iter_mut().enumerate() {
        for (a, arg) in word_args.iter_mut().zip(&args) {
            *a = arg[w];
        }
        *slot = gate_word(kind, &word_args[..args.len()]);
    }
    Some(out)
}
