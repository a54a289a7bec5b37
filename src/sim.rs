// SPDX-License-Identifier: Apache-2.0

//! Bit-parallel simulation of the subject graph: every `u64` carries 64
//! independent input patterns.

use crate::graph::{NodeKind, Operand, SubjectGraph};

/// Value of `op` given the per-node words `values`.
#[inline]
pub fn operand_word(values: &[u64], op: Operand) -> u64 {
    let v = values[op.node.id];
    if op.negated { !v } else { v }
}

/// Applies a gate to already-negated fanin words (`[d0, d1, sel]` for MUX).
#[inline]
pub fn gate_word(kind: NodeKind, fanins: &[u64]) -> u64 {
    match kind {
        NodeKind::Const0 => 0,
        NodeKind::Co | NodeKind::Buf => fanins[0],
        NodeKind::And => fanins[0] & fanins[1],
        NodeKind::Xor => fanins[0] ^ fanins[1],
        NodeKind::Mux => (fanins[2] & fanins[1]) | (!fanins[2] & fanins[0]),
        NodeKind::Ci => unreachable!("inputs are not evaluated"),
    }
}

/// Simulates every node; `input_words[i]` drives the `i`-th input.
pub fn simulate_nodes(graph: &SubjectGraph, input_words: &[u64]) -> Vec<u64> {
    assert_eq!(
        input_words.len(),
        graph.inputs().len(),
        "expected one word per input"
    );
    let mut values = vec![0u64; graph.len()];
    for (ci, word) in graph.inputs().iter().zip(input_words) {
        values[ci.id] = *word;
    }
    let mut args = [0u64; 3];
    for node in graph.topo_order() {
        let n = graph.node(node);
        if n.kind == NodeKind::Ci {
            continue;
        }
        for (slot, f) in args.iter_mut().zip(n.fanins()) {
            *slot = operand_word(&values, *f);
        }
        values[node.id] = gate_word(n.kind, &args[..n.fanins().len()]);
    }
    values
}

/// Simulates the graph and returns one word per output.
pub fn simulate_outputs(graph: &SubjectGraph, input_words: &[u64]) -> Vec<u64> {
    let values = simulate_nodes(graph, input_words);
    graph.outputs().iter().map(|co| values[co.id]).collect()
}
