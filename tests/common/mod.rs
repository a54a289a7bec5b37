// SPDX-License-Identifier: Apache-2.0

//! Seeded random subject graphs shared by the integration tests.

#![allow(dead_code)]

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use xlsynth_lutmap::graph::{Operand, SubjectGraph};
use xlsynth_lutmap::mapped::MappedNetwork;
use xlsynth_lutmap::sim::simulate_outputs;

pub fn rng(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

fn pick(rng: &mut Xoshiro256PlusPlus, pool: &[Operand]) -> Operand {
    let op = pool[rng.gen_range(0..pool.len())];
    op.negate_if(rng.gen_bool(0.5))
}

/// A random DAG of AND, XOR and MUX gates with reconvergent fanout. With
/// `choices`, some ANDs get a MUX-based twin linked as a structural choice.
pub fn random_dag(
    rng: &mut Xoshiro256PlusPlus,
    inputs: usize,
    gates: usize,
    outputs: usize,
    choices: bool,
) -> SubjectGraph {
    let mut g = SubjectGraph::new();
    let mut pool: Vec<Operand> = (0..inputs).map(|i| g.add_input(format!("x{}", i))).collect();
    // Bias towards recent nodes so the graph gets some depth.
    for _ in 0..gates {
        let window = pool.len().min(12);
        let recent = &pool[pool.len() - window..];
        let a = if rng.gen_bool(0.7) {
            pick(rng, recent)
        } else {
            pick(rng, &pool)
        };
        let b = pick(rng, &pool);
        let c = pick(rng, &pool);
        let op = match rng.gen_range(0..10) {
            0..=4 => {
                let alt = g.add_and(a, b).unwrap();
                if choices && !a.is_const() && !b.is_const() && alt.node.id + 1 == g.len() {
                    // a & b == a ? b : 0
                    let main = g.add_mux(Operand::FALSE, b, a).unwrap();
                    if main.node.id + 1 == g.len() && main.node != alt.node {
                        g.set_sibling(main.node, alt.node).unwrap();
                        pool.push(main);
                        continue;
                    }
                }
                alt
            }
            5..=6 => g.add_xor(a, b).unwrap(),
            _ => g.add_mux(a, b, c).unwrap(),
        };
        pool.push(op);
    }
    for i in 0..outputs {
        let driver = if i == 0 {
            pool[pool.len() - 1]
        } else {
            pick(rng, &pool[inputs..])
        };
        g.add_output(format!("y{}", i), driver).unwrap();
    }
    g
}

/// Independent fanout-free trees over shared inputs, one per output.
pub fn random_forest(
    rng: &mut Xoshiro256PlusPlus,
    inputs: usize,
    trees: usize,
    depth: usize,
) -> SubjectGraph {
    let mut g = SubjectGraph::new();
    let ins: Vec<Operand> = (0..inputs).map(|i| g.add_input(format!("x{}", i))).collect();
    for t in 0..trees {
        let root = grow_tree(rng, &mut g, &ins, depth);
        g.add_output(format!("y{}", t), root).unwrap();
    }
    g
}

fn grow_tree(
    rng: &mut Xoshiro256PlusPlus,
    g: &mut SubjectGraph,
    ins: &[Operand],
    depth: usize,
) -> Operand {
    if depth == 0 || rng.gen_bool(0.15) {
        return pick(rng, ins);
    }
    let a = grow_tree(rng, g, ins, depth - 1);
    let b = grow_tree(rng, g, ins, depth - 1);
    let before = g.len();
    let op = if rng.gen_bool(0.7) {
        g.add_and(a, b).unwrap()
    } else {
        g.add_xor(a, b).unwrap()
    };
    // Only two inputs can fold; fall back to a plain input then.
    if op.node.id == before {
        op.negate_if(rng.gen_bool(0.3))
    } else {
        pick(rng, ins)
    }
}

/// Input patterns plus the words every output of `graph` takes on them.
pub fn reference_outputs(
    rng: &mut Xoshiro256PlusPlus,
    graph: &SubjectGraph,
    rounds: usize,
) -> Vec<(Vec<u64>, Vec<u64>)> {
    (0..rounds)
        .map(|_| {
            let words: Vec<u64> = (0..graph.inputs().len()).map(|_| rng.r#gen()).collect();
            let outs = simulate_outputs(graph, &words);
            (words, outs)
        })
        .collect()
}

pub fn assert_network_matches(network: &MappedNetwork, reference: &[(Vec<u64>, Vec<u64>)]) {
    for (words, expected) in reference {
        assert_eq!(&network.simulate(words), expected, "inputs {:x?}", words);
    }
}
