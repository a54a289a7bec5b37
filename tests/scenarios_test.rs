// SPDX-License-Identifier: Apache-2.0

//! Small hand-built graphs whose cuts and round-by-round choices can be
//! worked out by hand.

use pretty_assertions::assert_eq;

use xlsynth_lutmap::cut::Cut;
use xlsynth_lutmap::graph::{NodeRef, Operand, SubjectGraph};
use xlsynth_lutmap::library::LutLibrary;
use xlsynth_lutmap::mapper::{Mapper, Round};
use xlsynth_lutmap::params::{FunctionMode, MapParams};
use xlsynth_lutmap::truth::{FuncTable, TruthTable};

struct Chain {
    graph: SubjectGraph,
    a: NodeRef,
    b: NodeRef,
    c: NodeRef,
    n1: NodeRef,
    n2: NodeRef,
}

/// `n1 = a & b`, `n2 = n1 & c`, output `n2`.
fn and_chain() -> Chain {
    let mut graph = SubjectGraph::new();
    let a = graph.add_input("a");
    let b = graph.add_input("b");
    let c = graph.add_input("c");
    let n1 = graph.add_and(a, b).unwrap();
    let n2 = graph.add_and(n1, c).unwrap();
    graph.add_output("y", n2).unwrap();
    Chain {
        graph,
        a: a.node,
        b: b.node,
        c: c.node,
        n1: n1.node,
        n2: n2.node,
    }
}

fn leaf_nodes(cut: &Cut) -> Vec<NodeRef> {
    let mut nodes: Vec<NodeRef> = cut.leaves().iter().map(|l| l.node).collect();
    nodes.sort();
    nodes
}

#[test]
fn test_three_input_cut_is_enumerated() {
    let _ = env_logger::builder().is_test(true).try_init();
    let chain = and_chain();
    let params = MapParams {
        lut_size: 3,
        functions: FunctionMode::Truth,
        keep_cuts: true,
        ..Default::default()
    };
    let mut mapper = Mapper::new(chain.graph, &LutLibrary::unit(3), params).unwrap();
    mapper.perform();

    let cuts = mapper.cuts(chain.n2);
    let leaf_sets: Vec<Vec<NodeRef>> = cuts.iter().map(leaf_nodes).collect();
    assert!(leaf_sets.contains(&vec![chain.a, chain.b, chain.c]), "{:?}", leaf_sets);
    assert_eq!(leaf_sets.last(), Some(&vec![chain.n2]));

    let wide = cuts.iter().find(|c| c.len() == 3).unwrap();
    let funcs = mapper.funcs().unwrap();
    let and3 = TruthTable::from_fn(3, |i| i == 0b111);
    assert_eq!(funcs.cut_table(wide).unwrap().shrink(3), and3);

    let best = mapper.best_cut(chain.n2).unwrap();
    assert_eq!(leaf_nodes(&best), vec![chain.a, chain.b, chain.c]);
    assert_eq!(mapper.stats().luts, 1);
}

#[test]
fn test_two_input_luts_reject_wide_merge() {
    let _ = env_logger::builder().is_test(true).try_init();
    let chain = and_chain();
    let params = MapParams {
        lut_size: 2,
        keep_cuts: true,
        ..Default::default()
    };
    let mut mapper = Mapper::new(chain.graph, &LutLibrary::unit(2), params).unwrap();
    let stats = mapper.perform();

    let leaf_sets: Vec<Vec<NodeRef>> = mapper.cuts(chain.n2).iter().map(leaf_nodes).collect();
    assert_eq!(leaf_sets, vec![vec![chain.c, chain.n1], vec![chain.n2]]);
    assert_eq!(stats.luts, 2);
    assert_eq!(stats.delay, 2.0);
}

#[test]
fn test_padded_cut_minimizes_to_same_function() {
    let mut funcs = FuncTable::new(3);
    let and2 = &TruthTable::var(3, 0) & &TruthTable::var(3, 1);
    let id = funcs.intern(&and2);

    let (a, b, d) = (Operand::new(1, false), Operand::new(2, false), Operand::new(4, false));
    let mut narrow = Cut::from_leaves(&[a, b]);
    narrow.func = Some(id);
    let mut padded = Cut::from_leaves(&[a, b, d]);
    // Same table: variable 2 is simply never read.
    padded.func = Some(funcs.intern(&and2));

    assert!(funcs.minimize_support(&mut padded));
    assert_eq!(padded.leaves(), narrow.leaves());
    assert_eq!(padded.func, narrow.func);

    let again = padded;
    assert!(!funcs.minimize_support(&mut padded));
    assert_eq!(padded, again);
}

#[test]
fn test_padded_cut_from_enumeration_minimizes() {
    // `(a & b) | (a & b & d)` reads `d` structurally but not logically.
    let mut g = SubjectGraph::new();
    let a = g.add_input("a");
    let b = g.add_input("b");
    let d = g.add_input("d");
    let ab = g.add_and(a, b).unwrap();
    let abd = g.add_and(ab, d).unwrap();
    let y = g.add_or(ab, abd).unwrap();
    g.add_output("y", y).unwrap();

    let params = MapParams {
        lut_size: 3,
        functions: FunctionMode::Truth,
        cut_min: true,
        ..Default::default()
    };
    let mut mapper = Mapper::new(g, &LutLibrary::unit(3), params).unwrap();
    mapper.perform();
    let best = mapper.best_cut(y.node).unwrap();
    assert_eq!(leaf_nodes(&best), vec![a.node, b.node]);
    let ab_best = mapper.best_cut(ab.node).unwrap();
    assert_eq!(best.func, ab_best.func);
    assert_eq!(best.compl ^ y.negated, ab_best.compl);
}

#[test]
fn test_area_round_picks_cheaper_cut_at_same_delay() {
    let _ = env_logger::builder().is_test(true).try_init();
    // Size-3 LUTs are cheap but slow, size-2 LUTs are fast but dear.
    let library = LutLibrary::parse("1 1 1\n2 2 1\n3 1 2\n").unwrap();
    let chain = and_chain();
    let mut mapper = Mapper::new(chain.graph, &library, MapParams::with_lut_size(3)).unwrap();

    let delay = mapper.perform_round(Round::DELAY1);
    // `{n1, c}` and `{a, b, c}` both arrive at 2; the delay round breaks the
    // tie on leaf count.
    assert_eq!(delay.delay, 2.0);
    assert_eq!(delay.luts, 2);
    assert_eq!(delay.area, 4.0);
    assert_eq!(
        leaf_nodes(&mapper.best_cut(chain.n2).unwrap()),
        vec![chain.c, chain.n1]
    );

    let area = mapper.perform_round(Round::AREA1);
    assert_eq!(mapper.global_required(), 200);
    assert_eq!(area.delay, 2.0);
    assert_eq!(area.luts, 1);
    assert_eq!(area.area, 1.0);
    assert_eq!(
        leaf_nodes(&mapper.best_cut(chain.n2).unwrap()),
        vec![chain.a, chain.b, chain.c]
    );
    assert_eq!(mapper.required_violations(), 0);
    assert_eq!(mapper.round_history().len(), 2);
}

#[test]
fn test_harvested_choice_cuts_respect_required_time() {
    let _ = env_logger::builder().is_test(true).try_init();
    // `s` reaches `a & b` through a deeper cone; `n` computes it directly and
    // takes `s` as its choice.
    let mut g = SubjectGraph::new();
    let a = g.add_input("a");
    let b = g.add_input("b");
    let t = g.add_and(a, b).unwrap();
    let s = g.add_and(t, b).unwrap();
    let n = g.add_and(a, b).unwrap();
    g.set_sibling(n.node, s.node).unwrap();
    g.add_output("y", n).unwrap();
    let params = MapParams {
        lut_size: 2,
        keep_cuts: true,
        ..Default::default()
    };
    let mut mapper = Mapper::new(g, &LutLibrary::unit(2), params).unwrap();

    // Nothing is required yet, so the slow `{b, t}` cut of the choice is
    // harvested.
    mapper.perform_round(Round::DELAY1);
    let leaf_sets: Vec<Vec<NodeRef>> = mapper.cuts(n.node).iter().map(leaf_nodes).collect();
    assert_eq!(
        leaf_sets,
        vec![vec![a.node, b.node], vec![b.node, t.node], vec![n.node]]
    );
    assert_eq!(mapper.required(n.node), Some(100));

    // `{b, t}` arrives at 2 but `n` is required at 1.
    mapper.perform_round(Round::DELAY2);
    let leaf_sets: Vec<Vec<NodeRef>> = mapper.cuts(n.node).iter().map(leaf_nodes).collect();
    assert_eq!(leaf_sets, vec![vec![a.node, b.node], vec![n.node]]);
    assert_eq!(mapper.stats().delay, 1.0);
}

#[test]
#[should_panic(expected = "needs a previous mapping")]
fn test_constrained_round_needs_previous_mapping() {
    let chain = and_chain();
    let mut mapper =
        Mapper::new(chain.graph, &LutLibrary::unit(3), MapParams::with_lut_size(3)).unwrap();
    mapper.perform_round(Round::AREA1);
}
