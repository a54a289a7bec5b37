// SPDX-License-Identifier: Apache-2.0

//! Properties every finished mapping must have, checked on seeded random
//! graphs.

mod common;

use test_case::test_case;

use xlsynth_lutmap::graph::NodeKind;
use xlsynth_lutmap::library::LutLibrary;
use xlsynth_lutmap::mapper::{Mapper, Round};
use xlsynth_lutmap::params::{FunctionMode, MapParams};

fn params(k: usize, functions: FunctionMode) -> MapParams {
    MapParams {
        lut_size: k,
        num_cuts: 6,
        functions,
        keep_cuts: true,
        ..Default::default()
    }
}

#[test_case(4, FunctionMode::Structural, false ; "k4 structural")]
#[test_case(6, FunctionMode::Structural, true ; "k6 structural choices")]
#[test_case(5, FunctionMode::Truth, false ; "k5 truth")]
#[test_case(4, FunctionMode::Truth, true ; "k4 truth choices")]
#[test_case(4, FunctionMode::Dsd, false ; "k4 dsd")]
fn test_cuts_are_bounded_and_arrivals_consistent(
    k: usize,
    functions: FunctionMode,
    choices: bool,
) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = common::rng(0x5eed + k as u64);
    let graph = common::random_dag(&mut rng, 8, 120, 6, choices);
    let mut mapper = Mapper::new(graph, &LutLibrary::unit(k), params(k, functions)).unwrap();
    mapper.perform();
    let graph = mapper.graph();

    for node in graph.topo_order() {
        if !graph.kind(node).is_logic() {
            continue;
        }
        let cuts = mapper.cuts(node);
        assert!(cuts.len() <= 6, "node {} keeps {} cuts", node.id, cuts.len());
        for cut in &cuts {
            assert!(!cut.is_empty(), "node {} has an empty cut", node.id);
            assert!(cut.len() <= k, "node {}: {:?}", node.id, cut);
        }
        // No kept cut is a leaf-superset of a better-ranked one.
        let ranked = &cuts[..cuts.len() - 1];
        for (i, better) in ranked.iter().enumerate() {
            for worse in &ranked[i + 1..] {
                assert!(
                    !better.is_subset_of(worse),
                    "node {}: {:?} dominates {:?}",
                    node.id,
                    better,
                    worse
                );
            }
        }
    }

    let timing = mapper.timing();
    for node in mapper.mapped_nodes() {
        let cut = mapper.best_cut(node).unwrap();
        let expected = cut
            .leaves()
            .iter()
            .enumerate()
            .map(|(pos, l)| mapper.arrival(l.node) + timing.pin_delay(cut.len(), pos))
            .max()
            .unwrap_or(0);
        assert_eq!(mapper.arrival(node), expected, "node {}", node.id);
        let required = mapper.required(node).unwrap();
        assert!(mapper.arrival(node) <= required, "node {}", node.id);
    }
    assert_eq!(mapper.required_violations(), 0);
}

#[test_case(FunctionMode::Structural ; "structural")]
#[test_case(FunctionMode::Truth ; "truth")]
#[test_case(FunctionMode::Dsd ; "dsd")]
fn test_area_rounds_keep_the_delay(functions: FunctionMode) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = common::rng(17);
    let graph = common::random_dag(&mut rng, 10, 200, 8, false);
    let mut mapper = Mapper::new(graph, &LutLibrary::unit(4), params(4, functions)).unwrap();
    let stats = mapper.perform();
    assert_eq!(stats.rounds.len(), 5);
    let delay_round = &stats.rounds[1];
    for round in &stats.rounds[2..] {
        assert!(
            round.delay_ticks <= mapper.global_required(),
            "{} delay {} above {}",
            round.name,
            round.delay_ticks,
            mapper.global_required()
        );
    }
    assert_eq!(mapper.global_required(), delay_round.delay_ticks);
    assert!(stats.rounds[4].area_units <= stats.rounds[1].area_units);
}

fn assert_area_rounds_never_grow(stats: &xlsynth_lutmap::MapStats, label: &str) {
    // Every area round is compared with the round right before it, starting
    // with the second delay round.
    for pair in stats.rounds[1..].windows(2) {
        assert!(
            pair[1].area_units <= pair[0].area_units,
            "{}: {} area {} after {} area {}",
            label,
            pair[1].name,
            pair[1].area,
            pair[0].name,
            pair[0].area
        );
    }
}

#[test_case(3 ; "k3")]
#[test_case(5 ; "k5")]
fn test_area_never_grows_on_fanout_free_graphs(k: usize) {
    let _ = env_logger::builder().is_test(true).try_init();
    for seed in 0..8 {
        let mut rng = common::rng(seed);
        let graph = common::random_forest(&mut rng, 9, 3, 6);
        let mut mapper =
            Mapper::new(graph, &LutLibrary::unit(k), MapParams::with_lut_size(k)).unwrap();
        let stats = mapper.perform();
        assert_area_rounds_never_grow(&stats, &format!("seed {}", seed));
    }
}

#[test_case(4 ; "k4")]
#[test_case(6 ; "k6")]
fn test_area_never_grows_on_shared_dags(k: usize) {
    let _ = env_logger::builder().is_test(true).try_init();
    for seed in 0..40 {
        let mut rng = common::rng(seed);
        let graph = common::random_dag(&mut rng, 10, 200, 8, seed % 2 == 0);
        let mut mapper =
            Mapper::new(graph, &LutLibrary::unit(k), MapParams::with_lut_size(k)).unwrap();
        let stats = mapper.perform();
        assert_eq!(stats.rounds.len(), 5);
        assert_area_rounds_never_grow(&stats, &format!("seed {} k {}", seed, k));
        assert!(stats.rounds[4].delay_ticks <= mapper.global_required());
        assert_eq!(mapper.required_violations(), 0);
    }
}

#[test]
fn test_delay_only_stops_after_delay_rounds() {
    let mut rng = common::rng(3);
    let graph = common::random_dag(&mut rng, 6, 50, 3, false);
    let params = MapParams {
        delay_only: true,
        ..MapParams::with_lut_size(4)
    };
    let mut mapper = Mapper::new(graph, &LutLibrary::unit(4), params).unwrap();
    let stats = mapper.perform();
    let names: Vec<&str> = stats.rounds.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec![Round::DELAY1.name, Round::DELAY2.name]);
}

#[test]
fn test_delay_target_relaxes_required_time() {
    let mut rng = common::rng(11);
    let graph = common::random_dag(&mut rng, 8, 150, 5, false);
    let tight = {
        let params = MapParams::with_lut_size(4);
        let mut mapper = Mapper::new(graph.clone(), &LutLibrary::unit(4), params).unwrap();
        mapper.perform()
    };
    let params = MapParams {
        delay_target: Some(tight.delay + 3.0),
        ..MapParams::with_lut_size(4)
    };
    let mut mapper = Mapper::new(graph, &LutLibrary::unit(4), params).unwrap();
    let relaxed = mapper.perform();
    assert_eq!(relaxed.global_required, tight.delay + 3.0);
    assert!(relaxed.delay <= relaxed.global_required);
    assert_eq!(relaxed.required_violations, 0);
}

#[test]
fn test_early_stop_keeps_results_valid() {
    let mut rng = common::rng(23);
    let graph = common::random_dag(&mut rng, 8, 150, 5, true);
    let reference = common::reference_outputs(&mut rng, &graph, 4);
    let params = MapParams {
        early_stop: true,
        ..MapParams::with_lut_size(5)
    };
    let mut mapper = Mapper::new(graph, &LutLibrary::unit(5), params).unwrap();
    let stats = mapper.perform();
    assert_eq!(stats.required_violations, 0);
    let network = xlsynth_lutmap::MappedNetwork::from_mapper(&mapper).unwrap();
    common::assert_network_matches(&network, &reference);
}

#[test]
fn test_released_cut_lists_return_to_the_arena() {
    let mut rng = common::rng(5);
    let graph = common::random_dag(&mut rng, 8, 100, 4, false);
    let mut mapper =
        Mapper::new(graph, &LutLibrary::unit(4), MapParams::with_lut_size(4)).unwrap();
    mapper.perform();
    let graph = mapper.graph();
    let fanout = graph.fanout_counts();
    // Lists survive only at nodes nobody reads.
    for node in graph.topo_order() {
        if fanout[node.id] > 0 {
            assert!(mapper.cuts(node).is_empty(), "node {}", node.id);
        }
    }
    let logic = graph.topo_order().filter(|n| graph.kind(*n).is_logic()).count();
    let listed: usize = graph.topo_order().map(|n| mapper.cuts(n).len()).sum();
    assert_eq!(mapper.arena().live_records(), logic + listed);
    assert_eq!(graph.count_kind(NodeKind::Ci), 8);
}
