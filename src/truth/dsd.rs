// SPDX-License-Identifier: Apache-2.0

//! Disjoint-support decomposition cost.
//!
//! A function decomposes when its support splits into two disjoint sets `A`
//! and `B` with `f = g(A) op h(B)` for `op` one of AND, OR or XOR, or when
//! some variable `x` selects between two cofactors with disjoint supports.
//! The cost is the number of two-input AND nodes the decomposition needs:
//! AND and OR blocks take one, XOR and MUX blocks take three.

use super::table::TruthTable;

const AND_COST: u32 = 1;
const XOR_COST: u32 = 3;
const MUX_COST: u32 = 3;

/// Returns the AND-node count of a full decomposition of `f`, or `None` when
/// some block of `f` is prime.
pub fn dsd_cost(f: &TruthTable) -> Option<u32> {
    let support = f.support();
    if support.count_ones() <= 1 {
        return Some(0);
    }
    let lowest = support & support.wrapping_neg();
    let rest = support & !lowest;

    // Every split puts the lowest variable in `A`, so each unordered split is
    // tried once.
    let mut subset = 0u32;
    loop {
        let a = lowest | subset;
        let b = support & !a;
        if b != 0 {
            if let Some(split) = try_split(f, a, b) {
                return split;
            }
        }
        if subset == rest {
            break;
        }
        subset = subset.wrapping_sub(rest) & rest;
    }

    for x in (0..f.num_vars()).filter(|x| (support >> x) & 1 != 0) {
        let f0 = f.cofactor0(x);
        let f1 = f.cofactor1(x);
        if f0.support() & f1.support() == 0 {
            return Some(dsd_cost(&f0)? + dsd_cost(&f1)? + MUX_COST);
        }
    }
    None
}

/// `Some(result)` if `f` splits over `(a, b)`; the inner result is `None` when
/// one of the parts is not decomposable.
fn try_split(f: &TruthTable, a: u32, b: u32) -> Option<Option<u32>> {
    let on_a = f.exist(b);
    let on_b = f.exist(a);
    if &(&on_a & &on_b) == f {
        return Some(combine(&on_a, &on_b, AND_COST));
    }
    let all_a = f.forall(b);
    let all_b = f.forall(a);
    if &(&all_a | &all_b) == f {
        return Some(combine(&all_a, &all_b, AND_COST));
    }
    let only_a = f.restrict0(b);
    let only_b = f.restrict0(a);
    let both = f.restrict0(a | b);
    if &(&(&only_a ^ &only_b) ^ &both) == f {
        return Some(combine(&only_a, &only_b, XOR_COST));
    }
    None
}

fn combine(g: &TruthTable, h: &TruthTable, cost: u32) -> Option<u32> {
    Some(dsd_cost(g)? + dsd_cost(h)? + cost)
}
