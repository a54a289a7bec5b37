// SPDX-License-Identifier: Apache-2.0

//! Hash-consed function table and cut function composition.

use ahash::AHashMap;

use super::dsd::dsd_cost;
use super::table::TruthTable;
use crate::cut::Cut;
use crate::graph::NodeKind;

pub type FuncId = u32;

/// Id of the constant-0 function.
pub const FUNC_CONST0: FuncId = 0;
/// Id of the identity of variable 0, the function of every trivial cut.
pub const FUNC_VAR0: FuncId = 1;

/// Every distinct function seen during a run, stored at a fixed width.
#[derive(Debug)]
pub struct FuncTable {
    nvars: usize,
    tables: Vec<TruthTable>,
    index: AHashMap<TruthTable, FuncId>,
    dsd: Vec<Option<Option<u32>>>,
}

impl FuncTable {
    pub fn new(nvars: usize) -> Self {
        let mut t = FuncTable {
            nvars,
            tables: Vec::new(),
            index: AHashMap::new(),
            dsd: Vec::new(),
        };
        let c0 = t.intern(&TruthTable::const0(nvars));
        let v0 = t.intern(&TruthTable::var(nvars, 0));
        debug_assert_eq!((c0, v0), (FUNC_CONST0, FUNC_VAR0));
        t
    }

    pub fn num_vars(&self) -> usize {
        self.nvars
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, id: FuncId) -> &TruthTable {
        &self.tables[id as usize]
    }

    /// Returns the id of `table`, adding it if it is new.
    pub fn intern(&mut self, table: &TruthTable) -> FuncId {
        assert_eq!(
            table.num_vars(),
            self.nvars,
            "function width mismatch: {} vs {}",
            table.num_vars(),
            self.nvars
        );
        if let Some(id) = self.index.get(table) {
            return *id;
        }
        let id = self.tables.len() as FuncId;
        self.tables.push(table.clone());
        self.index.insert(table.clone(), id);
        self.dsd.push(None);
        id
    }

    /// Function of `cut` with its complement applied, over the table width.
    pub fn cut_table(&self, cut: &Cut) -> Option<TruthTable> {
        let t = self.table(cut.func?).clone();
        Some(if cut.compl { !t } else { t })
    }

    /// Computes the function of `merged` as `kind` applied to the children.
    ///
    /// Each child is a fanin cut and the negation of the fanin edge it came
    /// through; children are in fanin order (`[d0, d1, sel]` for a MUX). All
    /// cuts must carry functions and have sorted leaves. The result is
    /// canonical: its value under the all-zero assignment is 0, and the
    /// returned flag says whether it was complemented to get there.
    pub fn compose(
        &mut self,
        kind: NodeKind,
        children: &[(&Cut, bool)],
        merged: &Cut,
    ) -> (FuncId, bool) {
        debug_assert_eq!(children.len(), kind.arity());
        debug_assert!(merged.is_sorted());
        let mut args: Vec<TruthTable> = Vec::with_capacity(children.len());
        for (cut, negated) in children {
            let func = cut.func.expect("compose needs child functions");
            let mut t = self.table(func).clone();
            if cut.compl ^ *negated {
                t = !t;
            }
            let positions: Vec<usize> = cut
                .leaves()
                .iter()
                .map(|l| {
                    merged
                        .position_of(l.node)
                        .expect("child leaf missing from merged cut")
                })
                .collect();
            t.stretch(&positions);
            args.push(t);
        }
        let result = match kind {
            NodeKind::Buf => args.swap_remove(0),
            NodeKind::And => &args[0] & &args[1],
            NodeKind::Xor => &args[0] ^ &args[1],
            NodeKind::Mux => TruthTable::mux(&args[2], &args[1], &args[0]),
            NodeKind::Const0 | NodeKind::Ci | NodeKind::Co => {
                unreachable!("{:?} nodes have no cut function", kind)
            }
        };
        self.intern_canonical(result)
    }

    /// Interns `t` or its complement, whichever is 0 under the all-zero
    /// assignment.
    pub fn intern_canonical(&mut self, t: TruthTable) -> (FuncId, bool) {
        if t.get_bit(0) {
            (self.intern(&!t), true)
        } else {
            (self.intern(&t), false)
        }
    }

    /// Drops the leaves the cut's function does not depend on and re-interns
    /// the packed function. At least one leaf is kept. Returns `false` and
    /// leaves the cut alone when nothing can be dropped.
    pub fn minimize_support(&mut self, cut: &mut Cut) -> bool {
        let Some(func) = cut.func else {
            return false;
        };
        let table = self.table(func);
        let support = table.support();
        debug_assert_eq!(support >> cut.len(), 0, "function depends on a missing leaf");
        let keep = if support == 0 { 1 } else { support };
        if keep.count_ones() as usize == cut.len() {
            return false;
        }
        let mut packed = table.clone();
        packed.min_base();
        cut.retain_mask(keep);
        cut.func = Some(self.intern(&packed));
        true
    }

    /// Two-input AND count of the function's disjoint-support decomposition,
    /// `None` if it has a prime block. Cached per id.
    pub fn dsd_cost(&mut self, id: FuncId) -> Option<u32> {
        if let Some(cached) = self.dsd[id as usize] {
            return cached;
        }
        let cost = dsd_cost(&self.tables[id as usize]);
        self.dsd[id as usize] = Some(cost);
        cost
    }

    /// Evaluates `cut`'s function (with complement) on one assignment of its
    /// leaves, `values[i]` being the value of leaf `i`.
    pub fn eval(&self, cut: &Cut, values: &[bool]) -> Option<bool> {
        let func = cut.func?;
        let index = values
            .iter()
            .enumerate()
            .fold(0usize, |acc, (i, v)| acc | ((*v as usize) << i));
        Some(self.table(func).get_bit(index) ^ cut.compl)
    }
}
