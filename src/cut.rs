// SPDX-License-Identifier: Apache-2.0

//! Scratch cuts and their scored form.

use std::fmt;

use crate::graph::{NodeRef, Operand};
use crate::params::MAX_LUT_SIZE;

/// A cut being built or scored: at most `MAX_LUT_SIZE` distinct leaves plus
/// the optional interned function `func` (with output complement `compl`).
#[derive(Clone, Copy)]
pub struct Cut {
    leaves: [Operand; MAX_LUT_SIZE],
    len: u8,
    pub func: Option<u32>,
    pub compl: bool,
    pub useless: bool,
}

impl Cut {
    pub fn empty() -> Self {
        Cut {
            leaves: [Operand::FALSE; MAX_LUT_SIZE],
            len: 0,
            func: None,
            compl: false,
            useless: false,
        }
    }

    /// The cut `{node}`; its function is the identity of variable 0 when
    /// functions are tracked.
    pub fn trivial(node: NodeRef, func: Option<u32>) -> Self {
        let mut cut = Cut::empty();
        cut.push(node.into());
        cut.func = func;
        cut
    }

    pub fn from_leaves(leaves: &[Operand]) -> Self {
        let mut cut = Cut::empty();
        for leaf in leaves {
            cut.push(*leaf);
        }
        cut
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn leaves(&self) -> &[Operand] {
        &self.leaves[..self.len()]
    }

    pub fn leaf(&self, i: usize) -> Operand {
        self.leaves()[i]
    }

    pub fn push(&mut self, leaf: Operand) {
        assert!(self.len() < MAX_LUT_SIZE, "cut overflow");
        self.leaves[self.len()] = leaf;
        self.len += 1;
    }

    /// Keeps the leaves whose bit is set in `mask`, in order.
    pub fn retain_mask(&mut self, mask: u32) {
        let mut w = 0;
        for r in 0..self.len() {
            if (mask >> r) & 1 != 0 {
                self.leaves[w] = self.leaves[r];
                w += 1;
            }
        }
        for slot in &mut self.leaves[w..] {
            *slot = Operand::FALSE;
        }
        self.len = w as u8;
    }

    pub fn is_trivial_for(&self, node: NodeRef) -> bool {
        self.len == 1 && self.leaves[0].node == node
    }

    pub fn position_of(&self, node: NodeRef) -> Option<usize> {
        self.leaves().iter().position(|l| l.node == node)
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        self.position_of(node).is_some()
    }

    /// Bit `id % 64` set for every leaf.
    pub fn signature(&self) -> u64 {
        self.leaves()
            .iter()
            .fold(0u64, |acc, l| acc | (1u64 << (l.node.id % 64)))
    }

    /// Exact leaf-set containment.
    pub fn is_subset_of(&self, other: &Cut) -> bool {
        self.len <= other.len && self.leaves().iter().all(|l| other.contains(l.node))
    }

    pub fn is_sorted(&self) -> bool {
        self.leaves().windows(2).all(|w| w[0].node < w[1].node)
    }

    pub fn sort_leaves(&mut self) {
        let n = self.len();
        self.leaves[..n].sort_unstable_by_key(|l| l.node);
    }

    /// Unions the leaf sets: the largest cut's leaves first, then the leaves
    /// of the others that are not present yet. Returns `None` when the union
    /// has more than `k` leaves.
    pub fn merge(cuts: &[&Cut], k: usize) -> Option<Cut> {
        debug_assert!(!cuts.is_empty() && cuts.len() <= 3);
        let mut order: [usize; 3] = [0, 1, 2];
        let order = &mut order[..cuts.len()];
        order.sort_by_key(|i| std::cmp::Reverse(cuts[*i].len()));
        let first = cuts[order[0]];
        if first.len() > k {
            return None;
        }
        let mut out = Cut::from_leaves(first.leaves());
        for &i in &order[1..] {
            for leaf in cuts[i].leaves() {
                if out.contains(leaf.node) {
                    continue;
                }
                if out.len() == k {
                    return None;
                }
                out.push(*leaf);
            }
        }
        Some(out)
    }
}

impl PartialEq for Cut {
    fn eq(&self, other: &Self) -> bool {
        self.leaves() == other.leaves()
            && self.func == other.func
            && self.compl == other.compl
            && self.useless == other.useless
    }
}

impl Eq for Cut {}

impl fmt::Debug for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, leaf) in self.leaves().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", leaf.node.id)?;
        }
        write!(f, "}}")?;
        if let Some(func) = self.func {
            write!(f, " f{}", func)?;
        }
        if self.compl {
            write!(f, " ~")?;
        }
        if self.useless {
            write!(f, " useless")?;
        }
        Ok(())
    }
}

/// A cut together with the costs it is ranked by.
///
/// Times are in ticks, area and edge flow in fixed-point units (see
/// `crate::library`). `seq` is the insertion sequence number and makes every
/// comparator a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutUnit {
    pub cut: Cut,
    pub arrival: u32,
    pub area: u64,
    pub edge: u64,
    pub ave_refs: u64,
    pub sig: u64,
    pub seq: u64,
}

impl CutUnit {
    pub fn new(cut: Cut) -> Self {
        CutUnit {
            sig: cut.signature(),
            cut,
            arrival: 0,
            area: 0,
            edge: 0,
            ave_refs: 0,
            seq: 0,
        }
    }

    /// True when this unit's leaves are contained in `other`'s, using the
    /// signature as a pre-filter.
    pub fn is_contained_in(&self, other: &CutUnit) -> bool {
        self.cut.len() <= other.cut.len()
            && (self.sig & other.sig) == self.sig
            && self.cut.is_subset_of(&other.cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cut(ids: &[usize]) -> Cut {
        Cut::from_leaves(&ids.iter().map(|id| Operand::new(*id, false)).collect::<Vec<_>>())
    }

    fn ids(c: &Cut) -> Vec<usize> {
        c.leaves().iter().map(|l| l.node.id).collect()
    }

    #[test]
    fn test_merge_puts_largest_cut_first() {
        let a = cut(&[7]);
        let b = cut(&[3, 9, 4]);
        let m = Cut::merge(&[&a, &b], 6).unwrap();
        assert_eq!(ids(&m), vec![3, 9, 4, 7]);
    }

    #[test]
    fn test_merge_dedups_and_respects_bound() {
        let a = cut(&[1, 2]);
        let b = cut(&[2, 3]);
        let c = cut(&[3, 4]);
        assert_eq!(ids(&Cut::merge(&[&a, &b], 3).unwrap()), vec![1, 2, 3]);
        assert!(Cut::merge(&[&a, &b, &c], 3).is_none());
        assert_eq!(Cut::merge(&[&a, &b, &c], 4).unwrap().len(), 4);
    }

    #[test]
    fn test_signature_and_containment() {
        let small = CutUnit::new(cut(&[1, 65]));
        let big = CutUnit::new(cut(&[1, 2, 65]));
        // 1 and 65 collide in the signature.
        assert_eq!(small.sig, 1 << 1);
        assert!(small.is_contained_in(&big));
        assert!(!big.is_contained_in(&small));
        let collide = CutUnit::new(cut(&[1, 129]));
        assert_eq!(collide.sig, small.sig);
        assert!(!collide.is_contained_in(&big));
    }

    #[test]
    fn test_retain_mask_and_sort() {
        let mut c = cut(&[9, 4, 6, 2]);
        c.retain_mask(0b1011);
        assert_eq!(ids(&c), vec![9, 4, 2]);
        assert!(!c.is_sorted());
        c.sort_leaves();
        assert_eq!(ids(&c), vec![2, 4, 9]);
        assert!(c.is_sorted());
        // Equality ignores the unused tail of the leaf array.
        assert_eq!(c, cut(&[2, 4, 9]));
    }
}
