// SPDX-License-Identifier: Apache-2.0

//! Multi-word truth tables over up to `MAX_TT_VARS` variables.
//!
//! A table over `n` variables holds `max(1, 2^(n - 6))` words. Word `w` covers
//! the assignments whose variables `6..n` spell out `w`; within a word the
//! layout is the one of `word6`. Operations on variables below 6 go through
//! the single-word routines word by word.

use std::ops::{BitAnd, BitOr, BitXor, Not};

use super::word6;

pub const MAX_TT_VARS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TruthTable {
    nvars: usize,
    words: Vec<u64>,
}

pub fn word_count(nvars: usize) -> usize {
    if nvars <= 6 { 1 } else { 1 << (nvars - 6) }
}

impl TruthTable {
    pub fn const0(nvars: usize) -> Self {
        assert!(
            nvars <= MAX_TT_VARS,
            "truth table over {} variables exceeds {}",
            nvars,
            MAX_TT_VARS
        );
        TruthTable {
            nvars,
            words: vec![0; word_count(nvars)],
        }
    }

    pub fn const1(nvars: usize) -> Self {
        !Self::const0(nvars)
    }

    /// The projection onto variable `i`.
    pub fn var(nvars: usize, i: usize) -> Self {
        assert!(i < nvars, "variable {} out of range for {} variables", i, nvars);
        let mut t = Self::const0(nvars);
        if i < 6 {
            t.words.fill(word6::var(i));
        } else {
            let step = 1usize << (i - 6);
            for (w, word) in t.words.iter_mut().enumerate() {
                if w & step != 0 {
                    *word = u64::MAX;
                }
            }
        }
        t
    }

    /// Builds a table from raw words, replicating sub-word tables.
    pub fn from_words(nvars: usize, words: &[u64]) -> Self {
        let mut t = Self::const0(nvars);
        assert_eq!(words.len(), t.words.len(), "word count mismatch");
        t.words.copy_from_slice(words);
        if nvars < 6 {
            t.words[0] = word6::replicate(t.words[0], nvars);
        }
        t
    }

    /// Tabulates `f` over every assignment.
    pub fn from_fn(nvars: usize, f: impl Fn(usize) -> bool) -> Self {
        let mut t = Self::const0(nvars);
        for index in 0..(1usize << nvars) {
            if f(index) {
                t.set_bit(index, true);
            }
        }
        if nvars < 6 {
            t.words[0] = word6::replicate(t.words[0], nvars);
        }
        t
    }

    pub fn num_vars(&self) -> usize {
        self.nvars
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn get_bit(&self, index: usize) -> bool {
        debug_assert!(index < (1usize << self.nvars));
        (self.words[index >> 6] >> (index & 63)) & 1 != 0
    }

    /// Sets one assignment's value; sub-word tables need `from_words` or
    /// `from_fn` to restore replication.
    pub fn set_bit(&mut self, index: usize, value: bool) {
        let word = &mut self.words[index >> 6];
        let bit = 1u64 << (index & 63);
        if value {
            *word |= bit;
        } else {
            *word &= !bit;
        }
    }

    pub fn is_const0(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn is_const1(&self) -> bool {
        self.words.iter().all(|w| *w == u64::MAX)
    }

    pub fn count_ones(&self) -> u32 {
        if self.nvars < 6 {
            (self.words[0] & word6::mask(self.nvars)).count_ones()
        } else {
            self.words.iter().map(|w| w.count_ones()).sum()
        }
    }

    /// `sel ? d1 : d0`.
    pub fn mux(sel: &Self, d1: &Self, d0: &Self) -> Self {
        debug_assert!(sel.nvars == d1.nvars && sel.nvars == d0.nvars);
        let words = sel
            .words
            .iter()
            .zip(d1.words.iter().zip(&d0.words))
            .map(|(s, (a, b))| (s & a) | (!s & b))
            .collect();
        TruthTable {
            nvars: sel.nvars,
            words,
        }
    }

    /// Swaps variables `i` and `i + 1` in place.
    pub fn swap_adjacent(&mut self, i: usize) {
        debug_assert!(i + 1 < self.nvars, "swap {} out of range", i);
        if i < 5 {
            for w in &mut self.words {
                *w = word6::swap_adjacent(*w, i);
            }
        } else if i == 5 {
            for pair in self.words.chunks_exact_mut(2) {
                let (lo, hi) = (pair[0], pair[1]);
                pair[0] = (lo & 0x0000_0000_FFFF_FFFF) | (hi << 32);
                pair[1] = (hi & 0xFFFF_FFFF_0000_0000) | (lo >> 32);
            }
        } else {
            let step = 1usize << (i - 6);
            for group in self.words.chunks_exact_mut(4 * step) {
                let (left, right) = group.split_at_mut(2 * step);
                left[step..].swap_with_slice(&mut right[..step]);
            }
        }
    }

    /// Swaps arbitrary variables `i` and `j` by adjacent transpositions.
    pub fn swap_vars(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        for k in lo..hi {
            self.swap_adjacent(k);
        }
        for k in (lo..hi - 1).rev() {
            self.swap_adjacent(k);
        }
    }

    /// Moves variable `j` (for every `j`) to position `positions[j]`.
    ///
    /// The table must only depend on its first `positions.len()` variables and
    /// `positions` must be strictly increasing; variables are moved upward
    /// starting from the highest one, so each one only ever crosses variables
    /// the function does not depend on.
    pub fn stretch(&mut self, positions: &[usize]) {
        debug_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        for (j, &target) in positions.iter().enumerate().rev() {
            debug_assert!(target >= j && target < self.nvars);
            for k in j..target {
                self.swap_adjacent(k);
            }
        }
    }

    pub fn has_var(&self, i: usize) -> bool {
        debug_assert!(i < self.nvars);
        if i < 6 {
            self.words.iter().any(|w| word6::has_var(*w, i))
        } else {
            let step = 1usize << (i - 6);
            self.words
                .chunks_exact(2 * step)
                .any(|c| c[..step] != c[step..])
        }
    }

    /// Bit mask of the variables the function depends on.
    pub fn support(&self) -> u32 {
        (0..self.nvars)
            .filter(|i| self.has_var(*i))
            .fold(0, |acc, i| acc | (1 << i))
    }

    pub fn cofactor0(&self, i: usize) -> Self {
        let mut t = self.clone();
        if i < 6 {
            for w in &mut t.words {
                *w = word6::cofactor0(*w, i);
            }
        } else {
            let step = 1usize << (i - 6);
            for c in t.words.chunks_exact_mut(2 * step) {
                let (lo, hi) = c.split_at_mut(step);
                hi.copy_from_slice(lo);
            }
        }
        t
    }

    pub fn cofactor1(&self, i: usize) -> Self {
        let mut t = self.clone();
        if i < 6 {
            for w in &mut t.words {
                *w = word6::cofactor1(*w, i);
            }
        } else {
            let step = 1usize << (i - 6);
            for c in t.words.chunks_exact_mut(2 * step) {
                let (lo, hi) = c.split_at_mut(step);
                lo.copy_from_slice(hi);
            }
        }
        t
    }

    /// Existential quantification of every variable in `vars`.
    pub fn exist(&self, vars: u32) -> Self {
        let mut t = self.clone();
        for i in (0..self.nvars).filter(|i| (vars >> i) & 1 != 0) {
            t = &t.cofactor0(i) | &t.cofactor1(i);
        }
        t
    }

    /// Universal quantification of every variable in `vars`.
    pub fn forall(&self, vars: u32) -> Self {
        let mut t = self.clone();
        for i in (0..self.nvars).filter(|i| (vars >> i) & 1 != 0) {
            t = &t.cofactor0(i) & &t.cofactor1(i);
        }
        t
    }

    /// Forces every variable in `vars` to 0.
    pub fn restrict0(&self, vars: u32) -> Self {
        let mut t = self.clone();
        for i in (0..self.nvars).filter(|i| (vars >> i) & 1 != 0) {
            t = t.cofactor0(i);
        }
        t
    }

    /// Packs the support into the lowest variables, preserving their order,
    /// and returns the support mask it packed.
    pub fn min_base(&mut self) -> u32 {
        let support = self.support();
        let mut next = 0;
        for v in 0..self.nvars {
            if (support >> v) & 1 == 0 {
                continue;
            }
            for k in (next..v).rev() {
                self.swap_adjacent(k);
            }
            next += 1;
        }
        support
    }

    /// Reinterprets the table over its first `nvars` variables. The function
    /// must not depend on the dropped ones.
    pub fn shrink(&self, nvars: usize) -> Self {
        debug_assert!(nvars <= self.nvars);
        debug_assert_eq!(self.support() >> nvars, 0);
        let mut words = self.words[..word_count(nvars)].to_vec();
        if nvars < 6 {
            words[0] = word6::replicate(words[0], nvars);
        }
        TruthTable { nvars, words }
    }

    /// Reinterprets the table over `nvars >= self.num_vars()` variables.
    pub fn extend(&self, nvars: usize) -> Self {
        debug_assert!(nvars >= self.nvars);
        let mut t = Self::const0(nvars);
        let n = self.words.len();
        for (w, word) in t.words.iter_mut().enumerate() {
            *word = self.words[w % n];
        }
        t
    }

    pub fn to_hex(&self) -> String {
        let digits = (1usize << self.nvars).div_ceil(4);
        let mut s = String::with_capacity(digits);
        for d in (0..digits).rev() {
            let word = self.words[(d * 4) >> 6];
            let nibble = (word >> ((d * 4) & 63)) & 0xF;
            let nibble = if self.nvars < 2 {
                nibble & word6::mask(self.nvars)
            } else {
                nibble
            };
            s.push(char::from_digit(nibble as u32, 16).unwrap_or('?'));
        }
        s
    }
}

impl Not for TruthTable {
    type Output = TruthTable;
    fn not(mut self) -> TruthTable {
        for w in &mut self.words {
            *w = !*w;
        }
        self
    }
}

impl Not for &TruthTable {
    type Output = TruthTable;
    fn not(self) -> TruthTable {
        !self.clone()
    }
}

macro_rules! impl_bitwise {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for &TruthTable {
            type Output = TruthTable;
            fn $method(self, rhs: &TruthTable) -> TruthTable {
                debug_assert_eq!(self.nvars, rhs.nvars);
                TruthTable {
                    nvars: self.nvars,
                    words: self
                        .words
                        .iter()
                        .zip(&rhs.words)
                        .map(|(a, b)| a $op b)
                        .collect(),
                }
            }
        }
    };
}

impl_bitwise!(BitAnd, bitand, &);
impl_bitwise!(BitOr, bitor, |);
impl_bitwise!(BitXor, bitxor, ^);

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn eval_swapped(t: &TruthTable, a: usize, i: usize, j: usize) -> bool {
        let bi = (a >> i) & 1;
        let bj = (a >> j) & 1;
        let swapped = (a & !((1 << i) | (1 << j))) | (bj << i) | (bi << j);
        t.get_bit(swapped)
    }

    fn sample(nvars: usize) -> TruthTable {
        // Depends on every variable, not symmetric.
        TruthTable::from_fn(nvars, |a| {
            let ones = a.count_ones() as usize;
            (a.wrapping_mul(0x9E37_79B9) >> 7) & 1 == 1 || ones == nvars - 1
        })
    }

    #[test_case(4; "sub-word")]
    #[test_case(6; "one word")]
    #[test_case(9; "multi-word")]
    fn test_swap_adjacent_matches_brute_force(nvars: usize) {
        let f = sample(nvars);
        for i in 0..nvars - 1 {
            let mut g = f.clone();
            g.swap_adjacent(i);
            for a in 0..(1 << nvars) {
                assert_eq!(g.get_bit(a), eval_swapped(&f, a, i, i + 1), "swap {}", i);
            }
        }
    }

    #[test]
    fn test_swap_vars_non_adjacent() {
        let f = sample(8);
        let mut g = f.clone();
        g.swap_vars(1, 7);
        for a in 0..256 {
            assert_eq!(g.get_bit(a), eval_swapped(&f, a, 1, 7));
        }
    }

    #[test_case(8, &[0, 3, 7])]
    #[test_case(12, &[2, 6, 11])]
    #[test_case(5, &[1, 2, 4])]
    fn test_stretch_moves_variables(nvars: usize, positions: &[usize]) {
        let small = &(&TruthTable::var(nvars, 0) & &TruthTable::var(nvars, 1))
            ^ &TruthTable::var(nvars, 2);
        let mut t = small.clone();
        t.stretch(positions);
        let expected = &(&TruthTable::var(nvars, positions[0])
            & &TruthTable::var(nvars, positions[1]))
            ^ &TruthTable::var(nvars, positions[2]);
        assert_eq!(t, expected);
    }

    #[test]
    fn test_min_base_packs_support() {
        let n = 10;
        let f = &TruthTable::var(n, 2) | &(&TruthTable::var(n, 7) & &TruthTable::var(n, 9));
        let mut g = f.clone();
        assert_eq!(g.min_base(), (1 << 2) | (1 << 7) | (1 << 9));
        let expected = &TruthTable::var(n, 0) | &(&TruthTable::var(n, 1) & &TruthTable::var(n, 2));
        assert_eq!(g, expected);
        // Already packed: unchanged.
        let mut h = g.clone();
        assert_eq!(h.min_base(), 0b111);
        assert_eq!(h, g);
    }

    #[test]
    fn test_quantifiers_and_cofactors() {
        let n = 8;
        let f = &TruthTable::var(n, 1) & &TruthTable::var(n, 6);
        assert_eq!(f.cofactor1(6), TruthTable::var(n, 1));
        assert!(f.cofactor0(6).is_const0());
        assert_eq!(f.exist(1 << 1), TruthTable::var(n, 6));
        assert!(f.forall(1 << 1).is_const0());
        assert!(f.restrict0(1 << 6).is_const0());
        assert_eq!(f.support(), (1 << 1) | (1 << 6));
    }

    #[test]
    fn test_shrink_and_extend() {
        let f = &TruthTable::var(9, 0) ^ &TruthTable::var(9, 3);
        let small = f.shrink(4);
        assert_eq!(small.num_vars(), 4);
        assert_eq!(small.words(), &[0x55AA_55AA_55AA_55AA][..]);
        assert_eq!(small.extend(9), f);
        assert_eq!(small.to_hex(), "55aa");
        assert_eq!(small.count_ones(), 8);
    }

    #[test]
    fn test_mux_and_constants() {
        let n = 7;
        let s = TruthTable::var(n, 6);
        let m = TruthTable::mux(&s, &TruthTable::const1(n), &TruthTable::var(n, 0));
        assert_eq!(m, &s | &TruthTable::var(n, 0));
        assert!(TruthTable::const1(n).is_const1());
        assert_eq!(TruthTable::const1(3).count_ones(), 8);
    }
}
