// SPDX-License-Identifier: Apache-2.0

//! Single-word truth tables over at most six variables.
//!
//! Bit `i` of the word holds the function value on the assignment encoded by
//! `i`, variable 0 being the least-significant selector. Tables over fewer than
//! six variables are kept replicated across the whole word, so every function
//! has exactly one representation regardless of how many variables it is
//! declared over.

pub const VARS: [u64; 6] = [
    0xAAAA_AAAA_AAAA_AAAA,
    0xCCCC_CCCC_CCCC_CCCC,
    0xF0F0_F0F0_F0F0_F0F0,
    0xFF00_FF00_FF00_FF00,
    0xFFFF_0000_FFFF_0000,
    0xFFFF_FFFF_0000_0000,
];

/// Masks for swapping variables `i` and `i + 1`: bits that stay put, bits that
/// move up by `1 << i` and bits that move down by `1 << i`.
const SWAP_MASKS: [[u64; 3]; 5] = [
    [0x9999_9999_9999_9999, 0x2222_2222_2222_2222, 0x4444_4444_4444_4444],
    [0xC3C3_C3C3_C3C3_C3C3, 0x0C0C_0C0C_0C0C_0C0C, 0x3030_3030_3030_3030],
    [0xF00F_F00F_F00F_F00F, 0x00F0_00F0_00F0_00F0, 0x0F00_0F00_0F00_0F00],
    [0xFF00_00FF_FF00_00FF, 0x0000_FF00_0000_FF00, 0x00FF_0000_00FF_0000],
    [0xFFFF_0000_0000_FFFF, 0x0000_0000_FFFF_0000, 0x0000_FFFF_0000_0000],
];

#[inline]
pub const fn var(i: usize) -> u64 {
    VARS[i]
}

/// Mask of the low `2^nvars` bits.
#[inline]
pub const fn mask(nvars: usize) -> u64 {
    if nvars >= 6 {
        u64::MAX
    } else {
        (1u64 << (1u32 << nvars)) - 1
    }
}

/// Repeats the low `2^nvars` bits across the word.
pub fn replicate(mut t: u64, nvars: usize) -> u64 {
    if nvars >= 6 {
        return t;
    }
    t &= mask(nvars);
    for i in nvars..6 {
        t |= t << (1u32 << i);
    }
    t
}

#[inline]
pub fn swap_adjacent(t: u64, i: usize) -> u64 {
    debug_assert!(i < 5);
    let [keep, up, down] = SWAP_MASKS[i];
    let shift = 1u32 << i;
    (t & keep) | ((t & up) << shift) | ((t & down) >> shift)
}

#[inline]
pub fn has_var(t: u64, i: usize) -> bool {
    let shift = 1u32 << i;
    ((t >> shift) & !VARS[i]) != (t & !VARS[i])
}

/// Support as a bit mask over the first `nvars` variables.
pub fn support(t: u64, nvars: usize) -> u32 {
    (0..nvars.min(6))
        .filter(|i| has_var(t, *i))
        .fold(0, |acc, i| acc | (1 << i))
}

/// `f` with variable `i` forced to 0.
#[inline]
pub fn cofactor0(t: u64, i: usize) -> u64 {
    let shift = 1u32 << i;
    let low = t & !VARS[i];
    low | (low << shift)
}

/// `f` with variable `i` forced to 1.
#[inline]
pub fn cofactor1(t: u64, i: usize) -> u64 {
    let shift = 1u32 << i;
    let high = t & VARS[i];
    high | (high >> shift)
}

#[inline]
pub fn get_bit(t: u64, index: usize) -> bool {
    debug_assert!(index < 64);
    (t >> index) & 1 != 0
}
