// SPDX-License-Identifier: Apache-2.0

//! Size-classed pool of cut records.
//!
//! Every record is a run of `u32` words laid out as
//!
//! ```text
//! [next handle, function id, flags, leaf0, leaf1, ...]
//! ```
//!
//! where `flags` packs the leaf count (bits 0..=3), the complement bit (bit 4),
//! the useless bit (bit 5) and the record's own word count (bits 24..=31). One
//! pool exists per word count; a pool is a list of pages that only grows. A
//! handle encodes the word count in its top bits and the slot index (page and
//! offset within the page) below that, so dereferencing is two shifts and an
//! index.
//!
//! The record's own word count doubles as a canary: recycled slots are filled
//! with a poison pattern whose "word count" never matches a real class, so a
//! stale handle trips a debug assertion on its next use.

use std::num::NonZeroU32;

use crate::cut::Cut;
use crate::params::MAX_LUT_SIZE;
use crate::graph::Operand;

pub const HEADER_WORDS: usize = 3;
pub const MAX_RECORD_WORDS: usize = HEADER_WORDS + MAX_LUT_SIZE;

const NEXT: usize = 0;
const FUNC: usize = 1;
const FLAGS: usize = 2;

const LEAVES_MASK: u32 = 0xF;
const COMPL_BIT: u32 = 1 << 4;
const USELESS_BIT: u32 = 1 << 5;
const SIZE_SHIFT: u32 = 24;

const CLASS_SHIFT: u32 = 27;
const SLOT_MASK: u32 = (1 << CLASS_SHIFT) - 1;
const PAGE_BITS: u32 = 10;
const PAGE_SLOTS: usize = 1 << PAGE_BITS;
const PAGE_MASK: u32 = (PAGE_SLOTS as u32) - 1;

pub const POISON: u32 = 0xA5A5_A5A5;
pub const NO_FUNC: u32 = u32::MAX;

/// Opaque reference to a record in a `CutArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CutHandle(NonZeroU32);

impl CutHandle {
    fn new(word_count: usize, slot: u32) -> Self {
        debug_assert!(word_count >= HEADER_WORDS && word_count <= MAX_RECORD_WORDS);
        debug_assert!(slot <= SLOT_MASK);
        let raw = ((word_count as u32) << CLASS_SHIFT) | slot;
        CutHandle(NonZeroU32::new(raw).expect("word count is never zero"))
    }

    pub fn raw(self) -> u32 {
        self.0.get()
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(CutHandle)
    }

    pub fn word_count(self) -> usize {
        (self.0.get() >> CLASS_SHIFT) as usize
    }

    fn slot(self) -> u32 {
        self.0.get() & SLOT_MASK
    }
}

#[derive(Debug, Default)]
struct SizeClass {
    pages: Vec<Box<[u32]>>,
    free: Vec<u32>,
    fresh: u32,
    live: usize,
}

/// Read-only view of one record.
#[derive(Debug, Clone, Copy)]
pub struct CutRecord<'a> {
    words: &'a [u32],
}

impl<'a> CutRecord<'a> {
    pub fn next(&self) -> Option<CutHandle> {
        CutHandle::from_raw(self.words[NEXT])
    }

    pub fn func(&self) -> Option<u32> {
        match self.words[FUNC] {
            NO_FUNC => None,
            id => Some(id),
        }
    }

    pub fn is_complemented(&self) -> bool {
        (self.words[FLAGS] & COMPL_BIT) != 0
    }

    pub fn is_useless(&self) -> bool {
        (self.words[FLAGS] & USELESS_BIT) != 0
    }

    pub fn leaf_count(&self) -> usize {
        (self.words[FLAGS] & LEAVES_MASK) as usize
    }

    pub fn leaf(&self, i: usize) -> Operand {
        debug_assert!(i < self.leaf_count());
        Operand::from_raw(self.words[HEADER_WORDS + i])
    }

    pub fn leaves(&self) -> impl Iterator<Item = Operand> + 'a {
        let n = (self.words[FLAGS] & LEAVES_MASK) as usize;
        self.words[HEADER_WORDS..HEADER_WORDS + n]
            .iter()
            .map(|w| Operand::from_raw(*w))
    }
}

/// Mutable view of one record.
#[derive(Debug)]
pub struct CutRecordMut<'a> {
    words: &'a mut [u32],
}

impl CutRecordMut<'_> {
    pub fn set_next(&mut self, next: Option<CutHandle>) {
        self.words[NEXT] = next.map_or(0, CutHandle::raw);
    }

    pub fn set_func(&mut self, func: Option<u32>) {
        self.words[FUNC] = func.unwrap_or(NO_FUNC);
    }

    pub fn set_complemented(&mut self, value: bool) {
        set_flag(&mut self.words[FLAGS], COMPL_BIT, value);
    }

    pub fn set_useless(&mut self, value: bool) {
        set_flag(&mut self.words[FLAGS], USELESS_BIT, value);
    }

    /// Writes the leaves; the record must have been allocated with room for
    /// exactly `leaves.len()` of them.
    pub fn set_leaves(&mut self, leaves: &[Operand]) {
        debug_assert_eq!(HEADER_WORDS + leaves.len(), self.words.len());
        let flags = &mut self.words[FLAGS];
        *flags = (*flags & !LEAVES_MASK) | leaves.len() as u32;
        for (slot, leaf) in self.words[HEADER_WORDS..].iter_mut().zip(leaves) {
            *slot = leaf.to_raw();
        }
    }
}

fn set_flag(word: &mut u32, bit: u32, value: bool) {
    if value {
        *word |= bit;
    } else {
        *word &= !bit;
    }
}

/// The pool itself; see the module docs for the record layout.
#[derive(Debug)]
pub struct CutArena {
    classes: Vec<SizeClass>,
}

impl Default for CutArena {
    fn default() -> Self {
        Self::new()
    }
}

impl CutArena {
    pub fn new() -> Self {
        CutArena {
            classes: (0..=MAX_RECORD_WORDS).map(|_| SizeClass::default()).collect(),
        }
    }

    /// Words needed for a record holding `leaf_count` leaves.
    pub fn words_for(leaf_count: usize) -> usize {
        HEADER_WORDS + leaf_count
    }

    /// Hands out a record of `word_count` words with a reset header.
    pub fn alloc(&mut self, word_count: usize) -> CutHandle {
        assert!(
            (HEADER_WORDS..=MAX_RECORD_WORDS).contains(&word_count),
            "cut record size {} outside of [{}, {}]",
            word_count,
            HEADER_WORDS,
            MAX_RECORD_WORDS
        );
        let class = &mut self.classes[word_count];
        let slot = match class.free.pop() {
            Some(slot) => slot,
            None => {
                let slot = class.fresh;
                if (slot as usize) % PAGE_SLOTS == 0 {
                    class
                        .pages
                        .push(vec![POISON; PAGE_SLOTS * word_count].into_boxed_slice());
                }
                class.fresh += 1;
                assert!(class.fresh <= SLOT_MASK, "cut arena class {} exhausted", word_count);
                slot
            }
        };
        class.live += 1;
        let handle = CutHandle::new(word_count, slot);
        let words = self.words_mut_unchecked(handle);
        words[NEXT] = 0;
        words[FUNC] = NO_FUNC;
        words[FLAGS] = (word_count as u32) << SIZE_SHIFT;
        handle
    }

    fn words_mut_unchecked(&mut self, handle: CutHandle) -> &mut [u32] {
        let word_count = handle.word_count();
        let slot = handle.slot();
        let page = &mut self.classes[word_count].pages[(slot >> PAGE_BITS) as usize];
        let base = (slot & PAGE_MASK) as usize * word_count;
        &mut page[base..base + word_count]
    }

    fn words(&self, handle: CutHandle) -> &[u32] {
        let word_count = handle.word_count();
        let slot = handle.slot();
        let page = &self.classes[word_count].pages[(slot >> PAGE_BITS) as usize];
        let base = (slot & PAGE_MASK) as usize * word_count;
        let words = &page[base..base + word_count];
        debug_assert_eq!(
            (words[FLAGS] >> SIZE_SHIFT) as usize,
            word_count,
            "stale or corrupt cut handle {:#x}",
            handle.raw()
        );
        words
    }

    pub fn entry(&self, handle: CutHandle) -> CutRecord<'_> {
        CutRecord {
            words: self.words(handle),
        }
    }

    pub fn entry_mut(&mut self, handle: CutHandle) -> CutRecordMut<'_> {
        let words = self.words_mut_unchecked(handle);
        debug_assert_eq!(
            (words[FLAGS] >> SIZE_SHIFT) as usize,
            words.len(),
            "stale or corrupt cut handle {:#x}",
            handle.raw()
        );
        CutRecordMut { words }
    }

    /// Returns the slot to its class free list and poisons its contents.
    pub fn recycle(&mut self, handle: CutHandle) {
        let words = self.words_mut_unchecked(handle);
        debug_assert_eq!(
            (words[FLAGS] >> SIZE_SHIFT) as usize,
            words.len(),
            "recycling stale cut handle {:#x}",
            handle.raw()
        );
        words.fill(POISON);
        let class = &mut self.classes[handle.word_count()];
        class.free.push(handle.slot());
        class.live -= 1;
    }

    /// Recycles every record of a `next`-linked list.
    pub fn recycle_list(&mut self, head: Option<CutHandle>) {
        let mut cur = head;
        while let Some(h) = cur {
            cur = self.entry(h).next();
            self.recycle(h);
        }
    }

    /// Copies a scratch cut into a freshly allocated record.
    pub fn store_cut(&mut self, cut: &Cut) -> CutHandle {
        let handle = self.alloc(Self::words_for(cut.len()));
        let mut rec = self.entry_mut(handle);
        rec.set_func(cut.func);
        rec.set_complemented(cut.compl);
        rec.set_useless(cut.useless);
        rec.set_leaves(cut.leaves());
        handle
    }

    pub fn load_cut(&self, handle: CutHandle) -> Cut {
        let rec = self.entry(handle);
        let mut cut = Cut::empty();
        for leaf in rec.leaves() {
            cut.push(leaf);
        }
        cut.func = rec.func();
        cut.compl = rec.is_complemented();
        cut.useless = rec.is_useless();
        cut
    }

    /// Iterates the handles of a `next`-linked list.
    pub fn list(&self, head: Option<CutHandle>) -> impl Iterator<Item = CutHandle> + '_ {
        let mut cur = head;
        std::iter::from_fn(move || {
            let h = cur?;
            cur = self.entry(h).next();
            Some(h)
        })
    }

    pub fn live_records(&self) -> usize {
        self.classes.iter().map(|c| c.live).sum()
    }

    pub fn page_count(&self) -> usize {
        self.classes.iter().map(|c| c.pages.len()).sum()
    }
}
