// SPDX-License-Identifier: Apache-2.0

//! Bounded, sorted cut store with subsumption pruning.
//!
//! The store is a small vector kept sorted by the active comparator. A cut is
//! only kept if no better-ranked cut uses a subset of its leaves, and keeping
//! it evicts every worse-ranked cut whose leaves contain its own.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::cut::CutUnit;

/// Cut ranking used during one round. `Ordering::Less` means "better".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CutCmp {
    /// Arrival, then leaf count, area flow, edge flow.
    Delay,
    /// Arrival, then area flow, edge flow, leaf count.
    Delay2,
    /// Area flow, then leaf count, edge flow, higher average refs, arrival.
    Area,
    /// Area flow, then edge flow, higher average refs, leaf count, arrival.
    Area2,
}

impl CutCmp {
    pub fn compare(self, a: &CutUnit, b: &CutUnit) -> Ordering {
        let (la, lb) = (a.cut.len(), b.cut.len());
        let primary = match self {
            CutCmp::Delay => a
                .arrival
                .cmp(&b.arrival)
                .then(la.cmp(&lb))
                .then(a.area.cmp(&b.area))
                .then(a.edge.cmp(&b.edge)),
            CutCmp::Delay2 => a
                .arrival
                .cmp(&b.arrival)
                .then(a.area.cmp(&b.area))
                .then(a.edge.cmp(&b.edge))
                .then(la.cmp(&lb)),
            CutCmp::Area => a
                .area
                .cmp(&b.area)
                .then(la.cmp(&lb))
                .then(a.edge.cmp(&b.edge))
                .then(b.ave_refs.cmp(&a.ave_refs))
                .then(a.arrival.cmp(&b.arrival)),
            CutCmp::Area2 => a
                .area
                .cmp(&b.area)
                .then(a.edge.cmp(&b.edge))
                .then(b.ave_refs.cmp(&a.ave_refs))
                .then(la.cmp(&lb))
                .then(a.arrival.cmp(&b.arrival)),
        };
        primary.then(a.seq.cmp(&b.seq))
    }

    /// Compares on the leading key only: arrival for the delay comparators,
    /// area flow for the area ones.
    pub fn compare_primary(self, a: &CutUnit, b: &CutUnit) -> Ordering {
        match self {
            CutCmp::Delay | CutCmp::Delay2 => a.arrival.cmp(&b.arrival),
            CutCmp::Area | CutCmp::Area2 => a.area.cmp(&b.area),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Kept,
    /// The store was full and the cut ranks below the worst kept cut.
    Worse,
    /// A better-ranked cut already uses a subset of the leaves.
    Dominated,
}

#[derive(Debug)]
pub struct CutStore {
    units: Vec<CutUnit>,
    limit: usize,
    cmp: CutCmp,
    next_seq: u64,
    inserted: usize,
    evicted: usize,
}

impl CutStore {
    /// A store that keeps at most `limit` cuts (and `limit + 1` for the
    /// duration of one insertion).
    pub fn new(limit: usize, cmp: CutCmp) -> Self {
        assert!(limit >= 1, "cut store needs room for at least one cut");
        CutStore {
            units: Vec::with_capacity(limit + 1),
            limit,
            cmp,
            next_seq: 0,
            inserted: 0,
            evicted: 0,
        }
    }

    /// Empties the store and switches to `cmp`.
    pub fn reset(&mut self, cmp: CutCmp) {
        self.units.clear();
        self.cmp = cmp;
        self.next_seq = 0;
    }

    pub fn comparator(&self) -> CutCmp {
        self.cmp
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.units.len() >= self.limit
    }

    pub fn units(&self) -> &[CutUnit] {
        &self.units
    }

    pub fn best(&self) -> Option<&CutUnit> {
        self.units.first()
    }

    pub fn worst(&self) -> Option<&CutUnit> {
        self.units.last()
    }

    /// Total cuts kept and evicted since creation, for diagnostics.
    pub fn counters(&self) -> (usize, usize) {
        (self.inserted, self.evicted)
    }

    /// True when `unit` cannot beat the worst cut of a full store on the
    /// leading key.
    pub fn cannot_improve(&self, unit: &CutUnit) -> bool {
        match self.units.last() {
            Some(worst) if self.is_full() => {
                self.cmp.compare_primary(unit, worst) == Ordering::Greater
            }
            _ => false,
        }
    }

    /// Inserts `unit`, assigning its tie-break sequence number.
    pub fn try_insert(&mut self, mut unit: CutUnit) -> Insert {
        unit.seq = self.next_seq;
        self.next_seq += 1;
        if self.units.is_empty() {
            self.units.push(unit);
            self.inserted += 1;
            return Insert::Kept;
        }
        let cmp = self.cmp;
        if self.is_full() {
            let worst = self.units.last().expect("store is not empty");
            if cmp.compare(&unit, worst) != Ordering::Less {
                return Insert::Worse;
            }
        }
        let pos = self
            .units
            .iter()
            .position(|u| cmp.compare(&unit, u) == Ordering::Less)
            .unwrap_or(self.units.len());
        if self.units[..pos].iter().any(|u| u.is_contained_in(&unit)) {
            return Insert::Dominated;
        }
        self.units.insert(pos, unit);
        self.inserted += 1;
        debug_assert!(self.units.len() <= self.limit + 1);

        let before = self.units.len();
        let mut i = pos + 1;
        while i < self.units.len() {
            if self.units[pos].is_contained_in(&self.units[i]) {
                self.units.remove(i);
            } else {
                i += 1;
            }
        }
        self.evicted += before - self.units.len();
        if self.units.len() > self.limit {
            self.units.pop();
            self.evicted += 1;
        }
        assert!(
            self.units.len() <= self.limit,
            "cut store holds {} cuts, limit {}",
            self.units.len(),
            self.limit
        );
        Insert::Kept
    }
}
