//! The disjoint closed-interval set that backs `Mᵢ`.
//!
//! Uses the same two-`BTreeSet` boundary trick as the reference
//! implementation this was generalized from: `lefts`/`rights` track the
//! start and end of every disjoint interval currently held, and inserting a
//! new interval erases whichever existing boundaries it swallows before
//! re-inserting the (possibly fused) result.

use std::collections::BTreeSet;
use std::ops::Bound::Included;

use num_bigint::BigInt;

/// A closed integer interval `[lo, hi]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub lo: BigInt,
    pub hi: BigInt,
}

impl Interval {
    pub fn new(lo: BigInt, hi: BigInt) -> Self {
        debug_assert!(lo <= hi);
        Self { lo, hi }
    }
}

/// A set of disjoint, closed integer intervals.
#[derive(Debug, Default, Clone)]
pub struct IntervalSet {
    lefts: BTreeSet<BigInt>,
    rights: BTreeSet<BigInt>,
}

impl IntervalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(lo: BigInt, hi: BigInt) -> Self {
        let mut set = Self::new();
        set.insert(Interval::new(lo, hi));
        set
    }

    pub fn is_empty(&self) -> bool {
        self.lefts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lefts.len()
    }

    /// All intervals, left boundary ascending.
    pub fn intervals(&self) -> Vec<Interval> {
        self.lefts
            .iter()
            .zip(self.rights.iter())
            .map(|(lo, hi)| Interval::new(lo.clone(), hi.clone()))
            .collect()
    }

    /// If exactly one interval remains and it is a singleton `[a, a]`,
    /// return `a`.
    pub fn as_singleton(&self) -> Option<BigInt> {
        if self.lefts.len() != 1 {
            return None;
        }
        let lo = self.lefts.iter().next().unwrap();
        let hi = self.rights.iter().next().unwrap();
        (lo == hi).then(|| lo.clone())
    }

    /// Insert `interval`, merging with any intervals it overlaps or
    /// abuts.
    pub fn insert(&mut self, interval: Interval) {
        let Interval { lo, hi } = interval;

        let left_inside = self.lefts.range((Included(&lo), Included(&hi))).count();
        let right_inside = self.rights.range((Included(&lo), Included(&hi))).count();

        let mut remaining_lefts = self.lefts.split_off(&lo).split_off(&hi);
        self.lefts.append(&mut remaining_lefts);

        let mut remaining_rights = self.rights.split_off(&lo).split_off(&hi);
        self.rights.append(&mut remaining_rights);

        match left_inside.cmp(&right_inside) {
            std::cmp::Ordering::Equal => {
                self.lefts.insert(lo.clone());
                self.rights.insert(hi.clone());
            }
            std::cmp::Ordering::Less => {
                self.rights.insert(hi.clone());
            }
            std::cmp::Ordering::Greater => {
                self.lefts.insert(lo.clone());
            }
        }

        let left_neighbor = &lo - 1;
        if self.rights.remove(&left_neighbor) {
            self.lefts.remove(&lo);
        }
        let right_neighbor = &hi + 1;
        if self.lefts.remove(&right_neighbor) {
            self.rights.remove(&hi);
        }
    }
}
