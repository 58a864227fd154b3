use num::bigint::BigInt;
use num::traits::Zero;

/// A finite set of integers stored as sorted, disjoint, non-adjacent
/// inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntervalSet {
    ranges: Vec<(i128, i128)>,
}

impl IntervalSet {
    pub fn empty() -> Self {
        IntervalSet::default()
    }

    pub fn point(v: i128) -> Self {
        IntervalSet {
            ranges: vec![(v, v)],
        }
    }

    /// Inclusive range; empty when `lo > hi`.
    pub fn range(lo: i128, hi: i128) -> Self {
        if lo > hi {
            IntervalSet::empty()
        } else {
            IntervalSet {
                ranges: vec![(lo, hi)],
            }
        }
    }

    /// Normalize an arbitrary collection of inclusive ranges.
    pub fn from_ranges(iter: impl IntoIterator<Item = (i128, i128)>) -> Self {
        let mut ranges: Vec<(i128, i128)> = iter.into_iter().filter(|(lo, hi)| lo <= hi).collect();
        ranges.sort_unstable();
        let mut merged: Vec<(i128, i128)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some((_, prev_hi)) if lo <= prev_hi.saturating_add(1) => {
                    *prev_hi = (*prev_hi).max(hi);
                }
                _ => merged.push((lo, hi)),
            }
        }
        IntervalSet { ranges: merged }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[(i128, i128)] {
        &self.ranges
    }

    pub fn min(&self) -> Option<i128> {
        self.ranges.first().map(|(lo, _)| *lo)
    }

    pub fn max(&self) -> Option<i128> {
        self.ranges.last().map(|(_, hi)| *hi)
    }

    /// Exact cardinality.
    pub fn count(&self) -> BigInt {
        let mut total = BigInt::zero();
        for (lo, hi) in &self.ranges {
            total += BigInt::from(hi - lo) + 1;
        }
        total
    }

    pub fn contains(&self, v: i128) -> bool {
        self.ranges
            .binary_search_by(|(lo, hi)| {
                if v < *lo {
                    std::cmp::Ordering::Greater
                } else if v > *hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    pub fn intersect(&self, other: &IntervalSet) -> IntervalSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (alo, ahi) = self.ranges[i];
            let (blo, bhi) = other.ranges[j];
            let lo = alo.max(blo);
            let hi = ahi.min(bhi);
            if lo <= hi {
                out.push((lo, hi));
            }
            if ahi < bhi {
                i += 1;
            } else {
                j += 1;
            }
        }
        IntervalSet { ranges: out }
    }

    pub fn union(&self, other: &IntervalSet) -> IntervalSet {
        IntervalSet::from_ranges(
            self.ranges
                .iter()
                .chain(other.ranges.iter())
                .copied()
                .collect::<Vec<_>>(),
        )
    }

    /// Values of `[lo, hi]` not in `self`.
    pub fn complement_within(&self, lo: i128, hi: i128) -> IntervalSet {
        let mut out = Vec::new();
        let mut cursor = lo;
        for (rlo, rhi) in &self.ranges {
            if *rhi < lo {
                continue;
            }
            if *rlo > hi {
                break;
            }
            if cursor < *rlo {
                out.push((cursor, rlo - 1));
            }
            cursor = cursor.max(rhi.saturating_add(1));
            if cursor > hi {
                break;
            }
        }
        if cursor <= hi {
            out.push((cursor, hi));
        }
        IntervalSet { ranges: out }
    }

    /// The set shifted by `delta`.
    pub fn shift(&self, delta: i128) -> IntervalSet {
        IntervalSet {
            ranges: self
                .ranges
                .iter()
                .map(|(lo, hi)| (lo + delta, hi + delta))
                .collect(),
        }
    }

    /// The set `{-v | v in self}`.
    pub fn negated(&self) -> IntervalSet {
        IntervalSet {
            ranges: self.ranges.iter().rev().map(|(lo, hi)| (-hi, -lo)).collect(),
        }
    }
}
