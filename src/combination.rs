use std::ops::Range;

use crate::configuration::{Configuration, MAX_SITES};

lazy_static! {
    /// Pascal's triangle up to the maximum number of sites
    static ref BINOMIALS: Vec<Vec<u64>> = {
        let mut rows: Vec<Vec<u64>> = Vec::with_capacity(MAX_SITES + 1);
        for n in 0..=MAX_SITES {
            let mut row = vec![1u64; n + 1];
            for k in 1..n {
                row[k] = rows[n - 1][k - 1] + rows[n - 1][k];
            }
            rows.push(row);
        }
        rows
    };
}

/// Binomial coefficient C(n, k), zero if k > n
///
/// Every coefficient with `n <= MAX_SITES` fits into 64 bits.
///
/// ```
/// # use orbitcount::combination::binomial;
/// assert_eq!(binomial(8, 2), 28);
/// assert_eq!(binomial(46, 23), 8_233_430_727_600);
/// assert_eq!(binomial(3, 5), 0);
/// ```
///
/// # Panics
/// If `n` exceeds [`MAX_SITES`].
pub fn binomial(n: usize, k: usize) -> u64 {
    assert!(n <= MAX_SITES, "Binomial table only covers up to {} elements", MAX_SITES);
    if k > n {
        return 0;
    }
    BINOMIALS[n][k]
}

/// The k-subset of `0..n` at a position in lexicographic order
///
/// Positions start at zero. Returns `None` if `rank >= C(n, k)`.
///
/// ```
/// # use orbitcount::combination::unrank;
/// assert_eq!(unrank(4, 2, 0), Some(vec![0, 1]));
/// assert_eq!(unrank(4, 2, 3), Some(vec![1, 2]));
/// assert_eq!(unrank(4, 2, 5), Some(vec![2, 3]));
/// assert_eq!(unrank(4, 2, 6), None);
/// ```
pub fn unrank(n: usize, k: usize, mut rank: u64) -> Option<Vec<usize>> {
    if rank >= binomial(n, k) {
        return None;
    }

    let mut subset = Vec::with_capacity(k);
    let mut x = 0;
    for j in 0..k {
        // Subsets continuing with x at position j
        loop {
            let count = binomial(n - 1 - x, k - 1 - j);
            if rank < count {
                break;
            }
            rank -= count;
            x += 1;
        }
        subset.push(x);
        x += 1;
    }

    Some(subset)
}

/// Advance a sorted k-subset of `0..n` to its lexicographic successor
///
/// Returns false, leaving the subset unchanged, if it was the last one or
/// has more elements than `n`.
pub fn next_subset(subset: &mut [usize], n: usize) -> bool {
    let k = subset.len();
    if k > n {
        return false;
    }

    let Some(i) = (0..k).rev().find(|&i| subset[i] < n - k + i) else {
        return false;
    };

    subset[i] += 1;
    for j in (i + 1)..k {
        subset[j] = subset[j - 1] + 1;
    }
    true
}

/// Split `0..total` into `parts` contiguous slices of near-equal length
///
/// All slices have length `total / parts` except the last, which absorbs the
/// remainder.
///
/// ```
/// # use orbitcount::combination::slices;
/// assert_eq!(slices(10, 3), vec![0..3, 3..6, 6..10]);
/// assert_eq!(slices(2, 3), vec![0..0, 0..0, 0..2]);
/// ```
pub fn slices(total: u64, parts: usize) -> Vec<Range<u64>> {
    let parts = parts.max(1) as u64;
    let chunk = total / parts;
    (0..parts)
        .map(|i| {
            let start = i * chunk;
            let stop = if i < parts - 1 { (i + 1) * chunk } else { total };
            start..stop
        })
        .collect()
}

/// Iterator over a contiguous range of k-subsets in lexicographic order
///
/// Only the subsets inside the range are ever constructed. Items are the
/// subsets encoded as configurations.
pub struct SubsetRange {
    n: usize,
    subset: Vec<usize>,
    remaining: u64
}

impl SubsetRange {
    pub fn new(n: usize, k: usize, range: Range<u64>) -> SubsetRange {
        let remaining = range.end.min(binomial(n, k)).saturating_sub(range.start);
        let subset = if remaining > 0 {
            unrank(n, k, range.start).unwrap_or_default()
        } else {
            Vec::new()
        };

        SubsetRange {n, subset, remaining}
    }
}

impl Iterator for SubsetRange {
    type Item = Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let item = Configuration::from_sites(&self.subset);
        self.remaining -= 1;
        if self.remaining > 0 {
            next_subset(&mut self.subset, self.n);
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, usize::try_from(self.remaining).ok())
    }
}
