use std::ops::Index;
use itertools::Itertools;
use rand::seq::SliceRandom;
use gcd::Gcd;
use thiserror::Error;

/// Errors arising in the construction or combination of permutations
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum PermutationError {
    /// Passed one-line notation does not contain each index exactly once
    #[error("Not a bijection of 0..{0}")]
    NotBijective(usize),
    /// Permutations or containers of different sizes
    #[error("Mismatched permutation sizes")]
    LengthMismatch,
    /// Permutations act on at most 256 elements
    #[error("Permutation of {0} elements exceeds the representable size")]
    TooLarge(usize),
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug, Hash)]
pub struct Permutation {
    // One-line representation
    pub sigma: Vec<u8>
}

impl std::fmt::Display for Permutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.sigma.iter().format(", "))
    }
}

impl Permutation {
    /// Initialize an identity permutation of specific size
    ///
    /// ```
    /// # use orbitcount::permutation::Permutation;
    /// assert_eq!(Permutation::identity(3).sigma, vec![0, 1, 2])
    /// ```
    pub fn identity(n: usize) -> Permutation {
        Permutation {sigma: (0..n).map(|i| i as u8).collect()}
    }

    /// Generate a uniformly random permutation (identity inclusive)
    pub fn random(n: usize) -> Permutation {
        let mut p = Permutation::identity(n);
        p.sigma.shuffle(&mut rand::thread_rng());
        p
    }

    /// Number of elements being permuted
    pub fn set_size(&self) -> usize {
        self.sigma.len()
    }

    pub fn is_identity(&self) -> bool {
        self.sigma.iter().enumerate().all(|(i, &s)| i == s as usize)
    }

    /// Fixed points are indices that the permutation maps onto themselves
    pub fn is_fixed_point(&self, i: usize) -> bool {
        self.sigma.get(i).map_or(false, |&s| s as usize == i)
    }

    /// Invert the permutation
    ///
    /// ```
    /// # use orbitcount::permutation::Permutation;
    /// # use std::convert::TryFrom;
    /// let p = Permutation::try_from(vec![2usize, 0, 1]).unwrap();
    /// assert_eq!(p.inverse().sigma, vec![1, 2, 0]);
    /// assert!(p.compose(&p.inverse()).unwrap().is_identity());
    /// ```
    pub fn inverse(&self) -> Permutation {
        let n = self.sigma.len();
        let mut inverse = Permutation::identity(n);
        for i in 0..n {
            inverse.sigma[self.sigma[i] as usize] = i as u8;
        }
        inverse
    }

    /// Apply the permutation to a container
    ///
    /// Post-condition is `other[i] == permuted[sigma[i]]`
    pub fn apply<T: Copy>(&self, other: &[T]) -> Result<Vec<T>, PermutationError> {
        if other.len() != self.sigma.len() {
            return Err(PermutationError::LengthMismatch);
        }

        let mut permuted = other.to_vec();
        for (i, &value) in other.iter().enumerate() {
            permuted[self.sigma[i] as usize] = value;
        }
        Ok(permuted)
    }

    /// Compose two permutations into a new permutation
    ///
    /// The composition maps `i` to `other[self[i]]`, i.e. `self` acts first.
    pub fn compose(&self, other: &Permutation) -> Result<Permutation, PermutationError> {
        if self.sigma.len() != other.sigma.len() {
            return Err(PermutationError::LengthMismatch);
        }

        let sigma = self.sigma.iter().map(|&s| other.sigma[s as usize]).collect();
        Ok(Permutation {sigma})
    }

    /// Disjoint cycle decomposition
    ///
    /// Each cycle starts at its smallest index and lists the indices in the
    /// order they are visited by repeated application, fixed points included.
    ///
    /// ```
    /// # use orbitcount::permutation::Permutation;
    /// # use std::convert::TryFrom;
    /// let p = Permutation::try_from(vec![2usize, 0, 1, 3]).unwrap();
    /// assert_eq!(p.cycles(), vec![vec![0, 2, 1], vec![3]]);
    /// ```
    pub fn cycles(&self) -> Vec<Vec<usize>> {
        let n = self.sigma.len();
        let mut visited = vec![false; n];
        let mut cycles = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }

            let mut cycle = Vec::new();
            let mut j = start;
            while !visited[j] {
                visited[j] = true;
                cycle.push(j);
                j = self.sigma[j] as usize;
            }
            cycles.push(cycle);
        }

        cycles
    }

    /// Number of disjoint cycles, fixed points included
    pub fn cycle_count(&self) -> usize {
        let n = self.sigma.len();
        let mut visited = vec![false; n];
        let mut count = 0;

        for start in 0..n {
            if visited[start] {
                continue;
            }

            count += 1;
            let mut j = start;
            while !visited[j] {
                visited[j] = true;
                j = self.sigma[j] as usize;
            }
        }

        count
    }

    /// Ascending lengths of the disjoint cycles
    ///
    /// ```
    /// # use orbitcount::permutation::Permutation;
    /// # use std::convert::TryFrom;
    /// let p = Permutation::try_from(vec![1usize, 0, 3, 4, 2, 5]).unwrap();
    /// assert_eq!(p.cycle_lengths(), vec![1, 2, 3]);
    /// ```
    pub fn cycle_lengths(&self) -> Vec<usize> {
        self.cycles().iter().map(Vec::len).sorted().collect()
    }

    /// Smallest positive power yielding the identity
    pub fn order(&self) -> usize {
        self.cycles().iter()
            .map(Vec::len)
            .fold(1, |lcm, l| lcm / lcm.gcd(l) * l)
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = PermutationError;

    fn try_from(one_line: Vec<usize>) -> Result<Permutation, Self::Error> {
        let n = one_line.len();
        if n > u8::MAX as usize + 1 {
            return Err(PermutationError::TooLarge(n));
        }

        let mut seen = vec![false; n];
        for &i in one_line.iter() {
            if i >= n || seen[i] {
                return Err(PermutationError::NotBijective(n));
            }
            seen[i] = true;
        }

        Ok(Permutation {sigma: one_line.into_iter().map(|i| i as u8).collect()})
    }
}

/// Implements indexing, letting Permutation behave as a container directly
impl Index<usize> for Permutation {
    type Output = u8;

    fn index(&self, i: usize) -> &Self::Output {
        &self.sigma[i]
    }
}
