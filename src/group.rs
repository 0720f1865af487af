use std::collections::{HashMap, HashSet};
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::configuration::MAX_SITES;
use crate::permutation::Permutation;
use crate::symmetry::{SymmetryOperation, Vector3};

/// Closeness criterion for matching transformed coordinates to sites
///
/// Two points match if every component differs by no more than
/// `absolute + relative * |reference|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub absolute: f64,
    pub relative: f64
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {absolute: 1e-8, relative: 1e-5}
    }
}

impl Tolerance {
    pub fn close(&self, a: &Vector3, b: &Vector3) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= self.absolute + self.relative * y.abs())
    }
}

/// Failures deriving site permutations from geometry
#[derive(Error, Debug, PartialEq, Clone)]
pub enum GeometryError {
    /// An operation's image of a site matches zero or several sites
    #[error("Operation '{operation}' maps site {site} onto {matches} sites, expected exactly one")]
    Mismatch {operation: String, site: usize, matches: usize},
    #[error("Sites {first} and {second} coincide")]
    DuplicateSite {first: usize, second: usize},
    #[error("{0} sites exceed the supported maximum of {}", MAX_SITES)]
    TooManySites(usize),
    #[error("No symmetry operations supplied")]
    NoOperations,
    #[error(transparent)]
    Group(#[from] GroupError),
}

/// Structural inconsistencies of a permutation group
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum GroupError {
    #[error("Permutation {index} is not a bijection on {sites} sites")]
    NotBijective {index: usize, sites: usize},
    #[error("Permutation {index} acts on {found} sites, expected {expected}")]
    SizeMismatch {index: usize, expected: usize, found: usize},
    #[error("Group does not contain the identity")]
    MissingIdentity,
    #[error("Composition of permutations {first} and {second} is not in the group")]
    NotClosed {first: usize, second: usize},
    #[error("Groups must contain at least one permutation")]
    Empty,
    #[error("{0} names supplied for {1} permutations")]
    NameCountMismatch(usize, usize),
}

/// Ordered set of site permutations induced by a group's operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationGroup {
    names: Vec<String>,
    permutations: Vec<Permutation>,
    sites: usize
}

impl PermutationGroup {
    /// Wrap permutations given in one-line notation, checking sizes and bijectivity
    ///
    /// Group axioms are not checked here, see [`PermutationGroup::validate`].
    pub fn new(permutations: Vec<Vec<usize>>) -> Result<PermutationGroup, GroupError> {
        let names = (0..permutations.len()).map(|i| format!("g{}", i)).collect();
        Self::with_names(names, permutations)
    }

    pub fn with_names(names: Vec<String>, permutations: Vec<Vec<usize>>) -> Result<PermutationGroup, GroupError> {
        if names.len() != permutations.len() {
            return Err(GroupError::NameCountMismatch(names.len(), permutations.len()));
        }

        let sites = permutations.first().ok_or(GroupError::Empty)?.len();
        let permutations = permutations.into_iter()
            .enumerate()
            .map(|(index, one_line)| {
                if one_line.len() != sites {
                    return Err(GroupError::SizeMismatch {index, expected: sites, found: one_line.len()});
                }
                Permutation::try_from(one_line).map_err(|_| GroupError::NotBijective {index, sites})
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PermutationGroup {names, permutations, sites})
    }

    /// Group order |G|
    pub fn order(&self) -> usize {
        self.permutations.len()
    }

    /// Number of sites N the group acts on
    pub fn site_count(&self) -> usize {
        self.sites
    }

    pub fn permutations(&self) -> &[Permutation] {
        &self.permutations
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Permutation induced by a named operation
    pub fn get(&self, name: &str) -> Option<&Permutation> {
        self.names.iter().position(|n| n == name).map(|i| &self.permutations[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Permutation)> {
        self.names.iter().map(String::as_str).zip(self.permutations.iter())
    }

    /// Check that the permutations form a group
    ///
    /// Requires the identity to be present and every pairwise composition to
    /// be an element. Failures indicate that operations and coordinates do not
    /// belong together.
    pub fn validate(&self) -> Result<(), GroupError> {
        if !self.permutations.iter().any(Permutation::is_identity) {
            return Err(GroupError::MissingIdentity);
        }

        let elements: HashSet<&Permutation> = self.permutations.iter().collect();
        for (i, a) in self.permutations.iter().enumerate() {
            for (j, b) in self.permutations.iter().enumerate() {
                let product = a.compose(b).map_err(|_| GroupError::SizeMismatch {
                    index: j,
                    expected: self.sites,
                    found: b.set_size()
                })?;
                if !elements.contains(&product) {
                    return Err(GroupError::NotClosed {first: i, second: j});
                }
            }
        }

        Ok(())
    }

    /// Partition the sites into orbits under the group
    ///
    /// Orbits are ordered by their smallest site, sites within an orbit ascend.
    pub fn site_orbits(&self) -> Vec<Vec<usize>> {
        let mut sets = UnionFind::new(self.sites);
        for permutation in self.permutations.iter() {
            for v in 0..self.sites {
                sets.union(v, permutation[v] as usize);
            }
        }

        let mut label_map = HashMap::new();
        let mut orbits: Vec<Vec<usize>> = Vec::new();
        for (v, label) in sets.into_labeling().into_iter().enumerate() {
            let target = *label_map.entry(label).or_insert_with(|| {
                orbits.push(Vec::new());
                orbits.len() - 1
            });
            orbits[target].push(v);
        }

        orbits
    }
}

/// Find the unique site matching a point
fn locate(point: &Vector3, coordinates: &[Vector3], tolerance: &Tolerance) -> Result<usize, usize> {
    let mut matches = coordinates.iter()
        .enumerate()
        .filter(|(_, site)| tolerance.close(point, site))
        .map(|(i, _)| i);

    match (matches.next(), matches.next()) {
        (Some(i), None) => Ok(i),
        (None, _) => Err(0),
        (Some(_), Some(_)) => Err(2 + matches.count())
    }
}

/// Derive the permutation group induced by symmetry operations on sites
///
/// For each operation, every site is transformed and matched against the
/// original sites within `tolerance`. Entry `i` of the resulting permutation is
/// the index of the site that site `i` is carried onto.
///
/// ```
/// # use orbitcount::group::{derive, Tolerance};
/// # use orbitcount::symmetry::{point_group, Vector3};
/// let square = [
///     Vector3::new(1.0, 0.0, 1.0), Vector3::new(0.0, -1.0, 1.0),
///     Vector3::new(-1.0, 0.0, 1.0), Vector3::new(0.0, 1.0, 1.0),
///     Vector3::new(1.0, 0.0, -1.0), Vector3::new(0.0, -1.0, -1.0),
///     Vector3::new(-1.0, 0.0, -1.0), Vector3::new(0.0, 1.0, -1.0),
/// ];
/// let group = derive(&point_group::d4h(), &square, &Tolerance::default()).unwrap();
/// assert_eq!(group.order(), 16);
/// assert!(group.get("E").unwrap().is_identity());
/// assert!(group.validate().is_ok());
/// ```
#[instrument(skip_all, fields(operations = operations.len(), sites = coordinates.len()))]
pub fn derive(operations: &[SymmetryOperation], coordinates: &[Vector3], tolerance: &Tolerance) -> Result<PermutationGroup, GeometryError> {
    let n = coordinates.len();
    if n > MAX_SITES {
        return Err(GeometryError::TooManySites(n));
    }
    if operations.is_empty() {
        return Err(GeometryError::NoOperations);
    }

    for (i, a) in coordinates.iter().enumerate() {
        if let Some(j) = coordinates.iter().skip(i + 1).position(|b| tolerance.close(a, b) || tolerance.close(b, a)) {
            return Err(GeometryError::DuplicateSite {first: i, second: i + 1 + j});
        }
    }

    let mut names = Vec::with_capacity(operations.len());
    let mut permutations = Vec::with_capacity(operations.len());
    for operation in operations {
        let one_line = coordinates.iter()
            .enumerate()
            .map(|(site, point)| {
                locate(&operation.apply(point), coordinates, tolerance)
                    .map_err(|matches| GeometryError::Mismatch {
                        operation: operation.name.clone(),
                        site,
                        matches
                    })
            })
            .collect::<Result<Vec<usize>, _>>()?;

        debug!(operation = %operation.name, permutation = ?one_line, "Derived site permutation");
        names.push(operation.name.clone());
        permutations.push(one_line);
    }

    Ok(PermutationGroup::with_names(names, permutations)?)
}
