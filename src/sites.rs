//! Reference site sets around a square-planar framework, all D4h-symmetric

use crate::symmetry::Vector3;

fn points(raw: &[[f64; 3]]) -> Vec<Vector3> {
    raw.iter().map(|&[x, y, z]| Vector3::new(x, y, z)).collect()
}

/// Eight sites at the vertices of a square prism
pub fn reduced_sphere() -> Vec<Vector3> {
    points(&[
        [1.0, 0.0, 1.0], [0.0, -1.0, 1.0], [-1.0, 0.0, 1.0], [0.0, 1.0, 1.0],
        [1.0, 0.0, -1.0], [0.0, -1.0, -1.0], [-1.0, 0.0, -1.0], [0.0, 1.0, -1.0],
    ])
}

/// Fourteen sites: the prism plus two axial and four equatorial sites
pub fn first_sphere() -> Vec<Vector3> {
    points(&[
        [0.0, 0.0, 2.0],
        [1.0, 0.0, 1.0], [0.0, -1.0, 1.0], [-1.0, 0.0, 1.0], [0.0, 1.0, 1.0],
        [1.0, 0.0, -1.0], [0.0, -1.0, -1.0], [-1.0, 0.0, -1.0], [0.0, 1.0, -1.0],
        [0.0, 0.0, -2.0], [2.0, 0.0, 0.0], [-2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, -2.0, 0.0],
    ])
}

/// Forty-six sites extending the first sphere by the neighboring frameworks
pub fn second_sphere() -> Vec<Vector3> {
    points(&[
        [0.0, 0.0, 2.0], [1.0, 0.0, 1.0], [0.0, -1.0, 1.0], [-1.0, 0.0, 1.0], [0.0, 1.0, 1.0],
        [1.0, 0.0, -1.0], [0.0, -1.0, -1.0], [-1.0, 0.0, -1.0], [0.0, 1.0, -1.0], [0.0, 0.0, -2.0],
        [2.0, 0.0, 0.0], [2.0, 0.0, 2.0], [3.0, 0.0, 1.0], [2.0, -1.0, 1.0], [2.0, 1.0, 1.0],
        [3.0, 0.0, -1.0], [2.0, -1.0, -1.0], [2.0, 1.0, -1.0], [2.0, 0.0, -2.0],
        [0.0, 2.0, 0.0], [0.0, 2.0, 2.0], [1.0, 2.0, 1.0], [-1.0, 2.0, 1.0], [0.0, 3.0, 1.0],
        [1.0, 2.0, -1.0], [-1.0, 2.0, -1.0], [0.0, 3.0, -1.0], [0.0, 2.0, -2.0],
        [-2.0, 0.0, 0.0], [-2.0, 0.0, 2.0], [-3.0, 0.0, 1.0], [-2.0, -1.0, 1.0], [-2.0, 1.0, 1.0],
        [-3.0, 0.0, -1.0], [-2.0, -1.0, -1.0], [-2.0, 1.0, -1.0], [-2.0, 0.0, -2.0],
        [0.0, -2.0, 0.0], [0.0, -2.0, 2.0], [1.0, -2.0, 1.0], [-1.0, -2.0, 1.0], [0.0, -3.0, 1.0],
        [1.0, -2.0, -1.0], [-1.0, -2.0, -1.0], [0.0, -3.0, -1.0], [0.0, -2.0, -2.0],
    ])
}

/// Look up a reference site set by name
///
/// ```
/// # use orbitcount::sites;
/// assert_eq!(sites::by_name("reduced").map(|s| s.len()), Some(8));
/// assert_eq!(sites::by_name("first").map(|s| s.len()), Some(14));
/// assert_eq!(sites::by_name("second").map(|s| s.len()), Some(46));
/// assert!(sites::by_name("third").is_none());
/// ```
pub fn by_name(name: &str) -> Option<Vec<Vector3>> {
    match name {
        "reduced" => Some(reduced_sphere()),
        "first" => Some(first_sphere()),
        "second" => Some(second_sphere()),
        _ => None
    }
}

#[cfg(test)]
pub fn d4h_group(coordinates: &[Vector3]) -> crate::group::PermutationGroup {
    use crate::group::{derive, Tolerance};
    use crate::symmetry::point_group;

    derive(&point_group::d4h(), coordinates, &Tolerance::default())
        .expect("Coordination spheres are D4h-symmetric")
}
