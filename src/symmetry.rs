extern crate nalgebra as na;
pub type Matrix3 = na::Matrix3<f64>;
pub type Vector3 = na::Vector3<f64>;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum SymmetryError {
    #[error("Operation '{0}' is not orthogonal")]
    NotOrthogonal(String),
    #[error("Operation '{name}' has determinant {determinant}, expected ±1")]
    BadDeterminant {name: String, determinant: f64},
    #[error("Zero-length axis or normal")]
    DegenerateAxis,
}

/// Named linear transform acting on three-dimensional coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryOperation {
    pub name: String,
    pub matrix: Matrix3
}

impl SymmetryOperation {
    /// Wrap a matrix, checking that it is orthogonal with determinant ±1
    pub fn new(name: impl Into<String>, matrix: Matrix3) -> Result<SymmetryOperation, SymmetryError> {
        let name = name.into();
        if !approx::relative_eq!(matrix.transpose() * matrix, Matrix3::identity(), epsilon = 1e-8) {
            return Err(SymmetryError::NotOrthogonal(name));
        }

        let determinant = matrix.determinant();
        if !approx::relative_eq!(determinant.abs(), 1.0, epsilon = 1e-8) {
            return Err(SymmetryError::BadDeterminant {name, determinant});
        }

        Ok(SymmetryOperation {name, matrix})
    }

    pub fn apply(&self, point: &Vector3) -> Vector3 {
        self.matrix * point
    }

    /// Proper rotations preserve handedness
    pub fn is_proper(&self) -> bool {
        self.matrix.determinant() > 0.0
    }
}

fn unit(axis: Vector3) -> Result<na::Unit<Vector3>, SymmetryError> {
    na::Unit::try_new(axis, 1e-12).ok_or(SymmetryError::DegenerateAxis)
}

/// Counterclockwise rotation about an axis by an angle in degrees
pub fn rotation(axis: Vector3, degrees: f64) -> Result<Matrix3, SymmetryError> {
    let rotation = na::Rotation3::from_axis_angle(&unit(axis)?, degrees.to_radians());
    Ok(rotation.into_inner())
}

/// Reflection through the plane containing the origin with a given normal
pub fn reflection(normal: Vector3) -> Result<Matrix3, SymmetryError> {
    let n = unit(normal)?.into_inner();
    Ok(Matrix3::identity() - 2.0 * n * n.transpose())
}

/// Inversion through the origin
pub fn inversion() -> Matrix3 {
    -Matrix3::identity()
}

/// Rotation followed by reflection through the plane perpendicular to the axis
pub fn improper_rotation(axis: Vector3, degrees: f64) -> Result<Matrix3, SymmetryError> {
    Ok(reflection(axis)? * rotation(axis, degrees)?)
}

/// Point groups given as explicit lists of named operations
pub mod point_group {
    use super::*;

    fn named(name: &str, matrix: Result<Matrix3, SymmetryError>) -> Result<SymmetryOperation, SymmetryError> {
        SymmetryOperation::new(name, matrix?)
    }

    /// The sixteen operations of D4h with the principal axis along z
    ///
    /// ```
    /// # use orbitcount::symmetry::point_group;
    /// let ops = point_group::d4h();
    /// assert_eq!(ops.len(), 16);
    /// assert_eq!(ops.iter().filter(|op| op.is_proper()).count(), 8);
    /// ```
    pub fn d4h() -> Vec<SymmetryOperation> {
        let x = Vector3::x();
        let y = Vector3::y();
        let z = Vector3::z();
        let xy = Vector3::new(1.0, 1.0, 0.0);
        let minus_xy = Vector3::new(1.0, -1.0, 0.0);

        let operations = [
            named("E", Ok(Matrix3::identity())),
            named("C4", rotation(z, 90.0)),
            named("C4^-1", rotation(z, -90.0)),
            named("C2", rotation(z, 180.0)),
            named("C2'(x)", rotation(x, 180.0)),
            named("C2'(y)", rotation(y, 180.0)),
            named("C2''(xy)", rotation(xy, 180.0)),
            named("C2''(-xy)", rotation(minus_xy, 180.0)),
            named("i", Ok(inversion())),
            named("S4", improper_rotation(z, 90.0)),
            named("S4^-1", improper_rotation(z, -90.0)),
            named("sigma_h", reflection(z)),
            named("sigma_v(x)", reflection(y)),
            named("sigma_v'(y)", reflection(x)),
            named("sigma_d(xy)", reflection(minus_xy)),
            named("sigma_d'(-xy)", reflection(xy)),
        ];

        operations.into_iter()
            .collect::<Result<Vec<_>, _>>()
            .expect("D4h operations are orthogonal by construction")
    }
}

#[cfg(test)]
mod tests {
    use crate::symmetry::*;

    #[test]
    fn elementary_operations() {
        let c4 = rotation(Vector3::z(), 90.0).unwrap();
        approx::assert_relative_eq!(c4 * Vector3::x(), Vector3::y(), epsilon = 1e-12);

        let sigma = reflection(Vector3::new(0.0, 0.0, 2.0)).unwrap();
        approx::assert_relative_eq!(sigma * Vector3::new(1.0, 2.0, 3.0), Vector3::new(1.0, 2.0, -3.0), epsilon = 1e-12);

        approx::assert_relative_eq!(inversion() * Vector3::new(1.0, -2.0, 3.0), Vector3::new(-1.0, 2.0, -3.0));

        let s4 = improper_rotation(Vector3::z(), 90.0).unwrap();
        approx::assert_relative_eq!(s4 * Vector3::new(1.0, 0.0, 1.0), Vector3::new(0.0, 1.0, -1.0), epsilon = 1e-12);
        approx::assert_relative_eq!(s4.determinant(), -1.0, epsilon = 1e-12);

        assert_eq!(rotation(Vector3::zeros(), 90.0), Err(SymmetryError::DegenerateAxis));
    }

    #[test]
    fn operation_validation() {
        assert!(SymmetryOperation::new("E", Matrix3::identity()).is_ok());
        assert!(matches!(
            SymmetryOperation::new("shear", Matrix3::new(1.0, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0)),
            Err(SymmetryError::NotOrthogonal(_))
        ));
        assert!(matches!(
            SymmetryOperation::new("scale", Matrix3::identity() * 2.0),
            Err(SymmetryError::NotOrthogonal(_))
        ));
    }

    #[test]
    fn d4h_is_closed() {
        let ops = point_group::d4h();
        for a in ops.iter() {
            for b in ops.iter() {
                let product = a.matrix * b.matrix;
                assert!(
                    ops.iter().any(|c| approx::relative_eq!(c.matrix, product, epsilon = 1e-9)),
                    "{} * {} not in D4h", a.name, b.name
                );
            }
        }
    }
}
