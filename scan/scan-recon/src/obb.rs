//! Oriented bounding box fitting for sampled point sets.
//!
//! Fits a box to the principal axes of the point covariance. Point sets too
//! small to define axes, or whose eigendecomposition does not converge, get
//! an axis-aligned zero-size box at the centroid.

// Sample counts are bounded by the reservoir capacity.
#![allow(clippy::cast_precision_loss)]

use nalgebra::{Matrix3, Rotation3, SymmetricEigen, Unit, UnitQuaternion, Vector3};
use tracing::warn;

/// Minimum number of points needed to fit principal axes.
pub const MIN_FIT_POINTS: usize = 3;

const EIGEN_EPSILON: f64 = 1e-12;
const EIGEN_MAX_ITERATIONS: usize = 1000;

/// Box aligned to the principal axes of a point set.
///
/// The axes form a right-handed orthonormal basis sorted by descending
/// variance; `extents` are full widths along each axis.
///
/// # Example
///
/// ```
/// use scan_recon::OrientedBoundingBox;
///
/// let points = [
///     [0.0, 0.0, 0.0],
///     [4.0, 0.0, 0.0],
///     [0.0, 1.0, 0.0],
///     [4.0, 1.0, 0.0],
/// ];
/// let obb = OrientedBoundingBox::from_points(&points);
///
/// assert!((obb.extents.x - 4.0).abs() < 1e-9);
/// assert!((obb.determinant() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OrientedBoundingBox {
    /// Box center in world space.
    pub center: Vector3<f64>,
    /// Full widths along each axis.
    pub extents: Vector3<f64>,
    /// Unit axes, largest variance first.
    pub axes: [Vector3<f64>; 3],
    /// Rotation taking the world basis onto `axes`.
    pub rotation: UnitQuaternion<f64>,
}

impl OrientedBoundingBox {
    /// Identity-oriented, zero-size box at `center`.
    #[must_use]
    pub fn degenerate(center: Vector3<f64>) -> Self {
        Self {
            center,
            extents: Vector3::zeros(),
            axes: [Vector3::x(), Vector3::y(), Vector3::z()],
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Fits a box to a point set.
    #[must_use]
    pub fn from_points(points: &[[f32; 3]]) -> Self {
        let centroid = centroid(points).unwrap_or_else(Vector3::zeros);
        Self::fit(points, &centroid)
    }

    /// Fits a box to a point set with a precomputed centroid.
    #[must_use]
    pub fn fit(points: &[[f32; 3]], centroid: &Vector3<f64>) -> Self {
        if points.len() < MIN_FIT_POINTS {
            return Self::degenerate(*centroid);
        }

        let Some(basis) = principal_basis(points, centroid) else {
            warn!(
                points = points.len(),
                "eigendecomposition did not converge, using axis-aligned fallback"
            );
            return Self::degenerate(*centroid);
        };

        let axes = [
            basis.column(0).into_owned(),
            basis.column(1).into_owned(),
            basis.column(2).into_owned(),
        ];

        let mut local_min = Vector3::repeat(f64::INFINITY);
        let mut local_max = Vector3::repeat(f64::NEG_INFINITY);
        for p in points {
            let offset = to_vector(p) - centroid;
            let local = basis.transpose() * offset;
            local_min = local_min.inf(&local);
            local_max = local_max.sup(&local);
        }

        let mid = (local_min + local_max) / 2.0;
        let rotation =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis));

        Self {
            center: centroid + basis * mid,
            extents: local_max - local_min,
            axes,
            rotation,
        }
    }

    /// Returns the axes as matrix columns.
    #[must_use]
    pub fn basis(&self) -> Matrix3<f64> {
        Matrix3::from_columns(&self.axes)
    }

    /// Returns the determinant of the basis (`+1` for a proper rotation).
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.basis().determinant()
    }

    /// Returns the orientation as `[w, x, y, z]`.
    #[must_use]
    pub fn quaternion_wxyz(&self) -> [f64; 4] {
        let q = self.rotation.quaternion();
        [q.w, q.i, q.j, q.k]
    }

    /// Returns the box volume.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.extents.x * self.extents.y * self.extents.z
    }
}

/// Returns the mean of a point set, or `None` if it is empty.
#[must_use]
pub fn centroid(points: &[[f32; 3]]) -> Option<Vector3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc: Vector3<f64>, p| acc + to_vector(p));
    Some(sum / points.len() as f64)
}

fn to_vector(p: &[f32; 3]) -> Vector3<f64> {
    Vector3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2]))
}

/// Right-handed orthonormal basis of principal axes, largest variance first.
fn principal_basis(points: &[[f32; 3]], centroid: &Vector3<f64>) -> Option<Matrix3<f64>> {
    let mut covariance = Matrix3::zeros();
    for p in points {
        let d = to_vector(p) - centroid;
        covariance += d * d.transpose();
    }
    covariance /= points.len() as f64;

    let eigen = SymmetricEigen::try_new(covariance, EIGEN_EPSILON, EIGEN_MAX_ITERATIONS)?;
    let eigenvalues = eigen.eigenvalues;

    let mut indices = [0usize, 1, 2];
    indices.sort_by(|&a, &b| {
        eigenvalues[b]
            .abs()
            .partial_cmp(&eigenvalues[a].abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut axes = [Vector3::zeros(); 3];
    for (axis, &index) in axes.iter_mut().zip(&indices) {
        let column = eigen.eigenvectors.column(index).into_owned();
        *axis = Unit::try_new(column, EIGEN_EPSILON)?.into_inner();
    }

    let mut basis = Matrix3::from_columns(&axes);
    if basis.determinant() < 0.0 {
        basis.set_column(2, &(-axes[2]));
    }
    Some(basis)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_right_handed(obb: &OrientedBoundingBox) {
        for axis in &obb.axes {
            assert_relative_eq!(axis.norm(), 1.0, epsilon = 1e-9);
        }
        assert_relative_eq!(obb.axes[0].dot(&obb.axes[1]), 0.0, epsilon = 1e-9);
        assert_relative_eq!(obb.axes[0].dot(&obb.axes[2]), 0.0, epsilon = 1e-9);
        assert_relative_eq!(obb.axes[1].dot(&obb.axes[2]), 0.0, epsilon = 1e-9);
        assert_relative_eq!(obb.determinant(), 1.0, epsilon = 1e-9);
    }

    fn box_corners(size: [f32; 3], offset: [f32; 3]) -> Vec<[f32; 3]> {
        let mut corners = Vec::new();
        for &x in &[0.0, size[0]] {
            for &y in &[0.0, size[1]] {
                for &z in &[0.0, size[2]] {
                    corners.push([x + offset[0], y + offset[1], z + offset[2]]);
                }
            }
        }
        corners
    }

    #[test]
    fn test_centroid() {
        assert!(centroid(&[]).is_none());
        let c = centroid(&[[0.0, 0.0, 0.0], [2.0, 4.0, 6.0]]).unwrap();
        assert_relative_eq!(c, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_axis_aligned_box() {
        let points = box_corners([4.0, 2.0, 1.0], [1.0, 1.0, 1.0]);
        let obb = OrientedBoundingBox::from_points(&points);

        assert_right_handed(&obb);
        assert_relative_eq!(obb.extents, Vector3::new(4.0, 2.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(obb.center, Vector3::new(3.0, 2.0, 1.5), epsilon = 1e-6);
        assert_relative_eq!(obb.axes[0].x.abs(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(obb.axes[1].y.abs(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(obb.volume(), 8.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rotated_box_extents() {
        let rotation = Rotation3::from_euler_angles(0.3, -0.2, 0.9);
        let points: Vec<[f32; 3]> = box_corners([5.0, 2.0, 0.5], [-2.5, -1.0, -0.25])
            .iter()
            .map(|p| {
                let r = rotation * to_vector(p);
                [r.x as f32, r.y as f32, r.z as f32]
            })
            .collect();

        let obb = OrientedBoundingBox::from_points(&points);
        assert_right_handed(&obb);
        assert_relative_eq!(obb.extents, Vector3::new(5.0, 2.0, 0.5), epsilon = 1e-4);
        assert_relative_eq!(obb.center.norm(), 0.0, epsilon = 1e-5);

        let primary = rotation * Vector3::x();
        assert_relative_eq!(obb.axes[0].dot(&primary).abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rotation_matches_axes() {
        let points = box_corners([3.0, 2.0, 1.0], [0.0, 0.0, 0.0]);
        let obb = OrientedBoundingBox::from_points(&points);

        let rotated_x = obb.rotation * Vector3::x();
        assert_relative_eq!(rotated_x, obb.axes[0], epsilon = 1e-9);
        let q = obb.quaternion_wxyz();
        let norm = q.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_two_points_use_fallback() {
        let points = [[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let obb = OrientedBoundingBox::from_points(&points);

        assert_eq!(obb.axes, [Vector3::x(), Vector3::y(), Vector3::z()]);
        assert_eq!(obb.extents, Vector3::zeros());
        assert_relative_eq!(obb.center, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(obb.quaternion_wxyz(), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_coincident_points_stay_finite() {
        let points = [[1.0, 1.0, 1.0]; 10];
        let obb = OrientedBoundingBox::from_points(&points);

        assert_right_handed(&obb);
        assert_relative_eq!(obb.extents, Vector3::zeros(), epsilon = 1e-9);
        assert_relative_eq!(obb.center, Vector3::new(1.0, 1.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_planar_points() {
        let points = box_corners([2.0, 1.0, 0.0], [0.0, 0.0, 0.0]);
        let obb = OrientedBoundingBox::from_points(&points);

        assert_right_handed(&obb);
        assert_relative_eq!(obb.extents.z, 0.0, epsilon = 1e-6);
    }
}
