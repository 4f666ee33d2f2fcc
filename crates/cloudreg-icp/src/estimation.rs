use cloudreg_3d::matrix::Matrix;
use cloudreg_3d::pointcloud::PointCloud;
use glam::{DMat3, DVec3, Mat3, Vec3};

use crate::correspondence::CorrespondenceSet;
use crate::error::RegistrationError;
use crate::validate;

/// A strategy that turns a set of correspondences into an incremental
/// transform.
///
/// The ICP driver consumes this abstractly: point-to-point is provided
/// here, point-to-plane and colored variants are further implementations of
/// the same trait.
pub trait TransformationEstimation {
    /// Compute the 4x4 incremental transform aligning the matched source
    /// points onto their matched target points.
    ///
    /// `source` is the current transformed source cloud; `correspondences`
    /// selects its matched points and names their target indices.
    fn compute_transformation(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        correspondences: &CorrespondenceSet,
    ) -> Result<Matrix, RegistrationError>;

    /// Smallest number of correspondences this strategy can work with.
    fn minimum_correspondences(&self) -> usize {
        3
    }
}

/// Point-to-point estimation, Arun et al. 1987.
///
/// Centroids, cross-covariance, 3x3 SVD, with the usual reflection fix on
/// the rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointToPoint;

impl TransformationEstimation for PointToPoint {
    fn compute_transformation(
        &self,
        source: &PointCloud,
        target: &PointCloud,
        correspondences: &CorrespondenceSet,
    ) -> Result<Matrix, RegistrationError> {
        let source_points = validate::points_f32(source)?;
        let target_points = validate::points_f32(target)?;

        // gather the matched pairs, source order
        let points_src: Vec<Vec3> = source_points
            .iter()
            .zip(correspondences.mask.iter())
            .filter(|&(_, &selected)| selected)
            .map(|(p, _)| Vec3::from_array(*p))
            .collect();
        let points_dst: Vec<Vec3> = correspondences
            .indices
            .iter()
            .map(|&idx| Vec3::from_array(target_points[idx]))
            .collect();

        if points_src.len() < self.minimum_correspondences() {
            return Err(RegistrationError::InsufficientCorrespondences {
                required: self.minimum_correspondences(),
                got: points_src.len(),
            });
        }

        // perfectly aligned pairs need no update
        if points_src == points_dst {
            return Ok(Matrix::identity(4).with_device(source.device()));
        }

        let (src_centroid, dst_centroid) = compute_centroids(&points_src, &points_dst);

        // cross-covariance H = sum[(src - src_mean) * (dst - dst_mean)^T]
        let mut h = Mat3::ZERO;
        for (&src_pt, &dst_pt) in points_src.iter().zip(points_dst.iter()) {
            let src_centered = src_pt - src_centroid;
            let dst_centered = dst_pt - dst_centroid;
            h += Mat3::from_cols(
                src_centered * dst_centered.x,
                src_centered * dst_centered.y,
                src_centered * dst_centered.z,
            );
        }

        let h_mat = faer::mat![
            [h.col(0).x as f64, h.col(1).x as f64, h.col(2).x as f64],
            [h.col(0).y as f64, h.col(1).y as f64, h.col(2).y as f64],
            [h.col(0).z as f64, h.col(1).z as f64, h.col(2).z as f64],
        ];
        let svd = h_mat.svd();
        let u = read_dmat3(&svd.u());
        let v = read_dmat3(&svd.v());

        // R = V * U^T, flipping the sign of V's last column when the
        // product would be a reflection
        let mut r = v * u.transpose();
        if r.determinant() < 0.0 {
            let v = DMat3::from_cols(v.x_axis, v.y_axis, -v.z_axis);
            r = v * u.transpose();
        }

        // t = dst_centroid - R * src_centroid
        let t = dst_centroid.as_dvec3() - r * src_centroid.as_dvec3();

        let rows = r.transpose().to_cols_array_2d();
        let transform = Matrix::from_array4x4(&[
            [rows[0][0] as f32, rows[0][1] as f32, rows[0][2] as f32, t.x as f32],
            [rows[1][0] as f32, rows[1][1] as f32, rows[1][2] as f32, t.y as f32],
            [rows[2][0] as f32, rows[2][1] as f32, rows[2][2] as f32, t.z as f32],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        Ok(transform.with_device(source.device()))
    }
}

/// Compute the centroids of two sets of points.
fn compute_centroids(points_src: &[Vec3], points_dst: &[Vec3]) -> (Vec3, Vec3) {
    let src_centroid =
        points_src.iter().fold(Vec3::ZERO, |acc, &p| acc + p) / points_src.len() as f32;
    let dst_centroid =
        points_dst.iter().fold(Vec3::ZERO, |acc, &p| acc + p) / points_dst.len() as f32;
    (src_centroid, dst_centroid)
}

fn read_dmat3(m: &faer::MatRef<'_, f64>) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(m.read(0, 0), m.read(1, 0), m.read(2, 0)),
        DVec3::new(m.read(0, 1), m.read(1, 1), m.read(2, 1)),
        DVec3::new(m.read(0, 2), m.read(1, 2), m.read(2, 2)),
    )
}
