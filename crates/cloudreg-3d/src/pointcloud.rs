use crate::device::Device;
use crate::dtype::Dtype;
use crate::matrix::Matrix;
use glam::{DMat3, DVec3};

/// Errors produced by the [`PointCloud`] container.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PointCloudError {
    /// The point cloud has no points.
    #[error("point cloud data is empty")]
    EmptyData,

    /// The normals buffer does not pair up with the points buffer.
    #[error("normals length {normals} does not match points length {points}")]
    NormalsLengthMismatch {
        /// Number of normals supplied.
        normals: usize,
        /// Number of points in the cloud.
        points: usize,
    },

    /// The supplied transform is not a 4x4 homogeneous matrix.
    #[error("transform matrix must be 4x4, got {rows}x{cols}")]
    InvalidTransform {
        /// Rows of the supplied matrix.
        rows: usize,
        /// Columns of the supplied matrix.
        cols: usize,
    },
}

#[derive(Debug, Clone)]
enum PointBuffer {
    F32(Vec<[f32; 3]>),
    F64(Vec<[f64; 3]>),
}

/// An ordered set of 3D points with optional per-point normals.
///
/// Storage is dtype-tagged so downstream consumers can require a concrete
/// precision at runtime; the registration core only accepts f32 clouds.
#[derive(Debug, Clone)]
pub struct PointCloud {
    points: PointBuffer,
    normals: Option<Vec<[f32; 3]>>,
    device: Device,
}

impl PointCloud {
    /// Create a single precision point cloud with optional normals.
    pub fn from_vec(
        points: Vec<[f32; 3]>,
        normals: Option<Vec<[f32; 3]>>,
    ) -> Result<Self, PointCloudError> {
        if points.is_empty() {
            return Err(PointCloudError::EmptyData);
        }
        if let Some(normals) = &normals {
            if normals.len() != points.len() {
                return Err(PointCloudError::NormalsLengthMismatch {
                    normals: normals.len(),
                    points: points.len(),
                });
            }
        }
        Ok(Self {
            points: PointBuffer::F32(points),
            normals,
            device: Device::Cpu,
        })
    }

    /// Create a double precision point cloud.
    ///
    /// Double precision clouds exist so dtype mismatches are observable at
    /// the registration boundary; normals are not supported in this mode.
    pub fn from_vec_f64(points: Vec<[f64; 3]>) -> Result<Self, PointCloudError> {
        if points.is_empty() {
            return Err(PointCloudError::EmptyData);
        }
        Ok(Self {
            points: PointBuffer::F64(points),
            normals: None,
            device: Device::Cpu,
        })
    }

    /// Move the cloud tag to another device.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        match &self.points {
            PointBuffer::F32(points) => points.len(),
            PointBuffer::F64(points) => points.len(),
        }
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Device tag of the point cloud.
    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Element dtype of the point buffer.
    pub fn dtype(&self) -> Dtype {
        match &self.points {
            PointBuffer::F32(_) => Dtype::F32,
            PointBuffer::F64(_) => Dtype::F64,
        }
    }

    /// The points as single precision, `None` when the buffer is f64.
    pub fn points_f32(&self) -> Option<&[[f32; 3]]> {
        match &self.points {
            PointBuffer::F32(points) => Some(points),
            PointBuffer::F64(_) => None,
        }
    }

    /// The points as double precision, `None` when the buffer is f32.
    pub fn points_f64(&self) -> Option<&[[f64; 3]]> {
        match &self.points {
            PointBuffer::F32(_) => None,
            PointBuffer::F64(points) => Some(points),
        }
    }

    /// Per-point normals, when present.
    pub fn normals(&self) -> Option<&[[f32; 3]]> {
        self.normals.as_deref()
    }

    /// Apply a 4x4 homogeneous transform to the cloud in place.
    ///
    /// Points get the full rigid/affine map, normals only the rotation
    /// part. The projective row of the matrix is ignored.
    pub fn transform(&mut self, matrix: &Matrix) -> Result<(), PointCloudError> {
        let m = matrix
            .to_dmat4()
            .ok_or(PointCloudError::InvalidTransform {
                rows: matrix.rows(),
                cols: matrix.cols(),
            })?;

        match &mut self.points {
            PointBuffer::F32(points) => {
                for p in points.iter_mut() {
                    let q = m.transform_point3(DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64));
                    *p = [q.x as f32, q.y as f32, q.z as f32];
                }
            }
            PointBuffer::F64(points) => {
                for p in points.iter_mut() {
                    let q = m.transform_point3(DVec3::new(p[0], p[1], p[2]));
                    *p = [q.x, q.y, q.z];
                }
            }
        }

        if let Some(normals) = &mut self.normals {
            let r = DMat3::from_mat4(m);
            for n in normals.iter_mut() {
                let q = r * DVec3::new(n[0] as f64, n[1] as f64, n[2] as f64);
                *n = [q.x as f32, q.y as f32, q.z as f32];
            }
        }

        Ok(())
    }
}
