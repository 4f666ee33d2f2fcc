use cloudreg_3d::device::Device;
use cloudreg_3d::dtype::Dtype;
use cloudreg_3d::matrix::MatrixError;
use cloudreg_3d::pointcloud::PointCloudError;

/// Errors produced by the registration entry points.
#[derive(thiserror::Error, Debug)]
pub enum RegistrationError {
    /// An input buffer does not use the precision the core requires.
    #[error("registration requires dtype {expected}, got {got}")]
    DtypeMismatch {
        /// The required dtype.
        expected: Dtype,
        /// The dtype found on the input.
        got: Dtype,
    },

    /// Two inputs live on different devices.
    #[error("target device {target} does not match source device {source_device}")]
    DeviceMismatch {
        /// Device of the source input.
        source_device: Device,
        /// Device of the offending input.
        target: Device,
    },

    /// The transformation does not have the expected shape.
    #[error("transformation must be 4x4, got {rows}x{cols}")]
    ShapeError {
        /// Rows of the supplied matrix.
        rows: usize,
        /// Columns of the supplied matrix.
        cols: usize,
    },

    /// A query mode was requested on an index that was not built for it.
    #[error("nearest neighbor index is not built for {mode} queries")]
    IndexNotReady {
        /// The query mode that was requested.
        mode: &'static str,
    },

    /// Not enough correspondences to estimate a transformation.
    #[error("transformation estimation needs at least {required} correspondences, got {got}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences the estimator needs.
        required: usize,
        /// Number of correspondences available.
        got: usize,
    },

    /// Error bubbled up from the point cloud container.
    #[error(transparent)]
    PointCloud(#[from] PointCloudError),

    /// Error bubbled up from matrix arithmetic.
    #[error(transparent)]
    Matrix(#[from] MatrixError),
}
