use cloudreg_3d::dtype::Dtype;
use cloudreg_3d::matrix::Matrix;
use cloudreg_3d::pointcloud::PointCloud;

use crate::error::RegistrationError;

/// Check the device and dtype contract between a source and target cloud.
///
/// Every public entry point runs this before touching any data: both clouds
/// must store f32 points and share one device.
pub(crate) fn check_point_clouds(
    source: &PointCloud,
    target: &PointCloud,
) -> Result<(), RegistrationError> {
    if source.dtype() != Dtype::F32 {
        return Err(RegistrationError::DtypeMismatch {
            expected: Dtype::F32,
            got: source.dtype(),
        });
    }
    if target.dtype() != Dtype::F32 {
        return Err(RegistrationError::DtypeMismatch {
            expected: Dtype::F32,
            got: target.dtype(),
        });
    }
    if target.device() != source.device() {
        return Err(RegistrationError::DeviceMismatch {
            source_device: source.device(),
            target: target.device(),
        });
    }
    Ok(())
}

/// Check that a transformation is a 4x4 f32 matrix on the source's device.
pub(crate) fn check_transformation(
    transformation: &Matrix,
    source: &PointCloud,
) -> Result<(), RegistrationError> {
    if transformation.rows() != 4 || transformation.cols() != 4 {
        return Err(RegistrationError::ShapeError {
            rows: transformation.rows(),
            cols: transformation.cols(),
        });
    }
    if transformation.dtype() != Dtype::F32 {
        return Err(RegistrationError::DtypeMismatch {
            expected: Dtype::F32,
            got: transformation.dtype(),
        });
    }
    if transformation.device() != source.device() {
        return Err(RegistrationError::DeviceMismatch {
            source_device: source.device(),
            target: transformation.device(),
        });
    }
    Ok(())
}

/// Typed access to the f32 points of a validated cloud.
pub(crate) fn points_f32(cloud: &PointCloud) -> Result<&[[f32; 3]], RegistrationError> {
    cloud
        .points_f32()
        .ok_or(RegistrationError::DtypeMismatch {
            expected: Dtype::F32,
            got: cloud.dtype(),
        })
}
