#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Compute device tags for point clouds and matrices.
pub mod device;

/// Element type tags for dynamically typed buffers.
pub mod dtype;

/// Linear algebra utilities on raw point slices.
pub mod linalg;

/// Dynamically shaped matrices used as homogeneous transforms.
pub mod matrix;

/// Point cloud container.
pub mod pointcloud;
