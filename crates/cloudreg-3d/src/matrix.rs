use crate::device::Device;
use crate::dtype::Dtype;
use glam::{DMat4, DVec4};

/// Errors produced by [`Matrix`] construction and arithmetic.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MatrixError {
    /// The data length does not match the requested shape.
    #[error("matrix shape {rows}x{cols} does not match data length {len}")]
    ShapeMismatch {
        /// Requested number of rows.
        rows: usize,
        /// Requested number of columns.
        cols: usize,
        /// Actual data length.
        len: usize,
    },

    /// The operand shapes are incompatible for multiplication.
    #[error("cannot multiply {lhs_rows}x{lhs_cols} by {rhs_rows}x{rhs_cols}")]
    IncompatibleShapes {
        /// Rows of the left operand.
        lhs_rows: usize,
        /// Columns of the left operand.
        lhs_cols: usize,
        /// Rows of the right operand.
        rhs_rows: usize,
        /// Columns of the right operand.
        rhs_cols: usize,
    },

    /// The operation is not implemented for the operand dtype.
    #[error("operation requires dtype {expected}, got {got}")]
    UnsupportedDtype {
        /// Dtype the operation supports.
        expected: Dtype,
        /// Dtype found on the operand.
        got: Dtype,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum MatrixBuffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Dynamically shaped row-major matrix with device and dtype tags.
///
/// Stands in for the tensor substrate's transform carrier: the shape and
/// element type are runtime properties, so the registration guard can check
/// them before any work happens. Homogeneous 4x4 transforms are the only
/// shape the registration core accepts, but nothing here enforces that.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    buf: MatrixBuffer,
    rows: usize,
    cols: usize,
    device: Device,
}

impl Matrix {
    /// Create an `n x n` single precision identity matrix on the CPU.
    pub fn identity(n: usize) -> Self {
        let mut data = vec![0.0f32; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self {
            buf: MatrixBuffer::F32(data),
            rows: n,
            cols: n,
            device: Device::Cpu,
        }
    }

    /// Create a single precision matrix from row-major data.
    pub fn from_shape_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self, MatrixError> {
        if data.len() != rows * cols {
            return Err(MatrixError::ShapeMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self {
            buf: MatrixBuffer::F32(data),
            rows,
            cols,
            device: Device::Cpu,
        })
    }

    /// Create a double precision matrix from row-major data.
    pub fn from_shape_vec_f64(
        rows: usize,
        cols: usize,
        data: Vec<f64>,
    ) -> Result<Self, MatrixError> {
        if data.len() != rows * cols {
            return Err(MatrixError::ShapeMismatch {
                rows,
                cols,
                len: data.len(),
            });
        }
        Ok(Self {
            buf: MatrixBuffer::F64(data),
            rows,
            cols,
            device: Device::Cpu,
        })
    }

    /// Create a single precision 4x4 matrix from a nested array.
    pub fn from_array4x4(m: &[[f32; 4]; 4]) -> Self {
        let data = m.iter().flatten().copied().collect();
        Self {
            buf: MatrixBuffer::F32(data),
            rows: 4,
            cols: 4,
            device: Device::Cpu,
        }
    }

    /// Move the matrix tag to another device.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Device tag of the matrix.
    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Element dtype of the matrix.
    pub fn dtype(&self) -> Dtype {
        match &self.buf {
            MatrixBuffer::F32(_) => Dtype::F32,
            MatrixBuffer::F64(_) => Dtype::F64,
        }
    }

    /// Read one element, widened to f64. `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let idx = row * self.cols + col;
        match &self.buf {
            MatrixBuffer::F32(data) => data.get(idx).map(|v| *v as f64),
            MatrixBuffer::F64(data) => data.get(idx).copied(),
        }
    }

    /// Matrix product `self * rhs` in single precision.
    ///
    /// Transform composition in the registration core is `U.matmul(&T)`,
    /// the update applied after the current transform.
    pub fn matmul(&self, rhs: &Matrix) -> Result<Matrix, MatrixError> {
        if self.cols != rhs.rows {
            return Err(MatrixError::IncompatibleShapes {
                lhs_rows: self.rows,
                lhs_cols: self.cols,
                rhs_rows: rhs.rows,
                rhs_cols: rhs.cols,
            });
        }
        let lhs_data = self.as_f32()?;
        let rhs_data = rhs.as_f32()?;

        let mut out = vec![0.0f32; self.rows * rhs.cols];
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = lhs_data[i * self.cols + k];
                for j in 0..rhs.cols {
                    out[i * rhs.cols + j] += a * rhs_data[k * rhs.cols + j];
                }
            }
        }
        Ok(Matrix {
            buf: MatrixBuffer::F32(out),
            rows: self.rows,
            cols: rhs.cols,
            device: self.device,
        })
    }

    /// View as a glam [`DMat4`] when the shape is 4x4, widening f32 data.
    pub fn to_dmat4(&self) -> Option<DMat4> {
        if self.rows != 4 || self.cols != 4 {
            return None;
        }
        let col = |j: usize| {
            DVec4::new(
                self.get(0, j).unwrap_or(0.0),
                self.get(1, j).unwrap_or(0.0),
                self.get(2, j).unwrap_or(0.0),
                self.get(3, j).unwrap_or(0.0),
            )
        };
        Some(DMat4::from_cols(col(0), col(1), col(2), col(3)))
    }

    fn as_f32(&self) -> Result<&[f32], MatrixError> {
        match &self.buf {
            MatrixBuffer::F32(data) => Ok(data),
            MatrixBuffer::F64(_) => Err(MatrixError::UnsupportedDtype {
                expected: Dtype::F32,
                got: Dtype::F64,
            }),
        }
    }
}
