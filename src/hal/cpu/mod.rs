//! Shape-directed CPU kernels over contiguous row-major spans.
//!
//! Kernels never allocate and never partially write: every precondition is checked before the
//! first element of the destination is touched.

use thiserror::Error;

pub use copy::{copy, copy_bytes, copy_full};
pub use elementwise::{binary, broadcast, clamp, convert, mul_add, select, unary};
pub use pad::{pad, pad_shape};
pub use reduce::reduce;
pub use reverse::reverse;
pub use tile::tile;
pub use transpose::transpose;

use crate::{
    error::ErrorKind,
    loom::{
        num::DataType,
        shape::{Dims, MAX_RANK, Shape, checked_size},
    },
};

mod copy;
mod elementwise;
mod pad;
mod reduce;
mod reverse;
mod tile;
mod transpose;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("span of {found} elements does not match the expected {expected}")]
    Length { expected: usize, found: usize },
    #[error("shape {found} does not match the expected {expected}")]
    Shape { expected: Shape, found: Shape },
    #[error("rank {0} exceeds the supported maximum of {max}", max = MAX_RANK)]
    Rank(usize),
    #[error("size of shape {0:?} overflows")]
    Overflow(Vec<usize>),
    #[error("expected {expected} per-dimension values, found {found}")]
    Dims { expected: usize, found: usize },
    #[error("axis {axis} is out of range for rank {rank}")]
    Axis { axis: usize, rank: usize },
    #[error("{0:?} is not a permutation")]
    Permutation(Vec<usize>),
    #[error("region at {index} of length {length} exceeds dimension {dim} of size {size}")]
    Region {
        dim: usize,
        index: usize,
        length: usize,
        size: usize,
    },
    #[error("scalar operand must hold exactly one element, found {0}")]
    Scalar(usize),
    #[error("negative padding {value} on axis {axis}")]
    NegativePadding { axis: usize, value: i64 },
    #[error("cannot tile an empty dimension {dim} into size {size}")]
    Tile { dim: usize, size: usize },
    #[error("integer division by zero at element {0}")]
    DivideByZero(usize),
    #[error("expected element type {expected}, found {found}")]
    Type { expected: DataType, found: DataType },
    #[error("operation `{op}` does not support element type {data_type}")]
    Unsupported { op: String, data_type: DataType },
}

impl KernelError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidArgument
    }
}

pub type KernelResult = Result<(), KernelError>;

#[inline]
pub(crate) fn check_len(expected: usize, found: usize) -> KernelResult {
    match expected == found {
        true => Ok(()),
        false => Err(KernelError::Length { expected, found }),
    }
}

#[inline]
pub(crate) fn check_dims(expected: usize, found: usize) -> KernelResult {
    match expected == found {
        true => Ok(()),
        false => Err(KernelError::Dims { expected, found }),
    }
}

#[inline]
pub(crate) fn check_shape(expected: &Shape, found: &Shape) -> KernelResult {
    match expected == found {
        true => Ok(()),
        false => Err(KernelError::Shape {
            expected: expected.clone(),
            found: found.clone(),
        }),
    }
}

#[inline]
pub(crate) fn check_scalar<T>(value: &[T]) -> Result<&T, KernelError> {
    match value {
        [value] => Ok(value),
        _ => Err(KernelError::Scalar(value.len())),
    }
}

/// Element count of `shape`, checked for overflow.
#[inline]
pub(crate) fn element_count(shape: &[usize]) -> Result<usize, KernelError> {
    checked_size(shape).ok_or_else(|| KernelError::Overflow(shape.to_vec()))
}

/// Byte count of `shape` with elements of `element_size` bytes, checked for overflow.
#[inline]
pub(crate) fn byte_count(shape: &[usize], element_size: usize) -> Result<usize, KernelError> {
    element_count(shape)?
        .checked_mul(element_size)
        .ok_or_else(|| KernelError::Overflow(shape.to_vec()))
}

/// Row-major strides of `shape` in units of `unit`.
#[inline]
pub(crate) fn unit_strides(shape: &[usize], unit: usize) -> Result<Dims, KernelError> {
    if shape.len() > MAX_RANK {
        return Err(KernelError::Rank(shape.len()));
    }
    Dims::strides(shape, unit).ok_or_else(|| KernelError::Overflow(shape.to_vec()))
}

/// Row-major element strides of `shape`.
#[inline]
pub(crate) fn strides(shape: &[usize]) -> Result<Dims, KernelError> {
    unit_strides(shape, 1)
}
