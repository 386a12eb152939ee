//! Runs kernels over [`BufferView`]s, selecting the monomorphized kernel from the runtime
//! element type tag.
//!
//! Shapes are checked here; element spans, permutations, padding and axes are checked by the
//! kernels. Unsupported (operation, element type) pairs are rejected as invalid arguments.

use derive_more::Display;

use super::{
    cpu::{self, KernelError, KernelResult, check_shape},
    ops::{self, BinaryOp, ReduceOp, UnaryOp},
    view::{BufferView, with_any_type, with_float_type, with_integer_type},
};
use crate::loom::{num::Scalar, shape::Shape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BinaryKind {
    CompareEq,
    CompareNe,
    CompareLt,
    CompareLe,
    CompareGt,
    CompareGe,
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRight,
    Atan2,
}

impl BinaryKind {
    /// Comparisons produce `u8` masks; everything else keeps the operand type.
    #[inline]
    pub fn is_compare(self) -> bool {
        matches!(
            self,
            BinaryKind::CompareEq
                | BinaryKind::CompareNe
                | BinaryKind::CompareLt
                | BinaryKind::CompareLe
                | BinaryKind::CompareGt
                | BinaryKind::CompareGe
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum UnaryKind {
    Abs,
    Not,
    Exp,
    Log,
    Rsqrt,
    Cos,
    Sin,
    Tanh,
    Floor,
    Ceil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ReduceKind {
    Sum,
    Min,
    Max,
}

fn unsupported(op: impl ToString, view: &BufferView) -> KernelError {
    KernelError::Unsupported {
        op: op.to_string(),
        data_type: view.data_type(),
    }
}

#[cfg_attr(
    feature = "trace",
    tracing::instrument(level = "trace", skip_all, fields(%kind))
)]
pub fn binary(
    kind: BinaryKind,
    lhs: &BufferView,
    rhs: &BufferView,
    dst: &mut BufferView,
) -> KernelResult {
    fn run<Op: BinaryOp<T>, T: Scalar>(
        lhs: &BufferView,
        rhs: &BufferView,
        dst: &mut BufferView,
    ) -> KernelResult {
        cpu::binary::<Op, T>(lhs.as_slice()?, rhs.as_slice()?, dst.as_mut_slice()?)
    }

    check_shape(lhs.shape(), rhs.shape())?;
    check_shape(lhs.shape(), dst.shape())?;
    let ty = lhs.data_type();
    let err = || Err(unsupported(kind, lhs));
    match kind {
        BinaryKind::CompareEq => {
            with_any_type!(ty, T => run::<ops::CompareEq, T>(lhs, rhs, dst))
        }
        BinaryKind::CompareNe => {
            with_any_type!(ty, T => run::<ops::CompareNe, T>(lhs, rhs, dst))
        }
        BinaryKind::CompareLt => {
            with_any_type!(ty, T => run::<ops::CompareLt, T>(lhs, rhs, dst))
        }
        BinaryKind::CompareLe => {
            with_any_type!(ty, T => run::<ops::CompareLe, T>(lhs, rhs, dst))
        }
        BinaryKind::CompareGt => {
            with_any_type!(ty, T => run::<ops::CompareGt, T>(lhs, rhs, dst))
        }
        BinaryKind::CompareGe => {
            with_any_type!(ty, T => run::<ops::CompareGe, T>(lhs, rhs, dst))
        }
        BinaryKind::Add => with_any_type!(ty, T => run::<ops::Add, T>(lhs, rhs, dst)),
        BinaryKind::Sub => with_any_type!(ty, T => run::<ops::Sub, T>(lhs, rhs, dst)),
        BinaryKind::Mul => with_any_type!(ty, T => run::<ops::Mul, T>(lhs, rhs, dst)),
        BinaryKind::Div => with_any_type!(ty, T => run::<ops::Div, T>(lhs, rhs, dst)),
        BinaryKind::Min => with_any_type!(ty, T => run::<ops::Min, T>(lhs, rhs, dst)),
        BinaryKind::Max => with_any_type!(ty, T => run::<ops::Max, T>(lhs, rhs, dst)),
        BinaryKind::And => {
            with_integer_type!(ty, T => run::<ops::And, T>(lhs, rhs, dst), err())
        }
        BinaryKind::Or => {
            with_integer_type!(ty, T => run::<ops::Or, T>(lhs, rhs, dst), err())
        }
        BinaryKind::Xor => {
            with_integer_type!(ty, T => run::<ops::Xor, T>(lhs, rhs, dst), err())
        }
        BinaryKind::ShiftLeft => {
            with_integer_type!(ty, T => run::<ops::ShiftLeft, T>(lhs, rhs, dst), err())
        }
        BinaryKind::ShiftRight => {
            with_integer_type!(ty, T => run::<ops::ShiftRight, T>(lhs, rhs, dst), err())
        }
        BinaryKind::Atan2 => {
            with_float_type!(ty, T => run::<ops::Atan2, T>(lhs, rhs, dst), err())
        }
    }
}

#[cfg_attr(
    feature = "trace",
    tracing::instrument(level = "trace", skip_all, fields(%kind))
)]
pub fn unary(kind: UnaryKind, src: &BufferView, dst: &mut BufferView) -> KernelResult {
    fn run<Op: UnaryOp<T>, T: Scalar>(src: &BufferView, dst: &mut BufferView) -> KernelResult {
        cpu::unary::<Op, T>(src.as_slice()?, dst.as_mut_slice()?)
    }

    check_shape(src.shape(), dst.shape())?;
    let ty = src.data_type();
    let err = || Err(unsupported(kind, src));
    match kind {
        UnaryKind::Abs => with_any_type!(ty, T => run::<ops::Abs, T>(src, dst)),
        UnaryKind::Not => with_integer_type!(ty, T => run::<ops::Not, T>(src, dst), err()),
        UnaryKind::Exp => with_float_type!(ty, T => run::<ops::Exp, T>(src, dst), err()),
        UnaryKind::Log => with_float_type!(ty, T => run::<ops::Log, T>(src, dst), err()),
        UnaryKind::Rsqrt => with_float_type!(ty, T => run::<ops::Rsqrt, T>(src, dst), err()),
        UnaryKind::Cos => with_float_type!(ty, T => run::<ops::Cos, T>(src, dst), err()),
        UnaryKind::Sin => with_float_type!(ty, T => run::<ops::Sin, T>(src, dst), err()),
        UnaryKind::Tanh => with_float_type!(ty, T => run::<ops::Tanh, T>(src, dst), err()),
        UnaryKind::Floor => with_float_type!(ty, T => run::<ops::Floor, T>(src, dst), err()),
        UnaryKind::Ceil => with_float_type!(ty, T => run::<ops::Ceil, T>(src, dst), err()),
    }
}

pub fn select(
    cond: &BufferView,
    lhs: &BufferView,
    rhs: &BufferView,
    dst: &mut BufferView,
) -> KernelResult {
    check_shape(dst.shape(), cond.shape())?;
    check_shape(dst.shape(), lhs.shape())?;
    check_shape(dst.shape(), rhs.shape())?;
    let cond = cond.as_slice::<u8>()?;
    with_any_type!(dst.data_type(), T => {
        cpu::select::<T>(cond, lhs.as_slice()?, rhs.as_slice()?, dst.as_mut_slice()?)
    })
}

pub fn clamp(
    src: &BufferView,
    min: &BufferView,
    max: &BufferView,
    dst: &mut BufferView,
) -> KernelResult {
    check_shape(dst.shape(), src.shape())?;
    check_shape(dst.shape(), min.shape())?;
    check_shape(dst.shape(), max.shape())?;
    with_any_type!(dst.data_type(), T => {
        cpu::clamp::<T>(src.as_slice()?, min.as_slice()?, max.as_slice()?, dst.as_mut_slice()?)
    })
}

pub fn mul_add(
    a: &BufferView,
    b: &BufferView,
    c: &BufferView,
    dst: &mut BufferView,
) -> KernelResult {
    check_shape(dst.shape(), a.shape())?;
    check_shape(dst.shape(), b.shape())?;
    check_shape(dst.shape(), c.shape())?;
    with_any_type!(dst.data_type(), T => {
        cpu::mul_add::<T>(a.as_slice()?, b.as_slice()?, c.as_slice()?, dst.as_mut_slice()?)
    })
}

/// Converts `src` into the element type of `dst`.
pub fn convert(src: &BufferView, dst: &mut BufferView) -> KernelResult {
    check_shape(src.shape(), dst.shape())?;
    with_any_type!(src.data_type(), S => {
        with_any_type!(dst.data_type(), D => {
            cpu::convert::<S, D>(src.as_slice()?, dst.as_mut_slice()?)
        })
    })
}

/// Fills `dst` with the single element of `value`.
pub fn broadcast(value: &BufferView, dst: &mut BufferView) -> KernelResult {
    with_any_type!(dst.data_type(), T => {
        cpu::broadcast::<T>(value.as_slice()?, dst.as_mut_slice()?)
    })
}

/// Copies the box `lengths` at `src_indices` of `src` to `dst_indices` of `dst`.
pub fn copy(
    src: &BufferView,
    src_indices: &[usize],
    dst: &mut BufferView,
    dst_indices: &[usize],
    lengths: &[usize],
) -> KernelResult {
    let expected = src.data_type();
    let found = dst.data_type();
    if expected != found {
        return Err(KernelError::Type { expected, found });
    }
    let dst_shape = dst.shape().clone();
    cpu::copy_bytes(
        src.buffer().as_bytes(),
        src.shape(),
        src_indices,
        dst.buffer_mut().as_bytes_mut(),
        &dst_shape,
        dst_indices,
        lengths,
        expected.size(),
    )
}

pub fn transpose(src: &BufferView, permutation: &[usize], dst: &mut BufferView) -> KernelResult {
    let permuted: Option<Vec<_>> = permutation
        .iter()
        .map(|&axis| src.shape().get(axis).copied())
        .collect();
    if let Some(permuted) = permuted {
        check_shape(&Shape::from(permuted), dst.shape())?;
    }
    with_any_type!(dst.data_type(), T => {
        cpu::transpose::<T>(src.as_slice()?, src.shape(), permutation, dst.as_mut_slice()?)
    })
}

pub fn reverse(src: &BufferView, axes: &[usize], dst: &mut BufferView) -> KernelResult {
    check_shape(src.shape(), dst.shape())?;
    with_any_type!(dst.data_type(), T => {
        cpu::reverse::<T>(src.as_slice()?, src.shape(), axes, dst.as_mut_slice()?)
    })
}

pub fn tile(src: &BufferView, dst: &mut BufferView) -> KernelResult {
    let dst_shape = dst.shape().clone();
    with_any_type!(dst.data_type(), T => {
        cpu::tile::<T>(src.as_slice()?, src.shape(), dst.as_mut_slice()?, &dst_shape)
    })
}

pub fn pad(
    src: &BufferView,
    fill: &BufferView,
    dst: &mut BufferView,
    low: &[i64],
    high: &[i64],
    interior: &[i64],
) -> KernelResult {
    let dst_shape = dst.shape().clone();
    with_any_type!(dst.data_type(), T => {
        cpu::pad::<T>(
            src.as_slice()?,
            src.shape(),
            fill.as_slice()?,
            dst.as_mut_slice()?,
            &dst_shape,
            low,
            high,
            interior,
        )
    })
}

#[cfg_attr(
    feature = "trace",
    tracing::instrument(level = "trace", skip_all, fields(%kind))
)]
pub fn reduce(
    kind: ReduceKind,
    src: &BufferView,
    init: &BufferView,
    dst: &mut BufferView,
    axis: usize,
) -> KernelResult {
    fn run<Op: ReduceOp<T>, T: Scalar>(
        src: &BufferView,
        init: &BufferView,
        dst: &mut BufferView,
        axis: usize,
    ) -> KernelResult {
        let dst_shape = dst.shape().clone();
        let (src, src_shape, init) = (src.as_slice()?, src.shape(), init.as_slice()?);
        cpu::reduce::<Op, T>(src, init, dst.as_mut_slice()?, axis, src_shape, &dst_shape)
    }

    let ty = dst.data_type();
    match kind {
        ReduceKind::Sum => with_any_type!(ty, T => run::<ops::ReduceSum, T>(src, init, dst, axis)),
        ReduceKind::Min => with_any_type!(ty, T => run::<ops::ReduceMin, T>(src, init, dst, axis)),
        ReduceKind::Max => with_any_type!(ty, T => run::<ops::ReduceMax, T>(src, init, dst, axis)),
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{BinaryKind, ReduceKind, UnaryKind};
    use crate::{
        error::ErrorKind,
        hal::{cpu::KernelError, dispatch, view::BufferView},
        loom::num::DataType,
    };

    fn view(s: &str) -> Result<BufferView, Box<dyn Error>> {
        Ok(s.parse()?)
    }

    #[test]
    fn test_binary() -> Result<(), Box<dyn Error>> {
        let lhs = view("2x2xi32=1,2,3,4")?;
        let rhs = view("2x2xi32=4,3,2,1")?;

        let mut dst = BufferView::zeros([2, 2], DataType::I32)?;
        dispatch::binary(BinaryKind::Mul, &lhs, &rhs, &mut dst)?;
        assert_eq!(dst.to_string(), "2x2xi32=4,6,6,4");

        let mut mask = BufferView::zeros([2, 2], DataType::U8)?;
        dispatch::binary(BinaryKind::CompareLt, &lhs, &rhs, &mut mask)?;
        assert_eq!(mask.to_string(), "2x2xu8=1,1,0,0");

        let zero = view("2x2xi32=1,0,1,1")?;
        let err = dispatch::binary(BinaryKind::Div, &lhs, &zero, &mut dst);
        assert_eq!(err, Err(KernelError::DivideByZero(1)));
        assert_eq!(dst.to_string(), "2x2xi32=4,6,6,4");
        Ok(())
    }

    #[test]
    fn test_unsupported() -> Result<(), Box<dyn Error>> {
        let x = view("2xf32=1,2")?;
        let mut dst = BufferView::zeros([2], DataType::F32)?;
        let err = dispatch::binary(BinaryKind::Xor, &x, &x, &mut dst).unwrap_err();
        assert_eq!(
            err,
            KernelError::Unsupported {
                op: "Xor".into(),
                data_type: DataType::F32
            }
        );
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let n = view("2xi8=1,2")?;
        let mut dst = BufferView::zeros([2], DataType::I8)?;
        assert!(dispatch::unary(UnaryKind::Exp, &n, &mut dst).is_err());

        let mut dst = BufferView::zeros([2], DataType::I32)?;
        assert_eq!(
            dispatch::unary(UnaryKind::Abs, &n, &mut dst),
            Err(KernelError::Type {
                expected: DataType::I8,
                found: DataType::I32
            })
        );
        Ok(())
    }

    #[test]
    fn test_structural() -> Result<(), Box<dyn Error>> {
        let src = view("2x3xf32=1,2,3,4,5,6")?;

        let mut dst = BufferView::zeros([3, 2], DataType::F32)?;
        dispatch::transpose(&src, &[1, 0], &mut dst)?;
        assert_eq!(dst.to_string(), "3x2xf32=1,4,2,5,3,6");

        let mut dst = BufferView::zeros([2, 3], DataType::F32)?;
        dispatch::reverse(&src, &[0, 1], &mut dst)?;
        assert_eq!(dst.to_string(), "2x3xf32=6,5,4,3,2,1");

        let mut dst = BufferView::zeros([3], DataType::F32)?;
        dispatch::reduce(ReduceKind::Sum, &src, &view("f32=0")?, &mut dst, 0)?;
        assert_eq!(dst.to_string(), "3xf32=5,7,9");

        let mut dst = BufferView::zeros([2, 2], DataType::F32)?;
        dispatch::copy(&src, &[0, 1], &mut dst, &[0, 0], &[2, 2])?;
        assert_eq!(dst.to_string(), "2x2xf32=2,3,5,6");

        let mut dst = BufferView::zeros([4, 3], DataType::F32)?;
        dispatch::tile(&src, &mut dst)?;
        assert_eq!(dst.to_string(), "4x3xf32=1,2,3,4,5,6,1,2,3,4,5,6");

        let mut dst = BufferView::zeros([5], DataType::I8)?;
        dispatch::pad(&view("3xi8=1,2,3")?, &view("i8=0")?, &mut dst, &[1], &[1], &[0])?;
        assert_eq!(dst.to_string(), "5xi8=0,1,2,3,0");

        let mut dst = BufferView::zeros([2, 3], DataType::I32)?;
        dispatch::convert(&src, &mut dst)?;
        assert_eq!(dst.to_string(), "2x3xi32=1,2,3,4,5,6");

        let mut dst = BufferView::zeros([2, 3], DataType::F16)?;
        dispatch::broadcast(&view("f16=0.5")?, &mut dst)?;
        assert_eq!(dst.to_string(), "2x3xf16=0.5,0.5,0.5,0.5,0.5,0.5");

        let mut wrong = BufferView::zeros([3, 3], DataType::F32)?;
        assert!(matches!(
            dispatch::transpose(&src, &[1, 0], &mut wrong),
            Err(KernelError::Shape { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_ternary() -> Result<(), Box<dyn Error>> {
        let cond = view("3xu8=1,0,1")?;
        let lhs = view("3xf64=1,2,3")?;
        let rhs = view("3xf64=-1,-2,-3")?;

        let mut dst = BufferView::zeros([3], DataType::F64)?;
        dispatch::select(&cond, &lhs, &rhs, &mut dst)?;
        assert_eq!(dst.to_string(), "3xf64=1,-2,3");

        dispatch::clamp(&view("3xf64=0,5,9")?, &view("3xf64=1")?, &view("3xf64=8")?, &mut dst)?;
        assert_eq!(dst.to_string(), "3xf64=1,5,8");

        dispatch::mul_add(&lhs, &lhs, &rhs, &mut dst)?;
        assert_eq!(dst.to_string(), "3xf64=0,-2,-6");
        Ok(())
    }
}
