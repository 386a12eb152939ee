use itertools::izip;

use super::{KernelResult, check_len, check_scalar};
use crate::{
    hal::ops::{BinaryOp, UnaryOp},
    loom::num::{Arithmetic, Cast, Scalar},
};

/// `dst[i] = Op(lhs[i], rhs[i])`.
pub fn binary<Op, T>(lhs: &[T], rhs: &[T], dst: &mut [Op::Output]) -> KernelResult
where
    Op: BinaryOp<T>,
    T: Scalar,
{
    check_len(dst.len(), lhs.len())?;
    check_len(dst.len(), rhs.len())?;
    Op::check(rhs)?;

    izip!(dst, lhs, rhs).for_each(|(z, &x, &y)| *z = Op::apply(x, y));
    Ok(())
}

/// `dst[i] = Op(src[i])`.
pub fn unary<Op, T>(src: &[T], dst: &mut [T]) -> KernelResult
where
    Op: UnaryOp<T>,
    T: Scalar,
{
    check_len(dst.len(), src.len())?;
    dst.iter_mut()
        .zip(src)
        .for_each(|(z, &x)| *z = Op::apply(x));
    Ok(())
}

/// `dst[i] = cond[i] != 0 ? lhs[i] : rhs[i]`.
pub fn select<T: Scalar>(cond: &[u8], lhs: &[T], rhs: &[T], dst: &mut [T]) -> KernelResult {
    check_len(dst.len(), cond.len())?;
    check_len(dst.len(), lhs.len())?;
    check_len(dst.len(), rhs.len())?;

    izip!(dst, cond, lhs, rhs).for_each(|(z, &c, &x, &y)| *z = if c != 0 { x } else { y });
    Ok(())
}

/// Clamps every `src[i]` into `[min[i], max[i]]`. A value equal to a bound yields that bound.
pub fn clamp<T: Scalar>(src: &[T], min: &[T], max: &[T], dst: &mut [T]) -> KernelResult {
    check_len(dst.len(), src.len())?;
    check_len(dst.len(), min.len())?;
    check_len(dst.len(), max.len())?;

    izip!(dst, src, min, max).for_each(|(z, &x, &lo, &hi)| {
        *z = if x <= lo {
            lo
        } else if x >= hi {
            hi
        } else {
            x
        }
    });
    Ok(())
}

/// `dst[i] = a[i] + b[i] * c[i]`.
pub fn mul_add<T: Arithmetic>(a: &[T], b: &[T], c: &[T], dst: &mut [T]) -> KernelResult {
    check_len(dst.len(), a.len())?;
    check_len(dst.len(), b.len())?;
    check_len(dst.len(), c.len())?;

    izip!(dst, a, b, c).for_each(|(z, &a, &b, &c)| *z = a.add(b.mul(c)));
    Ok(())
}

/// Element-by-element conversion with `as` semantics.
pub fn convert<S, D>(src: &[S], dst: &mut [D]) -> KernelResult
where
    S: Scalar + Cast<D>,
    D: Scalar,
{
    check_len(dst.len(), src.len())?;
    dst.iter_mut()
        .zip(src)
        .for_each(|(z, &x)| *z = x.cast());
    Ok(())
}

/// Fills `dst` with the single element of `src`.
pub fn broadcast<T: Scalar>(src: &[T], dst: &mut [T]) -> KernelResult {
    let &value = check_scalar(src)?;
    dst.fill(value);
    Ok(())
}
