use super::{
    KernelError, KernelResult, check_dims, check_len, check_scalar, element_count, strides,
};
use crate::loom::{
    num::Scalar,
    shape::{Dims, MAX_RANK, Shape},
};

/// Converts per-axis padding amounts, rejecting negative ones.
fn padding(values: &[i64]) -> Result<Dims, KernelError> {
    let mut dims = Dims::zeros(values.len()).ok_or(KernelError::Rank(values.len()))?;
    for (axis, (dim, &value)) in dims.iter_mut().zip(values).enumerate() {
        *dim = usize::try_from(value).map_err(|_| KernelError::NegativePadding { axis, value })?;
    }
    Ok(dims)
}

/// Padded length of one axis of length `size`, or `None` on overflow.
fn padded(size: usize, low: usize, high: usize, interior: usize) -> Option<usize> {
    let edges = low.checked_add(high)?;
    match size {
        0 => Some(edges),
        size => (size - 1)
            .checked_mul(interior)?
            .checked_add(size)?
            .checked_add(edges),
    }
}

/// Shape of `src_shape` after padding: `low + high + n + (n - 1) * interior` per axis, or
/// `low + high` for an empty axis.
pub fn pad_shape(
    src_shape: &[usize],
    low: &[i64],
    high: &[i64],
    interior: &[i64],
) -> Result<Shape, KernelError> {
    let rank = src_shape.len();
    if rank > MAX_RANK {
        return Err(KernelError::Rank(rank));
    }
    check_dims(rank, low.len())?;
    check_dims(rank, high.len())?;
    check_dims(rank, interior.len())?;
    let low = padding(low)?;
    let high = padding(high)?;
    let interior = padding(interior)?;

    let mut shape = Dims::zeros(rank).ok_or(KernelError::Rank(rank))?;
    for (dim, value) in shape.iter_mut().enumerate() {
        *value = padded(src_shape[dim], low[dim], high[dim], interior[dim])
            .ok_or_else(|| KernelError::Overflow(src_shape.to_vec()))?;
    }
    Ok(Shape::from(&shape[..]))
}

/// Places `src` into `dst` with `low` and `high` edge padding and `interior` padding between
/// elements, filling every padding position with the single element of `fill`.
#[allow(clippy::too_many_arguments)]
pub fn pad<T: Scalar>(
    src: &[T],
    src_shape: &[usize],
    fill: &[T],
    dst: &mut [T],
    dst_shape: &[usize],
    low: &[i64],
    high: &[i64],
    interior: &[i64],
) -> KernelResult {
    let &fill = check_scalar(fill)?;
    let expected = pad_shape(src_shape, low, high, interior)?;
    let found = Shape::from(dst_shape);
    if expected != found {
        return Err(KernelError::Shape { expected, found });
    }
    check_len(element_count(src_shape)?, src.len())?;
    check_len(element_count(dst_shape)?, dst.len())?;

    let low = padding(low)?;
    let high = padding(high)?;
    let interior = padding(interior)?;
    let src_strides = strides(src_shape)?;

    let rank = dst_shape.len();
    let mut index = Dims::zeros(rank).ok_or(KernelError::Rank(rank))?;
    for z in dst.iter_mut() {
        let mut offset = 0;
        let mut is_padding = false;
        for dim in 0..rank {
            let i = index[dim];
            let step = interior[dim] + 1;
            if i < low[dim] || i >= dst_shape[dim] - high[dim] || (i - low[dim]) % step != 0 {
                is_padding = true;
                break;
            }
            offset += (i - low[dim]) / step * src_strides[dim];
        }
        *z = if is_padding { fill } else { src[offset] };
        index.increment(dst_shape);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{pad, pad_shape};
    use crate::{hal::cpu::KernelError, loom::shape::Shape};

    #[test]
    fn test_pad() -> Result<(), Box<dyn Error>> {
        let mut dst = [9; 5];
        pad(&[1, 2, 3], &[3], &[0], &mut dst, &[5], &[1], &[1], &[0])?;
        assert_eq!(dst, [0, 1, 2, 3, 0]);

        let mut dst = [9; 7];
        pad(&[1, 2, 3], &[3], &[0], &mut dst, &[7], &[1], &[1], &[1])?;
        assert_eq!(dst, [0, 1, 0, 2, 0, 3, 0]);

        // 2x2 with one row above and one column on the right
        let mut dst = [9.0f32; 9];
        let src = [1.0, 2.0, 3.0, 4.0];
        pad(&src, &[2, 2], &[0.5], &mut dst, &[3, 3], &[1, 0], &[0, 1], &[0, 0])?;
        assert_eq!(dst, [0.5, 0.5, 0.5, 1.0, 2.0, 0.5, 3.0, 4.0, 0.5]);

        let mut dst = [9u8; 2];
        pad(&[], &[0], &[1], &mut dst, &[2], &[1], &[1], &[3])?;
        assert_eq!(dst, [1, 1]);
        Ok(())
    }

    #[test]
    fn test_pad_invalid() {
        let mut dst = [9; 5];
        let err = pad(&[1, 2, 3], &[3], &[0, 0], &mut dst, &[5], &[1], &[1], &[0]);
        assert_eq!(err, Err(KernelError::Scalar(2)));
        let err = pad(&[1, 2, 3], &[3], &[], &mut dst, &[5], &[1], &[1], &[0]);
        assert_eq!(err, Err(KernelError::Scalar(0)));

        let err = pad(&[1, 2, 3], &[3], &[0], &mut dst, &[5], &[-1], &[3], &[0]);
        assert_eq!(err, Err(KernelError::NegativePadding { axis: 0, value: -1 }));

        let err = pad(&[1, 2, 3], &[3], &[0], &mut dst, &[5], &[2], &[1], &[0]);
        assert_eq!(
            err,
            Err(KernelError::Shape {
                expected: Shape::from([6]),
                found: Shape::from([5]),
            })
        );
        assert_eq!(dst, [9; 5]);
    }

    #[test]
    fn test_pad_shape() -> Result<(), Box<dyn Error>> {
        assert_eq!(pad_shape(&[3, 4], &[1, 0], &[2, 0], &[0, 2])?, Shape::from([6, 10]));
        assert_eq!(pad_shape(&[0], &[1], &[2], &[5])?, Shape::from([3]));
        assert_eq!(pad_shape(&[], &[], &[], &[])?, Shape::scalar());
        Ok(())
    }

    #[test]
    fn test_pad_shape_overflow() {
        let err = pad_shape(&[3], &[i64::MAX], &[i64::MAX], &[0]);
        assert_eq!(err, Err(KernelError::Overflow(vec![3])));
        let err = pad_shape(&[usize::MAX], &[1], &[0], &[0]);
        assert_eq!(err, Err(KernelError::Overflow(vec![usize::MAX])));
        let err = pad_shape(&[1, 3], &[0, 0], &[0, 0], &[0, i64::MAX]);
        assert_eq!(err, Err(KernelError::Overflow(vec![1, 3])));

        // every axis fits, but their product does not
        let big = i64::MAX / 4;
        let dst_shape = [big as usize + 1; 2];
        let mut dst = [0u8; 1];
        let err = pad(&[1u8], &[1, 1], &[0], &mut dst, &dst_shape, &[big, big], &[0, 0], &[0, 0]);
        assert_eq!(err, Err(KernelError::Overflow(dst_shape.to_vec())));
        assert_eq!(dst, [0]);
    }
}
