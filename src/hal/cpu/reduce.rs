use super::{
    KernelError, KernelResult, check_len, check_scalar, check_shape, element_count, strides,
};
use crate::{
    hal::ops::ReduceOp,
    loom::{
        num::Scalar,
        shape::{Dims, MAX_RANK, Shape},
    },
};

/// Folds `src` along `axis` with `Op`, starting every output element from the single element of
/// `init`. `dst_shape` must be `src_shape` without `axis`.
pub fn reduce<Op, T>(
    src: &[T],
    init: &[T],
    dst: &mut [T],
    axis: usize,
    src_shape: &[usize],
    dst_shape: &[usize],
) -> KernelResult
where
    Op: ReduceOp<T>,
    T: Scalar,
{
    let &init = check_scalar(init)?;
    let rank = src_shape.len();
    if rank > MAX_RANK {
        return Err(KernelError::Rank(rank));
    }
    let expected = Shape::from(src_shape)
        .remove_axis(axis)
        .ok_or(KernelError::Axis { axis, rank })?;
    check_shape(&expected, &Shape::from(dst_shape))?;
    check_len(element_count(src_shape)?, src.len())?;
    check_len(element_count(dst_shape)?, dst.len())?;
    let dst_strides = strides(dst_shape)?;

    dst.fill(init);

    let mut index = Dims::zeros(rank).ok_or(KernelError::Rank(rank))?;
    walk::<Op, T>(src, dst, src_shape, &dst_strides, axis, &mut index, 0, 0);
    Ok(())
}

/// Visits `src` in row-major order, one dimension per level, folding each element into the
/// output element it maps to once `axis` is dropped from its index.
#[allow(clippy::too_many_arguments)]
fn walk<Op, T>(
    src: &[T],
    dst: &mut [T],
    shape: &[usize],
    dst_strides: &[usize],
    axis: usize,
    index: &mut Dims,
    dim: usize,
    offset: usize,
) -> usize
where
    Op: ReduceOp<T>,
    T: Scalar,
{
    if dim == shape.len() {
        let target: usize = index
            .iter()
            .enumerate()
            .filter(|&(d, _)| d != axis)
            .zip(dst_strides)
            .map(|((_, &i), &stride)| i * stride)
            .sum();
        dst[target] = Op::combine(dst[target], src[offset]);
        return offset + 1;
    }

    let mut offset = offset;
    for i in 0..shape[dim] {
        index[dim] = i;
        offset = walk::<Op, T>(src, dst, shape, dst_strides, axis, index, dim + 1, offset);
    }
    offset
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::Itertools;

    use super::reduce;
    use crate::{
        hal::{
            cpu::KernelError,
            ops::{ReduceMax, ReduceMin, ReduceSum},
        },
        loom::shape::Shape,
    };

    #[test]
    fn test_reduce() -> Result<(), Box<dyn Error>> {
        let src = [1, 2, 3, 4, 5, 6];

        let mut dst = [0; 3];
        reduce::<ReduceSum, _>(&src, &[0], &mut dst, 0, &[2, 3], &[3])?;
        assert_eq!(dst, [5, 7, 9]);

        reduce::<ReduceMax, _>(&src, &[i32::MIN], &mut dst, 0, &[2, 3], &[3])?;
        assert_eq!(dst, [4, 5, 6]);

        let mut dst = [0; 2];
        reduce::<ReduceSum, _>(&src, &[10], &mut dst, 1, &[2, 3], &[2])?;
        assert_eq!(dst, [16, 25]);

        reduce::<ReduceMin, _>(&src, &[i32::MAX], &mut dst, 1, &[2, 3], &[2])?;
        assert_eq!(dst, [1, 4]);

        // an empty reduced axis leaves the initial value
        let mut dst = [0.0f32; 2];
        reduce::<ReduceSum, _>(&[], &[1.5], &mut dst, 1, &[2, 0], &[2])?;
        assert_eq!(dst, [1.5, 1.5]);
        Ok(())
    }

    #[test]
    fn test_reduce_invalid() {
        let src = [1, 2, 3, 4, 5, 6];
        let mut dst = [0; 3];
        let err = reduce::<ReduceSum, _>(&src, &[0], &mut dst, 2, &[2, 3], &[3]);
        assert_eq!(err, Err(KernelError::Axis { axis: 2, rank: 2 }));
        let err = reduce::<ReduceSum, _>(&src, &[0], &mut dst, 1, &[2, 3], &[3]);
        assert_eq!(
            err,
            Err(KernelError::Shape {
                expected: Shape::from([2]),
                found: Shape::from([3]),
            })
        );
        let err = reduce::<ReduceSum, _>(&src, &[0, 0], &mut dst, 0, &[2, 3], &[3]);
        assert_eq!(err, Err(KernelError::Scalar(2)));
        assert_eq!(dst, [0; 3]);

        let shape = [usize::MAX, 2, 3];
        let err = reduce::<ReduceSum, _>(&src, &[0], &mut dst, 1, &shape, &[usize::MAX, 3]);
        assert_eq!(err, Err(KernelError::Overflow(shape.to_vec())));
        assert_eq!(dst, [0; 3]);
    }

    #[test]
    fn test_reduce_random() -> Result<(), Box<dyn Error>> {
        fastrand::seed(42);
        for rank in 1..=4 {
            let shape = (0..rank).map(|_| fastrand::usize(1..5)).collect_vec();
            let size: usize = shape.iter().product();
            let src = (0..size).map(|_| fastrand::i64(-100..100)).collect_vec();
            let strides = crate::hal::cpu::strides(&shape)?;

            for axis in 0..rank {
                let dst_shape = Shape::from(shape.clone()).remove_axis(axis).ok_or("axis")?;
                let mut dst = vec![0; dst_shape.size()];
                reduce::<ReduceSum, _>(&src, &[0], &mut dst, axis, &shape, &dst_shape)?;

                let expected = dst_shape
                    .iter()
                    .map(|&dim| 0..dim)
                    .multi_cartesian_product()
                    .map(|mut index| {
                        index.insert(axis, 0);
                        (0..shape[axis])
                            .map(|i| {
                                index[axis] = i;
                                let pairs = index.iter().zip(strides.iter());
                                pairs.map(|(&i, &s)| i * s).sum::<usize>()
                            })
                            .map(|offset| src[offset])
                            .sum::<i64>()
                    })
                    .collect_vec();
                // reducing rank 1 leaves a scalar
                let expected = match dst_shape.rank() {
                    0 => vec![src.iter().sum()],
                    _ => expected,
                };
                assert_eq!(dst, expected);
            }
        }
        Ok(())
    }
}
