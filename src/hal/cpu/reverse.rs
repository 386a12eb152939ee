use super::{KernelError, KernelResult, check_len, element_count, strides};
use crate::loom::{num::Scalar, shape::MAX_RANK};

/// Reverses `src` along every axis in `axes`. Repeated axes reverse once.
pub fn reverse<T: Scalar>(
    src: &[T],
    shape: &[usize],
    axes: &[usize],
    dst: &mut [T],
) -> KernelResult {
    let rank = shape.len();
    if rank > MAX_RANK {
        return Err(KernelError::Rank(rank));
    }

    let mut mask = [false; MAX_RANK];
    for &axis in axes {
        match axis < rank {
            true => mask[axis] = true,
            false => return Err(KernelError::Axis { axis, rank }),
        }
    }

    let size = element_count(shape)?;
    check_len(size, src.len())?;
    check_len(size, dst.len())?;
    if size == 0 {
        return Ok(());
    }

    let strides = strides(shape)?;
    for (index, z) in dst.iter_mut().enumerate() {
        let mut rest = index;
        let mut offset = 0;
        for (dim, (&stride, &extent)) in strides.iter().zip(shape).enumerate() {
            let i = rest / stride;
            rest %= stride;
            let i = if mask[dim] { extent - 1 - i } else { i };
            offset += i * stride;
        }
        *z = src[offset];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::Itertools;

    use super::reverse;
    use crate::hal::cpu::KernelError;

    #[test]
    fn test_reverse() -> Result<(), Box<dyn Error>> {
        let src = (0..6).collect_vec();
        let mut dst = vec![0; 6];

        reverse(&src, &[2, 3], &[1], &mut dst)?;
        assert_eq!(dst, [2, 1, 0, 5, 4, 3]);

        reverse(&src, &[2, 3], &[0], &mut dst)?;
        assert_eq!(dst, [3, 4, 5, 0, 1, 2]);

        reverse(&src, &[2, 3], &[0, 1, 1], &mut dst)?;
        assert_eq!(dst, [5, 4, 3, 2, 1, 0]);

        reverse(&src, &[2, 3], &[], &mut dst)?;
        assert_eq!(dst, src);

        let err = reverse(&src, &[2, 3], &[2], &mut dst);
        assert_eq!(err, Err(KernelError::Axis { axis: 2, rank: 2 }));

        let err = reverse::<i32>(&[], &[1 << 20, usize::MAX], &[0], &mut []);
        assert_eq!(err, Err(KernelError::Overflow(vec![1 << 20, usize::MAX])));
        Ok(())
    }

    #[test]
    fn test_reverse_twice() -> Result<(), Box<dyn Error>> {
        fastrand::seed(42);
        for rank in 1..=5 {
            let shape = (0..rank).map(|_| fastrand::usize(1..5)).collect_vec();
            let size: usize = shape.iter().product();
            let src = (0..size).map(|_| fastrand::i16(..)).collect_vec();
            let axes = (0..rank).filter(|_| fastrand::bool()).collect_vec();

            let mut mid = vec![0; size];
            let mut dst = vec![0; size];
            reverse(&src, &shape, &axes, &mut mid)?;
            reverse(&mid, &shape, &axes, &mut dst)?;
            assert_eq!(src, dst);
        }
        Ok(())
    }
}
