use super::{KernelError, KernelResult, check_dims, check_len, element_count, strides};
use crate::loom::{
    num::Scalar,
    shape::{Dims, MAX_RANK},
};

/// Permutes the axes of `src`: axis `i` of `dst` is axis `permutation[i]` of `src`.
pub fn transpose<T: Scalar>(
    src: &[T],
    src_shape: &[usize],
    permutation: &[usize],
    dst: &mut [T],
) -> KernelResult {
    let rank = src_shape.len();
    if rank > MAX_RANK {
        return Err(KernelError::Rank(rank));
    }
    check_dims(rank, permutation.len())?;

    let mut seen = [false; MAX_RANK];
    for &axis in permutation {
        match seen.get_mut(axis) {
            Some(flag) if axis < rank && !*flag => *flag = true,
            _ => return Err(KernelError::Permutation(permutation.to_vec())),
        }
    }

    let size = element_count(src_shape)?;
    check_len(size, src.len())?;
    check_len(size, dst.len())?;
    if size == 0 {
        return Ok(());
    }

    let mut dst_shape = Dims::zeros(rank).ok_or(KernelError::Rank(rank))?;
    for (dim, &axis) in dst_shape.iter_mut().zip(permutation) {
        *dim = src_shape[axis];
    }
    let src_strides = strides(src_shape)?;
    let dst_strides = strides(&dst_shape)?;

    for (index, z) in dst.iter_mut().enumerate() {
        let mut rest = index;
        let mut offset = 0;
        for (&stride, &axis) in dst_strides.iter().zip(permutation) {
            offset += rest / stride * src_strides[axis];
            rest %= stride;
        }
        *z = src[offset];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use itertools::Itertools;

    use super::transpose;
    use crate::hal::cpu::KernelError;

    #[test]
    fn test_transpose() -> Result<(), Box<dyn Error>> {
        let src = (0..6).collect_vec();
        let mut dst = vec![0; 6];
        transpose(&src, &[2, 3], &[1, 0], &mut dst)?;
        assert_eq!(dst, [0, 3, 1, 4, 2, 5]);

        let err = transpose(&src, &[2, 3], &[0, 0], &mut dst);
        assert_eq!(err, Err(KernelError::Permutation(vec![0, 0])));
        let err = transpose(&src, &[2, 3], &[0, 2], &mut dst);
        assert_eq!(err, Err(KernelError::Permutation(vec![0, 2])));

        let err = transpose::<u8>(&[], &[usize::MAX, 3], &[1, 0], &mut []);
        assert_eq!(err, Err(KernelError::Overflow(vec![usize::MAX, 3])));
        transpose::<u8>(&[], &[usize::MAX, 3, 0], &[2, 1, 0], &mut [])?;
        Ok(())
    }

    #[test]
    fn test_transpose_inverse() -> Result<(), Box<dyn Error>> {
        fastrand::seed(42);
        for rank in 0..=4 {
            let shape = (0..rank).map(|_| fastrand::usize(1..5)).collect_vec();
            let size: usize = shape.iter().product();
            let src = (0..size).map(|_| fastrand::f32()).collect_vec();

            for permutation in (0..rank).permutations(rank) {
                let mut inverse = vec![0; rank];
                for (dim, &axis) in permutation.iter().enumerate() {
                    inverse[axis] = dim;
                }
                let permuted = permutation.iter().map(|&axis| shape[axis]).collect_vec();

                let mut mid = vec![0.0; size];
                let mut dst = vec![0.0; size];
                transpose(&src, &shape, &permutation, &mut mid)?;
                transpose(&mid, &permuted, &inverse, &mut dst)?;
                assert_eq!(src, dst);
            }
        }
        Ok(())
    }
}
