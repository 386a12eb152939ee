use super::{KernelError, KernelResult, check_dims, check_len, element_count, strides};
use crate::loom::{num::Scalar, shape::MAX_RANK};

/// Fills `dst` by repeating `src` along every axis: `dst[i] = src[i mod src_shape]` per dimension.
pub fn tile<T: Scalar>(
    src: &[T],
    src_shape: &[usize],
    dst: &mut [T],
    dst_shape: &[usize],
) -> KernelResult {
    let rank = dst_shape.len();
    if rank > MAX_RANK {
        return Err(KernelError::Rank(rank));
    }
    check_dims(rank, src_shape.len())?;
    check_len(element_count(src_shape)?, src.len())?;
    check_len(element_count(dst_shape)?, dst.len())?;
    if dst.is_empty() {
        return Ok(());
    }
    if let Some(dim) = src_shape.iter().position(|&size| size == 0) {
        let size = dst_shape[dim];
        return Err(KernelError::Tile { dim, size });
    }

    let src_strides = strides(src_shape)?;
    let dst_strides = strides(dst_shape)?;
    for (index, z) in dst.iter_mut().enumerate() {
        let mut offset = 0;
        for dim in 0..rank {
            let i = index / dst_strides[dim] % dst_shape[dim];
            offset += i % src_shape[dim] * src_strides[dim];
        }
        *z = src[offset];
    }
    Ok(())
}
