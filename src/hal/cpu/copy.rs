use super::{KernelError, KernelResult, byte_count, check_dims, check_len, unit_strides};
use crate::loom::{
    num::Scalar,
    shape::{Dims, MAX_RANK},
};

/// Treats rank 0 as a single-element rank 1 array.
#[inline]
fn promote<'a>(values: &'a [usize], fill: &'a [usize; 1]) -> &'a [usize] {
    match values.is_empty() {
        true => fill,
        false => values,
    }
}

/// Copies the box `lengths` starting at `src_indices` in `src` to `dst_indices` in `dst`.
///
/// Both spans are row-major byte buffers of elements of `element_size` bytes. Rank 0 shapes are
/// copied as `[1]`; their indices and lengths may be given either empty or as `[0]` and `[1]`.
#[allow(clippy::too_many_arguments)]
pub fn copy_bytes(
    src: &[u8],
    src_shape: &[usize],
    src_indices: &[usize],
    dst: &mut [u8],
    dst_shape: &[usize],
    dst_indices: &[usize],
    lengths: &[usize],
    element_size: usize,
) -> KernelResult {
    let src_shape = promote(src_shape, &[1]);
    let dst_shape = promote(dst_shape, &[1]);
    let src_indices = promote(src_indices, &[0]);
    let dst_indices = promote(dst_indices, &[0]);
    let lengths = promote(lengths, &[1]);

    let rank = dst_shape.len();
    if rank > MAX_RANK {
        return Err(KernelError::Rank(rank));
    }
    check_dims(rank, src_shape.len())?;
    check_dims(rank, src_indices.len())?;
    check_dims(rank, dst_indices.len())?;
    check_dims(rank, lengths.len())?;
    check_len(byte_count(src_shape, element_size)?, src.len())?;
    check_len(byte_count(dst_shape, element_size)?, dst.len())?;

    for (dim, &length) in lengths.iter().enumerate() {
        let bounds = [
            (src_indices[dim], src_shape[dim]),
            (dst_indices[dim], dst_shape[dim]),
        ];
        for (index, size) in bounds {
            if index.checked_add(length).is_none_or(|end| end > size) {
                return Err(KernelError::Region {
                    dim,
                    index,
                    length,
                    size,
                });
            }
        }
    }
    if lengths.contains(&0) {
        return Ok(());
    }

    let src_strides = unit_strides(src_shape, element_size)?;
    let dst_strides = unit_strides(dst_shape, element_size)?;
    copy_region(src, &src_strides, src_indices, dst, &dst_strides, dst_indices, lengths);
    Ok(())
}

fn copy_region(
    src: &[u8],
    src_strides: &[usize],
    src_indices: &[usize],
    dst: &mut [u8],
    dst_strides: &[usize],
    dst_indices: &[usize],
    lengths: &[usize],
) {
    match lengths {
        [] => {}
        [length] => {
            // innermost strides are both the element size
            let size = length * dst_strides[0];
            let src_offset = src_indices[0] * src_strides[0];
            let dst_offset = dst_indices[0] * dst_strides[0];
            let src = &src[src_offset..src_offset + size];
            dst[dst_offset..dst_offset + size].copy_from_slice(src);
        }
        [length, lengths @ ..] => {
            for index in 0..*length {
                let src_offset = (src_indices[0] + index) * src_strides[0];
                let dst_offset = (dst_indices[0] + index) * dst_strides[0];
                copy_region(
                    &src[src_offset..],
                    &src_strides[1..],
                    &src_indices[1..],
                    &mut dst[dst_offset..],
                    &dst_strides[1..],
                    &dst_indices[1..],
                    lengths,
                );
            }
        }
    }
}

/// Typed form of [`copy_bytes`].
pub fn copy<T: Scalar>(
    src: &[T],
    src_shape: &[usize],
    src_indices: &[usize],
    dst: &mut [T],
    dst_shape: &[usize],
    dst_indices: &[usize],
    lengths: &[usize],
) -> KernelResult {
    copy_bytes(
        bytemuck::cast_slice(src),
        src_shape,
        src_indices,
        bytemuck::cast_slice_mut(dst),
        dst_shape,
        dst_indices,
        lengths,
        size_of::<T>(),
    )
}

/// Copies all of `src` into `dst`, both of `shape`.
pub fn copy_full<T: Scalar>(src: &[T], dst: &mut [T], shape: &[usize]) -> KernelResult {
    let zeros = Dims::zeros(shape.len()).ok_or(KernelError::Rank(shape.len()))?;
    copy(src, shape, &zeros, dst, shape, &zeros, shape)
}
