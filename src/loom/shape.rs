use std::sync::Arc;

use derive_more::{Deref, Display, From, Into};
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The highest rank kernels operate on. Per-dimension scratch is kept inline up to this rank.
pub const MAX_RANK: usize = 8;

/// Product of `dims`, or `None` if it does not fit in `usize`. The empty product is 1, and any
/// zero dimension makes the product 0 regardless of the others.
#[inline]
pub fn checked_size(dims: &[usize]) -> Option<usize> {
    match dims.contains(&0) {
        true => Some(0),
        false => dims.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim)),
    }
}

/// An ordered sequence of dimension sizes. Rank 0 denotes a scalar with a single element.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Deref, From, Into, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[display("[{}]", _0.iter().format(", "))]
pub struct Shape(Arc<[usize]>);

impl From<Vec<usize>> for Shape {
    #[inline]
    fn from(value: Vec<usize>) -> Self {
        Self(value.into())
    }
}

impl From<&[usize]> for Shape {
    #[inline]
    fn from(value: &[usize]) -> Self {
        Self(value.into())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    #[inline]
    fn from(value: [usize; N]) -> Self {
        Self(value.into())
    }
}

impl Shape {
    /// The rank-0 shape.
    #[inline]
    pub fn scalar() -> Self {
        Self::default()
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total element count: the product of all dimensions, 1 for rank 0.
    /// Returns `None` if the count overflows `usize`.
    #[inline]
    pub fn checked_size(&self) -> Option<usize> {
        checked_size(&self.0)
    }

    /// Total element count, saturating at `usize::MAX`. No span can be that long, so a saturated
    /// count never matches a buffer length.
    #[inline]
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }

    /// Returns the shape with `axis` removed, or `None` if `axis` is out of range.
    pub fn remove_axis(&self, axis: usize) -> Option<Self> {
        (axis < self.rank()).then(|| {
            let dims = self
                .iter()
                .enumerate()
                .filter(|&(index, _)| index != axis)
                .map(|(_, &dim)| dim)
                .collect_vec();
            Self::from(dims)
        })
    }
}

/// A fixed-capacity list of per-dimension values (indices, strides, lengths).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    data: [usize; MAX_RANK],
    len: usize,
}

impl std::ops::Deref for Dims {
    type Target = [usize];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.data[..self.len]
    }
}

impl std::ops::DerefMut for Dims {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data[..self.len]
    }
}

impl Dims {
    /// Creates `len` zeros. Returns `None` if `len` exceeds [`MAX_RANK`].
    #[inline]
    pub fn zeros(len: usize) -> Option<Self> {
        (len <= MAX_RANK).then_some(Self {
            data: [0; MAX_RANK],
            len,
        })
    }

    /// Copies `values`. Returns `None` if there are more than [`MAX_RANK`] of them.
    #[inline]
    pub fn from_slice(values: &[usize]) -> Option<Self> {
        let mut dims = Self::zeros(values.len())?;
        dims.copy_from_slice(values);
        Some(dims)
    }

    /// Row-major strides of `shape`, in units of `unit` (1 for elements, the element size for
    /// bytes). Returns `None` above [`MAX_RANK`] or if `unit` times the element count overflows.
    pub fn strides(shape: &[usize], unit: usize) -> Option<Self> {
        let mut strides = Self::zeros(shape.len())?;
        let mut stride = unit;
        for (dim, &size) in shape.iter().enumerate().rev() {
            strides[dim] = stride;
            stride = stride.checked_mul(size)?;
        }
        Some(strides)
    }

    /// Advances a row-major multi-index over `shape` by one element, wrapping to zeros at the end.
    pub fn increment(&mut self, shape: &[usize]) {
        for (index, &size) in self.iter_mut().zip(shape.iter()).rev() {
            *index += 1;
            if *index < size {
                return;
            }
            *index = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Dims, MAX_RANK, Shape, checked_size};

    #[test]
    fn test_shape() {
        let shape = Shape::from([2, 3, 4]);
        assert_eq!(shape.rank(), 3);
        assert_eq!(shape.size(), 24);
        assert_eq!(shape.to_string(), "[2, 3, 4]");
        assert_eq!(shape.remove_axis(1), Some(Shape::from([2, 4])));
        assert_eq!(shape.remove_axis(3), None);
        assert_eq!(shape, Shape::from(vec![2, 3, 4]));

        let scalar = Shape::scalar();
        assert_eq!(scalar.rank(), 0);
        assert_eq!(scalar.size(), 1);
        assert_eq!(scalar.to_string(), "[]");

        assert_eq!(Shape::from([3, 0, 2]).size(), 0);
    }

    #[test]
    fn test_size_overflow() {
        let huge = Shape::from([usize::MAX / 2, 3]);
        assert_eq!(huge.checked_size(), None);
        assert_eq!(huge.size(), usize::MAX);
        assert_eq!(checked_size(&[usize::MAX, 2]), None);
        assert_eq!(checked_size(&[usize::MAX, 1]), Some(usize::MAX));
        assert_eq!(checked_size(&[usize::MAX, 2, 0]), Some(0));
        assert_eq!(checked_size(&[]), Some(1));

        assert!(Dims::strides(&[usize::MAX, 2], 1).is_none());
        assert!(Dims::strides(&[2, usize::MAX / 2], 4).is_none());
    }

    #[test]
    fn test_dims() {
        let strides = Dims::strides(&[2, 3, 4], 1).unwrap();
        assert_eq!(&strides[..], &[12, 4, 1]);
        let strides = Dims::strides(&[2, 3, 4], 4).unwrap();
        assert_eq!(&strides[..], &[48, 16, 4]);
        assert!(Dims::zeros(MAX_RANK + 1).is_none());

        let shape = [2, 2];
        let mut index = Dims::zeros(2).unwrap();
        let mut visited = vec![];
        for _ in 0..5 {
            visited.push(index.to_vec());
            index.increment(&shape);
        }
        assert_eq!(
            visited,
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1], vec![0, 0]]
        );
    }
}
