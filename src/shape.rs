//! Row-major arithmetic on shapes given as `&[usize]`.

use super::{Error, Result};

/// Returns the number of elements in an array of shape `shape`.
pub fn length(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Returns the number of elements in an array of shape `shape`, or `None` if
/// the product of its non-zero lengths exceeds `isize::MAX`.
pub fn checked_length(shape: &[usize]) -> Option<usize> {
    let mut nonzero: usize = 1;
    for &size in shape {
        if size != 0 { nonzero = nonzero.checked_mul(size)?; }
    }
    if nonzero > isize::MAX as usize { return None; }
    Some(if shape.contains(&0) { 0 } else { nonzero })
}

/// Returns the row-major position (in `0..length(shape)`) of `index`.
///
/// Panics if `index` is not a valid index into an array of shape `shape`.
pub fn ravel(index: &[usize], shape: &[usize]) -> usize {
    assert_eq!(index.len(), shape.len(), "Index {:?} does not match shape {:?}", index, shape);
    let mut position = 0;
    for (&i, &size) in index.iter().zip(shape) {
        assert!(i < size, "Index {:?} is out of bounds for shape {:?}", index, shape);
        position = position * size + i;
    }
    position
}

/// Returns `dims` with an axis of length `len` inserted at position `axis`.
pub fn insert_axis(dims: &[usize], axis: usize, len: usize) -> Result<Vec<usize>> {
    if axis > dims.len() {
        return Err(Error::AxisOutOfBounds {axis, ndim: dims.len() + 1});
    }
    let mut ret = Vec::with_capacity(dims.len() + 1);
    ret.extend_from_slice(&dims[..axis]);
    ret.push(len);
    ret.extend_from_slice(&dims[axis..]);
    Ok(ret)
}

/// Replaces axis `axis` of a strided layout by the axes of `shape`.
///
/// The old axis must have exactly `length(shape)` elements. The new axes
/// visit the same elements in row-major order, so no element moves.
pub fn split_axis(
    dims: &[usize],
    strides: &[isize],
    axis: usize,
    shape: &[usize],
) -> (Vec<usize>, Vec<isize>) {
    assert_eq!(dims.len(), strides.len());
    assert_eq!(dims[axis], length(shape));
    let mut inner = Vec::with_capacity(shape.len());
    let mut stride = strides[axis];
    for &size in shape.iter().rev() {
        inner.push(stride);
        stride *= size as isize;
    }
    inner.reverse();
    let new_dims = [&dims[..axis], shape, &dims[axis + 1..]].concat();
    let new_strides = [&strides[..axis], &inner[..], &strides[axis + 1..]].concat();
    (new_dims, new_strides)
}

// ----------------------------------------------------------------------------
