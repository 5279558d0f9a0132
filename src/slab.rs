//! Non-copying axis operations on `ndarray` views.
//!
//! These are the only things a [`Bound`] view needs from the array layer:
//! the extent along an axis, a contiguous slice along an axis, disjoint parts
//! along an axis, and a reshape of one axis into several. All of them return
//! views of the same elements; nothing is ever copied.
//!
//! [`Bound`]: super::Bound

use std::ops::{Range};

use ndarray::{ArrayBase, ArrayView, ArrayViewMut, Axis, IxDyn, RawData, ShapeBuilder, Slice, ViewRepr};

use super::{shape};

/// Implemented by the data representations of `ndarray`'s shared and
/// mutable views.
pub trait Slab: RawData + Sized {
    /// Splits `a` into the parts before and after `index` along `axis`.
    fn cut(
        a: ArrayBase<Self, IxDyn>,
        axis: Axis,
        index: usize,
    ) -> (ArrayBase<Self, IxDyn>, ArrayBase<Self, IxDyn>);

    /// Views the elements of `a` with a new shape and new strides, starting
    /// from the same first element.
    ///
    /// # Safety
    ///
    /// `dims` and `strides` must visit only elements of `a`, each at most
    /// once, and `strides` must be non-negative.
    unsafe fn restride(
        a: ArrayBase<Self, IxDyn>,
        dims: &[usize],
        strides: &[usize],
    ) -> ArrayBase<Self, IxDyn>;
}

impl<'a, A> Slab for ViewRepr<&'a A> {
    fn cut(a: ArrayView<'a, A, IxDyn>, axis: Axis, index: usize) -> (ArrayView<'a, A, IxDyn>, ArrayView<'a, A, IxDyn>) {
        a.split_at(axis, index)
    }

    unsafe fn restride(a: ArrayView<'a, A, IxDyn>, dims: &[usize], strides: &[usize]) -> ArrayView<'a, A, IxDyn> {
        ArrayView::from_shape_ptr(IxDyn(dims).strides(IxDyn(strides)), a.as_ptr())
    }
}

impl<'a, A> Slab for ViewRepr<&'a mut A> {
    fn cut(a: ArrayViewMut<'a, A, IxDyn>, axis: Axis, index: usize) -> (ArrayViewMut<'a, A, IxDyn>, ArrayViewMut<'a, A, IxDyn>) {
        a.split_at(axis, index)
    }

    unsafe fn restride(mut a: ArrayViewMut<'a, A, IxDyn>, dims: &[usize], strides: &[usize]) -> ArrayViewMut<'a, A, IxDyn> {
        let ptr = a.as_mut_ptr();
        ArrayViewMut::from_shape_ptr(IxDyn(dims).strides(IxDyn(strides)), ptr)
    }
}

// ----------------------------------------------------------------------------

/// Returns the elements of `a` in `range` along `axis`.
pub fn narrow<S: RawData>(a: ArrayBase<S, IxDyn>, axis: Axis, range: Range<usize>) -> ArrayBase<S, IxDyn> {
    a.slice_axis_move(axis, Slice::from(range))
}

/// Splits `a` along `axis` into `count` consecutive parts of `width`
/// elements each. `a` must have exactly `count * width` elements along
/// `axis`.
pub fn chunks<S: Slab>(a: ArrayBase<S, IxDyn>, axis: Axis, width: usize, count: usize) -> Vec<ArrayBase<S, IxDyn>> {
    assert_eq!(a.len_of(axis), width * count);
    let mut ret = Vec::with_capacity(count);
    let mut rest = a;
    for _ in 1..count {
        let (part, tail) = S::cut(rest, axis, width);
        ret.push(part);
        rest = tail;
    }
    if count > 0 { ret.push(rest); }
    ret
}

/// Replaces `axis` of `a` by the axes of `shape`, in place. `a` must have
/// exactly `shape::length(shape)` elements along `axis`.
///
/// The elements along the old axis are laid out in row-major order over
/// the new axes.
pub fn unflatten<S: Slab>(a: ArrayBase<S, IxDyn>, axis: Axis, shape: &[usize]) -> ArrayBase<S, IxDyn> {
    let mut a = a;
    // Make every stride non-negative, remembering which axes to flip back.
    let flipped: Vec<usize> = (0..a.ndim()).filter(|&i| a.strides()[i] < 0).collect();
    for &i in &flipped { a.invert_axis(Axis(i)); }
    let (dims, strides) = shape::split_axis(a.shape(), a.strides(), axis.index(), shape);
    let strides: Vec<usize> = strides.into_iter().map(|s| s as usize).collect();
    // SAFETY: `split_axis()` only renames the positions of the elements of
    // `a` along `axis`, and all strides are non-negative.
    let mut b = unsafe { S::restride(a, &dims, &strides) };
    // Reversing a row-major sequence reverses every axis it is split into.
    for &i in &flipped {
        if i < axis.index() {
            b.invert_axis(Axis(i));
        } else if i == axis.index() {
            for j in 0..shape.len() { b.invert_axis(Axis(i + j)); }
        } else {
            b.invert_axis(Axis(i + shape.len() - 1));
        }
    }
    b
}

// ----------------------------------------------------------------------------
