//! A buffer paired with a [`Schema`] that describes it.

use std::fmt::{self, Debug};

use ndarray::{ArrayBase, ArrayD, Axis, Data, DataMut, Dimension, Ix0, IxDyn, OwnedRepr, RawData, ViewRepr};

use super::{shape, slab, Error, Result, Schema};
use super::schema::{Kind};
use super::slab::{Slab};

/// An array together with a [`Schema`] that names the positions along one of
/// its axes.
///
/// `S` is the data representation of the array, as in
/// [`ndarray::ArrayBase`]. A `Bound` can own its array ([`BoundArray`]) or
/// borrow one ([`BoundView`], [`BoundViewMut`]). Either way, everything read
/// through a `Bound` is a view of the same elements, and everything written
/// through it lands in the same elements. Nothing is ever copied.
///
/// The extent of the array along [`Schema::axis()`] is always exactly
/// [`Schema::len()`].
///
/// ```
/// use fieldview::{Schema, fields, ndarray::arr2};
/// let xy = Schema::new(fields![x, y]).unwrap();
/// let s = Schema::new(fields![t, p => &xy]).unwrap();
/// let mut a = arr2(&[[0.0; 2]; 3]);
/// let mut b = s.bind(a.view_mut()).unwrap();
/// b.set("t", 1.0).unwrap();
/// b.set_path("p.y", 2.0).unwrap();
/// assert_eq!(a, arr2(&[[1.0, 1.0], [0.0, 0.0], [2.0, 2.0]]));
/// ```
pub struct Bound<S: RawData> {
    buffer: ArrayBase<S, IxDyn>,
    /// Always has intercept 0.
    schema: Schema,
}

/// A [`Bound`] that owns its array.
pub type BoundArray<A> = Bound<OwnedRepr<A>>;

/// A [`Bound`] that borrows its array.
pub type BoundView<'a, A> = Bound<ViewRepr<&'a A>>;

/// A [`Bound`] that mutably borrows its array.
pub type BoundViewMut<'a, A> = Bound<ViewRepr<&'a mut A>>;

impl<S: RawData> Bound<S> {
    /// Pairs `buffer` with `schema`.
    ///
    /// `schema` is re-based to start at position 0 of `buffer`.
    ///
    /// # Errors
    ///
    /// - [`Error::AxisOutOfBounds`] if `buffer` has no axis `schema.axis()`.
    /// - [`Error::SizeMismatch`] if the extent of `buffer` along that axis is
    ///   not `schema.len()`.
    pub fn new<D: Dimension>(buffer: ArrayBase<S, D>, schema: &Schema) -> Result<Self> {
        let buffer = buffer.into_dyn();
        let axis = schema.axis();
        if axis >= buffer.ndim() {
            return Err(Error::AxisOutOfBounds {axis, ndim: buffer.ndim()});
        }
        let found = buffer.len_of(Axis(axis));
        if found != schema.len() {
            return Err(Error::SizeMismatch {axis, expected: schema.len(), found});
        }
        log::debug!("Bound a buffer of shape {:?} along axis {}", buffer.shape(), axis);
        Ok(Self {buffer, schema: schema.rebase(0)})
    }

    /// The schema, with intercept 0.
    pub fn schema(&self) -> &Schema { &self.schema }

    /// The underlying array.
    pub fn buffer(&self) -> &ArrayBase<S, IxDyn> { &self.buffer }

    /// Returns the underlying array.
    pub fn into_inner(self) -> ArrayBase<S, IxDyn> { self.buffer }

    /// Allocates a new array with the same schema and shape as `self`,
    /// filled with `B::default()`.
    pub fn similar<B: Clone + Default>(&self) -> BoundArray<B> {
        Bound {buffer: ArrayD::default(self.buffer.raw_dim()), schema: self.schema.clone()}
    }

    /// Allocates a new array with the same schema as `self`. See
    /// [`Bound::allocate()`].
    pub fn similar_with<B: Clone + Default>(&self, dims: &[usize]) -> Result<BoundArray<B>> {
        Bound::allocate(&self.schema, dims)
    }
}

impl<A> Bound<OwnedRepr<A>> {
    /// Allocates an array for `schema`, filled with `A::default()`.
    ///
    /// The array has shape `dims` with `schema.len()` inserted at position
    /// `schema.axis()`.
    ///
    /// ```
    /// use fieldview::{Schema, BoundArray, fields};
    /// let s = Schema::along(1, fields![a, b[2]]).unwrap();
    /// let b = BoundArray::<f32>::allocate(&s, &[4]).unwrap();
    /// assert_eq!(b.buffer().shape(), [4, 3]);
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::AxisOutOfBounds`] if `schema.axis() > dims.len()`.
    pub fn allocate(schema: &Schema, dims: &[usize]) -> Result<Self> where A: Clone + Default {
        Self::from_elem(schema, dims, A::default())
    }

    /// Allocates an array for `schema`, filled with `elem`. See
    /// [`Bound::allocate()`].
    pub fn from_elem(schema: &Schema, dims: &[usize], elem: A) -> Result<Self> where A: Clone {
        let shape = shape::insert_axis(dims, schema.axis(), schema.len())?;
        log::debug!("Allocating a buffer of shape {:?}", shape);
        Self::new(ArrayD::from_elem(IxDyn(&shape), elem), schema)
    }
}

impl<A, S: Data<Elem=A>> Bound<S> {
    /// Borrows `self`.
    pub fn view(&self) -> BoundView<'_, A> {
        Bound {buffer: self.buffer.view(), schema: self.schema.clone()}
    }

    /// Returns a view of field `name`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownField`] if there is no such field.
    pub fn get(&self, name: &str) -> Result<Field<ViewRepr<&A>>> {
        self.view().into_field(name)
    }

    /// Returns a view of the field at `path`, a sequence of field names
    /// separated by `.`. Every name except the last must be a nested field.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownField`] if a name is not found.
    /// - [`Error::NotNested`] if a name other than the last is not a nested
    ///   field.
    pub fn get_path(&self, path: &str) -> Result<Field<ViewRepr<&A>>> {
        self.view().into_path(path)
    }
}

impl<A, S: DataMut<Elem=A>> Bound<S> {
    /// Mutably borrows `self`.
    pub fn view_mut(&mut self) -> BoundViewMut<'_, A> {
        Bound {buffer: self.buffer.view_mut(), schema: self.schema.clone()}
    }

    /// Returns a mutable view of field `name`. See [`Bound::get()`].
    pub fn get_mut(&mut self, name: &str) -> Result<Field<ViewRepr<&mut A>>> {
        self.view_mut().into_field(name)
    }

    /// Returns a mutable view of the field at `path`. See
    /// [`Bound::get_path()`].
    pub fn get_path_mut(&mut self, path: &str) -> Result<Field<ViewRepr<&mut A>>> {
        self.view_mut().into_path(path)
    }

    /// Sets every element of field `name` to `value`.
    ///
    /// For a nested or repeated field, this sets every element of every
    /// field within it.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownField`] if there is no such field. Nothing is written.
    pub fn set(&mut self, name: &str, value: A) -> Result<()> where A: Clone {
        target(self.view_mut(), name)?.fill(value);
        Ok(())
    }

    /// Sets every element of the field at `path` to `value`. See
    /// [`Bound::get_path()`] and [`Bound::set()`].
    pub fn set_path(&mut self, path: &str, value: A) -> Result<()> where A: Clone {
        let (parent, name) = descend(self.view_mut(), path)?;
        target(parent, name)?.fill(value);
        Ok(())
    }

    /// Copies `value` into field `name`, broadcasting it to the shape that
    /// [`Bound::get()`] would return.
    ///
    /// For a nested or repeated field, the shape is that of the contiguous
    /// block of positions it occupies.
    ///
    /// ```
    /// use fieldview::{Schema, fields, ndarray::{arr1, arr2}};
    /// let s = Schema::new(fields![t, w[2]]).unwrap();
    /// let mut b = s.allocate::<i32>(&[3]).unwrap();
    /// b.assign("w", &arr1(&[7, 8, 9])).unwrap();
    /// assert_eq!(b.buffer(), &arr2(&[[0, 0, 0], [7, 8, 9], [7, 8, 9]]).into_dyn());
    /// ```
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownField`] if there is no such field. Nothing is
    ///   written.
    /// - [`Error::Broadcast`] if `value` cannot be broadcast to the shape of
    ///   the field. Nothing is written.
    pub fn assign<S2, D>(&mut self, name: &str, value: &ArrayBase<S2, D>) -> Result<()> where
        A: Clone,
        S2: Data<Elem=A>,
        D: Dimension,
    {
        assign_to(target(self.view_mut(), name)?, value)
    }

    /// Copies `value` into the field at `path`. See [`Bound::get_path()`]
    /// and [`Bound::assign()`].
    pub fn assign_path<S2, D>(&mut self, path: &str, value: &ArrayBase<S2, D>) -> Result<()> where
        A: Clone,
        S2: Data<Elem=A>,
        D: Dimension,
    {
        let (parent, name) = descend(self.view_mut(), path)?;
        assign_to(target(parent, name)?, value)
    }
}

impl<'a, A> Bound<ViewRepr<&'a A>> {
    /// Returns a view of field `name` that lives as long as the array.
    /// See [`Bound::get()`].
    pub fn into_field(self, name: &str) -> Result<Field<ViewRepr<&'a A>>> {
        field(self, name)
    }

    /// Returns a view of the field at `path` that lives as long as the array.
    /// See [`Bound::get_path()`].
    pub fn into_path(self, path: &str) -> Result<Field<ViewRepr<&'a A>>> {
        let (parent, name) = descend(self, path)?;
        field(parent, name)
    }
}

impl<'a, A> Bound<ViewRepr<&'a mut A>> {
    /// Returns a mutable view of field `name` that lives as long as the
    /// array. See [`Bound::get()`].
    pub fn into_field(self, name: &str) -> Result<Field<ViewRepr<&'a mut A>>> {
        field(self, name)
    }

    /// Returns a mutable view of the field at `path` that lives as long as
    /// the array. See [`Bound::get_path()`].
    pub fn into_path(self, path: &str) -> Result<Field<ViewRepr<&'a mut A>>> {
        let (parent, name) = descend(self, path)?;
        field(parent, name)
    }
}

impl<'a, A> Clone for Bound<ViewRepr<&'a A>> {
    fn clone(&self) -> Self {
        Bound {buffer: self.buffer.clone(), schema: self.schema.clone()}
    }
}

impl<A: Debug, S: Data<Elem=A>> Debug for Bound<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Bound")
            .field("schema", &self.schema)
            .field("buffer", &self.buffer)
            .finish()
    }
}

// ----------------------------------------------------------------------------

impl Schema {
    /// Pairs `buffer` with `self`. Equivalent to [`Bound::new()`].
    pub fn bind<S: RawData, D: Dimension>(&self, buffer: ArrayBase<S, D>) -> Result<Bound<S>> {
        Bound::new(buffer, self)
    }

    /// Allocates an array for `self`. Equivalent to [`Bound::allocate()`].
    pub fn allocate<A: Clone + Default>(&self, dims: &[usize]) -> Result<BoundArray<A>> {
        Bound::allocate(self, dims)
    }
}

// ----------------------------------------------------------------------------

/// The part of an array occupied by one field, as returned by
/// [`Bound::get()`].
pub enum Field<S: RawData> {
    /// A plain field of a 1-dimensional array. The view has no axes.
    Scalar(ArrayBase<S, IxDyn>),

    /// A plain field of an array with more than one axis, or any sized field.
    ///
    /// For a plain field the schema axis is removed. For a sized field it is
    /// replaced, in place, by the axes of the declared shape.
    Array(ArrayBase<S, IxDyn>),

    /// A nested field.
    Nested(Bound<S>),

    /// A repeated field. The array has the declared shape. Each element
    /// views its own disjoint part of the underlying array.
    Repeated(ArrayD<Bound<S>>),
}

/// A [`Field`] that borrows its array.
pub type FieldView<'a, A> = Field<ViewRepr<&'a A>>;

/// A [`Field`] that mutably borrows its array.
pub type FieldViewMut<'a, A> = Field<ViewRepr<&'a mut A>>;

impl<S: RawData> Field<S> {
    /// Returns the view of a scalar or array field.
    pub fn into_array(self) -> Option<ArrayBase<S, IxDyn>> {
        match self {
            Field::Scalar(a) | Field::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the view of a nested field.
    pub fn into_bound(self) -> Option<Bound<S>> {
        match self {
            Field::Nested(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the views of a repeated field.
    pub fn into_repeated(self) -> Option<ArrayD<Bound<S>>> {
        match self {
            Field::Repeated(bs) => Some(bs),
            _ => None,
        }
    }
}

impl<A, S: Data<Elem=A>> Field<S> {
    /// Returns the value of a scalar field.
    pub fn scalar(&self) -> Option<&A> {
        match self {
            Field::Scalar(a) => a.first(),
            _ => None,
        }
    }
}

impl<A, S: DataMut<Elem=A>> Field<S> {
    /// Returns the value of a scalar field.
    pub fn scalar_mut(&mut self) -> Option<&mut A> {
        match self {
            Field::Scalar(a) => a.first_mut(),
            _ => None,
        }
    }
}

impl<'a, A> Field<ViewRepr<&'a A>> {
    /// Returns the value of a scalar field, borrowed for as long as the
    /// array.
    pub fn into_scalar(self) -> Option<&'a A> {
        match self {
            Field::Scalar(a) => Some(a.into_dimensionality::<Ix0>().ok()?.into_scalar()),
            _ => None,
        }
    }
}

impl<'a, A> Field<ViewRepr<&'a mut A>> {
    /// Returns the value of a scalar field, borrowed for as long as the
    /// array.
    pub fn into_scalar(self) -> Option<&'a mut A> {
        match self {
            Field::Scalar(a) => Some(a.into_dimensionality::<Ix0>().ok()?.into_scalar()),
            _ => None,
        }
    }
}

impl<A: Debug, S: Data<Elem=A>> Debug for Field<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Scalar(a) => f.debug_tuple("Scalar").field(a).finish(),
            Field::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Field::Nested(b) => f.debug_tuple("Nested").field(b).finish(),
            Field::Repeated(bs) => f.debug_tuple("Repeated").field(bs).finish(),
        }
    }
}

// ----------------------------------------------------------------------------

/// Returns the positions of field `name` along the schema axis, and what the
/// field holds.
fn region<'s, S: RawData>(
    buffer: ArrayBase<S, IxDyn>,
    schema: &'s Schema,
    name: &str,
) -> Result<(ArrayBase<S, IxDyn>, &'s Kind)> {
    let (start, kind) = schema.locate(name)?;
    let axis = Axis(schema.axis());
    Ok((slab::narrow(buffer, axis, start..start + kind.width()), kind))
}

/// Views field `name` of `bound`.
fn field<S: Slab>(bound: Bound<S>, name: &str) -> Result<Field<S>> {
    let Bound {buffer, schema} = bound;
    let axis = Axis(schema.axis());
    let (block, kind) = region(buffer, &schema, name)?;
    Ok(match kind {
        Kind::Plain => {
            let a = block.index_axis_move(axis, 0);
            if a.ndim() == 0 { Field::Scalar(a) } else { Field::Array(a) }
        },
        Kind::Sized(shape) => Field::Array(slab::unflatten(block, axis, shape)),
        Kind::Nested(inner) => {
            Field::Nested(Bound {buffer: block, schema: inner.placed(axis.index(), 0)})
        },
        Kind::Repeated(inner, shape) => {
            let inner = inner.placed(axis.index(), 0);
            let parts = slab::chunks(block, axis, inner.len(), shape::length(shape));
            let bounds = parts.into_iter().map(|buffer| Bound {buffer, schema: inner.clone()}).collect();
            match ArrayD::from_shape_vec(IxDyn(shape), bounds) {
                Ok(bounds) => Field::Repeated(bounds),
                Err(_) => panic!("One part per element of {:?}", shape),
            }
        },
    })
}

/// Views the elements of field `name` of `bound` as a single array.
fn target<S: Slab>(bound: Bound<S>, name: &str) -> Result<ArrayBase<S, IxDyn>> {
    let Bound {buffer, schema} = bound;
    let axis = Axis(schema.axis());
    let (block, kind) = region(buffer, &schema, name)?;
    Ok(match kind {
        Kind::Plain => block.index_axis_move(axis, 0),
        Kind::Sized(shape) => slab::unflatten(block, axis, shape),
        Kind::Nested(_) | Kind::Repeated(..) => block,
    })
}

/// Follows all but the last name in `path`. Returns the nested field and the
/// last name.
fn descend<'p, S: Slab>(bound: Bound<S>, path: &'p str) -> Result<(Bound<S>, &'p str)> {
    let mut names = path.split('.');
    let mut bound = bound;
    let mut name = names.next().unwrap_or(path);
    for next in names {
        bound = match field(bound, name)? {
            Field::Nested(inner) => inner,
            _ => return Err(Error::NotNested(name.to_owned())),
        };
        name = next;
    }
    Ok((bound, name))
}

fn assign_to<A, S, D>(mut target: ArrayBase<ViewRepr<&mut A>, IxDyn>, value: &ArrayBase<S, D>) -> Result<()> where
    A: Clone,
    S: Data<Elem=A>,
    D: Dimension,
{
    let value = value.broadcast(target.raw_dim()).ok_or_else(|| Error::Broadcast {
        from: value.shape().to_vec(),
        to: target.shape().to_vec(),
    })?;
    target.assign(&value);
    Ok(())
}

// ----------------------------------------------------------------------------
