//! A pure-Rust library for giving names to the positions along one axis of a
//! multi-dimensional array.
//!
//! A [`Schema`] is an ordered list of named fields laid out along one axis.
//! Each field occupies a contiguous run of positions along that axis: one
//! position for a plain field, `product(shape)` positions for a sized field
//! holding an array, and as many positions as a whole other `Schema` for a
//! nested field. A repeated field holds an array of nested schemas. Schemas
//! are immutable and cheap to clone, and are usually declared with the
//! [`fields!`] macro, or read from a configuration file using `serde`.
//!
//! [`Schema::resolve()`] converts a field name into positions along the axis
//! ([`Offset`]s). More often, you will want to [`Schema::bind()`] a schema to
//! an [`ndarray`] array, producing a [`Bound`]. Reading a field of a `Bound`
//! with [`Bound::get()`] returns a view of the part of the array that the
//! field occupies, and writing a field with [`Bound::set()`] or
//! [`Bound::assign()`] writes into that part of the array. Nothing is ever
//! copied; a `Bound` can own its array, or borrow it from elsewhere.
//!
//! ```
//! use fieldview::{Schema, fields, ndarray::{Array2, arr1}};
//!
//! let xy = Schema::new(fields![x, y]).unwrap();
//! let particle = Schema::new(fields![mass, pos => &xy, vel => &xy]).unwrap();
//! assert_eq!(particle.len(), 5);
//!
//! // One column per particle.
//! let mut state = Array2::<f64>::zeros((5, 3));
//! let mut b = particle.bind(state.view_mut()).unwrap();
//! b.set("mass", 1.0).unwrap();
//! b.assign_path("vel.x", &arr1(&[0.5, 0.0, -0.5])).unwrap();
//! assert_eq!(state.row(3), arr1(&[0.5, 0.0, -0.5]));
//! ```

mod error;
pub use error::{Error, Result};

mod shape;
mod slab;

mod field;
pub use field::{FieldSpec};

mod schema;
pub use schema::{Schema, Offset};

mod bound;
pub use bound::{Bound, BoundArray, BoundView, BoundViewMut, Field, FieldView, FieldViewMut};

pub use ndarray;
