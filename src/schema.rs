//! Named fields laid out consecutively along one axis.

use std::ops::{Range};
use std::sync::{Arc};

use indexmap::{IndexMap};
use indexmap::map::{Entry};
use ndarray::{ArrayD, Dimension, IxDyn};
use serde::{Serialize, Deserialize};

use super::{shape, Error, Result, FieldSpec};

/// What a field holds, once its position is known.
///
/// Nested schemas always follow the axis of the enclosing schema, so they
/// compare equal by their fields alone.
#[derive(Debug, Clone)]
pub(crate) enum Kind {
    Plain,
    Sized(Vec<usize>),
    Nested(Schema),
    Repeated(Schema, Vec<usize>),
}

impl Kind {
    /// The number of positions the field occupies along the axis, or `None`
    /// if that is more than an array can have.
    fn checked_width(&self) -> Option<usize> {
        match self {
            Kind::Plain => Some(1),
            Kind::Sized(shape) => shape::checked_length(shape),
            Kind::Nested(inner) => Some(inner.len()),
            Kind::Repeated(inner, shape) => {
                shape::checked_length(&[shape::checked_length(shape)?, inner.len()])
            },
        }
    }

    /// The number of positions the field occupies along the axis. Only
    /// meaningful for fields of a built [`Schema`], whose widths are checked.
    pub fn width(&self) -> usize {
        match self {
            Kind::Plain => 1,
            Kind::Sized(shape) => shape::length(shape),
            Kind::Nested(inner) => inner.len(),
            Kind::Repeated(inner, shape) => shape::length(shape) * inner.len(),
        }
    }

    /// The declared shape of the field.
    pub fn shape(&self) -> &[usize] {
        match self {
            Kind::Plain | Kind::Nested(_) => &[1],
            Kind::Sized(shape) | Kind::Repeated(_, shape) => shape,
        }
    }
}

impl PartialEq for Kind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Kind::Plain, Kind::Plain) => true,
            (Kind::Sized(s), Kind::Sized(t)) => s == t,
            (Kind::Nested(a), Kind::Nested(b)) => a.same_fields(b),
            (Kind::Repeated(a, s), Kind::Repeated(b, t)) => s == t && a.same_fields(b),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    /// Relative to the start of the schema.
    start: usize,
    kind: Kind,
}

/// The part of a [`Schema`] that does not change when it is moved.
#[derive(Debug, PartialEq)]
struct Table {
    slots: IndexMap<String, Slot>,
    length: usize,
}

// ----------------------------------------------------------------------------

/// An immutable description of named fields laid out consecutively along one
/// axis of an array.
///
/// A `Schema` is built once from a list of [`FieldSpec`]s. Each field gets
/// the positions immediately after those of the previous field, so the
/// fields exactly tile the range `intercept() .. intercept() + len()`. All
/// offsets are 0-based.
///
/// ```
/// use fieldview::{Schema, Offset, fields};
/// let xy = Schema::new(fields![x, y]).unwrap();
/// let s = Schema::new(fields![t, w[2, 2], p => &xy]).unwrap();
/// assert_eq!(s.len(), 1 + 4 + 2);
/// assert_eq!(s.resolve("t").unwrap(), Offset::Scalar(0));
/// assert_eq!(s.span_of("w").unwrap(), 1..5);
/// match s.resolve("p").unwrap() {
///     Offset::Nested(p) => assert_eq!(p.resolve("y").unwrap(), Offset::Scalar(6)),
///     _ => unreachable!(),
/// }
/// ```
///
/// Cloning a `Schema` is cheap: the field table is shared.
///
/// Two `Schema`s compare equal if they have the same axis and the same
/// fields, whatever their intercepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Declaration", into = "Declaration")]
pub struct Schema {
    table: Arc<Table>,
    axis: usize,
    intercept: usize,
}

impl Schema {
    /// Lays out `fields` along axis 0.
    pub fn new<F: Into<FieldSpec>>(fields: impl IntoIterator<Item=F>) -> Result<Self> {
        Self::along(0, fields)
    }

    /// Lays out `fields` along axis `axis`.
    ///
    /// Nested schemas are laid out along `axis` too, whatever axis they were
    /// built with.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateField`] if two fields have the same name.
    /// - [`Error::NoFields`] if `fields` is empty.
    /// - [`Error::TooLarge`] if a field, or the schema as a whole, would span
    ///   more than `isize::MAX` positions.
    pub fn along<F: Into<FieldSpec>>(axis: usize, fields: impl IntoIterator<Item=F>) -> Result<Self> {
        let mut slots = IndexMap::new();
        let mut cursor: usize = 0;
        for field in fields {
            let (name, kind) = match field.into() {
                FieldSpec::Plain {name} => (name, Kind::Plain),
                FieldSpec::Sized {name, shape} => (name, Kind::Sized(shape)),
                FieldSpec::Nested {name, schema} => (name, Kind::Nested(schema.placed(axis, 0))),
                FieldSpec::Repeated {name, schema, shape} => (name, Kind::Repeated(schema.placed(axis, 0), shape)),
            };
            let end = kind.checked_width()
                .and_then(|width| cursor.checked_add(width))
                .filter(|&end| end <= isize::MAX as usize)
                .ok_or_else(|| Error::TooLarge(name.clone()))?;
            match slots.entry(name) {
                Entry::Occupied(e) => return Err(Error::DuplicateField(e.key().clone())),
                Entry::Vacant(e) => { e.insert(Slot {start: cursor, kind}); },
            }
            cursor = end;
        }
        if slots.is_empty() { return Err(Error::NoFields); }
        log::debug!("Laid out {} fields over {} positions along axis {}", slots.len(), cursor, axis);
        Ok(Self {table: Arc::new(Table {slots, length: cursor}), axis, intercept: 0})
    }

    /// Lays out fields from parallel lists of names and sizes. A size of
    /// `[1]` declares a plain field; any other size declares a sized field.
    ///
    /// ```
    /// use fieldview::{Schema, Offset};
    /// let s = Schema::from_sizes(0, &["a", "b"], &[&[1][..], &[3][..]]).unwrap();
    /// assert_eq!(s.len(), 4);
    /// assert_eq!(s.resolve("a").unwrap(), Offset::Scalar(0));
    /// assert_eq!(s.size_of("b").unwrap(), [3]);
    /// ```
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if `names` and `sizes` differ in length.
    /// - Any error of [`Schema::along()`].
    pub fn from_sizes<N: AsRef<str>, Z: AsRef<[usize]>>(
        axis: usize,
        names: &[N],
        sizes: &[Z],
    ) -> Result<Self> {
        if names.len() != sizes.len() {
            return Err(Error::ShapeMismatch {names: names.len(), sizes: sizes.len()});
        }
        Self::along(axis, names.iter().zip(sizes).map(|(name, size)| {
            match size.as_ref() {
                [1] => FieldSpec::plain(name.as_ref()),
                size => FieldSpec::sized(name.as_ref(), size),
            }
        }))
    }

    /// Lays out plain fields called `names` along axis `axis`.
    pub fn from_names<N: AsRef<str>>(axis: usize, names: &[N]) -> Result<Self> {
        Self::along(axis, names.iter().map(|name| FieldSpec::plain(name.as_ref())))
    }

    /// The total number of positions occupied by the fields.
    pub fn len(&self) -> usize { self.table.length }

    /// Returns `true` if the fields occupy no positions at all.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// The axis along which the fields are laid out.
    pub fn axis(&self) -> usize { self.axis }

    /// The position of the first field.
    pub fn intercept(&self) -> usize { self.intercept }

    /// The field names, in layout order.
    pub fn names(&self) -> impl Iterator<Item=&str> + '_ {
        self.table.slots.keys().map(String::as_str)
    }

    /// Returns `true` if there is a field called `name`.
    pub fn contains(&self, name: &str) -> bool { self.table.slots.contains_key(name) }

    /// The declared shape of field `name`; `[1]` for plain and nested fields.
    pub fn size_of(&self, name: &str) -> Result<&[usize]> {
        Ok(self.slot(name)?.kind.shape())
    }

    /// The positions occupied by field `name`, including the intercept.
    pub fn span_of(&self, name: &str) -> Result<Range<usize>> {
        let (start, kind) = self.locate(name)?;
        Ok(start..start + kind.width())
    }

    /// Returns the same fields, starting at position `intercept`.
    pub fn rebase(&self, intercept: usize) -> Self { self.placed(self.axis, intercept) }

    /// Returns the same fields, laid out along axis `axis`.
    pub fn with_axis(&self, axis: usize) -> Self { self.placed(axis, self.intercept) }

    /// Returns the absolute offsets of field `name`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownField`] if there is no such field.
    pub fn resolve(&self, name: &str) -> Result<Offset> {
        let (start, kind) = self.locate(name)?;
        log::trace!("Resolved field {:?} at {}", name, start);
        Ok(match kind {
            Kind::Plain => Offset::Scalar(start),
            Kind::Sized(shape) => Offset::Array(ArrayD::from_shape_fn(
                IxDyn(shape),
                |index| start + shape::ravel(index.slice(), shape),
            )),
            Kind::Nested(inner) => Offset::Nested(inner.placed(self.axis, start)),
            Kind::Repeated(inner, shape) => Offset::Repeated(ArrayD::from_shape_fn(
                IxDyn(shape),
                |index| inner.placed(self.axis, start + shape::ravel(index.slice(), shape) * inner.len()),
            )),
        })
    }

    /// The [`FieldSpec`]s from which `self` could be rebuilt.
    pub fn fields(&self) -> Vec<FieldSpec> {
        self.table.slots.iter().map(|(name, slot)| match &slot.kind {
            Kind::Plain => FieldSpec::plain(name.as_str()),
            Kind::Sized(shape) => FieldSpec::sized(name.as_str(), shape.clone()),
            Kind::Nested(inner) => FieldSpec::nested(name.as_str(), &inner.placed(self.axis, 0)),
            Kind::Repeated(inner, shape) => {
                FieldSpec::repeated(name.as_str(), &inner.placed(self.axis, 0), shape.clone())
            },
        }).collect()
    }

    /// Returns the same fields along `axis` starting at `intercept`.
    pub(crate) fn placed(&self, axis: usize, intercept: usize) -> Self {
        Self {table: Arc::clone(&self.table), axis, intercept}
    }

    /// Returns the absolute start of field `name`, and what it holds.
    ///
    /// Nested schemas in the returned [`Kind`] are relative: use
    /// [`Schema::placed()`] to position them.
    pub(crate) fn locate(&self, name: &str) -> Result<(usize, &Kind)> {
        let slot = self.slot(name)?;
        Ok((self.intercept + slot.start, &slot.kind))
    }

    /// Returns `true` if `self` and `other` have the same fields, whatever
    /// their axes.
    fn same_fields(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.table, &other.table) || self.table == other.table
    }

    fn slot(&self, name: &str) -> Result<&Slot> {
        self.table.slots.get(name).ok_or_else(|| Error::UnknownField(name.to_owned()))
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.axis == other.axis && self.same_fields(other)
    }
}

// ----------------------------------------------------------------------------

/// How a [`Schema`] appears in configuration files.
#[derive(Serialize, Deserialize)]
struct Declaration {
    #[serde(default)]
    axis: usize,
    fields: Vec<FieldSpec>,
}

impl TryFrom<Declaration> for Schema {
    type Error = Error;
    fn try_from(d: Declaration) -> Result<Self> { Self::along(d.axis, d.fields) }
}

impl From<Schema> for Declaration {
    fn from(s: Schema) -> Self { Declaration {axis: s.axis, fields: s.fields()} }
}

// ----------------------------------------------------------------------------

/// The absolute offsets of a field, as returned by [`Schema::resolve()`].
#[derive(Debug, Clone, PartialEq)]
pub enum Offset {
    /// A plain field.
    Scalar(usize),

    /// A sized field. The array has the declared shape.
    Array(ArrayD<usize>),

    /// A nested field, re-based to the field's first position.
    Nested(Schema),

    /// A repeated field. The array has the declared shape, and each copy
    /// is re-based to its own first position.
    Repeated(ArrayD<Schema>),
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use ndarray::{arr1, arr2};
    use proptest::prelude::*;

    use super::*;
    use crate::{fields};

    fn xyz() -> Schema { Schema::new(fields![x, y, z]).unwrap() }

    #[test]
    fn flat() {
        let s = Schema::new(["a", "b"]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.axis(), 0);
        assert_eq!(s.intercept(), 0);
        assert_eq!(s.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(s.resolve("a").unwrap(), Offset::Scalar(0));
        assert_eq!(s.resolve("b").unwrap(), Offset::Scalar(1));
        assert_eq!(s.size_of("a").unwrap(), [1]);
        assert_eq!(Schema::from_names(0, &["a", "b"]).unwrap(), s);
        assert_eq!(Schema::from_names(2, &["a", "b"]).unwrap().axis(), 2);
    }

    #[test]
    fn sized() {
        let s = Schema::along(1, fields![a, m[2, 3], b]).unwrap();
        assert_eq!(s.len(), 8);
        assert_eq!(s.axis(), 1);
        assert_eq!(s.size_of("m").unwrap(), [2, 3]);
        assert_eq!(s.span_of("m").unwrap(), 1..7);
        assert_eq!(
            s.resolve("m").unwrap(),
            Offset::Array(arr2(&[[1, 2, 3], [4, 5, 6]]).into_dyn()),
        );
        assert_eq!(s.resolve("b").unwrap(), Offset::Scalar(7));
    }

    #[test]
    fn nested() {
        let inner = xyz();
        let s = Schema::new(fields![a, b => &inner]).unwrap();
        assert_eq!(s.len(), 4);
        assert_eq!(s.size_of("b").unwrap(), [1]);
        let b = match s.resolve("b").unwrap() {
            Offset::Nested(b) => b,
            other => panic!("{:?}", other),
        };
        assert_eq!(b.intercept(), 1);
        assert_eq!(b, inner);
        assert_eq!(b.resolve("x").unwrap(), Offset::Scalar(1));
        assert_eq!(b.resolve("z").unwrap(), Offset::Scalar(3));
        assert_eq!(b.span_of("y").unwrap(), 2..3);
    }

    #[test]
    fn repeated() {
        let inner = xyz();
        let s = Schema::new(fields![a, ps[2, 2] => &inner, b]).unwrap();
        assert_eq!(s.len(), 1 + 4 * 3 + 1);
        assert_eq!(s.span_of("ps").unwrap(), 1..13);
        let ps = match s.resolve("ps").unwrap() {
            Offset::Repeated(ps) => ps,
            other => panic!("{:?}", other),
        };
        assert_eq!(ps.shape(), [2, 2]);
        let intercepts: Vec<usize> = ps.iter().map(Schema::intercept).collect();
        assert_eq!(intercepts, [1, 4, 7, 10]);
        assert_eq!(ps[[1, 0]].resolve("y").unwrap(), Offset::Scalar(8));
        assert_eq!(s.resolve("b").unwrap(), Offset::Scalar(13));
    }

    #[test]
    fn deeply_nested() {
        let inner = xyz();
        let middle = Schema::new(fields![m, q => &inner]).unwrap();
        let outer = Schema::new(fields![o, r[2] => &middle]).unwrap();
        assert_eq!(outer.len(), 1 + 2 * 4);
        let r = match outer.resolve("r").unwrap() {
            Offset::Repeated(r) => r,
            other => panic!("{:?}", other),
        };
        let q = match r[[1]].resolve("q").unwrap() {
            Offset::Nested(q) => q,
            other => panic!("{:?}", other),
        };
        assert_eq!(q.resolve("z").unwrap(), Offset::Scalar(8));
    }

    #[test]
    fn nested_axis_follows_parent() {
        let inner = Schema::along(2, fields![x, y]).unwrap();
        let s = Schema::along(1, fields![p => &inner]).unwrap();
        match s.resolve("p").unwrap() {
            Offset::Nested(p) => assert_eq!(p.axis(), 1),
            other => panic!("{:?}", other),
        }
        match s.with_axis(3).resolve("p").unwrap() {
            Offset::Nested(p) => assert_eq!(p.axis(), 3),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn rebase() {
        let s = Schema::new(fields![a, v[3]]).unwrap();
        let t = s.rebase(10);
        assert_eq!(s.intercept(), 0);
        assert_eq!(t.intercept(), 10);
        assert_eq!(t, s);
        assert_eq!(t.resolve("a").unwrap(), Offset::Scalar(10));
        assert_eq!(t.resolve("v").unwrap(), Offset::Array(arr1(&[11, 12, 13]).into_dyn()));
        assert_eq!(t.rebase(0).resolve("a").unwrap(), Offset::Scalar(0));
    }

    #[test]
    fn errors() {
        assert!(matches!(
            Schema::new(["a", "b", "a"]),
            Err(Error::DuplicateField(name)) if name == "a",
        ));
        assert!(matches!(Schema::new(Vec::<FieldSpec>::new()), Err(Error::NoFields)));
        assert!(matches!(
            Schema::from_sizes(0, &["a", "b"], &[[1usize]]),
            Err(Error::ShapeMismatch {names: 2, sizes: 1}),
        ));
        let s = xyz();
        assert!(matches!(s.resolve("w"), Err(Error::UnknownField(name)) if name == "w"));
        assert!(matches!(s.size_of("w"), Err(Error::UnknownField(_))));
        assert!(matches!(s.span_of("w"), Err(Error::UnknownField(_))));
        assert!(!s.contains("w"));
        assert!(s.contains("x"));
    }

    #[test]
    fn too_large() {
        let json = r#"{"fields": [{"kind": "sized", "name": "w", "shape": [9223372036854775808, 2]}]}"#;
        let err = serde_json::from_str::<Schema>(json).unwrap_err();
        assert!(err.to_string().contains("Field is too large: w"));
        assert!(matches!(
            Schema::new(vec![FieldSpec::sized("w", [1usize << 63, 2])]),
            Err(Error::TooLarge(name)) if name == "w",
        ));
        assert!(matches!(
            Schema::new(fields![a, e[0, 1usize << 62, 4]]),
            Err(Error::TooLarge(name)) if name == "e",
        ));
        let big = Schema::new(fields![w[1usize << 40]]).unwrap();
        assert!(matches!(
            Schema::new(fields![a, r[1usize << 30] => big]),
            Err(Error::TooLarge(name)) if name == "r",
        ));
        let half = Schema::new(fields![w[1usize << 62]]).unwrap();
        assert!(matches!(
            Schema::new(fields![a => half, b => half]),
            Err(Error::TooLarge(name)) if name == "b",
        ));
    }

    #[test]
    fn with_axis_moves_nested_fields() {
        let xy = Schema::new(fields![x, y]).unwrap();
        let along_0 = Schema::new(fields![t, p => &xy, q[2] => &xy]).unwrap();
        let along_1 = Schema::along(1, fields![t, p => &xy, q[2] => &xy]).unwrap();
        let moved = along_1.with_axis(0);
        assert_eq!(moved, along_0);
        assert_ne!(moved, along_1);
        assert_eq!(along_0.with_axis(1), along_1);
        let json = serde_json::to_value(&moved).unwrap();
        assert_eq!(json["axis"], 0);
        assert_eq!(json["fields"][1]["schema"]["axis"], 0);
        assert_eq!(json["fields"][2]["schema"]["axis"], 0);
        let back: Schema = serde_json::from_value(json).unwrap();
        assert_eq!(back, moved);
        assert_eq!(moved.fields(), along_0.fields());
    }

    #[test]
    fn zero_width() {
        let s = Schema::new(fields![a, e[0], b]).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.span_of("e").unwrap(), 1..1);
        assert_eq!(s.resolve("b").unwrap(), Offset::Scalar(1));
    }

    #[test]
    fn declaration() {
        let json = r#"{
            "axis": 1,
            "fields": [
                {"kind": "plain", "name": "t"},
                {"kind": "repeated", "name": "p", "shape": [2], "schema": {
                    "fields": [{"kind": "plain", "name": "x"}, {"kind": "plain", "name": "y"}]
                }}
            ]
        }"#;
        let s: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(s.axis(), 1);
        assert_eq!(s.len(), 5);
        let xy = Schema::new(fields![x, y]).unwrap();
        assert_eq!(s, Schema::along(1, fields![t, p[2] => xy]).unwrap());
        let again: Schema = serde_json::from_str(&serde_json::to_string(&s).unwrap()).unwrap();
        assert_eq!(again, s);
    }

    #[test]
    fn declaration_is_validated() {
        let json = r#"{"fields": [{"kind": "plain", "name": "a"}, {"kind": "plain", "name": "a"}]}"#;
        let err = serde_json::from_str::<Schema>(json).unwrap_err();
        assert!(err.to_string().contains("Duplicate field name: a"));
    }

    // ------------------------------------------------------------------------

    fn arb_fields() -> impl Strategy<Value=Vec<FieldSpec>> {
        let inner = xyz();
        let shape = prop::collection::vec(0usize..4, 0..3);
        let field = (0..4u8, shape).prop_map(move |(k, shape)| match k {
            0 => FieldSpec::plain(""),
            1 => FieldSpec::sized("", shape),
            2 => FieldSpec::nested("", &inner),
            _ => FieldSpec::repeated("", &inner, shape),
        });
        prop::collection::vec(field, 1..8).prop_map(|fields| {
            fields.into_iter().enumerate().map(|(i, f)| {
                let name = format!("f{}", i);
                match f {
                    FieldSpec::Plain {..} => FieldSpec::plain(name),
                    FieldSpec::Sized {shape, ..} => FieldSpec::sized(name, shape),
                    FieldSpec::Nested {schema, ..} => FieldSpec::nested(name, &schema),
                    FieldSpec::Repeated {schema, shape, ..} => FieldSpec::repeated(name, &schema, shape),
                }
            }).collect()
        })
    }

    fn expected_width(f: &FieldSpec) -> usize {
        match f {
            FieldSpec::Plain {..} => 1,
            FieldSpec::Sized {shape, ..} => shape.iter().product(),
            FieldSpec::Nested {schema, ..} => schema.len(),
            FieldSpec::Repeated {schema, shape, ..} => shape.iter().product::<usize>() * schema.len(),
        }
    }

    proptest! {
        #[test]
        fn length_is_additive(fields in arb_fields()) {
            let s = Schema::new(fields.clone()).unwrap();
            prop_assert_eq!(s.len(), fields.iter().map(expected_width).sum::<usize>());
        }

        #[test]
        fn spans_tile_the_range(fields in arb_fields(), intercept in 0usize..100) {
            let s = Schema::new(fields).unwrap().rebase(intercept);
            let mut cursor = intercept;
            for name in s.names() {
                let span = s.span_of(name).unwrap();
                prop_assert_eq!(span.start, cursor);
                cursor = span.end;
            }
            prop_assert_eq!(cursor, intercept + s.len());
        }

        #[test]
        fn construction_is_idempotent(fields in arb_fields()) {
            let s = Schema::new(fields.clone()).unwrap();
            let t = Schema::new(fields).unwrap();
            prop_assert_eq!(s.names().collect::<Vec<_>>(), t.names().collect::<Vec<_>>());
            for name in s.names() {
                prop_assert_eq!(s.size_of(name).unwrap(), t.size_of(name).unwrap());
            }
            prop_assert_eq!(s.len(), t.len());
            prop_assert_eq!(&s, &t);
            prop_assert_eq!(s.fields(), t.fields());
        }
    }
}
