use serde::{Serialize, Deserialize};

use super::{Schema};

/// Declares one field of a [`Schema`].
///
/// Fields are laid out in the order they are declared. A field occupies a
/// width along the schema axis that depends on its kind:
///
/// | Kind       | Width                            | Resolves to                |
/// |------------|----------------------------------|----------------------------|
/// | `Plain`    | 1                                | one offset                 |
/// | `Sized`    | `product(shape)`                 | an array of offsets        |
/// | `Nested`   | `schema.len()`                   | a [`Schema`]               |
/// | `Repeated` | `product(shape) * schema.len()`  | an array of [`Schema`]s    |
///
/// In configuration files a `FieldSpec` is tagged by `"kind"`:
///
/// ```
/// use fieldview::{FieldSpec};
/// let f: FieldSpec = serde_json::from_str(r#"{"kind": "sized", "name": "w", "shape": [2, 3]}"#).unwrap();
/// assert_eq!(f, FieldSpec::sized("w", [2, 3]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSpec {
    Plain { name: String },
    Sized { name: String, shape: Vec<usize> },
    Nested { name: String, schema: Schema },
    Repeated { name: String, schema: Schema, shape: Vec<usize> },
}

impl FieldSpec {
    /// A field of width 1.
    pub fn plain(name: impl Into<String>) -> Self {
        Self::Plain {name: name.into()}
    }

    /// A field holding an array of shape `shape`.
    pub fn sized(name: impl Into<String>, shape: impl Into<Vec<usize>>) -> Self {
        Self::Sized {name: name.into(), shape: shape.into()}
    }

    /// A field holding the fields of `schema`.
    pub fn nested(name: impl Into<String>, schema: &Schema) -> Self {
        Self::Nested {name: name.into(), schema: schema.clone()}
    }

    /// A field holding an array of shape `shape`, each element of which
    /// holds the fields of `schema`.
    pub fn repeated(name: impl Into<String>, schema: &Schema, shape: impl Into<Vec<usize>>) -> Self {
        Self::Repeated {name: name.into(), schema: schema.clone(), shape: shape.into()}
    }

    /// The name of the field.
    pub fn name(&self) -> &str {
        match self {
            Self::Plain {name} => name,
            Self::Sized {name, ..} => name,
            Self::Nested {name, ..} => name,
            Self::Repeated {name, ..} => name,
        }
    }
}

impl From<&str> for FieldSpec {
    fn from(name: &str) -> Self { Self::plain(name) }
}

impl From<String> for FieldSpec {
    fn from(name: String) -> Self { Self::plain(name) }
}

// ----------------------------------------------------------------------------

/// Declare a list of [`FieldSpec`]s.
///
/// - `name` declares a `Plain` field.
/// - `name[d0, d1, ...]` declares a `Sized` field.
/// - `name => schema` declares a `Nested` field.
/// - `name[d0, d1, ...] => schema` declares a `Repeated` field.
///
/// Field names are identifiers. `schema` is any expression of type
/// [`Schema`] or `&Schema`.
///
/// ```
/// use fieldview::{FieldSpec, Schema, fields};
/// let xy = Schema::new(fields![x, y]).unwrap();
/// let all = fields![t, w[2, 3], origin => &xy, corners[4] => &xy];
/// assert_eq!(all, vec![
///     FieldSpec::plain("t"),
///     FieldSpec::sized("w", [2, 3]),
///     FieldSpec::nested("origin", &xy),
///     FieldSpec::repeated("corners", &xy, [4]),
/// ]);
/// ```
///
/// [`Schema`]: super::Schema
#[macro_export]
macro_rules! fields {
    (@acc [$($spec:expr),*]) => {
        vec![$($spec),*]
    };
    (@acc [$($spec:expr),*] $name:ident [$($dim:expr),* $(,)?] => $schema:expr $(, $($rest:tt)*)?) => {
        $crate::fields!(@acc [$($spec,)* $crate::FieldSpec::repeated(
            stringify!($name), ::std::borrow::Borrow::<$crate::Schema>::borrow(&$schema), [$($dim),*],
        )] $($($rest)*)?)
    };
    (@acc [$($spec:expr),*] $name:ident [$($dim:expr),* $(,)?] $(, $($rest:tt)*)?) => {
        $crate::fields!(@acc [$($spec,)* $crate::FieldSpec::sized(
            stringify!($name), [$($dim),*],
        )] $($($rest)*)?)
    };
    (@acc [$($spec:expr),*] $name:ident => $schema:expr $(, $($rest:tt)*)?) => {
        $crate::fields!(@acc [$($spec,)* $crate::FieldSpec::nested(
            stringify!($name), ::std::borrow::Borrow::<$crate::Schema>::borrow(&$schema),
        )] $($($rest)*)?)
    };
    (@acc [$($spec:expr),*] $name:ident $(, $($rest:tt)*)?) => {
        $crate::fields!(@acc [$($spec,)* $crate::FieldSpec::plain(stringify!($name))] $($($rest)*)?)
    };
    ($($body:tt)*) => {
        $crate::fields!(@acc [] $($body)*)
    };
}

// ----------------------------------------------------------------------------
