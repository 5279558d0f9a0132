/// Errors that can occur while building a [`Schema`] or using a [`Bound`]
/// view.
///
/// [`Schema`]: super::Schema
/// [`Bound`]: super::Bound
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Two fields share a name.
    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    /// A list of field names and a list of sizes disagree in length.
    #[error("{names} field names but {sizes} sizes")]
    ShapeMismatch { names: usize, sizes: usize },

    /// A schema must declare at least one field.
    #[error("A schema needs at least one field")]
    NoFields,

    /// The buffer's extent along the schema axis is not the schema length.
    #[error("Buffer has extent {found} along axis {axis}, but the schema spans {expected}")]
    SizeMismatch { axis: usize, expected: usize, found: usize },

    /// The schema axis does not exist in the buffer.
    #[error("Axis {axis} is out of bounds for {ndim} dimensions")]
    AxisOutOfBounds { axis: usize, ndim: usize },

    /// No field of this name.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// A path descends through a field that has no fields of its own.
    #[error("Field is not nested: {0}")]
    NotNested(String),

    /// A value cannot be broadcast over the slice of a field.
    #[error("Cannot broadcast shape {from:?} to {to:?}")]
    Broadcast { from: Vec<usize>, to: Vec<usize> },

    /// A field, or the schema as a whole, spans more positions than an
    /// array can have.
    #[error("Field is too large: {0}")]
    TooLarge(String),
}

/// Shorthand for results in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
