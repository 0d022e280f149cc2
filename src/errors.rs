use thiserror::Error;

/// Error raised when a textual representation cannot be parsed back into a
/// value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not parse {kind}: {message}")]
pub struct ParseError {
    pub(crate) kind: &'static str,
    pub(crate) message: String,
}

impl ParseError {
    pub(crate) fn new(kind: &'static str, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

/// Errors raised by constructors and operations on temporal values.
///
/// Restrictions never raise for empty results (they return `None`), and
/// synchronization of values that do not overlap on time is likewise not an
/// error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Instants out of order, a single-instant sequence with an exclusive
    /// bound, a step sequence whose exclusive upper bound carries a new
    /// value, an empty instant array, and similar malformed shapes.
    #[error("invalid temporal shape: {0}")]
    ShapeViolation(String),

    /// The base types of two operands do not agree.
    #[error("operand type mismatch: {0}")]
    TypeMismatch(String),

    /// Spatial operands disagree on SRID, Z presence, or geodetic flag.
    #[error("SRID or dimension mismatch: {0}")]
    SridOrDimensionMismatch(String),

    /// Width or duration arguments that must be positive, bucket
    /// coordinates outside the representable range, degenerate spans.
    #[error("argument out of domain: {0}")]
    DomainError(String),

    /// A subtype conversion the input's shape does not allow.
    #[error("conversion not possible: {0}")]
    NotFound(String),

    /// An operation invoked for a base type that does not support it.
    #[error("operation not supported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
