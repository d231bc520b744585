use thiserror::Error;

/// Errors returned by routing graph operations.
///
/// Every failure names the offending id in its message. Validation always
/// precedes mutation, so a returned error means no table was touched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Unknown id, malformed address data, out-of-range value, or a port
    /// config that already has a bound stream.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation would violate a graph invariant.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// A query named an object that does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}
