//! Result type aliases for Redbin.

use crate::RedbinError;

/// A specialized `Result` type for Redbin operations.
pub type RedbinResult<T> = Result<T, RedbinError>;
