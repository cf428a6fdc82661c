use thiserror::Error;

use crate::ucs2::Ucs2Error;
use crate::value::JsonKind;

pub type Result<T, E = JsonError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("malformed json: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("document root must be an object or array, found {found:?}")]
    RootNotContainer { found: JsonKind },

    #[error("expected {expected:?}, found {found:?}")]
    TypeMismatch { expected: JsonKind, found: JsonKind },

    #[error("array index {index} out of bounds (len={len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("inserting the value would make the container contain itself")]
    Cycle,

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("non-ascii byte at offset {offset}")]
    NonAscii { offset: usize },

    #[error(transparent)]
    Ucs2(#[from] Ucs2Error),

    #[error("document nesting exceeds {limit} levels")]
    DepthLimit { limit: usize },

    #[error("json pointer not found: {0}")]
    PointerNotFound(String),

    #[error("invalid json pointer: {0}")]
    InvalidPointer(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
