//! CGATS error types.

use thiserror::Error;

/// Result type for CGATS operations.
pub type CgatsResult<T> = Result<T, CgatsError>;

/// Errors that can occur reading, writing or building CGATS tables.
#[derive(Debug, Error)]
pub enum CgatsError {
    /// Malformed input text.
    #[error("line {line}: {msg}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        msg: String,
    },

    /// The file contains no table.
    #[error("no table found")]
    NoTable,

    /// A field of that name already exists.
    #[error("duplicate field: {0}")]
    DuplicateField(String),

    /// Fields cannot be added once a table has data.
    #[error("cannot add field {0} to a table that already has data")]
    FieldAfterData(String),

    /// A data row has the wrong number of values.
    #[error("set has {actual} values, table has {expected} fields")]
    SetLength {
        /// Number of fields.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// A value does not match its field's type.
    #[error("value for field {0} has the wrong type")]
    TypeMismatch(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
