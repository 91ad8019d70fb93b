use std::fmt;

use serde::{Deserialize, Serialize};

/// Error taxonomy carried inside the SQL `#ERROR:<CODE>:<reason>` sentinel.
///
/// These are formula-authoring errors: they are embedded in the generated
/// SQL as data and surface per row at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Field reference invalid or missing.
    Ref,
    /// Value cannot be coerced to the required type.
    Type,
    /// Division or modulo by zero.
    Div0,
    /// Structurally invalid argument (e.g. an unresolvable date unit).
    Arg,
    /// Unknown function name.
    NotImpl,
    /// The dispatcher reached an unexpected syntax shape. Always a defect.
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;

        match self {
            Ref => "REF",
            Type => "TYPE",
            Div0 => "DIV0",
            Arg => "ARG",
            NotImpl => "NOT_IMPL",
            Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result type used by compilation entry points.
pub type FormulaResult<T> = Result<T, FormulaError>;

/// Host-level failures that abort a compilation outright.
///
/// Everything a formula author can cause is carried as data inside
/// [`SqlExpr`](crate::SqlExpr) instead; these variants are reserved for
/// conditions where no meaningful SQL can be produced at all.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// A formula field transitively references itself.
    CircularReference(String),
    /// The column resolver could not produce SQL for a field.
    ColumnResolution(String),
    /// An internal invariant was broken. Always a defect.
    Internal(String),
}

impl FormulaError {
    pub fn circular(field_id: &str) -> FormulaError {
        FormulaError::CircularReference(field_id.to_owned())
    }

    pub fn column(msg: &str) -> FormulaError {
        FormulaError::ColumnResolution(msg.to_owned())
    }

    pub fn internal(msg: &str) -> FormulaError {
        FormulaError::Internal(msg.to_owned())
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use FormulaError::*;

        match self {
            CircularReference(id) => write!(f, "dependency cycle through field '{}'", id),
            ColumnResolution(msg) => write!(f, "column resolution failed: {}", msg),
            Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for FormulaError {}
