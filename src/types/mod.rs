pub mod error;
pub mod field;
pub mod sql_expr;

pub use error::{ErrorCode, FormulaError, FormulaResult};
pub use field::{CellValueType, FieldDescriptor, FieldKind, Formatting, StorageKind};
pub use sql_expr::{ErrorParts, SqlExpr};
