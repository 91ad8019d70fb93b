//! formula-sql compiles spreadsheet-style formula expressions into single
//! PostgreSQL expressions.
//!
//! The caller supplies a parsed syntax tree, a field catalog and a column
//! resolver; the compiler returns one SQL text expression that evaluates to
//! either the formula's value or a `#ERROR:<CODE>:<reason>` sentinel, never
//! a database-level exception for well-formed input. Spreadsheet coercion
//! rules (loose numeric casts, blank handling, array normalization) and a
//! formula function library are built in.
//!
//! ```
//! use formula_sql::{
//!     ColumnMap, CompilerConfig, ExprNode, FieldDescriptor, FieldKind, InputCheckValidation,
//!     TableSchema, Translator,
//! };
//!
//! let schema =
//!     TableSchema::new().with_field(FieldDescriptor::new("fld1", "Price", FieldKind::Number));
//! let columns = ColumnMap::new().with_column("fld1", "\"price\"");
//! let config = CompilerConfig::default();
//! let validation = InputCheckValidation;
//!
//! let translator = Translator::new(&schema, &columns, &config, &validation);
//! let node = ExprNode::call("ROUND", vec![ExprNode::field("fld1"), ExprNode::IntegerLit(1)]);
//! let sql = translator.render_sql(&node).unwrap();
//! assert!(sql.contains("round"));
//! ```

pub mod ast;
pub mod schema;
pub mod sql;
pub mod types;

pub use ast::{BinaryOp, ExprNode, UnaryOp};
pub use schema::{ColumnMap, TableSchema};
pub use sql::{
    render, ColumnResolver, CompilerConfig, FieldCatalog, FormulaReference, InputCheckValidation,
    PatternValidation, Translator, TypeValidation,
};
pub use types::{
    CellValueType, ErrorCode, FieldDescriptor, FieldKind, Formatting, FormulaError, FormulaResult,
    SqlExpr, StorageKind,
};

// Re-exports for a consistent serde surface in embedders.
pub use serde;
pub use serde_json;

#[cfg(test)]
mod tests;
