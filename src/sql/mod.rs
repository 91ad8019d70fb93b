//! Formula-to-SQL compilation.
//!
//! The pipeline is a pure text-to-text transformation: a parsed
//! [`ExprNode`](crate::ast::ExprNode) tree plus a field catalog, a column
//! resolver and a compiler configuration go in; one PostgreSQL expression
//! comes out, suitable for embedding directly into a SELECT projection.
//!
//! # Error model
//!
//! Formula-authoring mistakes never abort compilation. They travel inside
//! [`SqlExpr`](crate::types::SqlExpr) as an error condition plus a
//! `#ERROR:<CODE>:<reason>` message, and [`render`] folds them into a CASE
//! around the value. Host-level `Err` is reserved for dependency cycles,
//! column-resolver failures and internal defects.

pub mod builder;
pub mod functions;
pub mod literal;
pub mod meta;
pub mod translator;
pub mod validation;
mod visitor;

pub use builder::{BranchSet, SqlBuilder, TextMode};
pub use translator::{
    render, ColumnResolver, CompilerConfig, FieldCatalog, FormulaReference, Translator,
};
pub use validation::{CastTarget, InputCheckValidation, PatternValidation, TypeValidation};
