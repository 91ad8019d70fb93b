//! Compilation driver: reference resolution, formula expansion with cycle
//! detection, and final SQL rendering.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono_tz::Tz;

use crate::{
    ast::ExprNode,
    sql::{
        builder::SqlBuilder,
        literal::json_object_display_text,
        meta::field_sql_meta,
        validation::TypeValidation,
        visitor::ToSql,
    },
    types::{
        CellValueType, ErrorCode, FieldDescriptor, FieldKind, FormulaError, FormulaResult, SqlExpr,
        StorageKind,
    },
};

/// How a reference to another formula field compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaReference {
    /// Substitute the referenced formula's own compiled expression inline.
    Expand,
    /// Resolve through the column resolver; for pipelines where formula
    /// values are precomputed upstream and re-expansion would be wrong.
    Proxy,
}

pub struct CompilerConfig {
    /// Target time zone for calendar arithmetic and date rendering.
    pub time_zone: Tz,
    /// Permit falling back to a trimmed, case-insensitive name lookup when
    /// a reference is not a known field id.
    pub allow_name_fallback: bool,
    pub formula_reference: FormulaReference,
}

impl Default for CompilerConfig {
    fn default() -> CompilerConfig {
        CompilerConfig {
            time_zone: Tz::Etc__UTC,
            allow_name_fallback: true,
            formula_reference: FormulaReference::Expand,
        }
    }
}

/// Read-only lookup of field descriptors. Snapshot semantics: the catalog
/// must not change for the lifetime of one compilation.
pub trait FieldCatalog {
    fn field_by_id(&self, id: &str) -> Option<Arc<FieldDescriptor>>;
    /// Trimmed, case-insensitive display-name lookup.
    fn field_by_name(&self, name: &str) -> Option<Arc<FieldDescriptor>>;
}

/// Produces the raw column SQL for a stored field.
pub trait ColumnResolver {
    fn column_sql(&self, field: &FieldDescriptor) -> FormulaResult<String>;
}

/// Per-compilation mutable state. One translator owns one session; nothing
/// is shared across concurrent compilations.
#[derive(Default)]
pub(crate) struct Session {
    /// Compiled formula fields, keyed by field id.
    cache: HashMap<String, SqlExpr>,
    /// Formula fields on the current expansion path.
    visiting: HashSet<String>,
    /// Nesting depth of function calls around the node being visited.
    call_depth: usize,
}

impl Session {
    pub(crate) fn enter_call(&mut self) {
        self.call_depth += 1;
    }

    pub(crate) fn leave_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }
}

/// One compilation unit: borrows the catalog, resolver, configuration and
/// validation strategy, and owns the session state.
pub struct Translator<'a> {
    catalog: &'a dyn FieldCatalog,
    resolver: &'a dyn ColumnResolver,
    config: &'a CompilerConfig,
    validation: &'a dyn TypeValidation,
}

impl<'a> Translator<'a> {
    pub fn new(
        catalog: &'a dyn FieldCatalog,
        resolver: &'a dyn ColumnResolver,
        config: &'a CompilerConfig,
        validation: &'a dyn TypeValidation,
    ) -> Translator<'a> {
        Translator {
            catalog,
            resolver,
            config,
            validation,
        }
    }

    pub(crate) fn builder(&self) -> SqlBuilder<'_> {
        SqlBuilder::new(self.config, self.validation)
    }

    /// Compile a syntax tree into a [`SqlExpr`]. `Err` is reserved for
    /// dependency cycles, column-resolver failures and internal defects;
    /// formula-authoring mistakes come back as error-carrying expressions.
    pub fn compile(&self, node: &ExprNode) -> FormulaResult<SqlExpr> {
        let mut session = Session::default();
        node.to_sql(self, &mut session)
    }

    /// Compile and render: one SQL text expression that evaluates to either
    /// the value or a `#ERROR:` sentinel.
    pub fn render_sql(&self, node: &ExprNode) -> FormulaResult<String> {
        Ok(render(&self.compile(node)?))
    }

    /// Resolve a `{Field}` reference token into a compiled expression.
    pub(crate) fn resolve_reference(
        &self,
        token: &str,
        session: &mut Session,
    ) -> FormulaResult<SqlExpr> {
        let field = match self.catalog.field_by_id(token) {
            Some(f) => Some(f),
            None if self.config.allow_name_fallback => self.catalog.field_by_name(token.trim()),
            None => None,
        };
        let Some(field) = field else {
            return Ok(SqlExpr::compile_error(
                CellValueType::Unknown,
                ErrorCode::Ref,
                &format!("field_not_found:{}", token.trim()),
            ));
        };

        if field.kind == FieldKind::Formula
            && self.config.formula_reference == FormulaReference::Expand
        {
            return self.expand_formula(field, session);
        }

        let column = self.resolver.column_sql(&field)?;
        let meta = field_sql_meta(&field);
        let expr = SqlExpr::new(column, meta.cell_type)
            .with_array(meta.is_multiple)
            .with_storage(meta.storage)
            .with_field(field);

        // A JSON-object field referenced bare (outside any function call)
        // renders as its display text, not its raw object.
        Ok(self.project_bare_object(expr, session))
    }

    fn expand_formula(
        &self,
        field: Arc<FieldDescriptor>,
        session: &mut Session,
    ) -> FormulaResult<SqlExpr> {
        if session.visiting.contains(&field.id) {
            return Err(FormulaError::circular(&field.id));
        }
        if let Some(cached) = session.cache.get(&field.id) {
            return Ok(cached.clone());
        }

        let Some(expression) = field.expression.clone() else {
            return Ok(SqlExpr::compile_error(
                CellValueType::Unknown,
                ErrorCode::Ref,
                &format!("formula_missing_expression:{}", field.id),
            ));
        };

        session.visiting.insert(field.id.clone());
        let compiled = expression.to_sql(self, session);
        session.visiting.remove(&field.id);

        let compiled = compiled?.with_field(field.clone());
        session.cache.insert(field.id.clone(), compiled.clone());
        Ok(compiled)
    }

    fn project_bare_object(&self, expr: SqlExpr, session: &Session) -> SqlExpr {
        let bare = session.call_depth == 0;
        let object_shaped = expr
            .field
            .as_deref()
            .map(|f| f.kind.is_json_object())
            .unwrap_or(false);
        if !bare || !object_shaped || expr.storage != StorageKind::Json {
            return expr;
        }

        let value = json_object_display_text(&expr.value_sql);
        SqlExpr {
            value_sql: value,
            value_type: CellValueType::String,
            storage: StorageKind::Scalar,
            ..expr
        }
    }
}

/// Render a compiled expression to final SQL text. The single point where
/// the error condition becomes a CASE around the value; an array result
/// wraps the sentinel into a one-element jsonb array so the column keeps
/// its physical shape on the error path.
pub fn render(expr: &SqlExpr) -> String {
    let Some(cond) = &expr.error_condition_sql else {
        return expr.value_sql.clone();
    };

    let message = expr.error_message_or_fallback();
    if expr.is_array {
        format!(
            "CASE WHEN {} THEN jsonb_build_array(({})::text) ELSE ({}) END",
            cond, message, expr.value_sql
        )
    } else {
        format!(
            "CASE WHEN {} THEN ({})::text ELSE ({})::text END",
            cond, message, expr.value_sql
        )
    }
}
