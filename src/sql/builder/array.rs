//! Array normalization, extraction and element-wise mapping.
//!
//! Six physical shapes reach this module: lookup proxy arrays, native jsonb
//! arrays of objects, native jsonb arrays of scalars, a scalar wrapped into
//! a one-element array, a bare jsonb object, and raw unknown values.
//! [`SqlBuilder::normalize_array_expr`] folds all of them into one
//! canonical jsonb array so every downstream operation can ignore physical
//! representation.

use super::{
    cast::{rebuild, LEADING_NUMBER, SCIENTIFIC},
    SqlBuilder,
};
use crate::{
    sql::literal::{error_literal, json_normalize_any},
    types::{CellValueType, ErrorCode, FieldKind, SqlExpr, StorageKind},
};

/// Numeric rendering of one array element inside an elements subquery,
/// together with the per-element failure guard (`None` when the element is
/// statically known to be numeric).
pub(super) struct ElementNumeric {
    pub value_sql: String,
    pub fail_sql: Option<String>,
}

impl<'a> SqlBuilder<'a> {
    /// Normalize any expression into a jsonb array: NULL becomes `[]`, an
    /// array stays itself, a scalar becomes a one-element array.
    /// Idempotent at the SQL-semantic level.
    pub fn normalize_array_expr(&self, expr: SqlExpr) -> SqlExpr {
        let value = if expr.is_array || expr.storage == StorageKind::Array {
            format!("COALESCE(({}), '[]'::jsonb)", expr.value_sql)
        } else if expr.storage == StorageKind::Json {
            json_normalize_any(&expr.value_sql)
        } else {
            format!(
                "(CASE WHEN ({v}) IS NULL THEN '[]'::jsonb ELSE jsonb_build_array({v}) END)",
                v = expr.value_sql
            )
        };
        let value_type = match expr.value_type {
            CellValueType::Unknown => expr
                .field
                .as_ref()
                .map(|f| crate::sql::meta::field_sql_meta(f).cell_type)
                .unwrap_or(CellValueType::Unknown),
            other => other,
        };
        let out = rebuild(expr, value, value_type);
        SqlExpr {
            is_array: true,
            storage: StorageKind::Array,
            ..out
        }
    }

    /// Unwrap an array to a scalar by extracting element 0 as text, with
    /// type-aware extraction for object-shaped elements (lookups through
    /// user/link/attachment fields).
    pub fn extract_scalar_text(&self, expr: SqlExpr) -> SqlExpr {
        let inner_kind = element_kind(&expr);
        let value_type = expr.value_type;
        let norm = self.normalize_array_expr(expr);
        let value = match inner_kind {
            Some(k) if k.is_json_object() => format!(
                "COALESCE(({n}) -> 0 ->> 'title', ({n}) -> 0 ->> 'name', ({n}) ->> 0)",
                n = norm.value_sql
            ),
            // A statically numeric element comes back typed, not as text;
            // `->>` alone would leak a text fragment into arithmetic.
            _ if value_type == CellValueType::Number => {
                format!("((({}) ->> 0)::numeric)", norm.value_sql)
            }
            _ => format!("(({}) ->> 0)", norm.value_sql),
        };
        let out = rebuild(norm, value, value_type);
        SqlExpr {
            is_array: false,
            storage: StorageKind::Scalar,
            ..out
        }
    }

    /// Stringify an array element-wise, joined with `sep` in element order.
    pub fn stringify_array(&self, expr: SqlExpr, sep: &str) -> SqlExpr {
        let elem = self.element_text(&expr, "t.elem");
        let norm = self.normalize_array_expr(expr);
        let value = format!(
            "(SELECT COALESCE(string_agg({elem}, '{sep}' ORDER BY t.idx), '') \
             FROM jsonb_array_elements({n}) WITH ORDINALITY AS t(elem, idx))",
            elem = elem,
            sep = sep.replace('\'', "''"),
            n = norm.value_sql
        );
        let out = rebuild(norm, value, CellValueType::String);
        SqlExpr {
            is_array: false,
            storage: StorageKind::Scalar,
            ..out
        }
    }

    /// Map a scalar numeric operation over every element, preserving order
    /// and embedding per-element errors as error-sentinel strings instead
    /// of one aggregate error.
    pub fn map_numeric_elements<F>(&self, expr: SqlExpr, reason: &str, op: F) -> SqlExpr
    where
        F: Fn(&str) -> String,
    {
        let elem = self.element_numeric(&expr);
        let norm = self.normalize_array_expr(expr);
        let mapped = op(&elem.value_sql);
        let body = match &elem.fail_sql {
            Some(fail) => format!(
                "CASE WHEN {fail} THEN to_jsonb({err}::text) ELSE to_jsonb({mapped}) END",
                fail = fail,
                err = error_literal(ErrorCode::Type, reason),
                mapped = mapped
            ),
            None => format!("to_jsonb({})", mapped),
        };
        let value = format!(
            "(SELECT COALESCE(jsonb_agg({body} ORDER BY t.idx), '[]'::jsonb) \
             FROM jsonb_array_elements({n}) WITH ORDINALITY AS t(elem, idx))",
            body = body,
            n = norm.value_sql
        );
        let out = rebuild(norm, value, CellValueType::Number);
        SqlExpr {
            is_array: true,
            storage: StorageKind::Array,
            ..out
        }
    }

    /// Fold an array into one scalar with the given SQL aggregate over the
    /// numeric rendering of each element. Elements that fail the loose cast
    /// surface through the expression's error condition.
    pub fn reduce_numeric(&self, expr: SqlExpr, aggregate: &str, reason: &str) -> SqlExpr {
        let elem = self.element_numeric(&expr);
        let norm = self.normalize_array_expr(expr);
        let value = format!(
            "(SELECT {agg}({elem}) FROM jsonb_array_elements({n}) AS t(elem))",
            agg = aggregate,
            elem = elem.value_sql,
            n = norm.value_sql
        );
        let guarded = match elem.fail_sql {
            Some(fail) => {
                let cond = format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements({n}) AS t(elem) WHERE {fail})",
                    n = norm.value_sql,
                    fail = fail
                );
                crate::types::ErrorParts::merge(&[&norm])
                    .push(cond, error_literal(ErrorCode::Type, reason))
                    .apply(norm)
            }
            None => norm,
        };
        let out = rebuild(guarded, value, CellValueType::Number);
        SqlExpr {
            is_array: false,
            storage: StorageKind::Scalar,
            ..out
        }
    }

    /// Number of elements in the normalized array.
    pub fn array_length(&self, expr: SqlExpr) -> SqlExpr {
        let norm = self.normalize_array_expr(expr);
        let value = format!("jsonb_array_length({})", norm.value_sql);
        let out = rebuild(norm, value, CellValueType::Number);
        SqlExpr {
            is_array: false,
            storage: StorageKind::Scalar,
            ..out
        }
    }

    /// Display-text rendering of one element (an alias like `t.elem`)
    /// inside an elements subquery.
    pub(crate) fn element_text(&self, expr: &SqlExpr, elem_sql: &str) -> String {
        match element_kind(expr) {
            Some(k) if k.is_json_object() => format!(
                "COALESCE(({e}) ->> 'title', ({e}) ->> 'name', ({e}) #>> '{{}}')",
                e = elem_sql
            ),
            _ => format!("(({}) #>> '{{}}')", elem_sql),
        }
    }

    /// Numeric rendering of one element. A lookup statically known to carry
    /// numbers casts directly (so SUM over it uses numeric comparisons, not
    /// lexical); anything else goes through the loose cast.
    pub(super) fn element_numeric(&self, expr: &SqlExpr) -> ElementNumeric {
        let statically_numeric = expr.value_type == CellValueType::Number
            || matches!(
                element_kind(expr),
                Some(FieldKind::Number | FieldKind::Rating | FieldKind::AutoNumber)
            );

        if statically_numeric {
            return ElementNumeric {
                value_sql: "((t.elem #>> '{}')::numeric)".to_owned(),
                fail_sql: None,
            };
        }

        let norm_text =
            "NULLIF(regexp_replace((t.elem #>> '{}'), '[,[:space:]]+', '', 'g'), '')".to_owned();
        ElementNumeric {
            value_sql: format!(
                "(substring({} from '{}')::numeric)",
                norm_text, LEADING_NUMBER
            ),
            fail_sql: Some(format!(
                "({n} IS NOT NULL AND ({n} !~ '{lead}' OR {n} ~ '{sci}'))",
                n = norm_text,
                lead = LEADING_NUMBER,
                sci = SCIENTIFIC
            )),
        }
    }
}

/// The field kind of an array's elements: the resolved inner field for
/// lookup-shaped sources, the field itself otherwise.
pub(super) fn element_kind(expr: &SqlExpr) -> Option<FieldKind> {
    let field = expr.field.as_deref()?;
    if field.kind.is_lookup_like() {
        field.inner.as_deref().map(|f| f.kind)
    } else {
        Some(field.kind)
    }
}
