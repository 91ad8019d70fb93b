//! Array-shaping functions: join, unique, flatten, compact. All of them
//! run on the normalized jsonb array shape and keep element order.

use super::wrong_arity;
use crate::{
    sql::builder::{SqlBuilder, TextMode},
    types::{CellValueType, ErrorParts, SqlExpr, StorageKind},
};

pub fn array_join(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (array, sep) = match <[SqlExpr; 2]>::try_from(args) {
        Ok([a, s]) => (a, Some(s)),
        Err(args) => match <[SqlExpr; 1]>::try_from(args) {
            Ok([a]) => (a, None),
            Err(_) => return wrong_arity("ARRAY_JOIN"),
        },
    };

    let Some(sep) = sep else {
        return b.stringify_array(array, ", ");
    };

    let elem = b.element_text(&array, "t.elem");
    let norm = b.normalize_array_expr(array);
    let sep = b.coerce_to_string(sep, TextMode::Plain);
    let value = format!(
        "(SELECT COALESCE(string_agg({elem}, COALESCE(({sep})::text, ', ') ORDER BY t.idx), '') \
         FROM jsonb_array_elements({n}) WITH ORDINALITY AS t(elem, idx))",
        elem = elem,
        sep = sep.value_sql,
        n = norm.value_sql
    );
    let out = SqlExpr {
        is_array: false,
        storage: StorageKind::Scalar,
        ..SqlExpr::new(value, CellValueType::String)
    };
    ErrorParts::merge(&[&norm, &sep]).apply(out)
}

/// ARRAY_UNIQUE keeps the first occurrence of each element, in its original
/// position order.
pub fn array_unique(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([array]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("ARRAY_UNIQUE");
    };

    let norm = b.normalize_array_expr(array);
    let value = format!(
        "(SELECT COALESCE(jsonb_agg(e.elem ORDER BY e.first_idx), '[]'::jsonb) \
         FROM (SELECT DISTINCT ON (t.elem) t.elem AS elem, t.idx AS first_idx \
               FROM jsonb_array_elements({n}) WITH ORDINALITY AS t(elem, idx) \
               ORDER BY t.elem, t.idx) AS e)",
        n = norm.value_sql
    );
    rebuilt_array(norm, value)
}

/// ARRAY_FLATTEN concatenates its arguments and unnests one level of
/// nesting.
pub fn array_flatten(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if args.is_empty() {
        return wrong_arity("ARRAY_FLATTEN");
    }

    let parts: Vec<SqlExpr> = args
        .into_iter()
        .map(|a| b.normalize_array_expr(a))
        .collect();
    let refs: Vec<&SqlExpr> = parts.iter().collect();
    let concat = parts
        .iter()
        .map(|p| format!("({})", p.value_sql))
        .collect::<Vec<_>>()
        .join(" || ");

    let value = format!(
        "(SELECT COALESCE(jsonb_agg(f.e ORDER BY t.idx, f.ord), '[]'::jsonb) \
         FROM jsonb_array_elements(({concat})) WITH ORDINALITY AS t(elem, idx) \
         CROSS JOIN LATERAL jsonb_array_elements(\
           CASE WHEN jsonb_typeof(t.elem) = 'array' THEN t.elem \
           ELSE jsonb_build_array(t.elem) END) WITH ORDINALITY AS f(e, ord))",
        concat = concat
    );

    let out = SqlExpr {
        is_array: true,
        storage: StorageKind::Array,
        ..SqlExpr::new(value, CellValueType::Unknown)
    };
    ErrorParts::merge(&refs).apply(out)
}

/// ARRAY_COMPACT drops null and empty-string elements.
pub fn array_compact(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([array]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("ARRAY_COMPACT");
    };

    let norm = b.normalize_array_expr(array);
    let value = format!(
        "(SELECT COALESCE(jsonb_agg(t.elem ORDER BY t.idx), '[]'::jsonb) \
         FROM jsonb_array_elements({n}) WITH ORDINALITY AS t(elem, idx) \
         WHERE jsonb_typeof(t.elem) <> 'null' AND COALESCE(t.elem #>> '{{}}', '') <> '')",
        n = norm.value_sql
    );
    rebuilt_array(norm, value)
}

/// Keep the normalized expression's metadata, swap in the new array value.
fn rebuilt_array(norm: SqlExpr, value_sql: String) -> SqlExpr {
    SqlExpr {
        value_sql,
        is_array: true,
        storage: StorageKind::Array,
        ..norm
    }
}
