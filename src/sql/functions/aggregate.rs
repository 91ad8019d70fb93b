//! Reducing functions: fold array arguments into one scalar alongside any
//! additional scalar arguments.

use super::wrong_arity;
use crate::{
    sql::builder::SqlBuilder,
    types::{CellValueType, ErrorParts, SqlExpr},
};

const CAST_REASON: &str = "cannot_cast_to_number";

/// One argument reduced to a scalar numeric part.
fn numeric_part(b: &SqlBuilder, arg: SqlExpr, aggregate: &str) -> SqlExpr {
    if arg.is_array {
        b.reduce_numeric(arg, aggregate, CAST_REASON)
    } else {
        b.coerce_to_number(arg, CAST_REASON)
    }
}

pub fn sum(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if args.is_empty() {
        return wrong_arity("SUM");
    }

    let parts: Vec<SqlExpr> = args
        .into_iter()
        .map(|a| numeric_part(b, a, "sum"))
        .collect();
    let refs: Vec<&SqlExpr> = parts.iter().collect();
    let value = format!(
        "({})",
        parts
            .iter()
            .map(|p| format!("COALESCE(({}), 0)", p.value_sql))
            .collect::<Vec<_>>()
            .join(" + ")
    );
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::Number))
}

pub fn average(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if args.is_empty() {
        return wrong_arity("AVERAGE");
    }

    // Per argument: a sum part and a non-null count part; the average is
    // total sum over total count.
    let mut sums = Vec::new();
    let mut counts = Vec::new();
    let mut parts = Vec::new();
    for arg in args {
        if arg.is_array {
            let s = b.reduce_numeric(arg.clone(), "sum", CAST_REASON);
            let c = b.reduce_numeric(arg, "count", CAST_REASON);
            sums.push(format!("COALESCE(({}), 0)", s.value_sql));
            counts.push(format!("COALESCE(({}), 0)", c.value_sql));
            parts.push(s);
        } else {
            let n = b.coerce_to_number(arg, CAST_REASON);
            sums.push(format!("COALESCE(({}), 0)", n.value_sql));
            counts.push(format!(
                "(CASE WHEN ({}) IS NOT NULL THEN 1 ELSE 0 END)",
                n.value_sql
            ));
            parts.push(n);
        }
    }

    let refs: Vec<&SqlExpr> = parts.iter().collect();
    let value = format!(
        "(({}) / NULLIF(({})::numeric, 0))",
        sums.join(" + "),
        counts.join(" + ")
    );
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::Number))
}

fn extremum(b: &SqlBuilder, args: Vec<SqlExpr>, name: &str, combiner: &str) -> SqlExpr {
    if args.is_empty() {
        return wrong_arity(name);
    }

    let aggregate = if combiner == "GREATEST" { "max" } else { "min" };
    let parts: Vec<SqlExpr> = args
        .into_iter()
        .map(|a| numeric_part(b, a, aggregate))
        .collect();
    let refs: Vec<&SqlExpr> = parts.iter().collect();
    let value = if parts.len() == 1 {
        format!("({})", parts[0].value_sql)
    } else {
        format!(
            "{}({})",
            combiner,
            parts
                .iter()
                .map(|p| format!("({})", p.value_sql))
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::Number))
}

pub fn max(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    extremum(b, args, "MAX", "GREATEST")
}

pub fn min(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    extremum(b, args, "MIN", "LEAST")
}

/// COUNT: numeric values only.
pub fn count(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if args.is_empty() {
        return wrong_arity("COUNT");
    }

    let mut counts = Vec::new();
    let mut parts = Vec::new();
    for arg in args {
        if arg.is_array {
            let c = b.reduce_numeric(arg, "count", CAST_REASON);
            counts.push(format!("COALESCE(({}), 0)", c.value_sql));
            parts.push(c);
        } else {
            // Count a scalar when it loosely casts to a number; cast
            // failures mean "not a number", never an error here.
            let text = format!("(({})::text)", arg.value_sql);
            counts.push(format!(
                "(CASE WHEN {} IS NOT NULL THEN 1 ELSE 0 END)",
                b.loose_numeric_value_sql(&text)
            ));
            parts.push(arg);
        }
    }

    let refs: Vec<&SqlExpr> = parts.iter().collect();
    let value = format!("({})", counts.join(" + "));
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::Number))
}

/// COUNTA: non-blank values.
pub fn counta(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if args.is_empty() {
        return wrong_arity("COUNTA");
    }

    let mut counts = Vec::new();
    let mut parts = Vec::new();
    for arg in args {
        if arg.is_array {
            let norm = b.normalize_array_expr(arg);
            counts.push(format!(
                "(SELECT count(*) FROM jsonb_array_elements({}) AS t(elem) \
                 WHERE jsonb_typeof(t.elem) <> 'null' AND COALESCE(t.elem #>> '{{}}', '') <> '')",
                norm.value_sql
            ));
            parts.push(norm);
        } else {
            counts.push(format!(
                "(CASE WHEN ({v}) IS NOT NULL AND (({v})::text) <> '' THEN 1 ELSE 0 END)",
                v = arg.value_sql
            ));
            parts.push(arg);
        }
    }

    let refs: Vec<&SqlExpr> = parts.iter().collect();
    let value = format!("({})", counts.join(" + "));
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::Number))
}

/// COUNTALL: every value, blanks included.
pub fn countall(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if args.is_empty() {
        return wrong_arity("COUNTALL");
    }

    let mut counts = Vec::new();
    let mut parts = Vec::new();
    for arg in args {
        if arg.is_array {
            let len = b.array_length(arg);
            counts.push(format!("COALESCE(({}), 0)", len.value_sql));
            parts.push(len);
        } else {
            counts.push("1".to_owned());
            parts.push(arg);
        }
    }

    let refs: Vec<&SqlExpr> = parts.iter().collect();
    let value = format!("({})", counts.join(" + "));
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::Number))
}
