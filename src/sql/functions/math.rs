//! Numeric functions. Unary ones vectorize: given an array argument they
//! map the scalar operation over each element in order, embedding
//! per-element errors, instead of collapsing to one aggregate error.

use super::{with_value, wrong_arity};
use crate::{
    sql::{builder::SqlBuilder, literal::error_literal},
    types::{CellValueType, ErrorCode, ErrorParts, SqlExpr},
};

const CAST_REASON: &str = "cannot_cast_to_number";

/// Shared shape of the unary numeric functions: arity check, then either a
/// vectorized element map or a scalar coercion followed by `op`.
fn numeric_unary<F>(b: &SqlBuilder, args: Vec<SqlExpr>, name: &str, op: F) -> SqlExpr
where
    F: Fn(&str) -> String,
{
    let Ok([arg]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity(name);
    };

    if arg.is_array {
        return b.map_numeric_elements(arg, CAST_REASON, op);
    }

    let num = b.coerce_to_number(arg, CAST_REASON);
    let value = op(&num.value_sql);
    with_value(num, value, CellValueType::Number)
}

pub fn abs(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    numeric_unary(b, args, "ABS", |x| format!("abs(({})::numeric)", x))
}

pub fn sqrt(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([arg]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("SQRT");
    };

    // The engine raises on sqrt of a negative; guard it into the error path
    // instead.
    let guard = |x: &str| {
        format!(
            "(CASE WHEN ({x}) < 0 THEN NULL ELSE sqrt(({x})::numeric) END)",
            x = x
        )
    };

    if arg.is_array {
        return b.map_numeric_elements(arg, CAST_REASON, guard);
    }

    let num = b.coerce_to_number(arg, CAST_REASON);
    let fail = format!("(COALESCE(({}), 0) < 0)", num.value_sql);
    let value = guard(&num.value_sql);
    ErrorParts::merge(&[&num])
        .push(fail, error_literal(ErrorCode::Arg, "sqrt_of_negative"))
        .apply(with_value(num, value, CellValueType::Number))
}

pub fn exp(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    numeric_unary(b, args, "EXP", |x| {
        format!("exp(({})::double precision)::numeric", x)
    })
}

pub fn int(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    numeric_unary(b, args, "INT", |x| format!("floor(({})::numeric)", x))
}

pub fn even(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    numeric_unary(b, args, "EVEN", |x| {
        format!(
            "(CASE WHEN ({x}) = 0 THEN 2 \
             ELSE sign(({x})::numeric) * 2 * ceil(abs(({x})::numeric) / 2) END)",
            x = x
        )
    })
}

pub fn odd(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    numeric_unary(b, args, "ODD", |x| {
        format!(
            "(CASE WHEN ({x}) = 0 THEN 1 \
             ELSE sign(({x})::numeric) * (2 * ceil((abs(({x})::numeric) + 1) / 2) - 1) END)",
            x = x
        )
    })
}

pub fn ceiling(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    numeric_unary(b, args, "CEILING", |x| format!("ceil(({})::numeric)", x))
}

pub fn floor(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    numeric_unary(b, args, "FLOOR", |x| format!("floor(({})::numeric)", x))
}

/// Split an argument list into one required argument plus one optional one.
fn one_plus_optional(args: Vec<SqlExpr>) -> Result<(SqlExpr, Option<SqlExpr>), ()> {
    match <[SqlExpr; 2]>::try_from(args) {
        Ok([a, opt]) => Ok((a, Some(opt))),
        Err(args) => match <[SqlExpr; 1]>::try_from(args) {
            Ok([a]) => Ok((a, None)),
            Err(_) => Err(()),
        },
    }
}

/// ROUND family: optional precision argument, defaulting to 0 digits.
fn round_family<F>(b: &SqlBuilder, args: Vec<SqlExpr>, name: &str, op: F) -> SqlExpr
where
    F: Fn(&str, &str) -> String,
{
    let Ok((arg, precision)) = one_plus_optional(args) else {
        return wrong_arity(name);
    };
    let precision = match precision {
        Some(p) => b.coerce_to_number(p, CAST_REASON),
        None => SqlExpr::new("0".to_owned(), CellValueType::Number),
    };
    let p = format!("(COALESCE(({}), 0))::int", precision.value_sql);

    if arg.is_array {
        let mapped = b.map_numeric_elements(arg, CAST_REASON, |x| op(x, &p));
        return ErrorParts::merge(&[&mapped, &precision]).apply(mapped.clone());
    }

    let num = b.coerce_to_number(arg, CAST_REASON);
    let value = op(&num.value_sql, &p);
    ErrorParts::merge(&[&num, &precision])
        .apply(with_value(num, value, CellValueType::Number))
}

pub fn round(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    round_family(b, args, "ROUND", |x, p| {
        format!("round(({})::numeric, {})", x, p)
    })
}

pub fn roundup(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    // Away from zero, like the spreadsheet convention.
    round_family(b, args, "ROUNDUP", |x, p| {
        format!(
            "(sign(({x})::numeric) * ceil(abs(({x})::numeric) * (10::numeric ^ {p})) \
             / (10::numeric ^ {p}))",
            x = x,
            p = p
        )
    })
}

pub fn rounddown(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    // Toward zero.
    round_family(b, args, "ROUNDDOWN", |x, p| {
        format!("trunc(({})::numeric, {})", x, p)
    })
}

pub fn power(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([base, exponent]) = <[SqlExpr; 2]>::try_from(args) else {
        return wrong_arity("POWER");
    };
    let base = b.coerce_to_number(base, CAST_REASON);
    let exponent = b.coerce_to_number(exponent, CAST_REASON);
    let value = format!(
        "power(({})::double precision, ({})::double precision)::numeric",
        base.value_sql, exponent.value_sql
    );
    ErrorParts::merge(&[&base, &exponent]).apply(SqlExpr::new(value, CellValueType::Number))
}

pub fn log(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok((x, base)) = one_plus_optional(args) else {
        return wrong_arity("LOG");
    };
    let base = match base {
        Some(base) => b.coerce_to_number(base, CAST_REASON),
        None => SqlExpr::new("10".to_owned(), CellValueType::Number),
    };
    let x = b.coerce_to_number(x, CAST_REASON);

    let fail = format!(
        "(COALESCE(({x}), 0) <= 0 OR COALESCE(({b}), 0) <= 0 OR ({b}) = 1)",
        x = x.value_sql,
        b = base.value_sql
    );
    let value = format!(
        "(CASE WHEN ({x}) > 0 AND ({b}) > 0 AND ({b}) <> 1 \
         THEN log(({b})::numeric, ({x})::numeric) ELSE NULL END)",
        x = x.value_sql,
        b = base.value_sql
    );
    ErrorParts::merge(&[&x, &base])
        .push(fail, error_literal(ErrorCode::Arg, "log_out_of_domain"))
        .apply(SqlExpr::new(value, CellValueType::Number))
}

fn division_like(b: &SqlBuilder, args: Vec<SqlExpr>, name: &str, token: &str) -> SqlExpr {
    let Ok([lhs, rhs]) = <[SqlExpr; 2]>::try_from(args) else {
        return wrong_arity(name);
    };
    let lhs = b.coerce_to_number(lhs, CAST_REASON);
    let rhs = b.coerce_to_number(rhs, CAST_REASON);

    let value = format!(
        "(({}) {} NULLIF(({}), 0))",
        lhs.value_sql, token, rhs.value_sql
    );
    // The zero-divisor guard is independent of operand validity.
    let div0 = format!("(COALESCE(({}), 0) = 0)", rhs.value_sql);
    ErrorParts::merge(&[&lhs, &rhs])
        .push(div0, error_literal(ErrorCode::Div0, "division_by_zero"))
        .apply(SqlExpr::new(value, CellValueType::Number))
}

pub fn mod_(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    division_like(b, args, "MOD", "%")
}

pub fn divide(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    division_like(b, args, "DIVIDE", "/")
}

pub fn value(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([arg]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("VALUE");
    };
    b.coerce_to_number(arg, CAST_REASON)
}
