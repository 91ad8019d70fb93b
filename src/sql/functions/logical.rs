//! Logical functions, plus the error-introspection pair ISERROR/ERROR.

use super::wrong_arity;
use crate::{
    sql::{
        builder::{SqlBuilder, TextMode},
        literal::dynamic_error_message,
    },
    types::{CellValueType, ErrorCode, ErrorParts, SqlExpr, StorageKind},
};

pub fn if_(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (cond, then, otherwise) = match <[SqlExpr; 3]>::try_from(args) {
        Ok([c, t, o]) => (c, t, Some(o)),
        Err(args) => match <[SqlExpr; 2]>::try_from(args) {
            Ok([c, t]) => (c, t, None),
            Err(_) => return wrong_arity("IF"),
        },
    };

    let cond = b.coerce_to_boolean(cond);
    // A missing else-branch behaves as a literal blank and participates in
    // unification as one.
    let otherwise = otherwise.unwrap_or_else(|| SqlExpr::new("''".to_owned(), CellValueType::String));

    let set = b.coerce_branches(vec![then, otherwise]);
    let then = &set.branches[0];
    let otherwise = &set.branches[1];
    let value = format!(
        "(CASE WHEN COALESCE(({}), FALSE) THEN ({}) ELSE ({}) END)",
        cond.value_sql, then.value_sql, otherwise.value_sql
    );

    let out = SqlExpr::new(value, set.value_type).with_array(set.is_array);
    let out = if set.is_array {
        out.with_storage(StorageKind::Array)
    } else {
        out
    };
    ErrorParts::merge(&[&cond, then, otherwise]).apply(out)
}

pub fn switch(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if args.len() < 2 {
        return wrong_arity("SWITCH");
    }

    let mut iter = args.into_iter();
    let subject = match iter.next() {
        Some(s) => b.coerce_to_string(s, TextMode::Plain),
        None => return wrong_arity("SWITCH"),
    };

    let rest: Vec<SqlExpr> = iter.collect();
    let has_default = rest.len() % 2 == 1;
    let pair_count = rest.len() / 2;

    let mut patterns = Vec::with_capacity(pair_count);
    let mut results = Vec::with_capacity(pair_count + 1);
    let mut iter = rest.into_iter();
    for _ in 0..pair_count {
        // The iterator length was checked above; a missing half is a defect.
        let (Some(p), Some(r)) = (iter.next(), iter.next()) else {
            return SqlExpr::compile_error(
                CellValueType::Unknown,
                ErrorCode::Internal,
                "switch_pair_underflow",
            );
        };
        patterns.push(b.coerce_to_string(p, TextMode::Plain));
        results.push(r);
    }
    let default = match (has_default, iter.next()) {
        (true, Some(d)) => d,
        _ => SqlExpr::new("''".to_owned(), CellValueType::String),
    };
    results.push(default);

    let set = b.coerce_switch_results(results);
    let (cases, default) = match set.branches.split_last() {
        Some((default, cases)) => (cases, default),
        None => {
            return SqlExpr::compile_error(
                CellValueType::Unknown,
                ErrorCode::Internal,
                "switch_without_default",
            )
        }
    };

    let mut value = String::from("(CASE");
    for (pattern, result) in patterns.iter().zip(cases) {
        value.push_str(&format!(
            " WHEN COALESCE(({}), '') = COALESCE(({}), '') THEN ({})",
            subject.value_sql, pattern.value_sql, result.value_sql
        ));
    }
    value.push_str(&format!(" ELSE ({}) END)", default.value_sql));

    let mut refs: Vec<&SqlExpr> = vec![&subject];
    refs.extend(patterns.iter());
    refs.extend(set.branches.iter());

    let out = SqlExpr::new(value, set.value_type).with_array(set.is_array);
    let out = if set.is_array {
        out.with_storage(StorageKind::Array)
    } else {
        out
    };
    ErrorParts::merge(&refs).apply(out)
}

fn variadic_boolean(b: &SqlBuilder, args: Vec<SqlExpr>, name: &str, token: &str) -> SqlExpr {
    if args.is_empty() {
        return wrong_arity(name);
    }

    let parts: Vec<SqlExpr> = args.into_iter().map(|a| b.coerce_to_boolean(a)).collect();
    let refs: Vec<&SqlExpr> = parts.iter().collect();
    let value = format!(
        "({})",
        parts
            .iter()
            .map(|p| format!("COALESCE(({}), FALSE)", p.value_sql))
            .collect::<Vec<_>>()
            .join(&format!(" {} ", token))
    );
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::Boolean))
}

pub fn and(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    variadic_boolean(b, args, "AND", "AND")
}

pub fn or(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    variadic_boolean(b, args, "OR", "OR")
}

/// XOR: true when an odd number of arguments are true.
pub fn xor(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if args.is_empty() {
        return wrong_arity("XOR");
    }

    let parts: Vec<SqlExpr> = args.into_iter().map(|a| b.coerce_to_boolean(a)).collect();
    let refs: Vec<&SqlExpr> = parts.iter().collect();
    let value = format!(
        "((({})) % 2 = 1)",
        parts
            .iter()
            .map(|p| format!("(CASE WHEN COALESCE(({}), FALSE) THEN 1 ELSE 0 END)", p.value_sql))
            .collect::<Vec<_>>()
            .join(" + ")
    );
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::Boolean))
}

pub fn not(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([arg]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("NOT");
    };
    let arg = b.coerce_to_boolean(arg);
    let value = format!("(NOT COALESCE(({}), FALSE))", arg.value_sql);
    ErrorParts::merge(&[&arg]).apply(SqlExpr::new(value, CellValueType::Boolean))
}

/// BLANK() is the literal blank: it compares equal to empty text and turns
/// into a typed NULL during branch unification.
pub fn blank(_b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if !args.is_empty() {
        return wrong_arity("BLANK");
    }
    SqlExpr::new("''".to_owned(), CellValueType::String)
}

pub fn true_(_b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if !args.is_empty() {
        return wrong_arity("TRUE");
    }
    SqlExpr::new("TRUE".to_owned(), CellValueType::Boolean)
}

pub fn false_(_b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if !args.is_empty() {
        return wrong_arity("FALSE");
    }
    SqlExpr::new("FALSE".to_owned(), CellValueType::Boolean)
}

/// ISERROR consumes its argument's error state instead of propagating it:
/// the result is a plain boolean that is true exactly when the argument
/// would have rendered a sentinel.
pub fn iserror(_b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([arg]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("ISERROR");
    };
    let value = match arg.error_condition_sql {
        Some(cond) => format!("(COALESCE(({}), FALSE))", cond),
        None => "FALSE".to_owned(),
    };
    SqlExpr::new(value, CellValueType::Boolean)
}

/// ERROR raises a custom error whose reason is evaluated at query time.
pub fn error(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let reason = match <[SqlExpr; 1]>::try_from(args) {
        Ok([r]) => Some(b.coerce_to_string(r, TextMode::Plain)),
        Err(args) if args.is_empty() => None,
        Err(_) => return wrong_arity("ERROR"),
    };

    let message = match &reason {
        Some(r) => dynamic_error_message(ErrorCode::Arg, &format!("({})", r.value_sql)),
        None => dynamic_error_message(ErrorCode::Arg, "NULL"),
    };

    let mut out = SqlExpr::typed_null(CellValueType::Unknown);
    out.error_condition_sql = Some("TRUE".to_owned());
    out.error_message_sql = Some(message);
    out
}
