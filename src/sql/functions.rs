//! Formula function library.
//!
//! Every function is a builder over the expression engine: it takes the
//! already-compiled argument expressions and produces one [`SqlExpr`].
//! Missing or surplus required arguments yield a compile-time wrong-arity
//! error expression, never a panic.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::{
    sql::builder::SqlBuilder,
    types::{CellValueType, ErrorCode, SqlExpr},
};

mod aggregate;
mod array_funcs;
mod datetime;
mod logical;
mod math;
mod text;
pub mod units;

pub type FormulaFn = fn(&SqlBuilder, Vec<SqlExpr>) -> SqlExpr;

const FUNCTION_TABLE: &[(&str, FormulaFn)] = &[
    // Aggregates and array reducers
    ("SUM", aggregate::sum),
    ("AVERAGE", aggregate::average),
    ("MAX", aggregate::max),
    ("MIN", aggregate::min),
    ("COUNT", aggregate::count),
    ("COUNTA", aggregate::counta),
    ("COUNTALL", aggregate::countall),
    ("ARRAY_JOIN", array_funcs::array_join),
    ("ARRAY_UNIQUE", array_funcs::array_unique),
    ("ARRAY_FLATTEN", array_funcs::array_flatten),
    ("ARRAY_COMPACT", array_funcs::array_compact),
    // Numeric
    ("ABS", math::abs),
    ("CEILING", math::ceiling),
    ("FLOOR", math::floor),
    ("ROUND", math::round),
    ("ROUNDUP", math::roundup),
    ("ROUNDDOWN", math::rounddown),
    ("INT", math::int),
    ("SQRT", math::sqrt),
    ("POWER", math::power),
    ("EXP", math::exp),
    ("LOG", math::log),
    ("MOD", math::mod_),
    ("DIVIDE", math::divide),
    ("VALUE", math::value),
    ("EVEN", math::even),
    ("ODD", math::odd),
    // Text
    ("CONCATENATE", text::concatenate),
    ("LEFT", text::left),
    ("RIGHT", text::right),
    ("MID", text::mid),
    ("LEN", text::len),
    ("LOWER", text::lower),
    ("UPPER", text::upper),
    ("TRIM", text::trim),
    ("T", text::t),
    ("REPT", text::rept),
    ("REPLACE", text::replace),
    ("SUBSTITUTE", text::substitute),
    ("FIND", text::find),
    ("SEARCH", text::search),
    ("ENCODE_URL_COMPONENT", text::encode_url_component),
    // Logical
    ("IF", logical::if_),
    ("SWITCH", logical::switch),
    ("AND", logical::and),
    ("OR", logical::or),
    ("XOR", logical::xor),
    ("NOT", logical::not),
    ("BLANK", logical::blank),
    ("TRUE", logical::true_),
    ("FALSE", logical::false_),
    ("ISERROR", logical::iserror),
    ("ERROR", logical::error),
    // Date and time
    ("TODAY", datetime::today),
    ("NOW", datetime::now),
    ("YEAR", datetime::year),
    ("MONTH", datetime::month),
    ("DAY", datetime::day),
    ("HOUR", datetime::hour),
    ("MINUTE", datetime::minute),
    ("SECOND", datetime::second),
    ("WEEKDAY", datetime::weekday),
    ("WEEKNUM", datetime::weeknum),
    ("DATE_ADD", datetime::date_add),
    ("DATETIME_DIFF", datetime::datetime_diff),
    ("DATETIME_FORMAT", datetime::datetime_format),
    ("DATETIME_PARSE", datetime::datetime_parse),
    ("DATESTR", datetime::datestr),
    ("TIMESTR", datetime::timestr),
    ("TONOW", datetime::tonow),
    ("FROMNOW", datetime::fromnow),
    ("IS_SAME", datetime::is_same),
    ("IS_AFTER", datetime::is_after),
    ("IS_BEFORE", datetime::is_before),
    ("WORKDAY", datetime::workday),
    ("WORKDAY_DIFF", datetime::workday_diff),
];

/// Synonyms normalized to one canonical handler key before dispatch.
const ALIASES: &[(&str, &str)] = &[
    ("AVG", "AVERAGE"),
    ("DATEADD", "DATE_ADD"),
    ("DATETIMEDIFF", "DATETIME_DIFF"),
    ("CEIL", "CEILING"),
    ("POW", "POWER"),
    ("STRLEN", "LEN"),
    ("IS_ERROR", "ISERROR"),
];

pub static FUNCTIONS: Lazy<HashMap<&'static str, FormulaFn>> =
    Lazy::new(|| FUNCTION_TABLE.iter().copied().collect());

static ALIAS_MAP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ALIASES.iter().copied().collect());

/// Resolve a function name to its handler: trim, uppercase, then apply the
/// alias table. `None` means the caller should emit a `NOT_IMPL` error.
pub fn lookup_function(name: &str) -> Option<FormulaFn> {
    let canonical = name.trim().to_uppercase();
    let canonical = ALIAS_MAP
        .get(canonical.as_str())
        .copied()
        .unwrap_or(canonical.as_str());
    FUNCTIONS.get(canonical).copied()
}

/// Compile-time wrong-arity error expression.
pub(crate) fn wrong_arity(name: &str) -> SqlExpr {
    SqlExpr::compile_error(
        CellValueType::Unknown,
        ErrorCode::Arg,
        &format!("wrong_arity:{}", name),
    )
}

/// Keep an expression's error metadata, replace its value and type.
pub(crate) fn with_value(expr: SqlExpr, value_sql: String, value_type: CellValueType) -> SqlExpr {
    SqlExpr {
        value_sql,
        value_type,
        ..expr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(lookup_function("sum").is_some());
        assert!(lookup_function("Sum").is_some());
        assert!(lookup_function(" SUM ").is_some());
    }

    #[test]
    fn test_aliases_resolve_to_canonical() {
        assert!(lookup_function("AVG").is_some());
        assert!(lookup_function("DATEADD").is_some());
        assert!(lookup_function("is_error").is_some());
    }

    #[test]
    fn test_unknown_function_is_none() {
        assert!(lookup_function("NO_SUCH_FUNCTION").is_none());
    }

    #[test]
    fn test_no_duplicate_registrations() {
        assert_eq!(FUNCTIONS.len(), FUNCTION_TABLE.len());
    }
}
