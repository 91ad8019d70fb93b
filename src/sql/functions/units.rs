//! Date unit arguments shared by DATE_ADD, DATETIME_DIFF, TONOW, FROMNOW
//! and IS_SAME.
//!
//! A unit written as a string literal resolves at compile time; a computed
//! unit compiles into a CASE dispatch over every known alias with a runtime
//! invalid-unit error for anything else.

use crate::{
    sql::{
        builder::{SqlBuilder, TextMode},
        literal::error_literal,
    },
    types::{CellValueType, ErrorCode, SqlExpr},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl DateUnit {
    pub const ALL: &'static [DateUnit] = &[
        DateUnit::Year,
        DateUnit::Quarter,
        DateUnit::Month,
        DateUnit::Week,
        DateUnit::Day,
        DateUnit::Hour,
        DateUnit::Minute,
        DateUnit::Second,
        DateUnit::Millisecond,
    ];

    /// Word aliases, matched case-insensitively.
    fn words(self) -> &'static [&'static str] {
        match self {
            DateUnit::Year => &["years", "year"],
            DateUnit::Quarter => &["quarters", "quarter"],
            DateUnit::Month => &["months", "month"],
            DateUnit::Week => &["weeks", "week"],
            DateUnit::Day => &["days", "day"],
            DateUnit::Hour => &["hours", "hour"],
            DateUnit::Minute => &["minutes", "minute"],
            DateUnit::Second => &["seconds", "second"],
            DateUnit::Millisecond => &["milliseconds", "millisecond"],
        }
    }

    /// Short aliases, matched case-sensitively: `M` is month, `m` minute.
    fn shorts(self) -> &'static [&'static str] {
        match self {
            DateUnit::Year => &["y"],
            DateUnit::Quarter => &["Q"],
            DateUnit::Month => &["M"],
            DateUnit::Week => &["w"],
            DateUnit::Day => &["d"],
            DateUnit::Hour => &["h"],
            DateUnit::Minute => &["m"],
            DateUnit::Second => &["s"],
            DateUnit::Millisecond => &["ms"],
        }
    }

    pub fn parse(raw: &str) -> Option<DateUnit> {
        let trimmed = raw.trim();
        let lowered = trimmed.to_lowercase();
        DateUnit::ALL.iter().copied().find(|u| {
            u.shorts().contains(&trimmed) || u.words().contains(&lowered.as_str())
        })
    }

    /// SQL boolean fragment: does the text in `unit_sql` name this unit.
    fn match_sql(self, unit_sql: &str) -> String {
        let words = self
            .words()
            .iter()
            .map(|w| format!("'{}'", w))
            .collect::<Vec<_>>()
            .join(", ");
        let shorts = self
            .shorts()
            .iter()
            .map(|s| format!("'{}'", s))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "(lower(btrim({u})) IN ({words}) OR btrim({u}) IN ({shorts}))",
            u = unit_sql,
            words = words,
            shorts = shorts
        )
    }
}

/// A resolved unit argument.
pub enum UnitArg {
    /// Known at compile time.
    Literal(DateUnit),
    /// Computed at query time; dispatched through a CASE.
    Dynamic(SqlExpr),
}

/// Resolve a unit argument. A literal string resolves (or fails) right
/// here; a computed text value defers to runtime; a value that can never be
/// text is rejected at compile time.
pub fn resolve_unit(b: &SqlBuilder, expr: SqlExpr, func: &str) -> Result<UnitArg, SqlExpr> {
    let invalid = || {
        SqlExpr::compile_error(
            CellValueType::Unknown,
            ErrorCode::Arg,
            &format!("invalid_unit:{}", func),
        )
    };

    if expr.is_array
        || matches!(
            expr.value_type,
            CellValueType::Number | CellValueType::Boolean | CellValueType::DateTime
        )
    {
        return Err(invalid());
    }

    match literal_text(&expr) {
        Some(text) => match DateUnit::parse(&text) {
            Some(unit) => Ok(UnitArg::Literal(unit)),
            None => Err(invalid()),
        },
        None => Ok(UnitArg::Dynamic(b.coerce_to_string(expr, TextMode::Plain))),
    }
}

/// Build the value SQL for a unit argument given the per-unit scalar form.
/// For a dynamic unit the result is a CASE plus an extra error guard the
/// caller must push after its argument errors.
pub fn dispatch<F>(unit: &UnitArg, func: &str, per_unit: F) -> (String, Option<(String, String)>)
where
    F: Fn(DateUnit) -> String,
{
    match unit {
        UnitArg::Literal(u) => (per_unit(*u), None),
        UnitArg::Dynamic(expr) => {
            let u = format!("(({})::text)", expr.value_sql);
            let mut value = String::from("(CASE");
            let mut matches = Vec::with_capacity(DateUnit::ALL.len());
            for unit in DateUnit::ALL.iter().copied() {
                let m = unit.match_sql(&u);
                value.push_str(&format!(" WHEN {} THEN {}", m, per_unit(unit)));
                matches.push(m);
            }
            value.push_str(" ELSE NULL END)");

            let fail = format!("(NOT ({}))", matches.join(" OR "));
            let message = error_literal(ErrorCode::Arg, &format!("invalid_unit:{}", func));
            (value, Some((fail, message)))
        }
    }
}

/// The text of a compile-time string literal, if that is what this
/// expression is. The compiler quotes literals itself, so the shape is
/// exact: a single-quoted fragment with doubled inner quotes.
pub(super) fn literal_text(expr: &SqlExpr) -> Option<String> {
    if expr.has_error() || expr.is_array || expr.value_type != CellValueType::String {
        return None;
    }
    let v = expr.value_sql.as_str();
    if v.len() < 2 || !v.starts_with('\'') || !v.ends_with('\'') {
        return None;
    }
    // Every quote inside one literal comes doubled; a lone quote means the
    // fragment is an expression, not a literal.
    let mut out = String::new();
    let mut chars = v[1..v.len() - 1].chars();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.next() != Some('\'') {
                return None;
            }
            out.push('\'');
        } else {
            out.push(c);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("day", Some(DateUnit::Day); "word")]
    #[test_case("Days", Some(DateUnit::Day); "word case insensitive")]
    #[test_case("d", Some(DateUnit::Day); "short")]
    #[test_case("M", Some(DateUnit::Month); "capital m is month")]
    #[test_case("m", Some(DateUnit::Minute); "lower m is minute")]
    #[test_case("ms", Some(DateUnit::Millisecond); "ms")]
    #[test_case("Q", Some(DateUnit::Quarter); "quarter short")]
    #[test_case(" week ", Some(DateUnit::Week); "trimmed")]
    #[test_case("fortnight", None; "unknown")]
    fn test_parse_unit(raw: &str, expected: Option<DateUnit>) {
        assert_eq!(DateUnit::parse(raw), expected);
    }

    #[test]
    fn test_literal_text_unquotes() {
        let e = SqlExpr::new("'o''clock'".to_owned(), CellValueType::String);
        assert_eq!(literal_text(&e), Some("o'clock".to_owned()));
    }

    #[test]
    fn test_literal_text_rejects_non_literal() {
        let e = SqlExpr::new("(col || 'x')".to_owned(), CellValueType::String);
        assert_eq!(literal_text(&e), None);
    }
}
