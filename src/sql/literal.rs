//! Pure string-building helpers: SQL literal quoting, error-sentinel
//! construction and the small jsonb snippets shared by the array engine.

use crate::types::ErrorCode;

/// Prefix of the error sentinel value returned on the error path.
pub const ERROR_PREFIX: &str = "#ERROR:";

/// Quote `s` as a SQL string literal, doubling embedded single quotes.
pub fn quote_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// Build the quoted `'#ERROR:<CODE>:<reason>'` literal for an error path.
pub fn error_literal(code: ErrorCode, reason: &str) -> String {
    quote_literal(&format!("{}{}:{}", ERROR_PREFIX, code.as_str(), reason))
}

/// Error sentinel whose reason is itself a SQL text fragment, concatenated
/// at evaluation time.
pub fn dynamic_error_message(code: ErrorCode, reason_sql: &str) -> String {
    format!(
        "({} || COALESCE({}, 'unknown'))",
        quote_literal(&format!("{}{}:", ERROR_PREFIX, code.as_str())),
        reason_sql
    )
}

/// Render a jsonb object fragment as display text: prefer `title`, then
/// `name`, then the raw text of the value.
pub fn json_object_display_text(obj_sql: &str) -> String {
    format!(
        "COALESCE(({obj}) ->> 'title', ({obj}) ->> 'name', ({obj}) #>> '{{}}')",
        obj = obj_sql
    )
}

/// Normalize an arbitrary jsonb fragment into an array: NULL becomes `[]`,
/// an array stays as-is, anything else is wrapped into one element. The
/// canonical shape every downstream array operation relies on.
pub fn json_normalize_any(value_sql: &str) -> String {
    format!(
        "(CASE WHEN ({v}) IS NULL THEN '[]'::jsonb \
         WHEN jsonb_typeof(({v})::jsonb) = 'array' THEN ({v})::jsonb \
         ELSE jsonb_build_array({v}) END)",
        v = value_sql
    )
}
