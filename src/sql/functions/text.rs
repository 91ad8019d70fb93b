//! Text functions. All of them coerce their arguments in `Plain` mode: no
//! display styling leaks into computed text.

use super::{with_value, wrong_arity};
use crate::{
    sql::builder::{SqlBuilder, TextMode},
    types::{CellValueType, ErrorParts, SqlExpr},
};

const NUM_REASON: &str = "cannot_cast_to_number";

fn plain(b: &SqlBuilder, expr: SqlExpr) -> SqlExpr {
    b.coerce_to_string(expr, TextMode::Plain)
}

fn nonnull(sql: &str) -> String {
    format!("COALESCE(({}), '')", sql)
}

pub fn concatenate(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if args.is_empty() {
        return wrong_arity("CONCATENATE");
    }

    let parts: Vec<SqlExpr> = args.into_iter().map(|a| plain(b, a)).collect();
    let refs: Vec<&SqlExpr> = parts.iter().collect();
    let value = format!(
        "({})",
        parts
            .iter()
            .map(|p| nonnull(&p.value_sql))
            .collect::<Vec<_>>()
            .join(" || ")
    );
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::String))
}

fn edge_slice(b: &SqlBuilder, args: Vec<SqlExpr>, name: &str, func: &str) -> SqlExpr {
    let (text, count) = match <[SqlExpr; 2]>::try_from(args) {
        Ok([t, c]) => (t, Some(c)),
        Err(args) => match <[SqlExpr; 1]>::try_from(args) {
            Ok([t]) => (t, None),
            Err(_) => return wrong_arity(name),
        },
    };

    let text = plain(b, text);
    let count = match count {
        Some(c) => b.coerce_to_number(c, NUM_REASON),
        None => SqlExpr::new("1".to_owned(), CellValueType::Number),
    };
    let value = format!(
        "{}({}, GREATEST((COALESCE(({}), 1))::int, 0))",
        func,
        nonnull(&text.value_sql),
        count.value_sql
    );
    ErrorParts::merge(&[&text, &count]).apply(SqlExpr::new(value, CellValueType::String))
}

pub fn left(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    edge_slice(b, args, "LEFT", "left")
}

pub fn right(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    edge_slice(b, args, "RIGHT", "right")
}

pub fn mid(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([text, start, count]) = <[SqlExpr; 3]>::try_from(args) else {
        return wrong_arity("MID");
    };
    let text = plain(b, text);
    let start = b.coerce_to_number(start, NUM_REASON);
    let count = b.coerce_to_number(count, NUM_REASON);
    let value = format!(
        "substr({}, (COALESCE(({}), 1))::int, GREATEST((COALESCE(({}), 0))::int, 0))",
        nonnull(&text.value_sql),
        start.value_sql,
        count.value_sql
    );
    ErrorParts::merge(&[&text, &start, &count]).apply(SqlExpr::new(value, CellValueType::String))
}

pub fn len(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([text]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("LEN");
    };
    let text = plain(b, text);
    let value = format!("length({})", nonnull(&text.value_sql));
    with_value(text, value, CellValueType::Number)
}

fn text_unary(b: &SqlBuilder, args: Vec<SqlExpr>, name: &str, func: &str) -> SqlExpr {
    let Ok([text]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity(name);
    };
    let text = plain(b, text);
    let value = format!("{}({})", func, nonnull(&text.value_sql));
    with_value(text, value, CellValueType::String)
}

pub fn lower(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    text_unary(b, args, "LOWER", "lower")
}

pub fn upper(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    text_unary(b, args, "UPPER", "upper")
}

pub fn trim(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    text_unary(b, args, "TRIM", "btrim")
}

/// T: the value when it is text, blank otherwise. Decided statically from
/// the argument's type.
pub fn t(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([arg]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("T");
    };
    if arg.value_type == CellValueType::String && !arg.is_array {
        plain(b, arg)
    } else {
        ErrorParts::merge(&[&arg]).apply(SqlExpr::typed_null(CellValueType::String))
    }
}

pub fn rept(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([text, times]) = <[SqlExpr; 2]>::try_from(args) else {
        return wrong_arity("REPT");
    };
    let text = plain(b, text);
    let times = b.coerce_to_number(times, NUM_REASON);
    let value = format!(
        "repeat({}, GREATEST((COALESCE(({}), 0))::int, 0))",
        nonnull(&text.value_sql),
        times.value_sql
    );
    ErrorParts::merge(&[&text, &times]).apply(SqlExpr::new(value, CellValueType::String))
}

pub fn replace(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([text, start, count, replacement]) = <[SqlExpr; 4]>::try_from(args) else {
        return wrong_arity("REPLACE");
    };
    let text = plain(b, text);
    let start = b.coerce_to_number(start, NUM_REASON);
    let count = b.coerce_to_number(count, NUM_REASON);
    let replacement = plain(b, replacement);
    let value = format!(
        "overlay({} placing {} from (COALESCE(({}), 1))::int \
         for GREATEST((COALESCE(({}), 0))::int, 0))",
        nonnull(&text.value_sql),
        nonnull(&replacement.value_sql),
        start.value_sql,
        count.value_sql
    );
    ErrorParts::merge(&[&text, &start, &count, &replacement])
        .apply(SqlExpr::new(value, CellValueType::String))
}

pub fn substitute(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (text, old, new, index) = match <[SqlExpr; 4]>::try_from(args) {
        Ok([t, o, n, i]) => (t, o, n, Some(i)),
        Err(args) => match <[SqlExpr; 3]>::try_from(args) {
            Ok([t, o, n]) => (t, o, n, None),
            Err(_) => return wrong_arity("SUBSTITUTE"),
        },
    };

    let text = plain(b, text);
    let old = plain(b, old);
    let new = plain(b, new);

    let value = match &index {
        None => format!(
            "replace({}, {}, {})",
            nonnull(&text.value_sql),
            nonnull(&old.value_sql),
            nonnull(&new.value_sql)
        ),
        Some(_) => {
            // Occurrence-specific substitution goes through the regex
            // engine; the needle and the replacement both need escaping.
            let escaped_old = format!(
                "regexp_replace({}, '([\\^$.|?*+()\\[\\]{{}}])', '\\\\\\1', 'g')",
                nonnull(&old.value_sql)
            );
            let escaped_new = format!("replace({}, '\\', '\\\\')", nonnull(&new.value_sql));
            format!(
                "regexp_replace({}, {}, {}, 1, GREATEST((COALESCE((__IDX__), 1))::int, 1))",
                nonnull(&text.value_sql),
                escaped_old,
                escaped_new
            )
        }
    };

    match index {
        None => ErrorParts::merge(&[&text, &old, &new])
            .apply(SqlExpr::new(value, CellValueType::String)),
        Some(index) => {
            let index = b.coerce_to_number(index, NUM_REASON);
            let value = value.replace("__IDX__", &index.value_sql);
            ErrorParts::merge(&[&text, &old, &new, &index])
                .apply(SqlExpr::new(value, CellValueType::String))
        }
    }
}

fn find_value(haystack: &str, needle: &str, start: Option<&str>) -> String {
    match start {
        None => format!("strpos({}, {})", haystack, needle),
        Some(s) => format!(
            "(CASE WHEN strpos(substr({h}, ({s})::int), {n}) = 0 THEN 0 \
             ELSE strpos(substr({h}, ({s})::int), {n}) + ({s})::int - 1 END)",
            h = haystack,
            n = needle,
            s = s
        ),
    }
}

fn locate(b: &SqlBuilder, args: Vec<SqlExpr>, name: &str) -> SqlExpr {
    let (needle, haystack, start) = match <[SqlExpr; 3]>::try_from(args) {
        Ok([n, h, s]) => (n, h, Some(s)),
        Err(args) => match <[SqlExpr; 2]>::try_from(args) {
            Ok([n, h]) => (n, h, None),
            Err(_) => return wrong_arity(name),
        },
    };

    let needle = plain(b, needle);
    let haystack = plain(b, haystack);
    let start = start.map(|s| b.coerce_to_number(s, NUM_REASON));

    let start_sql = start
        .as_ref()
        .map(|s| format!("COALESCE(({}), 1)", s.value_sql));
    let raw = find_value(
        &nonnull(&haystack.value_sql),
        &nonnull(&needle.value_sql),
        start_sql.as_deref(),
    );
    // FIND yields 0 when absent, SEARCH yields blank.
    let value = if name == "SEARCH" {
        format!("NULLIF({}, 0)", raw)
    } else {
        raw
    };

    let mut refs: Vec<&SqlExpr> = vec![&needle, &haystack];
    if let Some(s) = &start {
        refs.push(s);
    }
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::Number))
}

pub fn find(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    locate(b, args, "FIND")
}

pub fn search(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    locate(b, args, "SEARCH")
}

/// Characters percent-encoded by ENCODE_URL_COMPONENT, percent first so
/// already-encoded output is not double-escaped.
const URL_ESCAPES: &[(&str, &str)] = &[
    ("%", "%25"),
    (" ", "%20"),
    ("\"", "%22"),
    ("#", "%23"),
    ("$", "%24"),
    ("&", "%26"),
    ("+", "%2B"),
    (",", "%2C"),
    ("/", "%2F"),
    (":", "%3A"),
    (";", "%3B"),
    ("<", "%3C"),
    ("=", "%3D"),
    (">", "%3E"),
    ("?", "%3F"),
    ("@", "%40"),
    ("[", "%5B"),
    ("\\", "%5C"),
    ("]", "%5D"),
    ("^", "%5E"),
    ("`", "%60"),
    ("{", "%7B"),
    ("|", "%7C"),
    ("}", "%7D"),
];

pub fn encode_url_component(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([text]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("ENCODE_URL_COMPONENT");
    };
    let text = plain(b, text);

    let mut value = nonnull(&text.value_sql);
    for (from, to) in URL_ESCAPES {
        value = format!("replace({}, '{}', '{}')", value, from, to);
    }
    with_value(text, value, CellValueType::String)
}
