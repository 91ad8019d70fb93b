//! Date and time functions.
//!
//! Calendar-level work (extraction, truncation, day arithmetic) happens on
//! the wall-clock timestamp in the configured zone; elapsed-time work
//! (hour-and-below differences) stays on the absolute timestamptz. This is
//! what makes `DATETIME_DIFF(A, DATE_ADD(A, 1, "day"), "day")` exactly 1
//! across daylight-saving boundaries.

use super::{
    units::{self, DateUnit, UnitArg},
    with_value, wrong_arity,
};
use crate::{
    sql::{
        builder::{SqlBuilder, TextMode},
        literal::error_literal,
        validation::CastTarget,
    },
    types::{CellValueType, ErrorCode, ErrorParts, SqlExpr},
};

const CAST_REASON: &str = "cannot_cast_to_datetime";
const NUM_REASON: &str = "cannot_cast_to_number";

/// Wall-clock timestamp of a timestamptz fragment in `zone`.
fn local(value_sql: &str, zone: &str) -> String {
    format!("(({}) AT TIME ZONE '{}')", value_sql, zone)
}

pub fn today(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if !args.is_empty() {
        return wrong_arity("TODAY");
    }
    let zone = b.zone_name();
    let value = format!(
        "(date_trunc('day', {}) AT TIME ZONE '{}')",
        local("now()", &zone),
        zone
    );
    SqlExpr::new(value, CellValueType::DateTime)
}

pub fn now(_b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    if !args.is_empty() {
        return wrong_arity("NOW");
    }
    SqlExpr::new("now()".to_owned(), CellValueType::DateTime)
}

fn extract_part(b: &SqlBuilder, args: Vec<SqlExpr>, name: &str, part: &str) -> SqlExpr {
    let Ok([arg]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity(name);
    };
    let ts = b.coerce_to_datetime(arg, CAST_REASON);
    let value = format!(
        "(EXTRACT({} FROM {})::numeric)",
        part,
        local(&ts.value_sql, &b.zone_name())
    );
    with_value(ts, value, CellValueType::Number)
}

pub fn year(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    extract_part(b, args, "YEAR", "YEAR")
}

pub fn month(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    extract_part(b, args, "MONTH", "MONTH")
}

pub fn day(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    extract_part(b, args, "DAY", "DAY")
}

pub fn hour(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    extract_part(b, args, "HOUR", "HOUR")
}

pub fn minute(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    extract_part(b, args, "MINUTE", "MINUTE")
}

pub fn second(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([arg]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("SECOND");
    };
    let ts = b.coerce_to_datetime(arg, CAST_REASON);
    // EXTRACT(SECOND) carries the fractional part; the function is whole
    // seconds.
    let value = format!(
        "(floor(EXTRACT(SECOND FROM {}))::numeric)",
        local(&ts.value_sql, &b.zone_name())
    );
    with_value(ts, value, CellValueType::Number)
}

/// Week start-day argument of WEEKDAY and WEEKNUM. Resolved the same way
/// date units are: a string literal picks its branch (or fails) at compile
/// time, a computed value dispatches at runtime, and a value that can
/// never be text is an immediate argument error.
enum StartDay {
    Sunday,
    Monday,
    Dynamic(SqlExpr),
}

fn resolve_start_day(b: &SqlBuilder, expr: SqlExpr, func: &str) -> Result<StartDay, SqlExpr> {
    let invalid = || {
        SqlExpr::compile_error(
            CellValueType::Unknown,
            ErrorCode::Arg,
            &format!("invalid_start_day:{}", func),
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

    match units::literal_text(&expr) {
        Some(text) => match text.trim().to_lowercase().as_str() {
            "sunday" => Ok(StartDay::Sunday),
            "monday" => Ok(StartDay::Monday),
            _ => Err(invalid()),
        },
        None => Ok(StartDay::Dynamic(b.coerce_to_string(expr, TextMode::Plain))),
    }
}

/// WEEKDAY: 0 through 6 counted from the start day, Sunday by default.
pub fn weekday(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (date, start) = match <[SqlExpr; 2]>::try_from(args) {
        Ok([d, s]) => (d, Some(s)),
        Err(args) => match <[SqlExpr; 1]>::try_from(args) {
            Ok([d]) => (d, None),
            Err(_) => return wrong_arity("WEEKDAY"),
        },
    };

    let ts = b.coerce_to_datetime(date, CAST_REASON);
    let dow = format!(
        "(EXTRACT(DOW FROM {})::int)",
        local(&ts.value_sql, &b.zone_name())
    );

    let start = match start {
        None => StartDay::Sunday,
        Some(s) => match resolve_start_day(b, s, "WEEKDAY") {
            Ok(s) => s,
            Err(e) => return e,
        },
    };

    let start = match start {
        StartDay::Sunday => {
            return with_value(ts, format!("({})::numeric", dow), CellValueType::Number);
        }
        StartDay::Monday => {
            let value = format!("((({} + 6) % 7)::numeric)", dow);
            return with_value(ts, value, CellValueType::Number);
        }
        StartDay::Dynamic(start) => start,
    };

    let start_text = format!("lower(btrim(COALESCE(({})::text, 'sunday')))", start.value_sql);
    let value = format!(
        "((CASE WHEN {start} = 'monday' THEN ({dow} + 6) % 7 ELSE {dow} END)::numeric)",
        start = start_text,
        dow = dow
    );
    let fail = format!("({} NOT IN ('sunday', 'monday'))", start_text);
    ErrorParts::merge(&[&ts, &start])
        .push(fail, error_literal(ErrorCode::Arg, "invalid_start_day:WEEKDAY"))
        .apply(SqlExpr::new(value, CellValueType::Number))
}

/// WEEKNUM: the week containing January 1st is week 1.
pub fn weeknum(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (date, start) = match <[SqlExpr; 2]>::try_from(args) {
        Ok([d, s]) => (d, Some(s)),
        Err(args) => match <[SqlExpr; 1]>::try_from(args) {
            Ok([d]) => (d, None),
            Err(_) => return wrong_arity("WEEKNUM"),
        },
    };

    let ts = b.coerce_to_datetime(date, CAST_REASON);
    let d = local(&ts.value_sql, &b.zone_name());
    let weeknum_from = |offset: u8| {
        format!(
            "(floor((EXTRACT(DOY FROM {d})::int - 1 \
             + ((EXTRACT(DOW FROM date_trunc('year', {d}))::int + {off}) % 7))::numeric / 7) + 1)",
            d = d,
            off = offset
        )
    };

    let start = match start {
        None => StartDay::Sunday,
        Some(s) => match resolve_start_day(b, s, "WEEKNUM") {
            Ok(s) => s,
            Err(e) => return e,
        },
    };

    let start = match start {
        StartDay::Sunday => return with_value(ts, weeknum_from(0), CellValueType::Number),
        StartDay::Monday => return with_value(ts, weeknum_from(6), CellValueType::Number),
        StartDay::Dynamic(start) => start,
    };

    let start_text = format!("lower(btrim(COALESCE(({})::text, 'sunday')))", start.value_sql);
    let value = format!(
        "(CASE WHEN {start} = 'monday' THEN {monday} ELSE {sunday} END)",
        start = start_text,
        monday = weeknum_from(6),
        sunday = weeknum_from(0)
    );
    let fail = format!("({} NOT IN ('sunday', 'monday'))", start_text);
    ErrorParts::merge(&[&ts, &start])
        .push(fail, error_literal(ErrorCode::Arg, "invalid_start_day:WEEKNUM"))
        .apply(SqlExpr::new(value, CellValueType::Number))
}

pub fn date_add(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([date, count, unit]) = <[SqlExpr; 3]>::try_from(args) else {
        return wrong_arity("DATE_ADD");
    };

    let ts = b.coerce_to_datetime(date, CAST_REASON);
    let count = b.coerce_to_number(count, NUM_REASON);
    let unit = match units::resolve_unit(b, unit, "DATE_ADD") {
        Ok(u) => u,
        Err(e) => return e,
    };

    let zone = b.zone_name();
    let wall = local(&ts.value_sql, &zone);
    let n = format!("({})", count.value_sql);
    // Add on the wall clock, then pin the result back to an absolute
    // instant; one added day is one calendar day even across a DST switch.
    let (added, unit_fail) = units::dispatch(&unit, "DATE_ADD", |u| {
        let interval = match u {
            DateUnit::Year => format!("make_interval(years => ({})::int)", n),
            DateUnit::Quarter => format!("make_interval(months => (({})::int * 3))", n),
            DateUnit::Month => format!("make_interval(months => ({})::int)", n),
            DateUnit::Week => format!("make_interval(days => (({})::int * 7))", n),
            DateUnit::Day => format!("make_interval(days => ({})::int)", n),
            DateUnit::Hour => format!("make_interval(hours => ({})::int)", n),
            DateUnit::Minute => format!("make_interval(mins => ({})::int)", n),
            DateUnit::Second => format!("make_interval(secs => ({})::double precision)", n),
            DateUnit::Millisecond => {
                format!("make_interval(secs => (({})::double precision / 1000.0))", n)
            }
        };
        format!("(({} + {}) AT TIME ZONE '{}')", wall, interval, zone)
    });

    let mut refs: Vec<&SqlExpr> = vec![&ts, &count];
    if let UnitArg::Dynamic(u) = &unit {
        refs.push(u);
    }
    let mut parts = ErrorParts::merge(&refs);
    if let Some((cond, msg)) = unit_fail {
        parts = parts.push(cond, msg);
    }
    parts.apply(SqlExpr::new(added, CellValueType::DateTime))
}

/// Signed difference `lhs - rhs` in `unit`. Calendar units go through
/// `age`/wall-clock arithmetic, elapsed units through the epoch.
fn diff_sql(lhs_tz: &str, rhs_tz: &str, zone: &str, unit: DateUnit) -> String {
    let a = local(lhs_tz, zone);
    let b = local(rhs_tz, zone);
    let months = format!(
        "((EXTRACT(YEAR FROM age({a}, {b})) * 12) + EXTRACT(MONTH FROM age({a}, {b})))",
        a = a,
        b = b
    );
    let wall_epoch = format!("EXTRACT(EPOCH FROM ({} - {}))", a, b);
    let abs_epoch = format!("EXTRACT(EPOCH FROM (({}) - ({})))", lhs_tz, rhs_tz);

    match unit {
        DateUnit::Year => format!("(EXTRACT(YEAR FROM age({}, {}))::numeric)", a, b),
        DateUnit::Quarter => format!("(trunc({} / 3)::numeric)", months),
        DateUnit::Month => format!("(({})::numeric)", months),
        DateUnit::Week => format!("(trunc({} / 604800)::numeric)", wall_epoch),
        DateUnit::Day => format!("(trunc({} / 86400)::numeric)", wall_epoch),
        DateUnit::Hour => format!("(trunc({} / 3600)::numeric)", abs_epoch),
        DateUnit::Minute => format!("(trunc({} / 60)::numeric)", abs_epoch),
        DateUnit::Second => format!("(trunc({})::numeric)", abs_epoch),
        DateUnit::Millisecond => format!("(trunc({} * 1000)::numeric)", abs_epoch),
    }
}

fn diff_between(
    b: &SqlBuilder,
    lhs: SqlExpr,
    rhs: SqlExpr,
    unit: Option<SqlExpr>,
    func: &str,
    absolute: bool,
) -> SqlExpr {
    let lhs = b.coerce_to_datetime(lhs, CAST_REASON);
    let rhs = b.coerce_to_datetime(rhs, CAST_REASON);
    let unit = match unit {
        Some(u) => match units::resolve_unit(b, u, func) {
            Ok(u) => u,
            Err(e) => return e,
        },
        None => UnitArg::Literal(DateUnit::Day),
    };

    let zone = b.zone_name();
    let (value, unit_fail) = units::dispatch(&unit, func, |u| {
        diff_sql(&lhs.value_sql, &rhs.value_sql, &zone, u)
    });
    let value = if absolute {
        format!("(abs({}))", value)
    } else {
        value
    };

    let mut refs: Vec<&SqlExpr> = vec![&lhs, &rhs];
    if let UnitArg::Dynamic(u) = &unit {
        refs.push(u);
    }
    let mut parts = ErrorParts::merge(&refs);
    if let Some((cond, msg)) = unit_fail {
        parts = parts.push(cond, msg);
    }
    parts.apply(SqlExpr::new(value, CellValueType::Number))
}

pub fn datetime_diff(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (lhs, rhs, unit) = match <[SqlExpr; 3]>::try_from(args) {
        Ok([l, r, u]) => (l, r, Some(u)),
        Err(args) => match <[SqlExpr; 2]>::try_from(args) {
            Ok([l, r]) => (l, r, None),
            Err(_) => return wrong_arity("DATETIME_DIFF"),
        },
    };
    diff_between(b, lhs, rhs, unit, "DATETIME_DIFF", false)
}

/// Whole units elapsed from `date` to now.
pub fn tonow(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (date, unit) = match <[SqlExpr; 2]>::try_from(args) {
        Ok([d, u]) => (d, Some(u)),
        Err(args) => match <[SqlExpr; 1]>::try_from(args) {
            Ok([d]) => (d, None),
            Err(_) => return wrong_arity("TONOW"),
        },
    };
    let now = SqlExpr::new("now()".to_owned(), CellValueType::DateTime);
    diff_between(b, now, date, unit, "TONOW", true)
}

pub fn fromnow(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (date, unit) = match <[SqlExpr; 2]>::try_from(args) {
        Ok([d, u]) => (d, Some(u)),
        Err(args) => match <[SqlExpr; 1]>::try_from(args) {
            Ok([d]) => (d, None),
            Err(_) => return wrong_arity("FROMNOW"),
        },
    };
    let now = SqlExpr::new("now()".to_owned(), CellValueType::DateTime);
    diff_between(b, date, now, unit, "FROMNOW", true)
}

const DEFAULT_PATTERN: &str = "YYYY-MM-DD HH24:MI";

pub fn datetime_format(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (date, pattern) = match <[SqlExpr; 2]>::try_from(args) {
        Ok([d, p]) => (d, Some(p)),
        Err(args) => match <[SqlExpr; 1]>::try_from(args) {
            Ok([d]) => (d, None),
            Err(_) => return wrong_arity("DATETIME_FORMAT"),
        },
    };

    let ts = b.coerce_to_datetime(date, CAST_REASON);
    let wall = local(&ts.value_sql, &b.zone_name());
    match pattern {
        None => {
            let value = format!("to_char({}, '{}')", wall, DEFAULT_PATTERN);
            with_value(ts, value, CellValueType::String)
        }
        Some(pattern) => {
            let pattern = b.coerce_to_string(pattern, TextMode::Plain);
            let value = format!(
                "to_char({}, COALESCE(({})::text, '{}'))",
                wall, pattern.value_sql, DEFAULT_PATTERN
            );
            ErrorParts::merge(&[&ts, &pattern]).apply(SqlExpr::new(value, CellValueType::String))
        }
    }
}

pub fn datetime_parse(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (text, pattern) = match <[SqlExpr; 2]>::try_from(args) {
        Ok([t, p]) => (t, Some(p)),
        Err(args) => match <[SqlExpr; 1]>::try_from(args) {
            Ok([t]) => (t, None),
            Err(_) => return wrong_arity("DATETIME_PARSE"),
        },
    };

    // Without a pattern this is the ordinary loose datetime coercion.
    let Some(pattern) = pattern else {
        return b.coerce_to_datetime(text, CAST_REASON);
    };

    let text = b.coerce_to_string(text, TextMode::Plain);
    let pattern = b.coerce_to_string(pattern, TextMode::Plain);
    // The parsed wall time is reinterpreted in the configured zone.
    let value = format!(
        "((to_timestamp(({})::text, ({})::text))::timestamp AT TIME ZONE '{}')",
        text.value_sql,
        pattern.value_sql,
        b.zone_name()
    );
    ErrorParts::merge(&[&text, &pattern]).apply(SqlExpr::new(value, CellValueType::DateTime))
}

pub fn datestr(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([date]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("DATESTR");
    };
    let ts = b.coerce_to_datetime(date, CAST_REASON);
    let value = format!(
        "to_char({}, 'YYYY-MM-DD')",
        local(&ts.value_sql, &b.zone_name())
    );
    with_value(ts, value, CellValueType::String)
}

pub fn timestr(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let Ok([date]) = <[SqlExpr; 1]>::try_from(args) else {
        return wrong_arity("TIMESTR");
    };
    let ts = b.coerce_to_datetime(date, CAST_REASON);
    let value = format!(
        "to_char({}, 'HH24:MI:SS')",
        local(&ts.value_sql, &b.zone_name())
    );
    with_value(ts, value, CellValueType::String)
}

fn trunc_name(unit: DateUnit) -> &'static str {
    match unit {
        DateUnit::Year => "year",
        DateUnit::Quarter => "quarter",
        DateUnit::Month => "month",
        DateUnit::Week => "week",
        DateUnit::Day => "day",
        DateUnit::Hour => "hour",
        DateUnit::Minute => "minute",
        DateUnit::Second => "second",
        DateUnit::Millisecond => "milliseconds",
    }
}

pub fn is_same(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (lhs, rhs, unit) = match <[SqlExpr; 3]>::try_from(args) {
        Ok([l, r, u]) => (l, r, Some(u)),
        Err(args) => match <[SqlExpr; 2]>::try_from(args) {
            Ok([l, r]) => (l, r, None),
            Err(_) => return wrong_arity("IS_SAME"),
        },
    };

    let lhs = b.coerce_to_datetime(lhs, CAST_REASON);
    let rhs = b.coerce_to_datetime(rhs, CAST_REASON);

    let Some(unit) = unit else {
        let value = format!("(({}) = ({}))", lhs.value_sql, rhs.value_sql);
        return ErrorParts::merge(&[&lhs, &rhs]).apply(SqlExpr::new(value, CellValueType::Boolean));
    };

    let unit = match units::resolve_unit(b, unit, "IS_SAME") {
        Ok(u) => u,
        Err(e) => return e,
    };
    let zone = b.zone_name();
    let a = local(&lhs.value_sql, &zone);
    let c = local(&rhs.value_sql, &zone);
    let (value, unit_fail) = units::dispatch(&unit, "IS_SAME", |u| {
        format!(
            "(date_trunc('{name}', {a}) = date_trunc('{name}', {c}))",
            name = trunc_name(u),
            a = a,
            c = c
        )
    });

    let mut refs: Vec<&SqlExpr> = vec![&lhs, &rhs];
    if let UnitArg::Dynamic(u) = &unit {
        refs.push(u);
    }
    let mut parts = ErrorParts::merge(&refs);
    if let Some((cond, msg)) = unit_fail {
        parts = parts.push(cond, msg);
    }
    parts.apply(SqlExpr::new(value, CellValueType::Boolean))
}

fn ordered(b: &SqlBuilder, args: Vec<SqlExpr>, name: &str, token: &str) -> SqlExpr {
    let Ok([lhs, rhs]) = <[SqlExpr; 2]>::try_from(args) else {
        return wrong_arity(name);
    };
    let lhs = b.coerce_to_datetime(lhs, CAST_REASON);
    let rhs = b.coerce_to_datetime(rhs, CAST_REASON);
    let value = format!(
        "(COALESCE(({}) {} ({}), FALSE))",
        lhs.value_sql, token, rhs.value_sql
    );
    ErrorParts::merge(&[&lhs, &rhs]).apply(SqlExpr::new(value, CellValueType::Boolean))
}

pub fn is_after(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    ordered(b, args, "IS_AFTER", ">")
}

pub fn is_before(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    ordered(b, args, "IS_BEFORE", "<")
}

/// Step `base` (a weekday date fragment) forward by `k` working days; `k`
/// must be a non-negative int fragment.
fn step_forward(base: &str, k: &str) -> String {
    format!(
        "({b} + ((({k}) / 5) * 7 + (({k}) % 5) \
         + CASE WHEN EXTRACT(ISODOW FROM {b})::int + (({k}) % 5) >= 6 THEN 2 ELSE 0 END))",
        b = base,
        k = k
    )
}

fn step_backward(base: &str, k: &str) -> String {
    format!(
        "({b} - ((({k}) / 5) * 7 + (({k}) % 5) \
         + CASE WHEN EXTRACT(ISODOW FROM {b})::int - (({k}) % 5) <= 0 THEN 2 ELSE 0 END))",
        b = base,
        k = k
    )
}

/// Count of weekday holidays from the comma-separated list in `list_sql`
/// falling inside `(lo, hi]`. Unparseable entries are skipped.
fn holiday_count(b: &SqlBuilder, list_sql: &str, lo: &str, hi: &str) -> String {
    let entry = "btrim(hx.x)";
    let valid = b.validation.is_valid_for_type(entry, CastTarget::Timestamp);
    format!(
        "(SELECT count(*)::int FROM regexp_split_to_table({list}, ',') AS hx(x) \
         WHERE {entry} <> '' AND {valid} \
         AND EXTRACT(ISODOW FROM ({entry})::date)::int < 6 \
         AND ({entry})::date > {lo} AND ({entry})::date <= {hi})",
        list = list_sql,
        entry = entry,
        valid = valid,
        lo = lo,
        hi = hi
    )
}

fn holiday_list_arg(b: &SqlBuilder, holidays: Option<SqlExpr>) -> (String, Option<SqlExpr>) {
    match holidays {
        Some(h) => {
            let h = b.coerce_to_string(h, TextMode::Plain);
            (format!("COALESCE(({})::text, '')", h.value_sql), Some(h))
        }
        None => ("''".to_owned(), None),
    }
}

/// WORKDAY: the date `n` working days from `start`, weekends skipped, then
/// extended past any weekday holidays that fell inside the walked span.
pub fn workday(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (start, count, holidays) = match <[SqlExpr; 3]>::try_from(args) {
        Ok([s, c, h]) => (s, c, Some(h)),
        Err(args) => match <[SqlExpr; 2]>::try_from(args) {
            Ok([s, c]) => (s, c, None),
            Err(_) => return wrong_arity("WORKDAY"),
        },
    };

    let ts = b.coerce_to_datetime(start, CAST_REASON);
    let count = b.coerce_to_number(count, NUM_REASON);
    let (list, holidays) = holiday_list_arg(b, holidays);

    let zone = b.zone_name();
    // Weekend starts normalize to the nearest weekday against the direction
    // of travel, so the first step lands on a working day.
    let friday_base = "(s.d0 - CASE WHEN EXTRACT(ISODOW FROM s.d0)::int = 6 THEN 1 \
                       WHEN EXTRACT(ISODOW FROM s.d0)::int = 7 THEN 2 ELSE 0 END)";
    let monday_base = "(s.d0 + CASE WHEN EXTRACT(ISODOW FROM s.d0)::int = 6 THEN 2 \
                       WHEN EXTRACT(ISODOW FROM s.d0)::int = 7 THEN 1 ELSE 0 END)";

    let value = format!(
        "(SELECT ((CASE WHEN u.n = 0 THEN u.d0 \
                   WHEN u.n > 0 THEN {ext_fwd} \
                   ELSE {ext_back} END)::timestamp AT TIME ZONE '{zone}') \
          FROM (SELECT t.*, {hc} AS hc \
                FROM (SELECT s.*, CASE WHEN s.n >= 0 THEN {fwd} ELSE {back} END AS r0 \
                      FROM (SELECT ({start})::date AS d0, (COALESCE(({n}), 0))::int AS n) AS s) AS t) AS u)",
        ext_fwd = step_forward("u.r0", "u.hc"),
        ext_back = step_backward("u.r0", "u.hc"),
        zone = zone,
        hc = holiday_count(b, &list, "LEAST(t.d0, t.r0)", "GREATEST(t.d0, t.r0)"),
        fwd = step_forward(friday_base, "s.n"),
        back = step_backward(monday_base, "abs(s.n)"),
        start = local(&ts.value_sql, &zone),
        n = count.value_sql
    );

    let mut refs: Vec<&SqlExpr> = vec![&ts, &count];
    if let Some(h) = &holidays {
        refs.push(h);
    }
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::DateTime))
}

/// WORKDAY_DIFF: signed count of working days between two dates, both ends
/// inclusive, weekday holidays subtracted.
pub fn workday_diff(b: &SqlBuilder, args: Vec<SqlExpr>) -> SqlExpr {
    let (from, to, holidays) = match <[SqlExpr; 3]>::try_from(args) {
        Ok([f, t, h]) => (f, t, Some(h)),
        Err(args) => match <[SqlExpr; 2]>::try_from(args) {
            Ok([f, t]) => (f, t, None),
            Err(_) => return wrong_arity("WORKDAY_DIFF"),
        },
    };

    let from = b.coerce_to_datetime(from, CAST_REASON);
    let to = b.coerce_to_datetime(to, CAST_REASON);
    let (list, holidays) = holiday_list_arg(b, holidays);

    let zone = b.zone_name();
    let d1 = format!("({})::date", local(&from.value_sql, &zone));
    let d2 = format!("({})::date", local(&to.value_sql, &zone));

    // Whole weeks contribute five days each; the remainder is walked day by
    // day (at most six steps).
    let value = format!(
        "(SELECT (s.sgn * (((s.b - s.a + 1) / 7) * 5 \
          + (SELECT count(*) FROM generate_series(0, ((s.b - s.a + 1) % 7) - 1) AS g(i) \
             WHERE ((EXTRACT(ISODOW FROM s.a)::int - 1 + g.i) % 7) < 5) \
          - {hc}))::numeric \
          FROM (SELECT LEAST({d1}, {d2}) AS a, GREATEST({d1}, {d2}) AS b, \
                CASE WHEN {d1} <= {d2} THEN 1 ELSE -1 END AS sgn) AS s)",
        hc = holiday_count(b, &list, "(s.a - 1)", "s.b"),
        d1 = d1,
        d2 = d2
    );

    let mut refs: Vec<&SqlExpr> = vec![&from, &to];
    if let Some(h) = &holidays {
        refs.push(h);
    }
    ErrorParts::merge(&refs).apply(SqlExpr::new(value, CellValueType::Number))
}
