//! Scalar coercions between the five logical value types.

use super::SqlBuilder;
use crate::{
    sql::{
        literal::{error_literal, json_object_display_text},
        validation::CastTarget,
    },
    types::{CellValueType, ErrorCode, ErrorParts, Formatting, SqlExpr, StorageKind},
};

/// Longest leading numeric prefix: optional sign, digits, one decimal
/// point. No exponent on purpose. The whole prefix sits in the first
/// parenthesized group: `substring(text from pattern)` returns the first
/// group when the pattern has one, not the full match.
pub(super) const LEADING_NUMBER: &str = r"^([+-]?[0-9]+(\.[0-9]+)?)";
/// A numeric prefix followed by an exponent tail. Scientific notation is
/// rejected as a documented policy: aggregate functions over mixed-type
/// arrays must not silently produce malformed results.
pub(super) const SCIENTIFIC: &str = r"^[+-]?[0-9]+(\.[0-9]+)?[eE][+-]?[0-9]+";
/// Explicit UTC-offset tail of an absolute timestamp. A time of day must
/// precede the offset; otherwise the day component of a bare date like
/// `2026-01-02` would read as a `-02` offset.
const OFFSET_TAIL: &str =
    r"[0-9]{2}:[0-9]{2}(:[0-9]{2}(\.[0-9]+)?)?[[:space:]]*(Z|z|[+-][0-9]{2}(:?[0-9]{2})?)[[:space:]]*$";

/// How string coercion treats display formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    /// Apply the field's number/date display formatting.
    Display,
    /// Plain text: the mode of text-producing functions, where no styling
    /// leaks into computed text.
    Plain,
}

impl<'a> SqlBuilder<'a> {
    /// Coerce to a scalar number.
    pub fn coerce_to_number(&self, expr: SqlExpr, reason: &str) -> SqlExpr {
        if expr.is_unconditional_error() {
            return retype(expr, CellValueType::Number);
        }

        // A raw JSON-object field (attachment, link, button, user) can
        // never mean a number; skip SQL generation for the impossible path.
        if self.is_raw_json_object(&expr) {
            return SqlExpr::compile_error(CellValueType::Number, ErrorCode::Type, reason);
        }

        let expr = if expr.is_array {
            self.extract_scalar_text(expr)
        } else {
            expr
        };

        match expr.value_type {
            CellValueType::Number => expr,
            CellValueType::Boolean => {
                let value = format!("(CASE WHEN {} THEN 1 ELSE 0 END)", expr.value_sql);
                rebuild(expr, value, CellValueType::Number)
            }
            CellValueType::DateTime => {
                // Numbers and datetimes are never implicitly convertible.
                SqlExpr::compile_error(CellValueType::Number, ErrorCode::Type, reason)
            }
            CellValueType::String | CellValueType::Unknown => self.loose_numeric_cast(expr, reason),
        }
    }

    /// The loose numeric cast over text: strip commas and whitespace, take
    /// the longest leading numeric substring, fail only when the normalized
    /// text is non-empty and non-matching (or carries an exponent).
    fn loose_numeric_cast(&self, expr: SqlExpr, reason: &str) -> SqlExpr {
        let norm = format!(
            "NULLIF(regexp_replace(({})::text, '[,[:space:]]+', '', 'g'), '')",
            expr.value_sql
        );
        let value = format!(
            "(substring({norm} from '{lead}')::numeric)",
            norm = norm,
            lead = LEADING_NUMBER
        );
        let fail = format!(
            "({norm} IS NOT NULL AND ({norm} !~ '{lead}' OR {norm} ~ '{sci}'))",
            norm = norm,
            lead = LEADING_NUMBER,
            sci = SCIENTIFIC
        );

        ErrorParts::merge(&[&expr])
            .push(fail, error_literal(ErrorCode::Type, reason))
            .apply(rebuild(expr, value, CellValueType::Number))
    }

    /// Just the value fragment of the loose numeric cast, for callers that
    /// probe castability without wanting the error guard (COUNT).
    pub(crate) fn loose_numeric_value_sql(&self, text_sql: &str) -> String {
        format!(
            "(substring(NULLIF(regexp_replace({}, '[,[:space:]]+', '', 'g'), '') \
             from '{}')::numeric)",
            text_sql, LEADING_NUMBER
        )
    }

    /// Coerce to a scalar boolean. Total: boolean coercion itself never
    /// introduces an error condition.
    pub fn coerce_to_boolean(&self, expr: SqlExpr) -> SqlExpr {
        if expr.is_unconditional_error() {
            return retype(expr, CellValueType::Boolean);
        }

        if expr.is_array {
            let norm = self.normalize_array_expr(expr);
            let value = format!("(jsonb_array_length({}) > 0)", norm.value_sql);
            let scalar = rebuild(norm, value, CellValueType::Boolean);
            return SqlExpr {
                is_array: false,
                storage: StorageKind::Scalar,
                ..scalar
            };
        }

        if expr.storage == StorageKind::Json {
            let value = format!("(({}) IS NOT NULL)", expr.value_sql);
            return rebuild(expr, value, CellValueType::Boolean);
        }

        match expr.value_type {
            CellValueType::Boolean => expr,
            CellValueType::Number => {
                let value = format!("(COALESCE(({}) <> 0, FALSE))", expr.value_sql);
                rebuild(expr, value, CellValueType::Boolean)
            }
            CellValueType::DateTime => {
                let value = format!("(({}) IS NOT NULL)", expr.value_sql);
                rebuild(expr, value, CellValueType::Boolean)
            }
            CellValueType::String | CellValueType::Unknown => {
                let value = format!(
                    "(lower(btrim(COALESCE(({})::text, ''))) NOT IN \
                     ('', 'false', '0', 'no', 'off', 'null'))",
                    expr.value_sql
                );
                rebuild(expr, value, CellValueType::Boolean)
            }
        }
    }

    /// Coerce to a scalar timestamptz.
    pub fn coerce_to_datetime(&self, expr: SqlExpr, reason: &str) -> SqlExpr {
        if expr.is_unconditional_error() {
            return retype(expr, CellValueType::DateTime);
        }

        if let Some(field) = &expr.field {
            let kind = match field.kind.is_lookup_like() {
                true => field.inner.as_deref().map(|f| f.kind),
                false => Some(field.kind),
            };
            if kind.map(|k| k.is_datetime_incapable()).unwrap_or(false) {
                return SqlExpr::compile_error(CellValueType::DateTime, ErrorCode::Type, reason);
            }
        }

        let expr = if expr.is_array {
            self.extract_scalar_text(expr)
        } else {
            expr
        };

        match expr.value_type {
            CellValueType::DateTime => {
                let value = format!("(({})::timestamptz)", expr.value_sql);
                rebuild(expr, value, CellValueType::DateTime)
            }
            CellValueType::Number => {
                // Numbers are read as Unix epoch seconds.
                let value = format!("(to_timestamp(({})::double precision))", expr.value_sql);
                rebuild(expr, value, CellValueType::DateTime)
            }
            CellValueType::Boolean => {
                SqlExpr::compile_error(CellValueType::DateTime, ErrorCode::Type, reason)
            }
            CellValueType::String | CellValueType::Unknown => self.text_to_datetime(expr, reason),
        }
    }

    fn text_to_datetime(&self, expr: SqlExpr, reason: &str) -> SqlExpr {
        let text = format!("(({})::text)", expr.value_sql);
        let valid_tz = self
            .validation
            .is_valid_for_type(&text, CastTarget::Timestamptz);
        let valid_ts = self
            .validation
            .is_valid_for_type(&text, CastTarget::Timestamp);

        // A value with an explicit offset casts directly; one without is
        // reinterpreted in the configured time zone.
        let value = format!(
            "(CASE WHEN {valid_tz} AND {text} ~ '{offset}' THEN ({text})::timestamptz \
             WHEN {valid_ts} THEN (({text})::timestamp AT TIME ZONE '{zone}') \
             ELSE NULL END)",
            valid_tz = valid_tz,
            valid_ts = valid_ts,
            text = text,
            offset = OFFSET_TAIL,
            zone = self.zone_name()
        );
        let fail = format!(
            "({text} IS NOT NULL AND btrim({text}) <> '' AND NOT ({valid_tz} OR {valid_ts}))",
            text = text,
            valid_tz = valid_tz,
            valid_ts = valid_ts
        );

        ErrorParts::merge(&[&expr])
            .push(fail, error_literal(ErrorCode::Type, reason))
            .apply(rebuild(expr, value, CellValueType::DateTime))
    }

    /// Coerce to scalar text. `Display` mode applies the field's
    /// formatting; `Plain` mode is used by text-producing functions.
    pub fn coerce_to_string(&self, expr: SqlExpr, mode: TextMode) -> SqlExpr {
        if expr.is_unconditional_error() {
            return retype(expr, CellValueType::String);
        }

        if expr.is_array {
            return self.stringify_array(expr, ", ");
        }

        if expr.storage == StorageKind::Json {
            let value = json_object_display_text(&expr.value_sql);
            let scalar = rebuild(expr, value, CellValueType::String);
            return SqlExpr {
                storage: StorageKind::Scalar,
                ..scalar
            };
        }

        match expr.value_type {
            CellValueType::String => expr,
            CellValueType::Boolean => {
                let value = format!(
                    "(CASE WHEN ({v}) THEN 'true' WHEN NOT ({v}) THEN 'false' ELSE NULL END)",
                    v = expr.value_sql
                );
                rebuild(expr, value, CellValueType::String)
            }
            CellValueType::Number => self.number_to_text(expr, mode),
            CellValueType::DateTime => self.datetime_to_text(expr, mode),
            CellValueType::Unknown => {
                let value = format!("(({})::text)", expr.value_sql);
                rebuild(expr, value, CellValueType::String)
            }
        }
    }

    fn number_to_text(&self, expr: SqlExpr, mode: TextMode) -> SqlExpr {
        let formatting = expr.field.as_ref().and_then(|f| f.formatting.clone());
        let value = match (mode, formatting) {
            (TextMode::Display, Some(Formatting::Number { precision })) => format!(
                "to_char(({}), '{}')",
                expr.value_sql,
                number_pattern(precision)
            ),
            (TextMode::Display, Some(Formatting::Percent { precision })) => format!(
                "(to_char(({}) * 100, '{}') || '%')",
                expr.value_sql,
                number_pattern(precision)
            ),
            (TextMode::Display, Some(Formatting::Currency { precision, symbol })) => format!(
                "('{}' || to_char(({}), '{}'))",
                symbol.replace('\'', "''"),
                expr.value_sql,
                number_pattern(precision)
            ),
            _ => format!("(({})::text)", expr.value_sql),
        };
        rebuild(expr, value, CellValueType::String)
    }

    fn datetime_to_text(&self, expr: SqlExpr, mode: TextMode) -> SqlExpr {
        let formatting = expr.field.as_ref().and_then(|f| f.formatting.clone());
        let pattern = match (mode, formatting) {
            (TextMode::Display, Some(Formatting::DateTime { date, time })) => match time {
                Some(time) => format!("{} {}", date, time),
                None => date,
            },
            // In computed-text context the field's format participates only
            // if it defines a time component; otherwise a fixed fallback.
            (TextMode::Plain, Some(Formatting::DateTime { date, time: Some(time) })) => {
                format!("{} {}", date, time)
            }
            _ => "YYYY-MM-DD HH24:MI".to_owned(),
        };
        let value = format!(
            "to_char((({v}) AT TIME ZONE '{zone}'), '{pattern}')",
            v = expr.value_sql,
            zone = self.zone_name(),
            pattern = pattern.replace('\'', "''")
        );
        rebuild(expr, value, CellValueType::String)
    }

    /// True when the expression still exposes the raw stored value of a
    /// JSON-object field (not yet projected to display text).
    fn is_raw_json_object(&self, expr: &SqlExpr) -> bool {
        let Some(field) = &expr.field else {
            return false;
        };
        let kind = match field.kind.is_lookup_like() {
            true => field.inner.as_deref().map(|f| f.kind),
            false => Some(field.kind),
        };
        matches!(kind, Some(k) if k.is_numeric_incapable()) && expr.storage != StorageKind::Scalar
    }
}

/// Keep error metadata and field back-reference, replace the value.
pub(super) fn rebuild(expr: SqlExpr, value_sql: String, value_type: CellValueType) -> SqlExpr {
    SqlExpr {
        value_sql,
        value_type,
        ..expr
    }
}

pub(super) fn retype(expr: SqlExpr, value_type: CellValueType) -> SqlExpr {
    SqlExpr { value_type, ..expr }
}

/// `to_char` pattern for a fixed-precision number.
fn number_pattern(precision: u8) -> String {
    if precision == 0 {
        "FM999999999999999990".to_owned()
    } else {
        format!("FM999999999999999990.{}", "0".repeat(precision as usize))
    }
}
