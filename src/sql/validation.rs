//! Type-validation strategy.
//!
//! "Is this text validly castable to type T" differs between the two SQL
//! engine capability levels the compiler targets: newer engines expose an
//! input-validity probe, older ones have to make do with pattern guards.
//! The rest of the compiler asks this one question through the trait and
//! never branches on engine version itself.

/// Cast targets the compiler ever validates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastTarget {
    Timestamptz,
    Timestamp,
    Numeric,
    Jsonb,
}

impl CastTarget {
    pub fn type_name(&self) -> &'static str {
        use CastTarget::*;

        match self {
            Timestamptz => "timestamptz",
            Timestamp => "timestamp",
            Numeric => "numeric",
            Jsonb => "jsonb",
        }
    }
}

/// Strategy answering "would casting this text fragment to `target`
/// succeed", as a SQL boolean fragment evaluated per row.
pub trait TypeValidation {
    fn is_valid_for_type(&self, fragment: &str, target: CastTarget) -> String;
}

/// Engines with a native input-validity probe (`pg_input_is_valid`,
/// PostgreSQL 16+).
#[derive(Debug, Clone, Copy, Default)]
pub struct InputCheckValidation;

impl TypeValidation for InputCheckValidation {
    fn is_valid_for_type(&self, fragment: &str, target: CastTarget) -> String {
        format!(
            "(({f}) IS NOT NULL AND pg_input_is_valid(({f})::text, '{t}'))",
            f = fragment,
            t = target.type_name()
        )
    }
}

// Pattern guards for engines without an input probe. Deliberately stricter
// than the engine's own parser: a value the pattern rejects falls through to
// the error path instead of raising inside the query.
const TIMESTAMPTZ_PATTERN: &str =
    r"^\s*\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?)?\s*(Z|z|[+-]\d{2}(:?\d{2})?)\s*$";
const TIMESTAMP_PATTERN: &str =
    r"^\s*\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?)?\s*$";
const NUMERIC_PATTERN: &str = r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)\s*$";

/// Engines without an input probe: regex guards over the text value.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternValidation;

impl TypeValidation for PatternValidation {
    fn is_valid_for_type(&self, fragment: &str, target: CastTarget) -> String {
        match target {
            CastTarget::Timestamptz => format!(
                "(({f}) IS NOT NULL AND ({f})::text ~ '{p}')",
                f = fragment,
                p = TIMESTAMPTZ_PATTERN
            ),
            CastTarget::Timestamp => format!(
                "(({f}) IS NOT NULL AND ({f})::text ~ '{p}')",
                f = fragment,
                p = TIMESTAMP_PATTERN
            ),
            CastTarget::Numeric => format!(
                "(({f}) IS NOT NULL AND ({f})::text ~ '{p}')",
                f = fragment,
                p = NUMERIC_PATTERN
            ),
            // No pattern can prove arbitrary text is well-formed json; the
            // guard only rules out values that cannot possibly be.
            CastTarget::Jsonb => format!(
                "(({f}) IS NOT NULL AND left(btrim(({f})::text), 1) IN ('{{', '[', '\"'))",
                f = fragment
            ),
        }
    }
}
