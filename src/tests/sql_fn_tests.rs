use super::{compile, render_sql};
use crate::{ast::ExprNode, types::CellValueType};
use test_case::test_case;

fn call1(name: &str, arg: ExprNode) -> ExprNode {
    ExprNode::call(name, vec![arg])
}

#[test_case("ABS", "abs("; "abs")]
#[test_case("SQRT", "sqrt("; "sqrt")]
#[test_case("CEILING", "ceil("; "ceiling")]
#[test_case("FLOOR", "floor("; "floor")]
#[test_case("INT", "floor("; "int truncates toward minus infinity")]
#[test_case("EXP", "exp("; "exp")]
fn test_numeric_unary_shape(name: &str, fragment: &str) {
    let expr = compile(&call1(name, ExprNode::field("fld_num")));
    assert!(
        expr.value_sql.contains(fragment),
        "{} missing {} in {}",
        name,
        fragment,
        expr.value_sql
    );
    assert_eq!(expr.value_type, CellValueType::Number);
}

#[test]
fn test_wrong_arity_is_an_arg_error() {
    let sql = render_sql(&ExprNode::call("ABS", vec![]));
    assert!(sql.contains("#ERROR:ARG:wrong_arity:ABS"));
}

#[test]
fn test_alias_dispatches_to_canonical_handler() {
    let avg = compile(&call1("AVG", ExprNode::field("fld_amounts")));
    let average = compile(&call1("AVERAGE", ExprNode::field("fld_amounts")));
    assert_eq!(avg.value_sql, average.value_sql);
}

#[test]
fn test_sum_folds_arrays_and_scalars_together() {
    let node = ExprNode::call(
        "SUM",
        vec![ExprNode::field("fld_amounts"), ExprNode::IntegerLit(5)],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("sum("));
    assert!(expr.value_sql.contains(" + "));
    assert!(!expr.is_array);
}

#[test]
fn test_sum_element_cast_extracts_the_whole_numeric_prefix() {
    let expr = compile(&call1("SUM", ExprNode::field("fld_tags")));
    // `substring(text from pattern)` returns the first parenthesized group,
    // so the group must span the full prefix or '1,000' folds as NULL.
    assert!(expr
        .value_sql
        .contains(r"from '^([+-]?[0-9]+(\.[0-9]+)?)'"));
}

#[test]
fn test_mod_by_zero_is_div0() {
    let node = ExprNode::call(
        "MOD",
        vec![ExprNode::IntegerLit(10), ExprNode::IntegerLit(0)],
    );
    let sql = render_sql(&node);
    assert!(sql.contains("#ERROR:DIV0:division_by_zero"));
}

#[test]
fn test_sqrt_guards_negative_input() {
    let expr = compile(&call1("SQRT", ExprNode::field("fld_num")));
    assert!(expr.has_error());
    assert!(expr
        .error_message_or_fallback()
        .contains("sqrt_of_negative"));
}

#[test]
fn test_concatenate_never_applies_display_formatting() {
    let node = ExprNode::call(
        "CONCATENATE",
        vec![ExprNode::string("total: "), ExprNode::field("fld_num")],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("||"));
    // Plain mode: a bare ::text cast, no to_char pattern.
    assert!(!expr.value_sql.contains("to_char"));
}

#[test]
fn test_left_defaults_to_one_character() {
    let expr = compile(&call1("LEFT", ExprNode::field("fld_text")));
    assert!(expr.value_sql.contains("left("));
    assert!(expr.value_sql.contains("1"));
}

#[test]
fn test_substitute_with_occurrence_escapes_the_needle() {
    let node = ExprNode::call(
        "SUBSTITUTE",
        vec![
            ExprNode::field("fld_text"),
            ExprNode::string("a.b"),
            ExprNode::string("x"),
            ExprNode::IntegerLit(2),
        ],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("regexp_replace"));
}

#[test]
fn test_search_yields_blank_when_absent() {
    let node = ExprNode::call(
        "SEARCH",
        vec![ExprNode::string("x"), ExprNode::field("fld_text")],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("NULLIF"));

    let find = ExprNode::call(
        "FIND",
        vec![ExprNode::string("x"), ExprNode::field("fld_text")],
    );
    assert!(!compile(&find).value_sql.contains("NULLIF"));
}

#[test]
fn test_encode_url_component_escapes_percent_first() {
    let expr = compile(&call1("ENCODE_URL_COMPONENT", ExprNode::string("a/b c")));
    let first = expr.value_sql.find("%25").unwrap_or(usize::MAX);
    let slash = expr.value_sql.find("%2F").unwrap_or(0);
    assert!(first < slash);
}

#[test]
fn test_if_without_else_defaults_to_blank() {
    let node = ExprNode::call(
        "IF",
        vec![ExprNode::field("fld_done"), ExprNode::string("yes")],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("CASE WHEN"));
    assert_eq!(expr.value_type, CellValueType::String);
}

#[test]
fn test_switch_blank_default_does_not_force_string() {
    let node = ExprNode::call(
        "SWITCH",
        vec![
            ExprNode::field("fld_text"),
            ExprNode::string("a"),
            ExprNode::IntegerLit(1),
            ExprNode::string("b"),
            ExprNode::IntegerLit(2),
        ],
    );
    let expr = compile(&node);
    assert_eq!(expr.value_type, CellValueType::Number);
}

#[test]
fn test_iserror_consumes_the_error_state() {
    let bad = ExprNode::call(
        "MOD",
        vec![ExprNode::IntegerLit(1), ExprNode::IntegerLit(0)],
    );
    let expr = compile(&ExprNode::call("ISERROR", vec![bad]));
    assert_eq!(expr.value_type, CellValueType::Boolean);
    assert!(!expr.has_error());
}

#[test]
fn test_error_builds_a_dynamic_sentinel() {
    let expr = compile(&call1("ERROR", ExprNode::string("nope")));
    assert!(expr.is_unconditional_error());
    assert!(expr.error_message_or_fallback().contains("#ERROR:ARG:"));
}

#[test]
fn test_blank_compares_equal_to_empty_text() {
    let expr = compile(&ExprNode::call("BLANK", vec![]));
    assert!(expr.is_blank_string_literal());
}

#[test]
fn test_date_add_literal_unit_compiles_to_one_branch() {
    let node = ExprNode::call(
        "DATE_ADD",
        vec![
            ExprNode::field("fld_date"),
            ExprNode::IntegerLit(3),
            ExprNode::string("months"),
        ],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("make_interval(months =>"));
    assert!(!expr.value_sql.contains("invalid_unit"));
}

#[test]
fn test_date_add_dynamic_unit_dispatches_at_runtime() {
    let node = ExprNode::call(
        "DATE_ADD",
        vec![
            ExprNode::field("fld_date"),
            ExprNode::IntegerLit(3),
            ExprNode::field("fld_text"),
        ],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("CASE WHEN"));
    assert!(expr
        .error_message_or_fallback()
        .contains("invalid_unit:DATE_ADD"));
}

#[test]
fn test_date_add_bad_literal_unit_fails_at_compile_time() {
    let node = ExprNode::call(
        "DATE_ADD",
        vec![
            ExprNode::field("fld_date"),
            ExprNode::IntegerLit(3),
            ExprNode::string("fortnights"),
        ],
    );
    let expr = compile(&node);
    assert!(expr.is_unconditional_error());
}

#[test]
fn test_date_add_non_string_unit_short_circuits() {
    let node = ExprNode::call(
        "DATE_ADD",
        vec![
            ExprNode::field("fld_date"),
            ExprNode::IntegerLit(3),
            ExprNode::IntegerLit(7),
        ],
    );
    let expr = compile(&node);
    assert!(expr.is_unconditional_error());
    // No runtime dispatch is generated for a statically impossible unit.
    assert_eq!(expr.value_sql, "NULL");
}

#[test]
fn test_datetime_diff_defaults_to_days() {
    let node = ExprNode::call(
        "DATETIME_DIFF",
        vec![ExprNode::field("fld_date"), ExprNode::field("fld_date")],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("86400"));
}

#[test]
fn test_weekday_monday_start_shifts_the_index() {
    let node = ExprNode::call(
        "WEEKDAY",
        vec![ExprNode::field("fld_date"), ExprNode::string("Monday")],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("+ 6) % 7"));
    // A literal start day resolves into one branch, with no runtime
    // dispatch and no guard.
    assert!(!expr.value_sql.contains("CASE"));
    assert!(!expr.has_error());
}

#[test]
fn test_weekday_numeric_start_day_is_a_compile_time_error() {
    let node = ExprNode::call(
        "WEEKDAY",
        vec![ExprNode::field("fld_date"), ExprNode::IntegerLit(2)],
    );
    let expr = compile(&node);
    assert!(expr.is_unconditional_error());
    assert_eq!(expr.value_sql, "NULL");
}

#[test]
fn test_weekday_unknown_literal_start_day_fails_at_compile_time() {
    let node = ExprNode::call(
        "WEEKDAY",
        vec![ExprNode::field("fld_date"), ExprNode::string("friday")],
    );
    let expr = compile(&node);
    assert!(expr.is_unconditional_error());
    assert!(expr
        .error_message_or_fallback()
        .contains("invalid_start_day:WEEKDAY"));
}

#[test]
fn test_weekday_dynamic_start_day_dispatches_at_runtime() {
    let node = ExprNode::call(
        "WEEKDAY",
        vec![ExprNode::field("fld_date"), ExprNode::field("fld_text")],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("CASE"));
    assert!(expr
        .error_message_or_fallback()
        .contains("invalid_start_day:WEEKDAY"));
}

#[test]
fn test_workday_skips_weekends_and_counts_holidays() {
    let node = ExprNode::call(
        "WORKDAY",
        vec![
            ExprNode::field("fld_date"),
            ExprNode::IntegerLit(10),
            ExprNode::string("2026-01-01, 2026-01-02"),
        ],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("ISODOW"));
    assert!(expr.value_sql.contains("regexp_split_to_table"));
    assert_eq!(expr.value_type, CellValueType::DateTime);
}

#[test]
fn test_workday_diff_is_signed_and_inclusive() {
    let node = ExprNode::call(
        "WORKDAY_DIFF",
        vec![ExprNode::field("fld_date"), ExprNode::field("fld_date")],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("LEAST"));
    assert!(expr.value_sql.contains("sgn"));
    assert_eq!(expr.value_type, CellValueType::Number);
}

#[test]
fn test_array_join_with_custom_separator() {
    let node = ExprNode::call(
        "ARRAY_JOIN",
        vec![ExprNode::field("fld_tags"), ExprNode::string(" | ")],
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("string_agg"));
    assert!(!expr.is_array);
}

#[test]
fn test_array_unique_keeps_first_occurrence_order() {
    let expr = compile(&call1("ARRAY_UNIQUE", ExprNode::field("fld_tags")));
    assert!(expr.value_sql.contains("DISTINCT ON"));
    assert!(expr.value_sql.contains("first_idx"));
    assert!(expr.is_array);
}

#[test]
fn test_array_flatten_unnests_one_level() {
    let expr = compile(&call1("ARRAY_FLATTEN", ExprNode::field("fld_amounts")));
    assert!(expr.value_sql.contains("CROSS JOIN LATERAL"));
}

#[test]
fn test_array_compact_drops_blanks_and_nulls() {
    let expr = compile(&call1("ARRAY_COMPACT", ExprNode::field("fld_tags")));
    assert!(expr.value_sql.contains("jsonb_typeof"));
    assert!(expr.value_sql.contains("<> 'null'"));
}

#[test]
fn test_count_ignores_non_numeric_scalars() {
    let node = ExprNode::call(
        "COUNT",
        vec![ExprNode::field("fld_num"), ExprNode::string("abc")],
    );
    let expr = compile(&node);
    // Cast failures mean "not counted", never an error.
    assert!(!expr.has_error());
    assert!(expr.value_sql.contains("CASE WHEN"));
}
