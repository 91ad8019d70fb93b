use std::sync::Arc;

use super::compile;
use crate::{
    ast::{BinaryOp, ExprNode, UnaryOp},
    sql::{CompilerConfig, InputCheckValidation, SqlBuilder, TextMode},
    types::{
        CellValueType, ErrorCode, ErrorParts, FieldDescriptor, FieldKind, SqlExpr, StorageKind,
    },
};
use test_case::test_case;

fn with_builder<T>(f: impl FnOnce(&SqlBuilder) -> T) -> T {
    let config = CompilerConfig::default();
    let validation = InputCheckValidation;
    f(&SqlBuilder::new(&config, &validation))
}

fn text(sql: &str) -> SqlExpr {
    SqlExpr::new(sql.to_owned(), CellValueType::String)
}

fn number(sql: &str) -> SqlExpr {
    SqlExpr::new(sql.to_owned(), CellValueType::Number)
}

fn json_object_field(kind: FieldKind) -> SqlExpr {
    let field = Arc::new(FieldDescriptor::new("fld_j", "J", kind));
    SqlExpr::new("\"j\"".to_owned(), CellValueType::Unknown)
        .with_storage(StorageKind::Json)
        .with_field(field)
}

// Coercion is total: every (source field, target) pair yields an
// expression, never a panic. Impossible pairs come back as compile-time
// errors carrying the target's type.
#[test_case("fld_num")]
#[test_case("fld_text")]
#[test_case("fld_tags")]
#[test_case("fld_date")]
#[test_case("fld_done")]
#[test_case("fld_btn")]
#[test_case("fld_amounts")]
fn test_every_coercion_is_total(token: &str) {
    let expr = compile(&ExprNode::field(token));
    with_builder(|b| {
        let n = b.coerce_to_number(expr.clone(), "cannot_cast_to_number");
        assert_eq!(n.value_type, CellValueType::Number);
        assert!(!n.is_array);

        let d = b.coerce_to_datetime(expr.clone(), "cannot_cast_to_datetime");
        assert_eq!(d.value_type, CellValueType::DateTime);
        assert!(!d.is_array);

        let bo = b.coerce_to_boolean(expr.clone());
        assert_eq!(bo.value_type, CellValueType::Boolean);

        let s = b.coerce_to_string(expr, TextMode::Plain);
        assert_eq!(s.value_type, CellValueType::String);
    });
}

#[test]
fn test_loose_numeric_cast_shape() {
    with_builder(|b| {
        let n = b.coerce_to_number(text("'1,234 '"), "cannot_cast_to_number");
        assert!(n.value_sql.contains("regexp_replace"));
        assert!(n.value_sql.contains("substring"));
        assert!(n.value_sql.contains("::numeric"));
    });
}

#[test]
fn test_loose_cast_group_spans_the_whole_prefix() {
    with_builder(|b| {
        let n = b.coerce_to_number(text("'1,000'"), "cannot_cast_to_number");
        // substring() returns the first parenthesized group; a bare inner
        // group would surface only the fractional tail.
        assert!(n.value_sql.contains(r"from '^([+-]?[0-9]+(\.[0-9]+)?)'"));
    });
}

#[test]
fn test_loose_numeric_cast_rejects_scientific_notation() {
    with_builder(|b| {
        let n = b.coerce_to_number(text("'1e5'"), "cannot_cast_to_number");
        let cond = n.error_condition_sql.as_deref().unwrap_or("");
        assert!(cond.contains("[eE]"), "no exponent guard in {}", cond);
    });
}

#[test]
fn test_loose_numeric_cast_treats_blank_as_null_not_error() {
    with_builder(|b| {
        let n = b.coerce_to_number(text("''"), "cannot_cast_to_number");
        // Blank normalizes to NULL before the prefix match, so the failure
        // condition only fires on non-NULL normalized text.
        let cond = n.error_condition_sql.as_deref().unwrap_or("");
        assert!(cond.contains("IS NOT NULL"));
    });
}

#[test]
fn test_boolean_coercion_never_errors() {
    with_builder(|b| {
        for expr in [
            text("'maybe'"),
            number("1"),
            SqlExpr::new("now()".to_owned(), CellValueType::DateTime),
        ] {
            let out = b.coerce_to_boolean(expr);
            assert!(!out.has_error());
        }
    });
}

#[test]
fn test_boolean_falsy_set_for_text() {
    with_builder(|b| {
        let out = b.coerce_to_boolean(text("\"txt\""));
        assert!(out
            .value_sql
            .contains("('', 'false', '0', 'no', 'off', 'null')"));
    });
}

#[test]
fn test_number_reads_as_epoch_seconds() {
    with_builder(|b| {
        let out = b.coerce_to_datetime(number("1700000000"), "cannot_cast_to_datetime");
        assert!(out.value_sql.contains("to_timestamp"));
        assert!(!out.has_error());
    });
}

#[test]
fn test_text_datetime_distinguishes_offset_from_local() {
    with_builder(|b| {
        let out = b.coerce_to_datetime(text("\"txt\""), "cannot_cast_to_datetime");
        assert!(out.value_sql.contains("::timestamptz"));
        assert!(out.value_sql.contains("AT TIME ZONE"));
        assert!(out.has_error());
    });
}

#[test]
fn test_offset_detection_requires_a_time_of_day() {
    with_builder(|b| {
        let out = b.coerce_to_datetime(text("\"txt\""), "cannot_cast_to_datetime");
        // A bare date like '2026-01-02' ends in what looks like a '-02'
        // offset; only text with a clock component takes the direct
        // timestamptz branch.
        assert!(out.value_sql.contains("[0-9]{2}:[0-9]{2}"));
    });
}

#[test]
fn test_checkbox_can_never_be_a_datetime() {
    let expr = compile(&ExprNode::field("fld_done"));
    with_builder(|b| {
        let out = b.coerce_to_datetime(expr, "cannot_cast_to_datetime");
        assert!(out.is_unconditional_error());
    });
}

#[test_case(FieldKind::Button)]
#[test_case(FieldKind::Attachment)]
#[test_case(FieldKind::User)]
#[test_case(FieldKind::Link)]
fn test_json_object_kinds_can_never_be_numbers(kind: FieldKind) {
    with_builder(|b| {
        let out = b.coerce_to_number(json_object_field(kind), "cannot_cast_to_number");
        assert!(out.is_unconditional_error());
        assert_eq!(
            out.error_message_or_fallback(),
            "'#ERROR:TYPE:cannot_cast_to_number'"
        );
    });
}

#[test]
fn test_unconditional_error_survives_further_coercion() {
    with_builder(|b| {
        let err = SqlExpr::compile_error(CellValueType::String, ErrorCode::Ref, "field_not_found:x");
        let out = b.coerce_to_number(err, "cannot_cast_to_number");
        assert!(out.is_unconditional_error());
        assert_eq!(out.value_type, CellValueType::Number);
        // The original root cause is kept, not replaced by the cast's.
        assert!(out.error_message_or_fallback().contains("REF"));
    });
}

#[test]
fn test_numeric_lookup_extraction_yields_a_numeric_operand() {
    let node = ExprNode::binary(
        BinaryOp::Add,
        ExprNode::field("fld_amounts"),
        ExprNode::IntegerLit(1),
    );
    let expr = compile(&node);
    // Element 0 comes out of jsonb as text; arithmetic needs the typed
    // value, not a text fragment.
    assert!(expr.value_sql.contains("->> 0)::numeric"));
    assert_eq!(expr.value_type, CellValueType::Number);
}

// Comparison operand unification: number > datetime > boolean > text.

#[test]
fn test_comparison_number_beats_text() {
    let node = ExprNode::binary(
        BinaryOp::Gt,
        ExprNode::field("fld_num"),
        ExprNode::field("fld_text"),
    );
    let expr = compile(&node);
    assert_eq!(expr.value_type, CellValueType::Boolean);
    // The text side goes through the loose numeric cast.
    assert!(expr.value_sql.contains("substring"));
}

#[test]
fn test_comparison_datetime_beats_text() {
    let node = ExprNode::binary(
        BinaryOp::Lt,
        ExprNode::field("fld_date"),
        ExprNode::field("fld_text"),
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("pg_input_is_valid"));
}

#[test]
fn test_comparison_boolean_beats_text() {
    let node = ExprNode::binary(
        BinaryOp::Eq,
        ExprNode::field("fld_done"),
        ExprNode::field("fld_text"),
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("COALESCE"));
    assert!(expr.value_sql.contains("FALSE"));
}

#[test]
fn test_comparison_text_against_text_treats_blank_as_null() {
    let node = ExprNode::binary(
        BinaryOp::Eq,
        ExprNode::field("fld_text"),
        ExprNode::field("fld_notes"),
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("COALESCE"));
    assert!(expr.value_sql.contains("''"));
}

#[test]
fn test_array_equality_compares_normalized_jsonb() {
    let node = ExprNode::binary(
        BinaryOp::Eq,
        ExprNode::field("fld_tags"),
        ExprNode::field("fld_tags"),
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("'[]'::jsonb"));
    assert!(!expr.is_array);
}

// Branch unification.

#[test]
fn test_blank_branch_becomes_typed_null() {
    with_builder(|b| {
        let set = b.coerce_branches(vec![number("1"), text("''")]);
        assert_eq!(set.value_type, CellValueType::Number);
        assert!(!set.is_array);
        assert_eq!(set.branches[1].value_sql, "NULL");
        assert_eq!(set.branches[1].value_type, CellValueType::Number);
    });
}

#[test]
fn test_all_blank_branches_stay_text() {
    with_builder(|b| {
        let set = b.coerce_branches(vec![text("''"), text("''")]);
        assert_eq!(set.value_type, CellValueType::String);
        assert_eq!(set.branches[0].value_sql, "''");
    });
}

#[test]
fn test_uniform_array_branches_stay_arrays() {
    with_builder(|b| {
        let arr = number("\"amounts\"")
            .with_array(true)
            .with_storage(StorageKind::Array);
        let set = b.coerce_branches(vec![arr.clone(), arr]);
        assert!(set.is_array);
        assert_eq!(set.value_type, CellValueType::Number);
    });
}

#[test]
fn test_mixed_array_and_scalar_branches_collapse_to_scalar() {
    with_builder(|b| {
        let arr = number("\"amounts\"")
            .with_array(true)
            .with_storage(StorageKind::Array);
        let set = b.coerce_branches(vec![arr, number("1")]);
        assert!(!set.is_array);
        assert_eq!(set.value_type, CellValueType::Number);
        // The array branch got its scalar extracted.
        assert!(set.branches[0].value_sql.contains("jsonb"));
    });
}

#[test]
fn test_datetime_outranks_boolean_in_branches() {
    with_builder(|b| {
        let dt = SqlExpr::new("now()".to_owned(), CellValueType::DateTime);
        let bo = SqlExpr::new("TRUE".to_owned(), CellValueType::Boolean);
        let set = b.coerce_branches(vec![dt, bo]);
        assert_eq!(set.value_type, CellValueType::DateTime);
    });
}

// Error metadata plumbing.

#[test]
fn test_error_merge_reports_the_first_root_cause() {
    let a = SqlExpr::compile_error(CellValueType::Number, ErrorCode::Ref, "field_not_found:a");
    let b = SqlExpr::compile_error(CellValueType::Number, ErrorCode::Div0, "division_by_zero");
    let merged = ErrorParts::merge(&[&a, &b]);
    assert_eq!(merged.condition_sql.as_deref(), Some("(TRUE OR TRUE)"));
    let msg = merged.message_sql.unwrap_or_default();
    assert!(msg.starts_with("CASE WHEN TRUE THEN '#ERROR:REF:"));
}

#[test]
fn test_pushed_guard_yields_to_upstream_errors() {
    let up = SqlExpr::compile_error(CellValueType::Number, ErrorCode::Ref, "field_not_found:a");
    let parts = ErrorParts::merge(&[&up]).push(
        "(x = 0)".to_owned(),
        "'#ERROR:DIV0:division_by_zero'".to_owned(),
    );
    let msg = parts.message_sql.unwrap_or_default();
    assert!(msg.starts_with("CASE WHEN TRUE THEN '#ERROR:REF:"));
    assert!(msg.contains("ELSE '#ERROR:DIV0:"));
}

#[test]
fn test_division_error_flows_through_concatenation() {
    let bad = ExprNode::binary(
        BinaryOp::Div,
        ExprNode::IntegerLit(1),
        ExprNode::IntegerLit(0),
    );
    let node = ExprNode::binary(BinaryOp::Concat, ExprNode::string("x = "), bad);
    let expr = compile(&node);
    assert_eq!(expr.value_type, CellValueType::String);
    assert!(expr.has_error());
    assert!(expr.error_message_or_fallback().contains("DIV0"));
}

// Operator lowering details.

#[test]
fn test_negation_routes_booleans_through_numbers() {
    let node = ExprNode::unary(UnaryOp::Neg, ExprNode::field("fld_done"));
    let expr = compile(&node);
    assert_eq!(expr.value_type, CellValueType::Number);
    assert!(expr.value_sql.contains("THEN 1 ELSE 0"));
}

#[test]
fn test_logical_not_reads_numbers_as_nonzero() {
    let node = ExprNode::unary(UnaryOp::Not, ExprNode::field("fld_num"));
    let expr = compile(&node);
    assert_eq!(expr.value_type, CellValueType::Boolean);
    assert!(expr.value_sql.contains("<> 0"));
}

#[test]
fn test_concat_token_projects_json_to_display_text() {
    let node = ExprNode::binary(
        BinaryOp::Concat,
        ExprNode::field("fld_text"),
        ExprNode::field("fld_link"),
    );
    let expr = compile(&node);
    assert!(expr.value_sql.contains("->> 'title'"));
    assert_eq!(expr.storage, StorageKind::Scalar);
}

#[test]
fn test_arithmetic_over_datetime_is_a_type_error() {
    let node = ExprNode::binary(
        BinaryOp::Add,
        ExprNode::field("fld_date"),
        ExprNode::IntegerLit(1),
    );
    let expr = compile(&node);
    assert!(expr.is_unconditional_error());
}
