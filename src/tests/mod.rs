mod sql_fn_tests;
mod type_prop_tests;

use crate::{
    ast::ExprNode,
    schema::{ColumnMap, TableSchema},
    sql::{CompilerConfig, InputCheckValidation, Translator},
    types::{CellValueType, FieldDescriptor, FieldKind, SqlExpr},
};

/// One table with a field of every interesting shape, plus the column SQL
/// for each stored field.
pub(crate) fn fixture() -> (TableSchema, ColumnMap, CompilerConfig, InputCheckValidation) {
    let schema = TableSchema::new()
        .with_field(FieldDescriptor::new("fld_num", "Number", FieldKind::Number))
        .with_field(FieldDescriptor::new("fld_text", "Text", FieldKind::SingleLineText))
        .with_field(FieldDescriptor::new("fld_notes", "Notes", FieldKind::LongText))
        .with_field(FieldDescriptor::new("fld_tags", "Tags", FieldKind::MultipleSelect))
        .with_field(FieldDescriptor::new("fld_date", "Date", FieldKind::Date))
        .with_field(FieldDescriptor::new("fld_done", "Done", FieldKind::Checkbox))
        .with_field(FieldDescriptor::new("fld_link", "Project", FieldKind::Link))
        .with_field(FieldDescriptor::new("fld_btn", "Button", FieldKind::Button))
        .with_field(
            FieldDescriptor::new("fld_amounts", "Amounts", FieldKind::Lookup)
                .with_inner(FieldDescriptor::new("fld_amount", "Amount", FieldKind::Number)),
        )
        .with_field(
            FieldDescriptor::new("fld_doubled", "Doubled", FieldKind::Formula)
                .with_declared_type(CellValueType::Number)
                .with_expression(ExprNode::binary(
                    crate::ast::BinaryOp::Mul,
                    ExprNode::field("fld_num"),
                    ExprNode::IntegerLit(2),
                )),
        );

    let columns = ColumnMap::new()
        .with_column("fld_num", "\"num\"")
        .with_column("fld_text", "\"txt\"")
        .with_column("fld_notes", "\"notes\"")
        .with_column("fld_tags", "\"tags\"")
        .with_column("fld_date", "\"dt\"")
        .with_column("fld_done", "\"done\"")
        .with_column("fld_link", "\"project\"")
        .with_column("fld_btn", "\"btn\"")
        .with_column("fld_amounts", "\"amounts\"")
        .with_column("fld_doubled", "\"doubled\"");

    (schema, columns, CompilerConfig::default(), InputCheckValidation)
}

pub(crate) fn compile(node: &ExprNode) -> SqlExpr {
    let (schema, columns, config, validation) = fixture();
    let translator = Translator::new(&schema, &columns, &config, &validation);
    translator.compile(node).unwrap()
}

pub(crate) fn render_sql(node: &ExprNode) -> String {
    let (schema, columns, config, validation) = fixture();
    let translator = Translator::new(&schema, &columns, &config, &validation);
    translator.render_sql(node).unwrap()
}
