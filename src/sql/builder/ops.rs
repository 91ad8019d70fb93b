//! Unary and binary operator lowering.

use super::{cast::rebuild, SqlBuilder, TextMode};
use crate::{
    ast::{BinaryOp, UnaryOp},
    sql::literal::error_literal,
    types::{CellValueType, ErrorCode, ErrorParts, SqlExpr, StorageKind},
};

impl<'a> SqlBuilder<'a> {
    pub fn build_unary(&self, op: UnaryOp, operand: SqlExpr) -> SqlExpr {
        match op {
            UnaryOp::Neg => {
                let num = self.coerce_to_number(operand, "cannot_cast_to_number");
                let value = format!("(-({}))", num.value_sql);
                rebuild(num, value, CellValueType::Number)
            }
            UnaryOp::Not => {
                let b = self.coerce_to_boolean(operand);
                let value = format!("(NOT COALESCE(({}), FALSE))", b.value_sql);
                rebuild(b, value, CellValueType::Boolean)
            }
        }
    }

    pub fn build_binary(&self, op: BinaryOp, lhs: SqlExpr, rhs: SqlExpr) -> SqlExpr {
        if op.is_arithmetic() {
            self.build_arithmetic(op, lhs, rhs)
        } else if op.is_comparison() {
            self.build_comparison(op, lhs, rhs)
        } else if op.is_logical() {
            self.build_logical(op, lhs, rhs)
        } else {
            self.build_concat(lhs, rhs)
        }
    }

    fn build_arithmetic(&self, op: BinaryOp, lhs: SqlExpr, rhs: SqlExpr) -> SqlExpr {
        let lhs = self.coerce_to_number(lhs, "cannot_cast_to_number");
        let rhs = self.coerce_to_number(rhs, "cannot_cast_to_number");

        let divides = matches!(op, BinaryOp::Div | BinaryOp::Mod);
        let value = if divides {
            format!(
                "(({}) {} NULLIF(({}), 0))",
                lhs.value_sql,
                op.sql_token(),
                rhs.value_sql
            )
        } else {
            format!(
                "(({}) {} ({}))",
                lhs.value_sql,
                op.sql_token(),
                rhs.value_sql
            )
        };

        let mut errors = ErrorParts::merge(&[&lhs, &rhs]);
        if divides {
            // Zero divisors are their own error kind, guarded independently
            // of operand validity.
            errors = errors.push(
                format!("(COALESCE(({}), 0) = 0)", rhs.value_sql),
                error_literal(ErrorCode::Div0, "division_by_zero"),
            );
        }

        errors.apply(SqlExpr::new(value, CellValueType::Number))
    }

    fn build_comparison(&self, op: BinaryOp, lhs: SqlExpr, rhs: SqlExpr) -> SqlExpr {
        use CellValueType::*;

        // Arrays compare by their normalized jsonb shape for equality and
        // by their stringified form for ordering.
        if lhs.is_array || rhs.is_array {
            return if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
                let l = self.normalize_array_expr(lhs);
                let r = self.normalize_array_expr(rhs);
                let value = format!("(({}) {} ({}))", l.value_sql, op.sql_token(), r.value_sql);
                ErrorParts::merge(&[&l, &r]).apply(SqlExpr::new(value, Boolean))
            } else {
                let l = self.coerce_to_string(lhs, TextMode::Plain);
                let r = self.coerce_to_string(rhs, TextMode::Plain);
                self.text_comparison(op, l, r)
            };
        }

        let either = |t: CellValueType| lhs.value_type == t || rhs.value_type == t;

        if either(Number) {
            let l = self.coerce_to_number(lhs, "cannot_cast_to_number");
            let r = self.coerce_to_number(rhs, "cannot_cast_to_number");
            let value = format!("(({}) {} ({}))", l.value_sql, op.sql_token(), r.value_sql);
            ErrorParts::merge(&[&l, &r]).apply(SqlExpr::new(value, Boolean))
        } else if either(DateTime) {
            let l = self.coerce_to_datetime(lhs, "cannot_cast_to_datetime");
            let r = self.coerce_to_datetime(rhs, "cannot_cast_to_datetime");
            let value = format!("(({}) {} ({}))", l.value_sql, op.sql_token(), r.value_sql);
            ErrorParts::merge(&[&l, &r]).apply(SqlExpr::new(value, Boolean))
        } else if either(Boolean) {
            let l = self.coerce_to_boolean(lhs);
            let r = self.coerce_to_boolean(rhs);
            let value = format!(
                "(COALESCE(({}), FALSE) {} COALESCE(({}), FALSE))",
                l.value_sql,
                op.sql_token(),
                r.value_sql
            );
            ErrorParts::merge(&[&l, &r]).apply(SqlExpr::new(value, Boolean))
        } else {
            let l = self.coerce_to_string(lhs, TextMode::Plain);
            let r = self.coerce_to_string(rhs, TextMode::Plain);
            self.text_comparison(op, l, r)
        }
    }

    fn text_comparison(&self, op: BinaryOp, l: SqlExpr, r: SqlExpr) -> SqlExpr {
        // Blank and NULL compare as equal text.
        let value = format!(
            "(COALESCE(({}), '') {} COALESCE(({}), ''))",
            l.value_sql,
            op.sql_token(),
            r.value_sql
        );
        ErrorParts::merge(&[&l, &r]).apply(SqlExpr::new(value, CellValueType::Boolean))
    }

    fn build_logical(&self, op: BinaryOp, lhs: SqlExpr, rhs: SqlExpr) -> SqlExpr {
        let l = self.coerce_to_boolean(lhs);
        let r = self.coerce_to_boolean(rhs);
        let value = format!(
            "(COALESCE(({}), FALSE) {} COALESCE(({}), FALSE))",
            l.value_sql,
            op.sql_token(),
            r.value_sql
        );
        ErrorParts::merge(&[&l, &r]).apply(SqlExpr::new(value, CellValueType::Boolean))
    }

    fn build_concat(&self, lhs: SqlExpr, rhs: SqlExpr) -> SqlExpr {
        let l = self.coerce_to_string(lhs, TextMode::Plain);
        let r = self.coerce_to_string(rhs, TextMode::Plain);
        let value = format!(
            "(COALESCE(({}), '') || COALESCE(({}), ''))",
            l.value_sql, r.value_sql
        );
        let out = ErrorParts::merge(&[&l, &r]).apply(SqlExpr::new(value, CellValueType::String));
        SqlExpr {
            storage: StorageKind::Scalar,
            ..out
        }
    }
}
