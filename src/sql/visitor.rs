//! Syntax-tree dispatch: one compiled expression per node kind.
//!
//! Totality is structural: the match over [`ExprNode`] is exhaustive, so no
//! node shape can escape without producing a [`SqlExpr`]. A grammar change
//! that adds a variant fails to build until this dispatch decides what to
//! do with it.

use crate::{
    ast::ExprNode,
    sql::{
        functions::lookup_function,
        literal::quote_literal,
        translator::{Session, Translator},
    },
    types::{CellValueType, ErrorCode, FormulaResult, SqlExpr},
};

pub(crate) trait ToSql {
    fn to_sql(&self, tr: &Translator, session: &mut Session) -> FormulaResult<SqlExpr>;
}

impl ToSql for ExprNode {
    fn to_sql(&self, tr: &Translator, session: &mut Session) -> FormulaResult<SqlExpr> {
        match self {
            ExprNode::StringLit(s) => Ok(SqlExpr::new(quote_literal(s), CellValueType::String)),
            ExprNode::IntegerLit(i) => Ok(SqlExpr::new(i.to_string(), CellValueType::Number)),
            ExprNode::DecimalLit(d) => Ok(SqlExpr::new(d.to_string(), CellValueType::Number)),
            ExprNode::BooleanLit(v) => Ok(SqlExpr::new(
                if *v { "TRUE" } else { "FALSE" }.to_owned(),
                CellValueType::Boolean,
            )),
            ExprNode::FieldRef(token) => tr.resolve_reference(token, session),
            ExprNode::Unary { op, operand } => {
                let operand = operand.to_sql(tr, session)?;
                Ok(tr.builder().build_unary(*op, operand))
            }
            ExprNode::Binary { op, lhs, rhs } => {
                let lhs = lhs.to_sql(tr, session)?;
                let rhs = rhs.to_sql(tr, session)?;
                Ok(tr.builder().build_binary(*op, lhs, rhs))
            }
            ExprNode::Group(inner) => {
                let inner = inner.to_sql(tr, session)?;
                let value = format!("({})", inner.value_sql);
                Ok(SqlExpr { value_sql: value, ..inner })
            }
            ExprNode::Call { name, args } => {
                let Some(func) = lookup_function(name) else {
                    return Ok(SqlExpr::compile_error(
                        CellValueType::Unknown,
                        ErrorCode::NotImpl,
                        name.trim(),
                    ));
                };

                session.enter_call();
                let mut compiled = Vec::with_capacity(args.len());
                for arg in args {
                    let arg = match arg.to_sql(tr, session) {
                        Ok(a) => a,
                        Err(e) => {
                            session.leave_call();
                            return Err(e);
                        }
                    };
                    compiled.push(arg);
                }
                session.leave_call();

                Ok(func(&tr.builder(), compiled))
            }
        }
    }
}
