//! Formula syntax-tree nodes.
//!
//! The lexer/parser lives outside this crate; it hands the compiler an
//! already-parsed [`ExprNode`] tree. One variant exists per syntax shape the
//! grammar can produce, so the visitor's dispatch is a closed, exhaustive
//! match.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprNode {
    StringLit(String),
    IntegerLit(i64),
    DecimalLit(f64),
    BooleanLit(bool),
    /// A `{Field}` reference; carries the brace content verbatim (field id
    /// or display name, resolved by the translator).
    FieldRef(String),
    Unary {
        op: UnaryOp,
        operand: Box<ExprNode>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<ExprNode>,
        rhs: Box<ExprNode>,
    },
    /// A parenthesized group.
    Group(Box<ExprNode>),
    Call {
        name: String,
        args: Vec<ExprNode>,
    },
}

impl ExprNode {
    pub fn call(name: &str, args: Vec<ExprNode>) -> ExprNode {
        ExprNode::Call {
            name: name.to_owned(),
            args,
        }
    }

    pub fn field(token: &str) -> ExprNode {
        ExprNode::FieldRef(token.to_owned())
    }

    pub fn string(s: &str) -> ExprNode {
        ExprNode::StringLit(s.to_owned())
    }

    pub fn binary(op: BinaryOp, lhs: ExprNode, rhs: ExprNode) -> ExprNode {
        ExprNode::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnaryOp, operand: ExprNode) -> ExprNode {
        ExprNode::Unary {
            op,
            operand: Box::new(operand),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation, `-x`.
    Neg,
    /// Logical negation, `!x`.
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// String concatenation, `&`.
    Concat,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        use BinaryOp::*;

        matches!(self, Add | Sub | Mul | Div | Mod)
    }

    pub fn is_comparison(&self) -> bool {
        use BinaryOp::*;

        matches!(self, Eq | Ne | Gt | Ge | Lt | Le)
    }

    pub fn is_logical(&self) -> bool {
        use BinaryOp::*;

        matches!(self, And | Or)
    }

    /// The SQL operator token, for the operator families that map one to
    /// one onto SQL.
    pub fn sql_token(&self) -> &'static str {
        use BinaryOp::*;

        match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            Concat => "||",
            Eq => "=",
            Ne => "<>",
            Gt => ">",
            Ge => ">=",
            Lt => "<",
            Le => "<=",
            And => "AND",
            Or => "OR",
        }
    }
}
