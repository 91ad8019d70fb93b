//! Branch unification for IF and SWITCH: merge heterogeneous branches into
//! one output type.

use super::{cast::retype, SqlBuilder, TextMode};
use crate::types::{CellValueType, SqlExpr, StorageKind};

/// The unified branches plus the shape they agreed on.
pub struct BranchSet {
    pub branches: Vec<SqlExpr>,
    pub value_type: CellValueType,
    pub is_array: bool,
}

impl<'a> SqlBuilder<'a> {
    /// Unify two or more branch expressions of possibly different types.
    ///
    /// Precedence: a blank-text literal against non-text branches becomes a
    /// typed NULL of their type; arrays of one common type stay arrays;
    /// otherwise number > datetime > boolean > string coercion of every
    /// branch. Combinations beyond that fall back to string coercion of
    /// all branches rather than a smarter guess.
    pub fn coerce_branches(&self, branches: Vec<SqlExpr>) -> BranchSet {
        let blanks: Vec<bool> = branches
            .iter()
            .map(|b| b.is_blank_string_literal())
            .collect();
        let typed: Vec<&SqlExpr> = branches
            .iter()
            .zip(&blanks)
            .filter(|(_, blank)| !**blank)
            .map(|(b, _)| b)
            .collect();

        // All branches blank: nothing to unify.
        if typed.is_empty() {
            return BranchSet {
                value_type: CellValueType::String,
                is_array: false,
                branches,
            };
        }

        // Arrays survive unification only when every typed branch is an
        // array of the same element type.
        let first_type = typed[0].value_type;
        if typed.iter().all(|b| b.is_array && b.value_type == first_type) {
            let branches = branches
                .into_iter()
                .zip(blanks)
                .map(|(b, blank)| {
                    if blank {
                        SqlExpr {
                            is_array: true,
                            storage: StorageKind::Array,
                            ..retype(null_out(b), first_type)
                        }
                    } else {
                        b
                    }
                })
                .collect();
            return BranchSet {
                branches,
                value_type: first_type,
                is_array: true,
            };
        }

        let target = pick_branch_type(&typed);
        let branches = branches
            .into_iter()
            .zip(blanks)
            .map(|(b, blank)| {
                if blank && target != CellValueType::String {
                    // A literal blank becomes a typed NULL instead of
                    // forcing every branch to string.
                    retype(null_out(b), target)
                } else {
                    self.coerce_branch_to(b, target)
                }
            })
            .collect();

        BranchSet {
            branches,
            value_type: target,
            is_array: false,
        }
    }

    /// SWITCH result unification: same rules as IF branches; the literal
    /// blank default must not drag every case to string.
    pub fn coerce_switch_results(&self, results: Vec<SqlExpr>) -> BranchSet {
        self.coerce_branches(results)
    }

    fn coerce_branch_to(&self, branch: SqlExpr, target: CellValueType) -> SqlExpr {
        match target {
            CellValueType::Number => self.coerce_to_number(branch, "branch_cannot_cast_to_number"),
            CellValueType::DateTime => {
                self.coerce_to_datetime(branch, "branch_cannot_cast_to_datetime")
            }
            CellValueType::Boolean => self.coerce_to_boolean(branch),
            CellValueType::String | CellValueType::Unknown => {
                self.coerce_to_string(branch, TextMode::Display)
            }
        }
    }
}

/// Common output type for mixed scalar branches. Unknown-typed branches do
/// not vote; with no vote at all the fallback is string.
fn pick_branch_type(typed: &[&SqlExpr]) -> CellValueType {
    let has = |t: CellValueType| typed.iter().any(|b| !b.is_array && b.value_type == t);

    if has(CellValueType::Number) {
        CellValueType::Number
    } else if has(CellValueType::DateTime) {
        CellValueType::DateTime
    } else if has(CellValueType::Boolean) {
        CellValueType::Boolean
    } else {
        CellValueType::String
    }
}

/// Replace a branch's value with NULL, keeping its error metadata.
fn null_out(branch: SqlExpr) -> SqlExpr {
    SqlExpr {
        value_sql: "NULL".to_owned(),
        ..branch
    }
}
