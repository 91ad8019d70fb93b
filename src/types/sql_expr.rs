use std::sync::Arc;

use crate::{
    sql::literal::error_literal,
    types::{CellValueType, ErrorCode, FieldDescriptor, StorageKind},
};

/// The single currency of the compiler: a SQL fragment plus the type and
/// error metadata every downstream step needs.
///
/// If `error_condition_sql` is absent, `value_sql` can be used directly.
/// If present, `value_sql` must not be trusted while the condition holds;
/// consumers combining several expressions OR the conditions together and
/// keep the first non-absent message in source-argument order, so one root
/// cause is reported instead of a cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlExpr {
    /// SQL fragment producing the value when the error condition is false.
    pub value_sql: String,
    pub value_type: CellValueType,
    /// Whether `value_sql` yields a jsonb array of `value_type` elements.
    pub is_array: bool,
    /// Physical representation of the originating field's stored value.
    pub storage: StorageKind,
    /// SQL boolean fragment; when true at evaluation time the value must
    /// not be trusted.
    pub error_condition_sql: Option<String>,
    /// SQL text fragment evaluated only under the error condition; carries
    /// a `#ERROR:<CODE>:<reason>` payload.
    pub error_message_sql: Option<String>,
    /// Back-reference to the originating field, used only for formatting
    /// and inner-field metadata.
    pub field: Option<Arc<FieldDescriptor>>,
}

impl SqlExpr {
    pub fn new(value_sql: String, value_type: CellValueType) -> SqlExpr {
        SqlExpr {
            value_sql,
            value_type,
            is_array: false,
            storage: StorageKind::Scalar,
            error_condition_sql: None,
            error_message_sql: None,
            field: None,
        }
    }

    /// A typed NULL, used for blank defaults and error-path values.
    pub fn typed_null(value_type: CellValueType) -> SqlExpr {
        SqlExpr::new("NULL".to_owned(), value_type)
    }

    /// An expression that is unconditionally in error. Produced when the
    /// compiler can already prove the path impossible (wrong arity, a field
    /// kind that can never cast, a missing reference); no value SQL is
    /// generated for it at all.
    pub fn compile_error(value_type: CellValueType, code: ErrorCode, reason: &str) -> SqlExpr {
        SqlExpr {
            value_sql: "NULL".to_owned(),
            value_type,
            is_array: false,
            storage: StorageKind::Scalar,
            error_condition_sql: Some("TRUE".to_owned()),
            error_message_sql: Some(error_literal(code, reason)),
            field: None,
        }
    }

    pub fn with_field(mut self, field: Arc<FieldDescriptor>) -> SqlExpr {
        self.field = Some(field);
        self
    }

    pub fn with_array(mut self, is_array: bool) -> SqlExpr {
        self.is_array = is_array;
        self
    }

    pub fn with_storage(mut self, storage: StorageKind) -> SqlExpr {
        self.storage = storage;
        self
    }

    pub fn has_error(&self) -> bool {
        self.error_condition_sql.is_some()
    }

    /// True when the error condition can never be false, i.e. the whole
    /// expression was short-circuited at compile time.
    pub fn is_unconditional_error(&self) -> bool {
        self.error_condition_sql.as_deref() == Some("TRUE")
    }

    /// Blank string literals get special treatment during branch
    /// unification: a literal `''` against a non-text branch becomes a
    /// typed NULL instead of forcing everything to string.
    pub fn is_blank_string_literal(&self) -> bool {
        self.value_type == CellValueType::String && !self.is_array && self.value_sql == "''"
    }

    /// The error message to render when the condition holds, with a defect
    /// fallback for the (never expected) message-less case.
    pub fn error_message_or_fallback(&self) -> String {
        match &self.error_message_sql {
            Some(msg) => msg.clone(),
            None => error_literal(ErrorCode::Internal, "missing_error_message"),
        }
    }
}

/// Merged error condition/message pair for a combination of expressions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorParts {
    pub condition_sql: Option<String>,
    pub message_sql: Option<String>,
}

impl ErrorParts {
    pub fn none() -> ErrorParts {
        ErrorParts::default()
    }

    /// Merge the error metadata of `inputs` in source-argument order:
    /// conditions are OR'ed, and the message becomes a CASE that yields the
    /// first input whose condition holds. First match wins, so a single
    /// root error is reported.
    pub fn merge(inputs: &[&SqlExpr]) -> ErrorParts {
        let carriers: Vec<&SqlExpr> = inputs.iter().filter(|e| e.has_error()).copied().collect();

        match carriers.len() {
            0 => ErrorParts::none(),
            1 => ErrorParts {
                condition_sql: carriers[0].error_condition_sql.clone(),
                message_sql: Some(carriers[0].error_message_or_fallback()),
            },
            _ => {
                let conditions: Vec<&str> = carriers
                    .iter()
                    .map(|e| e.error_condition_sql.as_deref().unwrap_or("FALSE"))
                    .collect();

                let mut message = String::from("CASE");
                for e in &carriers {
                    message.push_str(&format!(
                        " WHEN {} THEN {}",
                        e.error_condition_sql.as_deref().unwrap_or("FALSE"),
                        e.error_message_or_fallback()
                    ));
                }
                message.push_str(" END");

                ErrorParts {
                    condition_sql: Some(format!("({})", conditions.join(" OR "))),
                    message_sql: Some(message),
                }
            }
        }
    }

    /// Append one more (condition, message) pair after the errors already
    /// merged from the inputs. Used by coercions that introduce their own
    /// runtime guard: upstream errors keep precedence.
    pub fn push(self, condition_sql: String, message_sql: String) -> ErrorParts {
        match self.condition_sql {
            None => ErrorParts {
                condition_sql: Some(condition_sql),
                message_sql: Some(message_sql),
            },
            Some(prev_cond) => {
                let prev_msg = self
                    .message_sql
                    .unwrap_or_else(|| error_literal(ErrorCode::Internal, "missing_error_message"));
                ErrorParts {
                    condition_sql: Some(format!("({} OR {})", prev_cond, condition_sql)),
                    message_sql: Some(format!(
                        "CASE WHEN {} THEN {} ELSE {} END",
                        prev_cond, prev_msg, message_sql
                    )),
                }
            }
        }
    }

    /// Apply the merged error metadata to an expression.
    pub fn apply(self, mut expr: SqlExpr) -> SqlExpr {
        expr.error_condition_sql = self.condition_sql;
        expr.error_message_sql = self.message_sql;
        expr
    }
}
