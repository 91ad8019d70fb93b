use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::ExprNode;

/// Closed set of field kinds the compiler understands.
///
/// Adding a kind is a compile-time-checked exercise: every dispatch over
/// `FieldKind` is an exhaustive match, so a new variant fails to build until
/// each coercion path has decided what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    SingleLineText,
    LongText,
    SingleSelect,
    MultipleSelect,
    Number,
    Rating,
    AutoNumber,
    Checkbox,
    Date,
    CreatedTime,
    LastModifiedTime,
    User,
    CreatedBy,
    LastModifiedBy,
    Attachment,
    Link,
    Button,
    Formula,
    Lookup,
    ConditionalLookup,
    Rollup,
    ConditionalRollup,
}

impl FieldKind {
    /// Kinds whose stored value is a structured JSON object (or an array of
    /// them) rather than a plain scalar.
    pub fn is_json_object(&self) -> bool {
        use FieldKind::*;

        matches!(
            self,
            User | CreatedBy | LastModifiedBy | Attachment | Link | Button
        )
    }

    /// Kinds that can never carry numeric meaning, no matter what the cell
    /// holds. Coercing one of these to a number is a compile-time error.
    pub fn is_numeric_incapable(&self) -> bool {
        self.is_json_object()
    }

    /// Kinds that can never hold a point in time.
    pub fn is_datetime_incapable(&self) -> bool {
        use FieldKind::*;

        self.is_json_object() || matches!(self, Checkbox | Rating)
    }

    /// Lookup-shaped kinds that surface another field's value through a link
    /// relationship and therefore resolve through an inner field.
    pub fn is_lookup_like(&self) -> bool {
        use FieldKind::*;

        matches!(self, Lookup | ConditionalLookup | Rollup | ConditionalRollup)
    }
}

/// Logical type of a cell value, independent of how it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CellValueType {
    String,
    Number,
    Boolean,
    DateTime,
    Unknown,
}

/// Physical representation of a field's stored value. Orthogonal to
/// [`CellValueType`]: extraction and casting SQL differ by representation
/// even when the logical type is the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageKind {
    /// A plain typed column.
    Scalar,
    /// A jsonb column holding one object.
    Json,
    /// A jsonb column holding an array.
    Array,
}

/// Display formatting attached to a field. Patterns are `to_char`
/// compatible; translating UI-level formats into these patterns is the
/// catalog's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Formatting {
    Number {
        precision: u8,
    },
    Percent {
        precision: u8,
    },
    Currency {
        precision: u8,
        symbol: String,
    },
    DateTime {
        date: String,
        #[serde(default)]
        time: Option<String>,
    },
}

/// Read-only descriptor of one field, produced by the external catalog and
/// immutable for the duration of a compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: String,
    pub name: String,
    pub kind: FieldKind,
    /// Declared cell value type for kinds whose type is not implied by the
    /// kind itself (formula, rollup).
    #[serde(default)]
    pub declared_type: Option<CellValueType>,
    /// Multiplicity flag for kinds that may hold several values (link,
    /// user). Lookup-shaped kinds are always multiple regardless.
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub formatting: Option<Formatting>,
    /// For lookup-shaped kinds: the field being looked through.
    #[serde(default)]
    pub inner: Option<Arc<FieldDescriptor>>,
    /// For formula fields: the already-parsed expression, supplied by the
    /// catalog. The compiler never parses text itself.
    #[serde(default)]
    pub expression: Option<Arc<ExprNode>>,
}

impl FieldDescriptor {
    pub fn new(id: &str, name: &str, kind: FieldKind) -> FieldDescriptor {
        FieldDescriptor {
            id: id.to_owned(),
            name: name.to_owned(),
            kind,
            declared_type: None,
            multiple: false,
            formatting: None,
            inner: None,
            expression: None,
        }
    }

    pub fn with_declared_type(mut self, ty: CellValueType) -> FieldDescriptor {
        self.declared_type = Some(ty);
        self
    }

    pub fn with_multiple(mut self, multiple: bool) -> FieldDescriptor {
        self.multiple = multiple;
        self
    }

    pub fn with_formatting(mut self, formatting: Formatting) -> FieldDescriptor {
        self.formatting = Some(formatting);
        self
    }

    pub fn with_inner(mut self, inner: FieldDescriptor) -> FieldDescriptor {
        self.inner = Some(Arc::new(inner));
        self
    }

    pub fn with_expression(mut self, expression: ExprNode) -> FieldDescriptor {
        self.expression = Some(Arc::new(expression));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_round_trips_through_json() {
        let field = FieldDescriptor::new("fld1", "Price", FieldKind::Number).with_formatting(
            Formatting::Currency {
                precision: 2,
                symbol: "$".to_owned(),
            },
        );
        let json = serde_json::to_string(&field).unwrap();
        let back: FieldDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_descriptor_deserializes_from_catalog_json() {
        let field: FieldDescriptor = serde_json::from_value(serde_json::json!({
            "id": "fld_l",
            "name": "Amounts",
            "kind": "lookup",
            "inner": { "id": "fld_a", "name": "Amount", "kind": "number" }
        }))
        .unwrap();
        assert!(field.kind.is_lookup_like());
        assert_eq!(
            field.inner.as_deref().map(|f| f.kind),
            Some(FieldKind::Number)
        );
    }
}
