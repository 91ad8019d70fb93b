//! Field-to-SQL-metadata resolver: one closed dispatch from a field
//! descriptor to the logical type, multiplicity and physical storage the
//! coercion engine works with.

use crate::types::{CellValueType, FieldDescriptor, FieldKind, StorageKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSqlMeta {
    pub cell_type: CellValueType,
    pub is_multiple: bool,
    pub storage: StorageKind,
}

impl FieldSqlMeta {
    fn scalar(cell_type: CellValueType) -> FieldSqlMeta {
        FieldSqlMeta {
            cell_type,
            is_multiple: false,
            storage: StorageKind::Scalar,
        }
    }
}

/// Resolve the SQL-level metadata for a field.
///
/// Every kind is matched explicitly; there is no default arm, so adding a
/// field kind forces a decision here before the crate builds again.
pub fn field_sql_meta(field: &FieldDescriptor) -> FieldSqlMeta {
    use FieldKind::*;

    match field.kind {
        SingleLineText | LongText | SingleSelect => FieldSqlMeta::scalar(CellValueType::String),
        MultipleSelect => FieldSqlMeta {
            cell_type: CellValueType::String,
            is_multiple: true,
            storage: StorageKind::Array,
        },
        Number | Rating | AutoNumber => FieldSqlMeta::scalar(CellValueType::Number),
        Checkbox => FieldSqlMeta::scalar(CellValueType::Boolean),
        Date | CreatedTime | LastModifiedTime => FieldSqlMeta::scalar(CellValueType::DateTime),
        User | Link => FieldSqlMeta {
            cell_type: CellValueType::String,
            is_multiple: field.multiple,
            storage: if field.multiple {
                StorageKind::Array
            } else {
                StorageKind::Json
            },
        },
        CreatedBy | LastModifiedBy | Button => FieldSqlMeta {
            cell_type: CellValueType::String,
            is_multiple: false,
            storage: StorageKind::Json,
        },
        Attachment => FieldSqlMeta {
            cell_type: CellValueType::String,
            is_multiple: true,
            storage: StorageKind::Array,
        },
        Formula => FieldSqlMeta::scalar(field.declared_type.unwrap_or(CellValueType::Unknown)),
        Rollup | ConditionalRollup => {
            FieldSqlMeta::scalar(field.declared_type.unwrap_or(CellValueType::Number))
        }
        Lookup | ConditionalLookup => FieldSqlMeta {
            cell_type: field
                .inner
                .as_deref()
                .map(|inner| field_sql_meta(inner).cell_type)
                .unwrap_or(CellValueType::Unknown),
            is_multiple: true,
            storage: StorageKind::Array,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(FieldKind::SingleLineText, CellValueType::String, false, StorageKind::Scalar)]
    #[test_case(FieldKind::MultipleSelect, CellValueType::String, true, StorageKind::Array)]
    #[test_case(FieldKind::Number, CellValueType::Number, false, StorageKind::Scalar)]
    #[test_case(FieldKind::Checkbox, CellValueType::Boolean, false, StorageKind::Scalar)]
    #[test_case(FieldKind::Date, CellValueType::DateTime, false, StorageKind::Scalar)]
    #[test_case(FieldKind::Button, CellValueType::String, false, StorageKind::Json)]
    #[test_case(FieldKind::Attachment, CellValueType::String, true, StorageKind::Array)]
    fn test_plain_kinds(
        kind: FieldKind,
        cell_type: CellValueType,
        multiple: bool,
        storage: StorageKind,
    ) {
        let field = FieldDescriptor::new("fld1", "f", kind);
        let meta = field_sql_meta(&field);
        assert_eq!(meta.cell_type, cell_type);
        assert_eq!(meta.is_multiple, multiple);
        assert_eq!(meta.storage, storage);
    }

    #[test]
    fn test_link_multiplicity_switches_storage() {
        let single = FieldDescriptor::new("fld1", "link", FieldKind::Link);
        assert_eq!(field_sql_meta(&single).storage, StorageKind::Json);

        let many = single.clone().with_multiple(true);
        let meta = field_sql_meta(&many);
        assert_eq!(meta.storage, StorageKind::Array);
        assert!(meta.is_multiple);
    }

    #[test]
    fn test_lookup_takes_inner_type() {
        let inner = FieldDescriptor::new("fld2", "amount", FieldKind::Number);
        let lookup = FieldDescriptor::new("fld1", "amounts", FieldKind::Lookup).with_inner(inner);
        let meta = field_sql_meta(&lookup);
        assert_eq!(meta.cell_type, CellValueType::Number);
        assert!(meta.is_multiple);
        assert_eq!(meta.storage, StorageKind::Array);
    }

    #[test]
    fn test_formula_uses_declared_type() {
        let field = FieldDescriptor::new("fld1", "f", FieldKind::Formula)
            .with_declared_type(CellValueType::Boolean);
        assert_eq!(field_sql_meta(&field).cell_type, CellValueType::Boolean);
    }
}
