//! In-memory field catalog and column resolver, for tests and simple
//! embedders. Production callers typically back these traits with their own
//! metadata store.

use std::{collections::HashMap, sync::Arc};

use crate::{
    sql::translator::{ColumnResolver, FieldCatalog},
    types::{FieldDescriptor, FormulaError, FormulaResult},
};

/// A table's worth of field descriptors.
#[derive(Default)]
pub struct TableSchema {
    fields: Vec<Arc<FieldDescriptor>>,
}

impl TableSchema {
    pub fn new() -> TableSchema {
        TableSchema::default()
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> TableSchema {
        self.fields.push(Arc::new(field));
        self
    }

    pub fn add(&mut self, field: FieldDescriptor) {
        self.fields.push(Arc::new(field));
    }
}

impl FieldCatalog for TableSchema {
    fn field_by_id(&self, id: &str) -> Option<Arc<FieldDescriptor>> {
        self.fields.iter().find(|f| f.id == id).cloned()
    }

    fn field_by_name(&self, name: &str) -> Option<Arc<FieldDescriptor>> {
        let wanted = name.trim().to_lowercase();
        self.fields
            .iter()
            .find(|f| f.name.trim().to_lowercase() == wanted)
            .cloned()
    }
}

/// Field-id-to-column-SQL map.
#[derive(Default)]
pub struct ColumnMap {
    columns: HashMap<String, String>,
}

impl ColumnMap {
    pub fn new() -> ColumnMap {
        ColumnMap::default()
    }

    pub fn with_column(mut self, field_id: &str, column_sql: &str) -> ColumnMap {
        self.columns
            .insert(field_id.to_owned(), column_sql.to_owned());
        self
    }
}

impl ColumnResolver for ColumnMap {
    fn column_sql(&self, field: &FieldDescriptor) -> FormulaResult<String> {
        self.columns
            .get(&field.id)
            .cloned()
            .ok_or_else(|| FormulaError::column(&format!("no column for field '{}'", field.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldKind;

    #[test]
    fn test_name_lookup_is_case_insensitive_and_trimmed() {
        let schema = TableSchema::new()
            .with_field(FieldDescriptor::new("fld1", "Total Price", FieldKind::Number));
        assert!(schema.field_by_name("  total price ").is_some());
        assert!(schema.field_by_name("total").is_none());
    }

    #[test]
    fn test_missing_column_is_a_resolution_error() {
        let map = ColumnMap::new();
        let field = FieldDescriptor::new("fld1", "f", FieldKind::Number);
        assert!(matches!(
            map.column_sql(&field),
            Err(FormulaError::ColumnResolution(_))
        ));
    }
}
