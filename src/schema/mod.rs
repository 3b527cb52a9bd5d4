//! Document schemas and the catalog that binds them to collections.
//!
//! # Data Flow
//! ```text
//! SchemaConfig (definitions + bindings + default)
//!     → catalog.rs (SchemaCatalog, resolved per CollectionKey)
//!     → DocumentSchema bound into an Accessor
//!     → validate.rs (insert documents, update changes)
//! ```
//!
//! # Design Decisions
//! - No implicit coercion: a field holds the declared JSON type or is rejected
//! - The reserved schema name `none` means schemaless
//! - Validation happens before anything reaches a backend

pub mod catalog;
pub mod validate;

use crate::config::schema::{FieldDefinition, FieldKind, SchemaDefinition, UnknownFields};

pub use catalog::SchemaCatalog;

/// Schema name that disables validation.
pub const SCHEMALESS: &str = "none";

/// Name of the built-in inventory schema.
pub const INVENTORY: &str = "inventory";

/// Food groups accepted by the inventory schema.
pub const FOOD_GROUPS: &[&str] = &["fruits", "vegetables", "grains", "protein", "dairy"];

/// A compiled document shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSchema {
    name: String,
    fields: Vec<FieldDefinition>,
    unknown_fields: UnknownFields,
}

impl DocumentSchema {
    pub fn new(name: impl Into<String>, definition: SchemaDefinition) -> Self {
        Self {
            name: name.into(),
            fields: definition.fields,
            unknown_fields: definition.unknown_fields,
        }
    }

    /// A schema that accepts any object.
    pub fn schemaless() -> Self {
        Self {
            name: SCHEMALESS.to_string(),
            fields: Vec::new(),
            unknown_fields: UnknownFields::Allow,
        }
    }

    /// The grocery inventory item shape.
    pub fn inventory() -> Self {
        let field = |name: &str, kind, min| FieldDefinition {
            name: name.to_string(),
            kind,
            required: true,
            allowed: Vec::new(),
            min,
            index: false,
        };

        let mut food_group = field("food_group", FieldKind::String, None);
        food_group.allowed = FOOD_GROUPS.iter().map(|g| g.to_string()).collect();

        Self {
            name: INVENTORY.to_string(),
            fields: vec![
                field("item", FieldKind::String, None),
                food_group,
                field("price_in_usd", FieldKind::Number, Some(0.0)),
                field("quantity", FieldKind::Integer, Some(0.0)),
            ],
            unknown_fields: UnknownFields::Strip,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn unknown_fields(&self) -> UnknownFields {
        self.unknown_fields
    }

    pub fn is_schemaless(&self) -> bool {
        self.fields.is_empty() && self.unknown_fields == UnknownFields::Allow
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields that want a backend index.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.index)
            .map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_shape() {
        let schema = DocumentSchema::inventory();
        assert_eq!(schema.name(), INVENTORY);
        assert_eq!(schema.fields().len(), 4);
        assert!(schema.fields().iter().all(|f| f.required));
        assert_eq!(schema.field("food_group").unwrap().allowed.len(), FOOD_GROUPS.len());
        assert_eq!(schema.indexed_fields().count(), 0);
        assert!(!schema.is_schemaless());
    }

    #[test]
    fn schemaless_shape() {
        assert!(DocumentSchema::schemaless().is_schemaless());
    }
}
