//! Typed names and identifiers accepted at the HTTP boundary.
//!
//! Request paths carry arbitrary strings; these newtypes are the only way
//! into the registries, so every cached key is known to be well formed.

use bson::oid::ObjectId;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::error::ValidationError;

const DATABASE_NAME_MAX: usize = 63;
const COLLECTION_NAME_MAX: usize = 120;
const DATABASE_FORBIDDEN: &[char] = &['/', '\\', '.', '"', '$', '*', '<', '>', ':', '|', '?', ' ', '\0'];

/// Name of a logical database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseName(String);

impl DatabaseName {
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        let invalid = |reason| ValidationError::InvalidName {
            kind: "database",
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if name.len() > DATABASE_NAME_MAX {
            return Err(invalid("must be at most 63 bytes"));
        }
        if name.contains(DATABASE_FORBIDDEN) {
            return Err(invalid("contains a forbidden character"));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a collection inside a database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionName(String);

impl CollectionName {
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        let invalid = |reason| ValidationError::InvalidName {
            kind: "collection",
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if name.len() > COLLECTION_NAME_MAX {
            return Err(invalid("must be at most 120 bytes"));
        }
        if name.contains(['$', '\0']) {
            return Err(invalid("contains a forbidden character"));
        }
        if name.starts_with("system.") {
            return Err(invalid("the system. prefix is reserved"));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite cache key of the accessor registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionKey {
    pub database: DatabaseName,
    pub collection: CollectionName,
}

impl CollectionKey {
    pub fn new(database: DatabaseName, collection: CollectionName) -> Self {
        Self {
            database,
            collection,
        }
    }

    /// Parse both halves of the key from raw path segments.
    pub fn parse(database: &str, collection: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(
            DatabaseName::parse(database)?,
            CollectionName::parse(collection)?,
        ))
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Primary key of a stored document (24 hex digits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(ObjectId);

impl DocumentId {
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    pub fn parse(id: &str) -> Result<Self, ValidationError> {
        ObjectId::parse_str(id)
            .map(Self)
            .map_err(|_| ValidationError::InvalidId(id.to_string()))
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

impl From<ObjectId> for DocumentId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_names() {
        assert!(DatabaseName::parse("Test").is_ok());
        assert!(DatabaseName::parse("inventory_2024").is_ok());
        assert!(DatabaseName::parse("").is_err());
        assert!(DatabaseName::parse("a.b").is_err());
        assert!(DatabaseName::parse("a b").is_err());
        assert!(DatabaseName::parse(&"x".repeat(64)).is_err());
    }

    #[test]
    fn collection_names() {
        assert!(CollectionName::parse("Items").is_ok());
        assert!(CollectionName::parse("orders.archive").is_ok());
        assert!(CollectionName::parse("$cmd").is_err());
        assert!(CollectionName::parse("system.users").is_err());
    }

    #[test]
    fn composite_key_display() {
        let key = CollectionKey::parse("Test", "Items").unwrap();
        assert_eq!(key.to_string(), "Test.Items");
    }

    #[test]
    fn document_ids() {
        let id = DocumentId::generate();
        assert_eq!(DocumentId::parse(&id.to_hex()).unwrap(), id);
        assert_eq!(
            DocumentId::parse("not-an-id"),
            Err(ValidationError::InvalidId("not-an-id".into()))
        );
        assert_eq!(
            serde_json::to_value(id).unwrap(),
            serde_json::Value::String(id.to_hex())
        );
    }
}
