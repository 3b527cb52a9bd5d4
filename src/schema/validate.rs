//! Document validation against a `DocumentSchema`.

use serde_json::Value;

use crate::config::schema::{FieldDefinition, FieldKind, UnknownFields};
use crate::error::ValidationError;
use crate::schema::DocumentSchema;
use crate::store::{Document, ID_FIELD};

impl DocumentSchema {
    /// Validate a document about to be inserted.
    ///
    /// Returns the document as it should be stored (unknown fields stripped
    /// when the schema says so).
    pub fn validate_new(&self, value: Value) -> Result<Document, ValidationError> {
        let document = match value {
            Value::Object(map) => map,
            _ => return Err(ValidationError::NotAnObject),
        };

        let document = self.check_names(document)?;

        for field in &self.fields {
            match document.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(ValidationError::MissingField(field.name.clone()));
                }
                None | Some(Value::Null) => {}
                Some(value) => check_value(field, value)?,
            }
        }

        Ok(document)
    }

    /// Validate the changes of a merge update.
    ///
    /// Only fields present in `changes` are checked; required fields may not
    /// be cleared.
    pub fn validate_changes(&self, changes: Document) -> Result<Document, ValidationError> {
        let changes = self.check_names(changes)?;

        for (name, value) in &changes {
            let Some(field) = self.field(name) else {
                continue;
            };
            match value {
                Value::Null if field.required => {
                    return Err(ValidationError::MissingField(field.name.clone()));
                }
                Value::Null => {}
                value => check_value(field, value)?,
            }
        }

        Ok(changes)
    }

    /// Reject reserved and malformed names, then apply the unknown-field policy.
    fn check_names(&self, document: Document) -> Result<Document, ValidationError> {
        let mut checked = Document::new();
        for (name, value) in document {
            if name == ID_FIELD {
                return Err(ValidationError::ReservedField(name));
            }
            if name.is_empty() || name.starts_with('$') || name.contains('.') {
                return Err(ValidationError::InvalidFieldName(name));
            }
            if self.field(&name).is_none() {
                match self.unknown_fields {
                    UnknownFields::Allow => {}
                    UnknownFields::Strip => continue,
                    UnknownFields::Reject => return Err(ValidationError::UnknownField(name)),
                }
            }
            checked.insert(name, value);
        }
        Ok(checked)
    }
}

fn check_value(field: &FieldDefinition, value: &Value) -> Result<(), ValidationError> {
    let wrong_type = |expected| ValidationError::WrongType {
        field: field.name.clone(),
        expected,
    };

    let matches = match field.kind {
        FieldKind::String => value.is_string(),
        FieldKind::Number => value.is_number(),
        FieldKind::Integer => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Object => value.is_object(),
        FieldKind::Array => value.is_array(),
        FieldKind::Any => true,
    };
    if !matches {
        return Err(wrong_type(expected_name(field.kind)));
    }

    if let (Some(text), false) = (value.as_str(), field.allowed.is_empty()) {
        if !field.allowed.iter().any(|a| a == text) {
            return Err(ValidationError::NotAllowed {
                field: field.name.clone(),
                value: text.to_string(),
            });
        }
    }

    if let (Some(number), Some(min)) = (value.as_f64(), field.min) {
        if number < min {
            return Err(ValidationError::BelowMinimum {
                field: field.name.clone(),
                min,
            });
        }
    }

    Ok(())
}

fn expected_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String => "a string",
        FieldKind::Number => "a number",
        FieldKind::Integer => "an integer",
        FieldKind::Boolean => "a boolean",
        FieldKind::Object => "an object",
        FieldKind::Array => "an array",
        FieldKind::Any => "any value",
    }
}
