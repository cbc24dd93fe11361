//! Schema document type
//!
//! A schema document is the JSON object describing a form. Its grammar is
//! owned by the form renderer (Formily); this crate only guarantees that it
//! is a JSON object.

use crate::error::FormcraftError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A generated form schema
///
/// Serializes transparently as the underlying JSON object.
///
/// # Examples
///
/// ```
/// use formcraft::schema::SchemaDocument;
/// use serde_json::json;
///
/// let schema = SchemaDocument::try_from(json!({
///     "type": "object",
///     "properties": { "name": { "type": "string" } }
/// }))
/// .unwrap();
/// assert_eq!(schema.field_names(), vec!["name"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDocument(Map<String, Value>);

impl SchemaDocument {
    /// Parse a schema document from JSON text
    ///
    /// # Errors
    ///
    /// Returns `FormcraftError::MalformedSchema` if the text is not JSON or
    /// is JSON but not an object
    pub fn parse(text: &str) -> Result<Self, FormcraftError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| FormcraftError::MalformedSchema(e.to_string()))?;
        Self::try_from(value)
    }

    /// Top-level field names from the `properties` map
    pub fn field_names(&self) -> Vec<&str> {
        self.0
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Borrow the underlying JSON object
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a plain JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Pretty-printed JSON text
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| "{}".to_string())
    }
}

impl TryFrom<Value> for SchemaDocument {
    type Error = FormcraftError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(FormcraftError::MalformedSchema(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
