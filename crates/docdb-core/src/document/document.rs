//! Loosely-typed document values.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, InvalidInputError};
use crate::types::ResourceId;

/// Field holding the caller-chosen document id.
pub const ID_FIELD: &str = "id";

/// Field holding the server-assigned resource id.
pub const RID_FIELD: &str = "_rid";

/// A document: a JSON object of arbitrary shape.
///
/// The only schema knowledge the client has is the `id` and `_rid` fields;
/// everything else is opaque. Field lookups return `Option` rather than
/// silently producing nulls.
///
/// # Example
///
/// ```
/// use docdb_core::Document;
/// use serde_json::json;
///
/// let doc = Document::new(json!({
///     "id": "device-1",
///     "_rid": "Xyz789=",
///     "type": "sensor"
/// })).unwrap();
///
/// assert_eq!(doc.id(), Some("device-1"));
/// assert_eq!(doc.resource_id().unwrap().as_str(), "Xyz789=");
/// assert_eq!(doc.get_str("type"), Some("sensor"));
/// assert_eq!(doc.get_str("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a JSON object.
    pub fn new(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(InvalidInputError::Document {
                reason: format!("expected a JSON object, found {}", kind(&other)),
            }
            .into()),
        }
    }

    /// Get a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a field if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// The caller-chosen id, if present and a string.
    pub fn id(&self) -> Option<&str> {
        self.get_str(ID_FIELD)
    }

    /// The server-assigned resource id, if the document has been stored.
    ///
    /// Blank `_rid` values are treated as absent.
    pub fn resource_id(&self) -> Option<ResourceId> {
        self.get_str(RID_FIELD)
            .filter(|rid| !rid.trim().is_empty())
            .map(ResourceId::new)
    }

    /// Assign a fresh UUID id if the document has none, returning the id.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is present but not a string.
    pub fn ensure_id(&mut self) -> Result<&str, Error> {
        if let Some(other) = self.0.get(ID_FIELD).filter(|v| !v.is_string() && !v.is_null()) {
            return Err(InvalidInputError::Document {
                reason: format!("'id' must be a string, found {}", kind(other)),
            }
            .into());
        }

        if self.id().is_none() {
            self.0.insert(
                ID_FIELD.to_string(),
                Value::String(Uuid::new_v4().to_string()),
            );
        }

        Ok(self.id().unwrap_or_default())
    }

    /// Returns the underlying object.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume and return the document as a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for Document {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Document::new(value).map_err(serde::de::Error::custom)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
