//! Query parameter and result types.

use indexmap::IndexMap;
use serde_json::Value;

use super::Document;
use crate::error::{Error, InvalidInputError};
use crate::types::ContinuationToken;

/// Named query parameter bindings.
///
/// Names follow the `@name` convention and are unique; binding a name again
/// replaces its value in place. Insertion order is preserved so request bodies
/// are stable.
///
/// # Example
///
/// ```
/// use docdb_core::QueryParameters;
///
/// let params = QueryParameters::new()
///     .with("@t", "sensor").unwrap()
///     .with("@min", 5).unwrap();
///
/// assert_eq!(params.len(), 2);
/// assert_eq!(params.get("@t").unwrap(), "sensor");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParameters(IndexMap<String, Value>);

impl QueryParameters {
    /// Create an empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name does not start with `@` or has nothing
    /// after it.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), Error> {
        let name = name.into();
        Self::validate(&name)?;
        self.0.insert(name, value.into());
        Ok(())
    }

    /// Chaining form of [`bind`](Self::bind).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<Self, Error> {
        self.bind(name, value)?;
        Ok(self)
    }

    /// Look up a binding.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Iterate bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(name: &str) -> Result<(), Error> {
        let Some(rest) = name.strip_prefix('@') else {
            return Err(InvalidInputError::Parameter {
                name: name.to_string(),
                reason: "must start with '@'".to_string(),
            }
            .into());
        };

        if rest.is_empty() || rest.chars().any(char::is_whitespace) {
            return Err(InvalidInputError::Parameter {
                name: name.to_string(),
                reason: "must be '@' followed by a non-blank identifier".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Check that a query string is usable.
///
/// # Errors
///
/// Returns an error if the query is empty or whitespace-only.
pub fn validate_query(query: &str) -> Result<(), Error> {
    if query.trim().is_empty() {
        return Err(InvalidInputError::Query {
            reason: "query string is empty".to_string(),
        }
        .into());
    }
    Ok(())
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Documents in server order.
    pub documents: Vec<Document>,

    /// Item count for this page, when the service reported one.
    pub item_count: Option<u32>,

    /// Cursor for the next page, if more results exist.
    pub continuation: Option<ContinuationToken>,
}

impl QueryResult {
    /// Returns true when no further pages exist.
    pub fn is_terminal(&self) -> bool {
        self.continuation.is_none()
    }
}
