//! Wire constants and request/response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use docdb_core::QueryParameters;

// ============================================================================
// Headers
// ============================================================================

pub const AUTHORIZATION: &str = "authorization";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const ACCEPT: &str = "Accept";
pub const MS_VERSION: &str = "x-ms-version";
pub const MS_DATE: &str = "x-ms-date";
pub const IS_QUERY: &str = "x-ms-documentdb-isquery";
pub const MAX_ITEM_COUNT: &str = "x-ms-max-item-count";
pub const CONTINUATION: &str = "x-ms-continuation";
pub const ITEM_COUNT: &str = "x-ms-item-count";

// ============================================================================
// Header values
// ============================================================================

pub const APPLICATION_JSON: &str = "application/json";
pub const QUERY_JSON: &str = "application/query+json";
pub const API_VERSION: &str = "2015-08-06";

// ============================================================================
// Bodies
// ============================================================================

/// Request body for a query.
#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<QueryParameter<'a>>,
}

impl<'a> QueryRequest<'a> {
    pub fn new(query: &'a str, parameters: &'a QueryParameters) -> Self {
        Self {
            query,
            parameters: parameters
                .iter()
                .map(|(name, value)| QueryParameter { name, value })
                .collect(),
        }
    }
}

/// A single named binding in a query body.
#[derive(Debug, Serialize)]
pub struct QueryParameter<'a> {
    pub name: &'a str,
    pub value: &'a Value,
}

/// Request body for creating a database or collection.
#[derive(Debug, Serialize)]
pub struct CreateResourceRequest<'a> {
    pub id: &'a str,
}

/// Error response format.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub code: Option<String>,
    pub message: Option<String>,
}
