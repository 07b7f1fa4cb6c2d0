//! Document and query types.
//!
//! This module defines the values exchanged with the service.
//! The operations themselves live on the client in `docdb-rest`.

#[allow(clippy::module_inception)]
mod document;
mod query;

pub use document::{Document, ID_FIELD, RID_FIELD};
pub use query::{QueryParameters, QueryResult, validate_query};
