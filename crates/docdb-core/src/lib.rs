//! docdb-core - Core types, request signing, and collaborator traits for the
//! document database REST client.

pub mod auth;
pub mod config;
pub mod document;
pub mod error;
pub mod retry;
pub mod traits;
pub mod types;

pub use auth::{AuthorizationToken, MasterKey, RequestDate, Signer};
pub use config::{DocDbConfig, EnvConfigProvider};
pub use document::{Document, QueryParameters, QueryResult};
pub use error::{Error, RequestContext};
pub use retry::RetryPolicy;
pub use traits::{ConfigProvider, HttpRequest, HttpResponse, Transport};
pub use types::{ContinuationToken, Endpoint, ResourceId, ResourceName, ResourceType, Verb};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
