//! Error types for the docdb client.
//!
//! This module provides a unified error type with explicit variants for
//! transport, authentication, protocol, input validation, and precondition
//! errors.

use std::fmt;
use thiserror::Error;

use crate::types::{ResourceId, ResourceType, Verb};

/// The unified error type for docdb operations.
///
/// This error type covers all possible failure modes in the library,
/// with explicit variants to allow callers to handle specific cases.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (connection, timeout, cancellation).
    #[error("transport error ({context}): {source}")]
    Transport {
        /// The request that failed.
        context: RequestContext,
        /// The underlying transport failure.
        #[source]
        source: TransportError,
    },

    /// Authentication errors (malformed master key).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (non-success status, unexpected response shape).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (blank query, blank endpoint, bad parameter).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// A document operation was called on a document that cannot support it.
    #[error("precondition violated: {0}")]
    Precondition(#[from] PreconditionError),

    /// A document or query operation was called before resource resolution.
    #[error("{resource} has not been resolved; call initialize() first")]
    NotInitialized {
        /// The resource that is still unresolved.
        resource: ResourceType,
    },
}

impl Error {
    /// Returns true if the failure is worth retrying.
    ///
    /// Transport failures are transient unless the request was cancelled.
    /// Protocol failures are transient only for throttling, timeout, and
    /// server-side availability statuses.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport { source, .. } => !matches!(source, TransportError::Cancelled),
            Error::Protocol(err) => err.is_transient(),
            _ => false,
        }
    }

    /// Returns the HTTP status of a protocol failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Protocol(err) => Some(err.status),
            _ => None,
        }
    }
}

/// Identifies the request a remote failure belongs to.
///
/// Carried on transport and protocol errors so that a signature mismatch can
/// be told apart from a genuine service error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// HTTP verb the request was signed with.
    pub verb: Verb,
    /// Resource type the request was signed with.
    pub resource_type: ResourceType,
    /// Resource id the request was signed with (empty for database scope).
    pub resource_id: ResourceId,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(verb: Verb, resource_type: ResourceType, resource_id: ResourceId) -> Self {
        Self {
            verb,
            resource_type,
            resource_id,
        }
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} '{}'",
            self.verb,
            self.resource_type.as_str(),
            self.resource_id
        )
    }
}

/// Transport-level errors reported by a [`Transport`](crate::traits::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The request was cancelled before completing.
    #[error("request cancelled")]
    Cancelled,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The master key is missing or is not valid base64.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Protocol-level errors from service responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code (0 when the failure is not tied to a status).
    pub status: u16,
    /// Service error code (if present).
    pub code: Option<String>,
    /// Error message from the service.
    pub message: Option<String>,
    /// The request that produced this error.
    pub context: RequestContext,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        write!(f, " ({})", self.context)
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(
        status: u16,
        code: Option<String>,
        message: Option<String>,
        context: RequestContext,
    ) -> Self {
        Self {
            status,
            code,
            message,
            context,
        }
    }

    /// Create an error for a successful response whose body could not be used.
    pub fn invalid_response(message: impl Into<String>, context: RequestContext) -> Self {
        Self::new(0, None, Some(message.into()), context)
    }

    /// Check if the service rejected the request signature or key.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    /// Check if the service reported that the resource already exists.
    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    /// Check if the status indicates a failure that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self.status, 408 | 429 | 449 | 500 | 502 | 503 | 504)
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid endpoint URL.
    #[error("invalid endpoint '{value}': {reason}")]
    Endpoint { value: String, reason: String },

    /// Invalid query string.
    #[error("invalid query: {reason}")]
    Query { reason: String },

    /// Invalid query parameter.
    #[error("invalid query parameter '{name}': {reason}")]
    Parameter { name: String, reason: String },

    /// Invalid document value.
    #[error("invalid document: {reason}")]
    Document { reason: String },

    /// A required configuration setting is missing or blank.
    #[error("missing configuration setting '{name}'")]
    MissingSetting { name: String },

    /// Invalid resource name.
    #[error("invalid resource name '{value}': {reason}")]
    ResourceName { value: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// Violated preconditions on document operations.
#[derive(Debug, Error)]
pub enum PreconditionError {
    /// The document carries no `_rid`, so it cannot be addressed.
    #[error("document has no resource id (_rid); it must be created before it can be {operation}")]
    MissingResourceId { operation: &'static str },
}
