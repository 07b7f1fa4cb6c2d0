//! Collaborator traits for transport and configuration.

mod config;
mod transport;

pub use config::ConfigProvider;
pub use transport::{HttpRequest, HttpResponse, Transport};
