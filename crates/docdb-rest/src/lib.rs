//! docdb-rest - REST client for the document database.
//!
//! [`DocDbClient`] resolves its database and collection by name, then runs
//! parameterized queries and document create/update/delete operations. Every
//! request is signed with the account master key and retried on transient
//! failures according to the configured policy.

mod client;
mod pager;
mod resolver;
mod rest;
mod transport;

pub use client::DocDbClient;
pub use pager::QueryPages;
pub use resolver::ResolutionState;
pub use transport::ReqwestTransport;
