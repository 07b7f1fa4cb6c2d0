//! Request authorization.
//!
//! Every request carries an `authorization` header derived from the account
//! master key, the request verb, the addressed resource, and the request date.
//! The [`Signer`] produces that header; it performs no network I/O.

mod master_key;
mod signer;

pub use master_key::MasterKey;
pub use signer::{AuthorizationToken, RequestDate, Signer};
