//! Low-level REST plumbing: header layout, signing, and response handling.

pub(crate) mod client;
pub(crate) mod wire;
