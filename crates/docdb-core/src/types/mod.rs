//! Protocol addressing types.
//!
//! These types enforce protocol invariants at construction time,
//! ensuring invalid states are unrepresentable.

mod endpoint;
mod resource;

pub use endpoint::Endpoint;
pub use resource::{ContinuationToken, ResourceId, ResourceName, ResourceType, Verb};
