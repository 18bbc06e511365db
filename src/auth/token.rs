//! Token values produced and consumed by pipeline stages.

pub mod result;
pub mod secret;
