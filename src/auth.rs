//! Identifiers and secret-bearing token types threaded through the pipeline.

pub mod id;
pub mod token;

pub use id::*;
pub use token::{result::*, secret::*};
