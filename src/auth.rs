//! Token models produced by the OAuth layer and consumed by the issuance pipeline.

pub mod introspection;
pub mod token;

pub use introspection::*;
pub use token::*;
