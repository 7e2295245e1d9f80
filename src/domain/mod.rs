//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `document` - Document aggregate, operation audit records and versions

pub mod document;
pub mod foundation;
