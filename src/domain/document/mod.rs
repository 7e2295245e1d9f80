//! Document domain module.
//!
//! The document aggregate, the immutable records an accepted edit produces
//! (operation audit entries and version snapshots), and document errors.

mod aggregate;
mod errors;
mod records;

pub use aggregate::{AccessLevel, Document, ShareLink, INITIAL_VERSION};
pub use errors::DocumentError;
pub use records::{DocumentVersion, Operation, INITIAL_LABEL, REVERT_LABEL};
