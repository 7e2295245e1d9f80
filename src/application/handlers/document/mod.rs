//! Document command and query handlers.
//!
//! `ApplyOperationHandler` is the operation service the collaboration rooms
//! call for every accepted edit. The remaining handlers cover creation,
//! lookup, history and revert.

mod apply_operation;
mod create_document;
mod deadline;
mod get_document;
mod list_versions;
mod revert_to_version;

pub use apply_operation::{ApplyOperationCommand, ApplyOperationHandler, ApplyOperationResult};
pub use create_document::{CreateDocumentCommand, CreateDocumentHandler};
pub use deadline::StorageDeadline;
pub use get_document::{GetDocumentHandler, GetDocumentQuery};
pub use list_versions::{ListVersionsHandler, ListVersionsQuery};
pub use revert_to_version::{RevertToVersionCommand, RevertToVersionHandler};
