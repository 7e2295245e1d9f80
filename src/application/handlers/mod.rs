//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod document;

pub use document::{
    ApplyOperationCommand, ApplyOperationHandler, ApplyOperationResult, CreateDocumentCommand,
    CreateDocumentHandler, GetDocumentHandler, GetDocumentQuery, ListVersionsHandler,
    ListVersionsQuery, RevertToVersionCommand, RevertToVersionHandler, StorageDeadline,
};
