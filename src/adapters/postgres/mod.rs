//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresDocumentRepository` - documents, access rows, operations and versions

mod document_repository;

pub use document_repository::PostgresDocumentRepository;
