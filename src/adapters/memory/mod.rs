//! In-memory adapters for development and tests.

mod document_repository;

pub use document_repository::InMemoryDocumentRepository;
