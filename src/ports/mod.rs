//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `DocumentRepository` - Documents, operation audit records and version
//!   snapshots

mod document_repository;

pub use document_repository::DocumentRepository;
