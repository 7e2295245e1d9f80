//! Document repository port.
//!
//! Defines the storage contract the collaboration engine consumes. The
//! operation service's only I/O goes through this trait.
//!
//! # Design
//!
//! - **Tenant-scoped**: every lookup takes the tenant, a document of another
//!   tenant is indistinguishable from a missing one
//! - **Append-only history**: operations and versions are never rewritten
//! - **Concurrency**: implementations must be safe to call from many rooms at
//!   once; callers serialize writes per document

use async_trait::async_trait;

use crate::domain::document::{Document, DocumentVersion, Operation};
use crate::domain::foundation::{DocumentId, DomainError, TenantId};

/// Repository port for documents and their edit history.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Insert a new document with its permissions and share links.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn create_document(&self, document: &Document) -> Result<(), DomainError>;

    /// Find a document by tenant and ID.
    ///
    /// Returns `None` if not found.
    async fn get_document(
        &self,
        tenant_id: &TenantId,
        document_id: &DocumentId,
    ) -> Result<Option<Document>, DomainError>;

    /// Overwrite an existing document (content, version, permissions, links).
    ///
    /// # Errors
    ///
    /// - `DocumentNotFound` if the document doesn't exist for its tenant
    /// - `DatabaseError` on persistence failure
    async fn update_document(&self, document: &Document) -> Result<(), DomainError>;

    /// Append an operation audit record.
    async fn save_operation(&self, operation: &Operation) -> Result<(), DomainError>;

    /// Append a version snapshot.
    async fn save_version(&self, version: &DocumentVersion) -> Result<(), DomainError>;

    /// List version snapshots, newest first.
    ///
    /// `limit` caps the number of rows returned; `None` returns all of them.
    async fn list_versions(
        &self,
        tenant_id: &TenantId,
        document_id: &DocumentId,
        limit: Option<u32>,
    ) -> Result<Vec<DocumentVersion>, DomainError>;
}
