//! In-memory document repository.
//!
//! Keeps every document, operation and version in process memory. Used when
//! no database is configured and as the backing store in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::document::{Document, DocumentVersion, Operation};
use crate::domain::foundation::{DocumentId, DomainError, ErrorCode, TenantId};
use crate::ports::DocumentRepository;

type DocumentKey = (TenantId, DocumentId);

/// Thread-safe in-memory store.
///
/// # Example
///
/// ```ignore
/// let repo = Arc::new(InMemoryDocumentRepository::new());
/// repo.create_document(&document).await?;
///
/// // Assert in tests
/// assert_eq!(repo.operations_for(&tenant, &doc).await.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryDocumentRepository {
    documents: RwLock<HashMap<DocumentKey, Document>>,
    operations: RwLock<HashMap<DocumentKey, Vec<Operation>>>,
    versions: RwLock<HashMap<DocumentKey, Vec<DocumentVersion>>>,
}

impl InMemoryDocumentRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Returns the operation audit trail of a document, oldest first.
    pub async fn operations_for(
        &self,
        tenant_id: &TenantId,
        document_id: &DocumentId,
    ) -> Vec<Operation> {
        self.operations
            .read()
            .await
            .get(&(tenant_id.clone(), document_id.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns count of stored documents.
    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn create_document(&self, document: &Document) -> Result<(), DomainError> {
        let key = (document.tenant_id().clone(), document.id().clone());
        let mut documents = self.documents.write().await;
        if documents.contains_key(&key) {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Document {} already exists", document.id()),
            )
            .with_detail("field", "id"));
        }
        documents.insert(key, document.clone());
        Ok(())
    }

    async fn get_document(
        &self,
        tenant_id: &TenantId,
        document_id: &DocumentId,
    ) -> Result<Option<Document>, DomainError> {
        let key = (tenant_id.clone(), document_id.clone());
        Ok(self.documents.read().await.get(&key).cloned())
    }

    async fn update_document(&self, document: &Document) -> Result<(), DomainError> {
        let key = (document.tenant_id().clone(), document.id().clone());
        let mut documents = self.documents.write().await;

        match documents.get_mut(&key) {
            Some(stored) => {
                *stored = document.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::DocumentNotFound,
                format!("Document not found: {}/{}", key.0, key.1),
            )),
        }
    }

    async fn save_operation(&self, operation: &Operation) -> Result<(), DomainError> {
        let key = (operation.tenant_id.clone(), operation.document_id.clone());
        self.operations
            .write()
            .await
            .entry(key)
            .or_default()
            .push(operation.clone());
        Ok(())
    }

    async fn save_version(&self, version: &DocumentVersion) -> Result<(), DomainError> {
        let key = (version.tenant_id.clone(), version.document_id.clone());
        self.versions
            .write()
            .await
            .entry(key)
            .or_default()
            .push(version.clone());
        Ok(())
    }

    async fn list_versions(
        &self,
        tenant_id: &TenantId,
        document_id: &DocumentId,
        limit: Option<u32>,
    ) -> Result<Vec<DocumentVersion>, DomainError> {
        let key = (tenant_id.clone(), document_id.clone());
        let mut versions = self
            .versions
            .read()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_default();

        versions.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        if let Some(limit) = limit {
            versions.truncate(limit as usize);
        }
        Ok(versions)
    }
}
