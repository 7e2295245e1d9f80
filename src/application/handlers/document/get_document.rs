//! GetDocumentHandler - Query handler for the current persisted document.

use std::sync::Arc;

use crate::domain::document::{Document, DocumentError};
use crate::domain::foundation::{DocumentId, TenantId};
use crate::ports::DocumentRepository;

use super::StorageDeadline;

/// Query for a single document.
#[derive(Debug, Clone)]
pub struct GetDocumentQuery {
    pub tenant_id: TenantId,
    pub document_id: DocumentId,
}

/// Handler for loading documents.
pub struct GetDocumentHandler {
    repository: Arc<dyn DocumentRepository>,
    deadline: StorageDeadline,
}

impl GetDocumentHandler {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self {
            repository,
            deadline: StorageDeadline::none(),
        }
    }

    pub fn with_deadline(mut self, deadline: StorageDeadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn handle(&self, query: GetDocumentQuery) -> Result<Document, DocumentError> {
        self.deadline
            .run(
                self.repository
                    .get_document(&query.tenant_id, &query.document_id),
            )
            .await?
            .ok_or_else(|| DocumentError::not_found(&query.tenant_id, &query.document_id))
    }
}
