//! ListVersionsHandler - Query handler for a document's version history.

use std::sync::Arc;

use crate::domain::document::{DocumentError, DocumentVersion};
use crate::domain::foundation::{DocumentId, TenantId};
use crate::ports::DocumentRepository;

use super::StorageDeadline;

/// Query for version snapshots, newest first.
#[derive(Debug, Clone)]
pub struct ListVersionsQuery {
    pub tenant_id: TenantId,
    pub document_id: DocumentId,
    pub limit: Option<u32>,
}

/// Handler for listing versions.
pub struct ListVersionsHandler {
    repository: Arc<dyn DocumentRepository>,
    deadline: StorageDeadline,
}

impl ListVersionsHandler {
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

    pub async fn handle(
        &self,
        query: ListVersionsQuery,
    ) -> Result<Vec<DocumentVersion>, DocumentError> {
        self.deadline
            .run(
                self.repository
                    .list_versions(&query.tenant_id, &query.document_id, query.limit),
            )
            .await
    }
}
