//! CreateDocumentHandler - Command handler for creating new documents.

use std::sync::Arc;

use crate::domain::document::{Document, DocumentError, DocumentVersion, INITIAL_LABEL};
use crate::domain::foundation::{DocumentId, TenantId, UserId};
use crate::ports::DocumentRepository;

use super::StorageDeadline;

/// Command to create a new document.
#[derive(Debug, Clone)]
pub struct CreateDocumentCommand {
    pub tenant_id: TenantId,
    pub owner_id: UserId,
    pub title: String,
    pub initial_content: String,
}

/// Handler for creating documents.
pub struct CreateDocumentHandler {
    repository: Arc<dyn DocumentRepository>,
    deadline: StorageDeadline,
}

impl CreateDocumentHandler {
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

    pub async fn handle(&self, cmd: CreateDocumentCommand) -> Result<Document, DocumentError> {
        if cmd.title.trim().is_empty() {
            return Err(DocumentError::validation("title", "Title cannot be empty"));
        }

        let document = Document::new(
            DocumentId::generate(),
            cmd.tenant_id,
            cmd.owner_id.clone(),
            cmd.title,
            cmd.initial_content,
        );

        self.deadline
            .run(self.repository.create_document(&document))
            .await?;

        let initial = DocumentVersion::snapshot(
            &document,
            cmd.owner_id,
            INITIAL_LABEL,
            *document.created_at(),
        );
        if let Err(e) = self.deadline.run(self.repository.save_version(&initial)).await {
            tracing::warn!(
                document_id = %document.id(),
                "Failed to persist initial version snapshot: {}",
                e
            );
        }

        tracing::debug!(
            tenant_id = %document.tenant_id(),
            document_id = %document.id(),
            "Document created"
        );

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryDocumentRepository;
    use crate::domain::document::{AccessLevel, INITIAL_VERSION};
    use crate::domain::foundation::ErrorCode;

    fn command(title: &str) -> CreateDocumentCommand {
        CreateDocumentCommand {
            tenant_id: TenantId::new("acme").unwrap(),
            owner_id: UserId::new("owner").unwrap(),
            title: title.to_string(),
            initial_content: "A".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_document_with_initial_snapshot() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let handler = CreateDocumentHandler::new(repo.clone());

        let document = handler.handle(command("Plan")).await.unwrap();

        assert_eq!(document.version(), INITIAL_VERSION);
        assert_eq!(
            document.access_for(document.owner_id()),
            Some(AccessLevel::Edit)
        );

        let versions = repo
            .list_versions(document.tenant_id(), document.id(), None)
            .await
            .unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].sequence, 1);
        assert_eq!(versions[0].label, "initial");
        assert_eq!(versions[0].content, "A");
    }

    #[tokio::test]
    async fn rejects_blank_title() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let handler = CreateDocumentHandler::new(repo.clone());

        let err = handler.handle(command("  ")).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert_eq!(repo.document_count().await, 0);
    }
}
