//! RevertToVersionHandler - Command handler for restoring an earlier snapshot.
//!
//! A revert is an ordinary forward edit: the content of the chosen snapshot
//! becomes the new content and the version moves forward by one. Like every
//! other edit it must run inside the document's room, which calls this
//! handler for `revert` frames.

use std::sync::Arc;

use crate::domain::document::{Document, DocumentError, DocumentVersion, REVERT_LABEL};
use crate::domain::foundation::{DocumentId, TenantId, Timestamp, UserId, VersionId};
use crate::ports::DocumentRepository;

use super::StorageDeadline;

/// Command to revert a document to one of its snapshots.
#[derive(Debug, Clone)]
pub struct RevertToVersionCommand {
    pub tenant_id: TenantId,
    pub document_id: DocumentId,
    pub version_id: VersionId,
    pub user_id: UserId,
}

/// Handler for reverting documents.
pub struct RevertToVersionHandler {
    repository: Arc<dyn DocumentRepository>,
    deadline: StorageDeadline,
}

impl RevertToVersionHandler {
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
        cmd: RevertToVersionCommand,
    ) -> Result<(Document, DocumentVersion), DocumentError> {
        let versions = self
            .deadline
            .run(
                self.repository
                    .list_versions(&cmd.tenant_id, &cmd.document_id, None),
            )
            .await?;

        let target = versions
            .into_iter()
            .find(|v| v.id == cmd.version_id)
            .ok_or(DocumentError::VersionNotFound(cmd.version_id))?;

        let mut document = self
            .deadline
            .run(self.repository.get_document(&cmd.tenant_id, &cmd.document_id))
            .await?
            .ok_or_else(|| DocumentError::not_found(&cmd.tenant_id, &cmd.document_id))?;

        let now = Timestamp::now();
        document.replace_content(target.content, now);
        self.deadline
            .write_document(self.repository.as_ref(), &document)
            .await?;

        let restored = DocumentVersion::snapshot(&document, cmd.user_id, REVERT_LABEL, now);
        if let Err(e) = self.deadline.run(self.repository.save_version(&restored)).await {
            tracing::warn!(
                document_id = %document.id(),
                sequence = restored.sequence,
                "Failed to persist revert snapshot: {}",
                e
            );
        }

        tracing::info!(
            document_id = %document.id(),
            restored_from = target.sequence,
            version = document.version(),
            "Document reverted"
        );

        Ok((document, restored))
    }
}
