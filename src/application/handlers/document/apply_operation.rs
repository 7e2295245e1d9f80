//! ApplyOperationHandler - Command handler for applying one edit to one document.
//!
//! The edit replaces the whole content (last writer wins) and bumps the
//! version by one. Only the document update decides success; the audit
//! record and version snapshot are written afterwards on a best-effort basis.

use std::sync::Arc;

use crate::domain::document::{Document, DocumentError, DocumentVersion, Operation};
use crate::domain::foundation::{DocumentId, TenantId, Timestamp, UserId};
use crate::ports::DocumentRepository;

use super::StorageDeadline;

/// Command to apply an edit.
#[derive(Debug, Clone)]
pub struct ApplyOperationCommand {
    pub tenant_id: TenantId,
    pub document_id: DocumentId,
    pub user_id: UserId,
    /// Opaque client payload, stored verbatim in the audit record.
    pub delta: String,
    /// Full replacement content.
    pub new_content: String,
    /// Client-supplied logical clock. Recorded, never validated.
    pub lamport: i64,
    pub label: String,
}

/// Result of a successfully applied edit.
#[derive(Debug, Clone)]
pub struct ApplyOperationResult {
    pub document: Document,
    pub operation: Operation,
    pub version: DocumentVersion,
}

/// Handler for applying edits.
pub struct ApplyOperationHandler {
    repository: Arc<dyn DocumentRepository>,
    deadline: StorageDeadline,
}

impl ApplyOperationHandler {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        Self {
            repository,
            deadline: StorageDeadline::none(),
        }
    }

    /// Bound every repository call made by this handler.
    pub fn with_deadline(mut self, deadline: StorageDeadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn handle(
        &self,
        cmd: ApplyOperationCommand,
    ) -> Result<ApplyOperationResult, DocumentError> {
        // 1. Load current state
        let mut document = self
            .deadline
            .run(self.repository.get_document(&cmd.tenant_id, &cmd.document_id))
            .await?
            .ok_or_else(|| DocumentError::not_found(&cmd.tenant_id, &cmd.document_id))?;

        // 2. Replace content and build the records for this version
        let now = Timestamp::now();
        document.replace_content(cmd.new_content, now);

        let operation = Operation::record(&document, cmd.user_id.clone(), cmd.lamport, cmd.delta, now);
        let version = DocumentVersion::snapshot(&document, cmd.user_id, cmd.label, now);

        // 3. Persist the document; this is the only write that can fail the edit
        self.deadline
            .write_document(self.repository.as_ref(), &document)
            .await?;

        // 4. Audit trail, best effort
        if let Err(e) = self
            .deadline
            .run(self.repository.save_operation(&operation))
            .await
        {
            tracing::warn!(
                document_id = %document.id(),
                operation_id = %operation.id,
                version = document.version(),
                "Failed to persist operation audit record: {}",
                e
            );
        }

        if let Err(e) = self.deadline.run(self.repository.save_version(&version)).await {
            tracing::warn!(
                document_id = %document.id(),
                sequence = version.sequence,
                "Failed to persist version snapshot: {}",
                e
            );
        }

        Ok(ApplyOperationResult {
            document,
            operation,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryDocumentRepository;
    use crate::domain::foundation::{DomainError, ErrorCode};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    fn tenant() -> TenantId {
        TenantId::new("acme").unwrap()
    }

    fn doc_id() -> DocumentId {
        DocumentId::new("doc-1").unwrap()
    }

    fn seeded_document() -> Document {
        Document::new(doc_id(), tenant(), UserId::new("owner").unwrap(), "Plan", "A")
    }

    fn command(user: &str, content: &str) -> ApplyOperationCommand {
        ApplyOperationCommand {
            tenant_id: tenant(),
            document_id: doc_id(),
            user_id: UserId::new(user).unwrap(),
            delta: "naive-full-sync".to_string(),
            new_content: content.to_string(),
            lamport: 1,
            label: String::new(),
        }
    }

    /// Repository double with switchable failures.
    struct MockDocumentRepository {
        document: Mutex<Option<Document>>,
        fail_update: bool,
        fail_audit: bool,
        stall_update: bool,
        stall_after_update: bool,
        saved_operations: Mutex<Vec<Operation>>,
        saved_versions: Mutex<Vec<DocumentVersion>>,
    }

    impl MockDocumentRepository {
        fn with_document() -> Self {
            Self {
                document: Mutex::new(Some(seeded_document())),
                fail_update: false,
                fail_audit: false,
                stall_update: false,
                stall_after_update: false,
                saved_operations: Mutex::new(Vec::new()),
                saved_versions: Mutex::new(Vec::new()),
            }
        }

        fn failing_update() -> Self {
            Self {
                fail_update: true,
                ..Self::with_document()
            }
        }

        fn failing_audit() -> Self {
            Self {
                fail_audit: true,
                ..Self::with_document()
            }
        }

        fn stalling_update() -> Self {
            Self {
                stall_update: true,
                ..Self::with_document()
            }
        }

        fn slow_acknowledging_update() -> Self {
            Self {
                stall_after_update: true,
                ..Self::with_document()
            }
        }
    }

    #[async_trait]
    impl DocumentRepository for MockDocumentRepository {
        async fn create_document(&self, document: &Document) -> Result<(), DomainError> {
            *self.document.lock().unwrap() = Some(document.clone());
            Ok(())
        }

        async fn get_document(
            &self,
            _tenant_id: &TenantId,
            _document_id: &DocumentId,
        ) -> Result<Option<Document>, DomainError> {
            Ok(self.document.lock().unwrap().clone())
        }

        async fn update_document(&self, document: &Document) -> Result<(), DomainError> {
            if self.stall_update {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail_update {
                return Err(DomainError::database("Simulated update failure"));
            }
            *self.document.lock().unwrap() = Some(document.clone());
            if self.stall_after_update {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(())
        }

        async fn save_operation(&self, operation: &Operation) -> Result<(), DomainError> {
            if self.fail_audit {
                return Err(DomainError::database("Simulated audit failure"));
            }
            self.saved_operations.lock().unwrap().push(operation.clone());
            Ok(())
        }

        async fn save_version(&self, version: &DocumentVersion) -> Result<(), DomainError> {
            if self.fail_audit {
                return Err(DomainError::database("Simulated version failure"));
            }
            self.saved_versions.lock().unwrap().push(version.clone());
            Ok(())
        }

        async fn list_versions(
            &self,
            _tenant_id: &TenantId,
            _document_id: &DocumentId,
            _limit: Option<u32>,
        ) -> Result<Vec<DocumentVersion>, DomainError> {
            Ok(self.saved_versions.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn applies_replacement_and_bumps_version() {
        let repo = Arc::new(MockDocumentRepository::with_document());
        let handler = ApplyOperationHandler::new(repo.clone());

        let result = handler.handle(command("u1", "AB")).await.unwrap();

        assert_eq!(result.document.version(), 2);
        assert_eq!(result.document.content(), "AB");
        assert_eq!(result.version.sequence, 2);
        assert_eq!(result.version.content, "AB");
        assert_eq!(result.operation.delta, "naive-full-sync");
        assert_eq!(result.operation.user_id.as_str(), "u1");

        let stored = repo.document.lock().unwrap().clone().unwrap();
        assert_eq!(stored.version(), 2);
        assert_eq!(repo.saved_operations.lock().unwrap().len(), 1);
        assert_eq!(repo.saved_versions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let repo = Arc::new(InMemoryDocumentRepository::new());
        let handler = ApplyOperationHandler::new(repo.clone());

        let err = handler.handle(command("u1", "AB")).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
        assert!(repo.operations_for(&tenant(), &doc_id()).await.is_empty());
    }

    #[tokio::test]
    async fn update_failure_is_propagated_without_side_effects() {
        let repo = Arc::new(MockDocumentRepository::failing_update());
        let handler = ApplyOperationHandler::new(repo.clone());

        let err = handler.handle(command("u1", "AB")).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert_eq!(repo.document.lock().unwrap().clone().unwrap().version(), 1);
        assert!(repo.saved_operations.lock().unwrap().is_empty());
        assert!(repo.saved_versions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn audit_failure_does_not_fail_the_edit() {
        let repo = Arc::new(MockDocumentRepository::failing_audit());
        let handler = ApplyOperationHandler::new(repo.clone());

        let result = handler.handle(command("u1", "AB")).await.unwrap();

        assert_eq!(result.document.version(), 2);
        assert_eq!(repo.document.lock().unwrap().clone().unwrap().content(), "AB");
        assert!(repo.saved_versions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lamport_hint_does_not_reject_stale_clocks() {
        let repo = Arc::new(MockDocumentRepository::with_document());
        let handler = ApplyOperationHandler::new(repo.clone());

        let mut first = command("u1", "AB");
        first.lamport = 100;
        let mut stale = command("u2", "AC");
        stale.lamport = 1;

        handler.handle(first).await.unwrap();
        let result = handler.handle(stale).await.unwrap();

        assert_eq!(result.document.version(), 3);
        assert_eq!(result.document.content(), "AC");
        assert_eq!(result.operation.lamport, 1);
    }

    #[tokio::test]
    async fn label_is_carried_into_the_snapshot() {
        let repo = Arc::new(MockDocumentRepository::with_document());
        let handler = ApplyOperationHandler::new(repo);

        let mut cmd = command("u1", "AB");
        cmd.label = "draft".to_string();
        let result = handler.handle(cmd).await.unwrap();

        assert_eq!(result.version.label, "draft");
        assert_eq!(result.version.author_id.as_str(), "u1");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_update_times_out_under_deadline() {
        let repo = Arc::new(MockDocumentRepository::stalling_update());
        let handler = ApplyOperationHandler::new(repo.clone())
            .with_deadline(StorageDeadline::after(Duration::from_secs(5)));

        let err = handler.handle(command("u1", "AB")).await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::Timeout);
        assert_eq!(repo.document.lock().unwrap().clone().unwrap().version(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn update_committed_past_deadline_is_still_accepted() {
        let repo = Arc::new(MockDocumentRepository::slow_acknowledging_update());
        let handler = ApplyOperationHandler::new(repo.clone())
            .with_deadline(StorageDeadline::after(Duration::from_secs(5)));

        let result = handler.handle(command("u1", "AB")).await.unwrap();

        assert_eq!(result.document.version(), 2);
        assert_eq!(repo.document.lock().unwrap().clone().unwrap().content(), "AB");
        assert_eq!(repo.saved_versions.lock().unwrap().len(), 1);
    }
}
