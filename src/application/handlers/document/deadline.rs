//! Optional deadline applied to individual storage calls.

use std::future::Future;
use std::time::Duration;

use crate::domain::document::{Document, DocumentError};
use crate::domain::foundation::DomainError;
use crate::ports::DocumentRepository;

/// Upper bound on how long a single repository call may take.
///
/// A room processes one message at a time, so an unbounded storage call
/// stalls every client of that document. `StorageDeadline::none()` keeps the
/// unbounded behaviour.
///
/// A timed-out call is abandoned, not rolled back: a write may still have
/// committed. Document writes go through [`StorageDeadline::write_document`],
/// which re-reads the document after a timeout to find out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageDeadline(Option<Duration>);

impl StorageDeadline {
    /// No deadline; calls wait as long as storage takes.
    pub fn none() -> Self {
        Self(None)
    }

    /// Calls fail with `TimedOut` once `limit` has elapsed.
    pub fn after(limit: Duration) -> Self {
        Self(Some(limit))
    }

    /// Builds a deadline from a seconds setting where zero disables it.
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Self::none()
        } else {
            Self::after(Duration::from_secs(secs))
        }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.0
    }

    /// Await a repository call under this deadline.
    pub async fn run<T, F>(&self, call: F) -> Result<T, DocumentError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match self.0 {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result.map_err(DocumentError::from),
                Err(_) => Err(DocumentError::TimedOut(limit)),
            },
            None => call.await.map_err(DocumentError::from),
        }
    }

    /// Persist `document` under this deadline.
    ///
    /// When the deadline fires the stored document is read back. If it already
    /// carries the new version the write landed and counts as successful;
    /// otherwise the timeout is returned.
    pub async fn write_document(
        &self,
        repository: &dyn DocumentRepository,
        document: &Document,
    ) -> Result<(), DocumentError> {
        let err = match self.run(repository.update_document(document)).await {
            Err(err @ DocumentError::TimedOut(_)) => err,
            other => return other,
        };

        let stored = self
            .run(repository.get_document(document.tenant_id(), document.id()))
            .await;
        match stored {
            Ok(Some(stored)) if stored.version() == document.version() => {
                tracing::warn!(
                    document_id = %document.id(),
                    version = document.version(),
                    "Document write finished after the storage deadline"
                );
                Ok(())
            }
            _ => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryDocumentRepository;
    use crate::domain::document::{DocumentVersion, Operation};
    use crate::domain::foundation::{DocumentId, ErrorCode, TenantId, Timestamp, UserId};
    use async_trait::async_trait;

    #[test]
    fn zero_seconds_disables_deadline() {
        assert_eq!(StorageDeadline::from_secs(0), StorageDeadline::none());
        assert_eq!(
            StorageDeadline::from_secs(5).limit(),
            Some(Duration::from_secs(5))
        );
    }

    #[tokio::test]
    async fn passes_through_successful_calls() {
        let deadline = StorageDeadline::after(Duration::from_secs(1));
        let value = deadline.run(async { Ok::<_, DomainError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn converts_repository_errors() {
        let err = StorageDeadline::none()
            .run(async { Err::<(), _>(DomainError::database("boom")) })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let deadline = StorageDeadline::after(Duration::from_millis(50));
        let err = deadline
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, DomainError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::TimedOut(_)));
    }

    // ───────────────────────────────────────────────────────────────
    // Document writes
    // ───────────────────────────────────────────────────────────────

    /// Stores the write, then hangs before reporting back.
    struct SlowAcknowledgeRepository {
        inner: InMemoryDocumentRepository,
        store_before_stall: bool,
    }

    #[async_trait]
    impl DocumentRepository for SlowAcknowledgeRepository {
        async fn create_document(&self, document: &Document) -> Result<(), DomainError> {
            self.inner.create_document(document).await
        }

        async fn get_document(
            &self,
            tenant_id: &TenantId,
            document_id: &DocumentId,
        ) -> Result<Option<Document>, DomainError> {
            self.inner.get_document(tenant_id, document_id).await
        }

        async fn update_document(&self, document: &Document) -> Result<(), DomainError> {
            if self.store_before_stall {
                self.inner.update_document(document).await?;
            }
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn save_operation(&self, operation: &Operation) -> Result<(), DomainError> {
            self.inner.save_operation(operation).await
        }

        async fn save_version(&self, version: &DocumentVersion) -> Result<(), DomainError> {
            self.inner.save_version(version).await
        }

        async fn list_versions(
            &self,
            tenant_id: &TenantId,
            document_id: &DocumentId,
            limit: Option<u32>,
        ) -> Result<Vec<DocumentVersion>, DomainError> {
            self.inner.list_versions(tenant_id, document_id, limit).await
        }
    }

    async fn edited_document(repo: &SlowAcknowledgeRepository) -> Document {
        let mut document = Document::new(
            DocumentId::new("doc-1").unwrap(),
            TenantId::new("acme").unwrap(),
            UserId::new("owner").unwrap(),
            "Plan",
            "A",
        );
        repo.create_document(&document).await.unwrap();
        document.replace_content("AB", Timestamp::now());
        document
    }

    #[tokio::test(start_paused = true)]
    async fn write_that_landed_after_timeout_counts_as_success() {
        let repo = SlowAcknowledgeRepository {
            inner: InMemoryDocumentRepository::new(),
            store_before_stall: true,
        };
        let document = edited_document(&repo).await;

        StorageDeadline::after(Duration::from_secs(5))
            .write_document(&repo, &document)
            .await
            .unwrap();

        let stored = repo
            .get_document(document.tenant_id(), document.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn write_that_never_landed_reports_timeout() {
        let repo = SlowAcknowledgeRepository {
            inner: InMemoryDocumentRepository::new(),
            store_before_stall: false,
        };
        let document = edited_document(&repo).await;

        let err = StorageDeadline::after(Duration::from_secs(5))
            .write_document(&repo, &document)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Timeout);
    }
}
