//! PostgreSQL implementation of DocumentRepository.
//!
//! Documents, their permissions and share links are written in one
//! transaction. Operations and versions are append-only rows.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::document::{AccessLevel, Document, DocumentVersion, Operation, ShareLink};
use crate::domain::foundation::{
    DocumentId, DomainError, ErrorCode, TenantId, Timestamp, UserId, VersionId,
};
use crate::ports::DocumentRepository;

/// PostgreSQL implementation of the DocumentRepository port.
///
/// # Usage
///
/// ```rust,ignore
/// let pool = PgPool::connect("postgres://...").await?;
/// let repo = PostgresDocumentRepository::new(pool);
///
/// repo.create_document(&document).await?;
/// ```
#[derive(Clone)]
pub struct PostgresDocumentRepository {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresDocumentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDocumentRepository")
            .field("pool", &"PgPool")
            .finish()
    }
}

impl PostgresDocumentRepository {
    /// Creates a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Migration failed: {}", e)))
    }

    /// Replace the permission and share link rows of a document.
    async fn write_access(
        tx: &mut Transaction<'_, Postgres>,
        document: &Document,
    ) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM document_permissions WHERE tenant_id = $1 AND document_id = $2")
            .bind(document.tenant_id().as_str())
            .bind(document.id().as_str())
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;

        for (subject, level) in document.permissions() {
            sqlx::query(
                r#"
                INSERT INTO document_permissions (tenant_id, document_id, subject_id, subject_type, level)
                VALUES ($1, $2, $3, 'user', $4)
                "#,
            )
            .bind(document.tenant_id().as_str())
            .bind(document.id().as_str())
            .bind(subject.as_str())
            .bind(level.as_str())
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;
        }

        sqlx::query("DELETE FROM share_links WHERE tenant_id = $1 AND document_id = $2")
            .bind(document.tenant_id().as_str())
            .bind(document.id().as_str())
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;

        for link in document.share_links() {
            sqlx::query(
                r#"
                INSERT INTO share_links (
                    id, tenant_id, document_id, token, level, expires_at, created_at, created_by
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&link.id)
            .bind(document.tenant_id().as_str())
            .bind(document.id().as_str())
            .bind(&link.token)
            .bind(link.level.as_str())
            .bind(link.expires_at.as_ref().map(|t| *t.as_datetime()))
            .bind(link.created_at.as_datetime())
            .bind(link.created_by.as_str())
            .execute(&mut **tx)
            .await
            .map_err(db_error)?;
        }

        Ok(())
    }

    async fn load_permissions(
        &self,
        tenant_id: &TenantId,
        document_id: &DocumentId,
    ) -> Result<BTreeMap<UserId, AccessLevel>, DomainError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT subject_id, level
            FROM document_permissions
            WHERE tenant_id = $1 AND document_id = $2
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(document_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|row| -> Result<_, DomainError> {
                Ok((parse_user(&row.subject_id)?, parse_level(&row.level)?))
            })
            .collect()
    }

    async fn load_share_links(
        &self,
        tenant_id: &TenantId,
        document_id: &DocumentId,
    ) -> Result<Vec<ShareLink>, DomainError> {
        let rows = sqlx::query_as::<_, ShareLinkRow>(
            r#"
            SELECT id, token, level, expires_at, created_at, created_by
            FROM share_links
            WHERE tenant_id = $1 AND document_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(document_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter()
            .map(|row| -> Result<_, DomainError> {
                Ok(ShareLink {
                    id: row.id,
                    token: row.token,
                    level: parse_level(&row.level)?,
                    expires_at: row.expires_at.map(Timestamp::from_datetime),
                    created_at: Timestamp::from_datetime(row.created_at),
                    created_by: parse_user(&row.created_by)?,
                    document_id: document_id.clone(),
                    tenant_id: tenant_id.clone(),
                })
            })
            .collect()
    }
}

/// Internal row types for sqlx query mapping.
#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    tenant_id: String,
    id: String,
    title: String,
    content: String,
    owner_id: String,
    version: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct PermissionRow {
    subject_id: String,
    level: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ShareLinkRow {
    id: String,
    token: String,
    level: String,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
    created_by: String,
}

#[derive(Debug, sqlx::FromRow)]
struct VersionRow {
    id: uuid::Uuid,
    tenant_id: String,
    document_id: String,
    author_id: String,
    sequence: i64,
    content: String,
    label: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<VersionRow> for DocumentVersion {
    type Error = DomainError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        Ok(DocumentVersion {
            id: VersionId::from_uuid(row.id),
            document_id: DocumentId::new(row.document_id).map_err(invalid_row)?,
            tenant_id: TenantId::new(row.tenant_id).map_err(invalid_row)?,
            author_id: parse_user(&row.author_id)?,
            sequence: row.sequence,
            content: row.content,
            label: row.label,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Database error: {}", e))
}

fn invalid_row(e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::InvalidFormat, format!("Invalid stored value: {}", e))
}

fn parse_user(raw: &str) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(invalid_row)
}

fn parse_level(raw: &str) -> Result<AccessLevel, DomainError> {
    raw.parse().map_err(invalid_row)
}

#[async_trait]
impl DocumentRepository for PostgresDocumentRepository {
    async fn create_document(&self, document: &Document) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                tenant_id, id, title, content, owner_id, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(document.tenant_id().as_str())
        .bind(document.id().as_str())
        .bind(document.title())
        .bind(document.content())
        .bind(document.owner_id().as_str())
        .bind(document.version())
        .bind(document.created_at().as_datetime())
        .bind(document.updated_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Document {} already exists", document.id()),
            )
            .with_detail("field", "id"),
            other => db_error(other),
        })?;

        Self::write_access(&mut tx, document).await?;
        tx.commit().await.map_err(db_error)
    }

    async fn get_document(
        &self,
        tenant_id: &TenantId,
        document_id: &DocumentId,
    ) -> Result<Option<Document>, DomainError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT tenant_id, id, title, content, owner_id, version, created_at, updated_at
            FROM documents
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(document_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let permissions = self.load_permissions(tenant_id, document_id).await?;
        let share_links = self.load_share_links(tenant_id, document_id).await?;

        Ok(Some(Document::reconstitute(
            DocumentId::new(row.id).map_err(invalid_row)?,
            TenantId::new(row.tenant_id).map_err(invalid_row)?,
            row.title,
            row.content,
            parse_user(&row.owner_id)?,
            permissions,
            share_links,
            row.version,
            Timestamp::from_datetime(row.created_at),
            Timestamp::from_datetime(row.updated_at),
        )))
    }

    async fn update_document(&self, document: &Document) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET title = $1, content = $2, version = $3, updated_at = $4
            WHERE tenant_id = $5 AND id = $6
            "#,
        )
        .bind(document.title())
        .bind(document.content())
        .bind(document.version())
        .bind(document.updated_at().as_datetime())
        .bind(document.tenant_id().as_str())
        .bind(document.id().as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::DocumentNotFound,
                format!("Document {} not found", document.id()),
            ));
        }

        Self::write_access(&mut tx, document).await?;
        tx.commit().await.map_err(db_error)
    }

    async fn save_operation(&self, operation: &Operation) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO operations (id, tenant_id, document_id, user_id, lamport, delta, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(operation.id.as_uuid())
        .bind(operation.tenant_id.as_str())
        .bind(operation.document_id.as_str())
        .bind(operation.user_id.as_str())
        .bind(operation.lamport)
        .bind(&operation.delta)
        .bind(operation.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn save_version(&self, version: &DocumentVersion) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO document_versions (
                id, tenant_id, document_id, author_id, sequence, content, label, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(version.id.as_uuid())
        .bind(version.tenant_id.as_str())
        .bind(version.document_id.as_str())
        .bind(version.author_id.as_str())
        .bind(version.sequence)
        .bind(&version.content)
        .bind(&version.label)
        .bind(version.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn list_versions(
        &self,
        tenant_id: &TenantId,
        document_id: &DocumentId,
        limit: Option<u32>,
    ) -> Result<Vec<DocumentVersion>, DomainError> {
        // LIMIT NULL returns every row.
        let rows = sqlx::query_as::<_, VersionRow>(
            r#"
            SELECT id, tenant_id, document_id, author_id, sequence, content, label, created_at
            FROM document_versions
            WHERE tenant_id = $1 AND document_id = $2
            ORDER BY sequence DESC
            LIMIT $3
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(document_id.as_str())
        .bind(limit.map(i64::from))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(DocumentVersion::try_from).collect()
    }
}
