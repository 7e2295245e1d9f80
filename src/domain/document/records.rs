//! Immutable records produced by accepted edits.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DocumentId, OperationId, TenantId, Timestamp, UserId, VersionId};

use super::Document;

/// Label given to the snapshot written when a document is created.
pub const INITIAL_LABEL: &str = "initial";

/// Label given to the snapshot written when a document is reverted.
pub const REVERT_LABEL: &str = "revert";

/// Audit entry recording who changed a document and with what payload.
///
/// `lamport` is whatever the client sent. It is stored for replay and
/// diagnostics but never used to order or reject edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OperationId,
    pub document_id: DocumentId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub lamport: i64,
    pub delta: String,
    pub created_at: Timestamp,
}

impl Operation {
    /// Record an edit that was applied to `document`.
    pub fn record(
        document: &Document,
        user_id: UserId,
        lamport: i64,
        delta: impl Into<String>,
        at: Timestamp,
    ) -> Self {
        Self {
            id: OperationId::new(),
            document_id: document.id().clone(),
            tenant_id: document.tenant_id().clone(),
            user_id,
            lamport,
            delta: delta.into(),
            created_at: at,
        }
    }
}

/// Fully materialized snapshot of a document at one version.
///
/// `sequence` always equals the document version the snapshot was taken at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    pub id: VersionId,
    pub document_id: DocumentId,
    pub tenant_id: TenantId,
    pub author_id: UserId,
    pub sequence: i64,
    pub content: String,
    pub label: String,
    pub created_at: Timestamp,
}

impl DocumentVersion {
    /// Snapshot the current state of `document`.
    pub fn snapshot(
        document: &Document,
        author_id: UserId,
        label: impl Into<String>,
        at: Timestamp,
    ) -> Self {
        Self {
            id: VersionId::new(),
            document_id: document.id().clone(),
            tenant_id: document.tenant_id().clone(),
            author_id,
            sequence: document.version(),
            content: document.content().to_string(),
            label: label.into(),
            created_at: at,
        }
    }
}
