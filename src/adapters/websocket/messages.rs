//! WebSocket message protocol types.
//!
//! Defines the JSON frames exchanged between collaborating clients and a
//! document room. Every frame carries a `type` tag plus the identity of the
//! document and user it concerns.
//!
//! # Client → Server
//!
//! ```json
//! { "type": "operation", "tenantId": "acme", "documentId": "doc-1", "userId": "u1",
//!   "delta": "...", "newContent": "AB", "lamport": 7, "label": "" }
//! { "type": "revert", "versionId": "6f1c..." }
//! ```
//!
//! # Server → Client
//!
//! ```json
//! { "type": "update", "tenantId": "acme", "documentId": "doc-1", "userId": "u1",
//!   "version": 2, "content": "AB", "operation": { ... }, "versioned": { ... } }
//! ```

use serde::{Deserialize, Serialize};

use crate::application::handlers::document::ApplyOperationResult;
use crate::domain::document::{Document, DocumentVersion, Operation};
use crate::domain::foundation::{DocumentId, TenantId, UserId, VersionId};

use super::room::RoomKey;

// ════════════════════════════════════════════════════════════════════════════════
// Client → Server Messages
// ════════════════════════════════════════════════════════════════════════════════

/// Kind of an inbound frame.
///
/// Unknown kinds are kept rather than rejected; the room acknowledges them
/// without touching the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClientMessageKind {
    Operation,
    /// Restore the content of an earlier snapshot as a new version.
    Revert,
    Presence,
    Other(String),
}

impl Default for ClientMessageKind {
    fn default() -> Self {
        ClientMessageKind::Other(String::new())
    }
}

impl From<String> for ClientMessageKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "operation" => ClientMessageKind::Operation,
            "revert" => ClientMessageKind::Revert,
            "presence" => ClientMessageKind::Presence,
            _ => ClientMessageKind::Other(kind),
        }
    }
}

impl From<ClientMessageKind> for String {
    fn from(kind: ClientMessageKind) -> Self {
        match kind {
            ClientMessageKind::Operation => "operation".to_string(),
            ClientMessageKind::Revert => "revert".to_string(),
            ClientMessageKind::Presence => "presence".to_string(),
            ClientMessageKind::Other(kind) => kind,
        }
    }
}

/// Frame sent by a client.
///
/// The identity fields are informational. The room a connection joined and
/// the user bound at upgrade time decide where an edit lands and who made it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    #[serde(rename = "type", default)]
    pub kind: ClientMessageKind,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub user_id: String,
    /// Opaque payload, never parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    /// Full replacement content for `operation` frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    /// Advisory logical clock, not used for ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lamport: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Snapshot to restore for `revert` frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<VersionId>,
}

impl ClientMessage {
    /// Build an `operation` frame replacing the content.
    pub fn operation(new_content: impl Into<String>) -> Self {
        Self {
            kind: ClientMessageKind::Operation,
            new_content: Some(new_content.into()),
            ..Default::default()
        }
    }

    /// Build a `revert` frame restoring `version_id`.
    pub fn revert(version_id: VersionId) -> Self {
        Self {
            kind: ClientMessageKind::Revert,
            version_id: Some(version_id),
            ..Default::default()
        }
    }

    /// Build a `presence` frame.
    pub fn presence() -> Self {
        Self {
            kind: ClientMessageKind::Presence,
            ..Default::default()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Server → Client Messages
// ════════════════════════════════════════════════════════════════════════════════

/// Kind of an outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMessageKind {
    /// Current persisted state, sent once after joining.
    Snapshot,
    /// An accepted edit.
    Update,
    /// Another user is active.
    Presence,
    /// Inert acknowledgment of an unrecognized frame.
    Ack,
    /// A failure scoped to the receiving connection.
    Error,
}

/// Frame sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(rename = "type")]
    pub kind: ServerMessageKind,
    pub tenant_id: TenantId,
    pub document_id: DocumentId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioned: Option<DocumentVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ServerMessage {
    fn bare(kind: ServerMessageKind, key: &RoomKey, user_id: &UserId) -> Self {
        Self {
            kind,
            tenant_id: key.tenant_id.clone(),
            document_id: key.document_id.clone(),
            user_id: user_id.clone(),
            version: None,
            content: None,
            operation: None,
            versioned: None,
            message: None,
        }
    }

    /// State sync for a connection that just joined.
    pub fn snapshot(key: &RoomKey, user_id: &UserId, document: &Document) -> Self {
        Self {
            version: Some(document.version()),
            content: Some(document.content().to_string()),
            ..Self::bare(ServerMessageKind::Snapshot, key, user_id)
        }
    }

    /// Broadcast for an accepted edit.
    pub fn update(key: &RoomKey, user_id: &UserId, applied: ApplyOperationResult) -> Self {
        Self {
            version: Some(applied.document.version()),
            content: Some(applied.document.content().to_string()),
            operation: Some(applied.operation),
            versioned: Some(applied.version),
            ..Self::bare(ServerMessageKind::Update, key, user_id)
        }
    }

    /// Broadcast for an accepted revert. Reverts carry no operation record.
    pub fn reverted(
        key: &RoomKey,
        user_id: &UserId,
        document: &Document,
        version: DocumentVersion,
    ) -> Self {
        Self {
            version: Some(document.version()),
            content: Some(document.content().to_string()),
            versioned: Some(version),
            ..Self::bare(ServerMessageKind::Update, key, user_id)
        }
    }

    pub fn presence(key: &RoomKey, user_id: &UserId) -> Self {
        Self {
            message: Some("presence".to_string()),
            ..Self::bare(ServerMessageKind::Presence, key, user_id)
        }
    }

    pub fn ack(key: &RoomKey, user_id: &UserId) -> Self {
        Self {
            message: Some("noop".to_string()),
            ..Self::bare(ServerMessageKind::Ack, key, user_id)
        }
    }

    pub fn error(key: &RoomKey, user_id: &UserId, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::bare(ServerMessageKind::Error, key, user_id)
        }
    }
}
