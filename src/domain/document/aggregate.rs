//! Document aggregate entity.
//!
//! A document is the unit of collaboration: one tenant owns it, any number of
//! users edit it, and every accepted edit replaces its full content.
//!
//! # Ownership
//!
//! Operation audit records and version snapshots reference a document by ID
//! but are persisted independently of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DocumentId, TenantId, Timestamp, UserId};

/// Version number every document starts at.
pub const INITIAL_VERSION: i64 = 1;

/// Coarse permission tiers for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    View,
    Comment,
    Edit,
}

impl AccessLevel {
    /// Database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::View => "view",
            AccessLevel::Comment => "comment",
            AccessLevel::Edit => "edit",
        }
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(AccessLevel::View),
            "comment" => Ok(AccessLevel::Comment),
            "edit" => Ok(AccessLevel::Edit),
            other => Err(format!("unknown access level: {}", other)),
        }
    }
}

/// An expirable link granting scoped access to a document.
///
/// Links are issued and managed outside this service; the aggregate only
/// carries them so that updates round-trip without loss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    pub id: String,
    pub token: String,
    pub level: AccessLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub created_by: UserId,
    pub document_id: DocumentId,
    pub tenant_id: TenantId,
}

/// Document aggregate - the shared text being edited.
///
/// # Invariants
///
/// - `(tenant_id, id)` identifies the document
/// - `version` starts at [`INITIAL_VERSION`] and grows by exactly one per
///   accepted content replacement
/// - `content` is always the payload of the most recent replacement
/// - `permissions` holds at most one level per subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    id: DocumentId,
    tenant_id: TenantId,
    title: String,
    content: String,
    owner_id: UserId,
    permissions: BTreeMap<UserId, AccessLevel>,
    share_links: Vec<ShareLink>,
    version: i64,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Document {
    /// Create a new document at the initial version.
    ///
    /// The owner is granted edit access.
    pub fn new(
        id: DocumentId,
        tenant_id: TenantId,
        owner_id: UserId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        let mut permissions = BTreeMap::new();
        permissions.insert(owner_id.clone(), AccessLevel::Edit);

        Self {
            id,
            tenant_id,
            title: title.into(),
            content: content.into(),
            owner_id,
            permissions,
            share_links: Vec::new(),
            version: INITIAL_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitute a document from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: DocumentId,
        tenant_id: TenantId,
        title: String,
        content: String,
        owner_id: UserId,
        permissions: BTreeMap<UserId, AccessLevel>,
        share_links: Vec<ShareLink>,
        version: i64,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            tenant_id,
            title,
            content,
            owner_id,
            permissions,
            share_links,
            version,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn permissions(&self) -> &BTreeMap<UserId, AccessLevel> {
        &self.permissions
    }

    /// Returns the access level granted to a subject, if any.
    pub fn access_for(&self, subject: &UserId) -> Option<AccessLevel> {
        self.permissions.get(subject).copied()
    }

    pub fn share_links(&self) -> &[ShareLink] {
        &self.share_links
    }

    /// Returns the current revision stamp.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the whole content, last writer wins.
    ///
    /// No merge and no conflict check happens here. Returns the new version.
    pub fn replace_content(&mut self, content: impl Into<String>, at: Timestamp) -> i64 {
        self.content = content.into();
        self.version += 1;
        self.updated_at = at;
        self.version
    }
}
