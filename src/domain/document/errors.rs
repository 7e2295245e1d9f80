//! Document error types.

use std::time::Duration;

use thiserror::Error;

use crate::domain::foundation::{
    DocumentId, DomainError, ErrorCode, TenantId, ValidationError, VersionId,
};

/// Errors surfaced by document operations.
#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    /// The document does not exist for the tenant.
    #[error("Document not found: {tenant_id}/{document_id}")]
    NotFound {
        tenant_id: TenantId,
        document_id: DocumentId,
    },

    /// The requested version snapshot does not exist.
    #[error("Version not found: {0}")]
    VersionNotFound(VersionId),

    /// Input failed validation.
    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    /// A storage call did not complete within its deadline.
    #[error("Storage call timed out after {0:?}")]
    TimedOut(Duration),

    /// The storage layer rejected the primary write or read.
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl DocumentError {
    pub fn not_found(tenant_id: &TenantId, document_id: &DocumentId) -> Self {
        DocumentError::NotFound {
            tenant_id: tenant_id.clone(),
            document_id: document_id.clone(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DocumentError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            DocumentError::NotFound { .. } => ErrorCode::DocumentNotFound,
            DocumentError::VersionNotFound(_) => ErrorCode::VersionNotFound,
            DocumentError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            DocumentError::TimedOut(_) => ErrorCode::Timeout,
            DocumentError::Storage(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<DomainError> for DocumentError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat => {
                DocumentError::ValidationFailed {
                    field: err
                        .details
                        .get("field")
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string()),
                    message: err.message,
                }
            }
            _ => DocumentError::Storage(err.to_string()),
        }
    }
}

impl From<ValidationError> for DocumentError {
    fn from(err: ValidationError) -> Self {
        DocumentError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_document_not_found_code() {
        let err = DocumentError::not_found(
            &TenantId::new("acme").unwrap(),
            &DocumentId::new("doc-1").unwrap(),
        );
        assert_eq!(err.code(), ErrorCode::DocumentNotFound);
        assert_eq!(err.to_string(), "Document not found: acme/doc-1");
    }

    #[test]
    fn database_errors_become_storage_failures() {
        let err: DocumentError = DomainError::database("connection refused").into();
        assert_eq!(err.code(), ErrorCode::DatabaseError);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn update_of_missing_target_is_a_storage_failure() {
        let err: DocumentError =
            DomainError::new(ErrorCode::DocumentNotFound, "no row updated").into();
        assert!(matches!(err, DocumentError::Storage(_)));
    }

    #[test]
    fn validation_errors_keep_field_name() {
        let err: DocumentError = ValidationError::empty_field("title").into();
        match err {
            DocumentError::ValidationFailed { field, .. } => assert_eq!(field, "title"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn timeout_reports_timeout_code() {
        let err = DocumentError::TimedOut(Duration::from_secs(2));
        assert_eq!(err.code(), ErrorCode::Timeout);
    }
}
