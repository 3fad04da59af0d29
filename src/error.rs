use thiserror::Error;

use crate::sync::Collection;

/// Failures of in-memory mutators. None of these leave partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error("session has ended")]
    SignedOut,
}

impl StoreError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// A remote store call that did not go through. Local state is never rolled back.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("store returned {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("{collection}/{id} does not exist")]
    MissingDocument { collection: Collection, id: String },
    #[error("encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("keyring: {0}")]
    Keyring(String),
}

/// Failures of the initial load. These block entry into the session.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read user document: {0}")]
    Fetch(#[source] SyncError),
    #[error("could not create default document: {0}")]
    Create(#[source] SyncError),
    #[error("legacy document could not be migrated: {0}")]
    Migration(String),
    #[error("stored user document is malformed: {0}")]
    Corrupt(#[source] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type SyncResult<T> = Result<T, SyncError>;
