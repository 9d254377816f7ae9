// marksync/src/domain/gateways/store.rs
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::bookmark::{Bookmark, BookmarkPatch, NewBookmark};
use crate::domain::category::SortOrder;
use crate::domain::error::DomainError;

/// Failure reported by the store gateway. `conflict` is set exactly when the
/// backend rejected a uniqueness violation; everything else carries the
/// provider's message verbatim.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    pub conflict: bool,
}

impl StoreError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            conflict: false,
        }
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
            conflict: true,
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(error: StoreError) -> Self {
        if error.conflict {
            DomainError::DuplicateConflict
        } else {
            DomainError::Store(error.message)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Gateway to the hosted backend holding the canonical bookmark rows.
///
/// Implementations execute one backend round trip per call and either return
/// the canonical state or a typed failure; they hold no list state of their
/// own. Row-level security on the backend scopes every call to the
/// authenticated owner.
#[async_trait]
pub trait BookmarkStore: Send + Sync + std::fmt::Debug {
    /// All rows of the owner, ordered by creation time
    async fn fetch_all(&self, owner: Uuid, order: SortOrder) -> StoreResult<Vec<Bookmark>>;

    /// Insert canonical fields; the store assigns id and timestamps and
    /// returns the canonical row. Rejects url duplicates with a conflict.
    async fn insert(&self, draft: &NewBookmark) -> StoreResult<Bookmark>;

    /// Apply a partial update to an existing row
    async fn update(&self, id: Uuid, patch: &BookmarkPatch) -> StoreResult<()>;

    /// Delete a row by id
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}
