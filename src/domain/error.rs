// marksync/src/domain/error.rs
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("This bookmark already exists")]
    DuplicateConflict,

    #[error("Bookmark not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    #[error("Store error: {0}")]
    Store(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::DuplicateConflict)
    }
}
