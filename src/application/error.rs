// marksync/src/application/error.rs
use crate::domain::error::DomainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Realtime subscription failed: {0}")]
    Subscription(String),

    #[error("{0}")]
    Other(String),
}
pub type ApplicationResult<T> = Result<T, ApplicationError>;
