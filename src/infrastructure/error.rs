// marksync/src/infrastructure/error.rs
use crate::domain::error::DomainError;
use crate::domain::gateways::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<InfrastructureError> for DomainError {
    fn from(error: InfrastructureError) -> Self {
        DomainError::Store(error.to_string())
    }
}

impl From<InfrastructureError> for StoreError {
    fn from(error: InfrastructureError) -> Self {
        StoreError::new(error.to_string())
    }
}

impl From<reqwest::Error> for InfrastructureError {
    fn from(error: reqwest::Error) -> Self {
        InfrastructureError::Network(error.to_string())
    }
}

impl From<InfrastructureError> for crate::application::error::ApplicationError {
    fn from(error: InfrastructureError) -> Self {
        crate::application::error::ApplicationError::Other(error.to_string())
    }
}
