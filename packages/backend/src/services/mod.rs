pub mod admin_auth;
pub mod catalog;
pub mod files;
pub mod grades;
pub mod moderation;
pub mod reviews;

use thiserror::Error;

use review_core::{TransitionError, ValidationErrors};

use crate::response::AppError;
use crate::storage::StorageError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => errors.into(),
            ServiceError::NotFound(what) => AppError::not_found(format!("{what} not found")),
            ServiceError::Forbidden(message) => AppError::forbidden(message),
            ServiceError::Conflict(message) => AppError::conflict(message),
            ServiceError::Transition(err) => AppError::conflict(err.to_string()),
            ServiceError::Store(StoreError::NotFound(what)) => {
                AppError::not_found(format!("{what} not found"))
            }
            ServiceError::Store(StoreError::Conflict(message)) => AppError::conflict(message),
            ServiceError::Store(other) => {
                tracing::error!(error = %other, "Store operation failed");
                AppError::internal(other.to_string())
            }
            ServiceError::Storage(err) => {
                tracing::error!(error = %err, "Object storage operation failed");
                AppError::internal(err.to_string())
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        ServiceError::Store(err).into()
    }
}
