// service/error.rs
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::error::HttpError;
use crate::service::storage::StorageError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Precondition(String),

    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Bid {0} not found")]
    BidNotFound(Uuid),

    #[error("Submission {0} not found")]
    SubmissionNotFound(Uuid),

    #[error("A similar job was recently posted. Please wait before posting again.")]
    DuplicateJob,

    #[error("Writer {1} has already bid on job {0}")]
    AlreadyApplied(Uuid, Uuid),

    #[error("Job {0} is not open for bidding")]
    JobNotOpen(Uuid),

    #[error("Bid {0} is no longer pending")]
    BidNotPending(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_)
            | ServiceError::Precondition(_)
            | ServiceError::JobNotOpen(_)
            | ServiceError::BidNotPending(_) => StatusCode::BAD_REQUEST,

            ServiceError::JobNotFound(_)
            | ServiceError::BidNotFound(_)
            | ServiceError::SubmissionNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::DuplicateJob | ServiceError::AlreadyApplied(_, _) => {
                StatusCode::CONFLICT
            }

            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,

            ServiceError::Storage(_) | ServiceError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        HttpError::new(error.to_string(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_expected_statuses() {
        let id = Uuid::nil();
        assert_eq!(
            ServiceError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::JobNotFound(id).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::AlreadyApplied(id, id).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ServiceError::DuplicateJob.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
