use thiserror::Error;

use crate::backend::StoreError;

#[derive(Debug, Error)]
pub enum ResultError {
    /// No result stored for the job, or it expired
    #[error("Result not found for job: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ResultError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResultError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ResultError>;
