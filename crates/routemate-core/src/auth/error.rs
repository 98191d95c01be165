use thiserror::Error;

use super::token::MalformedTokenError;
use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication failed: {0}")]
    Failed(#[from] ApiError),

    #[error("Server returned a malformed token: {0}")]
    MalformedToken(#[from] MalformedTokenError),

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
