//! Request-boundary error taxonomy.
//!
//! Every failure a handler can hit is mapped here to one status code and a
//! short plain-text body. Internal details are logged, never returned.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{oauth::OAuthError, store::StoreError, token::TokenError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid session token")]
    Unauthenticated,

    #[error("requester is not the creator of this link")]
    Forbidden,

    #[error("email domain is not allowed: {0}")]
    DomainNotAllowed(String),

    #[error("link not found")]
    NotFound,

    #[error("link already exists")]
    Conflict,

    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("identity provider error: {0}")]
    Upstream(#[from] OAuthError),

    #[error("storage failure: {0}")]
    Storage(sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::DomainNotAllowed(_) => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InvalidInput(_) | Self::Upstream(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::AlreadyExists(_) => Self::Conflict,
            StoreError::Forbidden(_) => Self::Forbidden,
            StoreError::Database(err) => Self::Storage(err),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        debug!("Token rejected: {err}");
        Self::Unauthenticated
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Unauthenticated => "Unauthorized".to_string(),
            Self::Forbidden => "Forbidden".to_string(),
            Self::DomainNotAllowed(domains) => {
                format!("Only {domains} emails can be used to login.")
            }
            Self::NotFound => "Link not found".to_string(),
            Self::Conflict => "Link already exists".to_string(),
            Self::InvalidInput(message) => message.to_string(),
            Self::Upstream(err) => {
                warn!("OAuth exchange failed: {err}");
                "Failed to sign in with the identity provider".to_string()
            }
            Self::Storage(err) => {
                error!("Database error: {err}");
                "Internal Server Error".to_string()
            }
            Self::Internal(message) => {
                error!("Internal error: {message}");
                "Internal Server Error".to_string()
            }
        };
        (status, body).into_response()
    }
}
