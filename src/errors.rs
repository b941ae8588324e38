use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::result::DatabaseErrorKind;
use std::fmt;
use thiserror::Error;

use crate::db::models::{ErrorResponse, Status};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Io(#[from] tokio::io::Error),

    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),

    #[error(transparent)]
    RedisError(#[from] redis::RedisError),

    #[error(transparent)]
    DbPool(#[from] diesel_async::pooled_connection::deadpool::PoolError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Unexpected Error: {0}")]
    Custom(String),
}

/// A status change the current state of an order or booking does not allow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot mark as delivered until payment is received")]
    PaymentRequired,

    #[error("Cannot move {entity} from {from} to {to}")]
    NotAllowed {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("The {entity} is already {status} and can no longer change")]
    Terminal { entity: &'static str, status: String },

    #[error("Delivery agent {agent_id} is already handling order {order_id}")]
    AgentBusy { agent_id: i32, order_id: i32 },

    #[error("Order is already assigned to delivery agent {agent_id}")]
    AlreadyAssigned { agent_id: i32 },

    #[error("The {0} must be verified first")]
    NotVerified(&'static str),

    #[error("Checkout requires the guest to be checked in and fully paid")]
    CheckoutBlocked,

    #[error("{0}")]
    Rejected(String),
}

/// Error messages for the API Responses
pub enum ErrorMessages {
    Unexpected,
    DB,
}

// Use the ErrorMessages enum to display error messages for the API Responses
impl fmt::Display for ErrorMessages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorMessages::Unexpected => "We encountered an unexpected error while processing the request.",
            ErrorMessages::DB => "An unforeseen database error has occurred. Kindly try again after some time.",
        };
        write!(f, "{message}")
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::Diesel(diesel::result::Error::NotFound) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Conflict(_) | ApiError::Transition(_) => StatusCode::CONFLICT,
            ApiError::Diesel(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients. Internal failures are replaced by
    /// a generic message and only logged.
    fn public_message(&self) -> String {
        match self {
            ApiError::Diesel(diesel::result::Error::NotFound) => "Record not found".to_string(),
            ApiError::Diesel(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _,
            )) => "A record with the same unique value already exists".to_string(),
            ApiError::Diesel(_) | ApiError::DbPool(_) => ErrorMessages::DB.to_string(),
            ApiError::Io(_)
            | ApiError::RedisError(_)
            | ApiError::Json(_)
            | ApiError::Http(_)
            | ApiError::Custom(_) => ErrorMessages::Unexpected.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorResponse {
            status: Status::Error,
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Validation(format!("Invalid multipart body: {err}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::Validation(format!("Invalid request body: {}", err.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(err: PathRejection) -> Self {
        ApiError::Validation(format!("Invalid path: {}", err.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        ApiError::Validation(format!("Invalid query string: {}", err.body_text()))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("Token rejected: {}", err);
        ApiError::Unauthorized("Invalid or expired token".to_string())
    }
}
