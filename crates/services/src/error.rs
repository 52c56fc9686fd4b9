use bson::oid::ObjectId;
use thiserror::Error;

use crate::auth::AuthError;
use crate::dao::base::DaoError;

/// Domain failures shared by every workflow. Transports translate these once
/// (HTTP status codes, socket `error` events).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Access denied. Allowed roles: {}", .allowed.join(", "))]
    RoleRequired { allowed: Vec<&'static str> },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("User is admin or manager of {} active project(s)", .project_ids.len())]
    RemovalBlocked { project_ids: Vec<ObjectId> },
    #[error(transparent)]
    Dao(#[from] DaoError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{what} not found"))
    }

    /// Maps a unique-index violation to `Conflict(message)`.
    pub fn on_duplicate(message: &'static str) -> impl Fn(DaoError) -> ServiceError {
        move |err| match err {
            DaoError::DuplicateKey(_) => ServiceError::Conflict(message.to_string()),
            other => ServiceError::Dao(other),
        }
    }

    /// Short machine-readable kind, used by the socket gateway.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::Forbidden(_)
            | ServiceError::RoleRequired { .. }
            | ServiceError::RemovalBlocked { .. } => "forbidden",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::InvalidState(_) => "invalid_state",
            ServiceError::Dao(DaoError::NotFound) => "not_found",
            ServiceError::Dao(DaoError::DuplicateKey(_)) => "conflict",
            ServiceError::Dao(_) => "internal",
            ServiceError::Auth(AuthError::HashError(_)) => "internal",
            ServiceError::Auth(_) => "unauthorized",
        }
    }
}
