//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use realmhub_domain::DomainError;

use crate::infrastructure::ports::RepoError;
use crate::use_cases::{
    AccessError, LandError, MessageError, PlayerError, PropertyError, RealmError,
};

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "Internal error".to_string()
            }
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg) => msg,
        };
        let body = json!({ "status": status.as_u16(), "message": message });
        (status, Json(body)).into_response()
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<AccessError> for ApiError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::LandNotFound(_) | AccessError::RealmNotFound { .. } => {
                ApiError::NotFound(e.to_string())
            }
            AccessError::NotMember { .. } | AccessError::NotHost { .. } => {
                ApiError::Forbidden(e.to_string())
            }
            AccessError::Repo(e) => e.into(),
        }
    }
}

impl From<LandError> for ApiError {
    fn from(e: LandError) -> Self {
        match e {
            LandError::Access(e) => e.into(),
            LandError::Repo(e) => e.into(),
        }
    }
}

impl From<RealmError> for ApiError {
    fn from(e: RealmError) -> Self {
        match e {
            RealmError::Access(e) => e.into(),
            RealmError::HostCannotLeave(_) => ApiError::Forbidden(e.to_string()),
            RealmError::Repo(e) => e.into(),
        }
    }
}

impl From<PropertyError> for ApiError {
    fn from(e: PropertyError) -> Self {
        match e {
            PropertyError::Access(e) => e.into(),
            PropertyError::UnknownPlayer(_) => ApiError::NotFound(e.to_string()),
            PropertyError::Repo(e) => e.into(),
        }
    }
}

impl From<MessageError> for ApiError {
    fn from(e: MessageError) -> Self {
        match e {
            MessageError::Access(e) => e.into(),
            MessageError::Repo(e) => e.into(),
        }
    }
}

impl From<PlayerError> for ApiError {
    fn from(e: PlayerError) -> Self {
        match e {
            PlayerError::NotSelf => ApiError::Forbidden(e.to_string()),
            PlayerError::Repo(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realmhub_domain::{LandName, PlayerName, RealmName};

    #[test]
    fn membership_failures_are_forbidden() {
        let err: ApiError = AccessError::NotMember {
            player: PlayerName::new("mallory").expect("valid"),
            realm: RealmName::new("lobby").expect("valid"),
        }
        .into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_land_is_not_found() {
        let err: ApiError = LandError::Access(AccessError::LandNotFound(
            LandName::new("nowhere").expect("valid"),
        ))
        .into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn database_failures_are_internal() {
        let err: ApiError = RepoError::database("append", "disk full").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
