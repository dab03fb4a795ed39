use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Message returned for failures that carry no user-facing explanation
pub const GENERIC_FAILURE_MESSAGE: &str = "An error has occurred.";

/// Every failure a manager operation can surface to its caller
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Duplicate email, handle or profile
    #[error("{0}")]
    Conflict(String),
    /// Missing account or profile
    #[error("{0}")]
    NotFound(String),
    /// The submitted password does not match the stored hash
    #[error("{0}")]
    UnprocessableCredential(String),
    /// A well-formed request the caller is not allowed to make (e.g. self-follow)
    #[error("{0}")]
    InvalidOperation(String),
    /// Request input failed format validation
    #[error("{}", .0.join(" "))]
    Validation(Vec<String>),
    /// Missing, malformed or expired bearer token
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Unhandled(#[from] color_eyre::Report),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            // Existing clients expect 403 for duplicates
            ServiceError::Conflict(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::UnprocessableCredential(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::InvalidOperation(_) | ServiceError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message safe to show to a client
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Unhandled(report) => {
                if is_dev_mode() {
                    format!("{:?}", report)
                } else {
                    GENERIC_FAILURE_MESSAGE.to_string()
                }
            }
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Unhandled(color_eyre::Report::new(err))
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::Unhandled(color_eyre::Report::new(err))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request Error");
        } else {
            tracing::info!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let errors = match &self {
            ServiceError::Validation(messages) => messages.clone(),
            _ => Vec::new(),
        };

        let body = ErrorBody {
            status: status.as_u16(),
            message: self.public_message(),
            errors,
        };

        (status, Json(body)).into_response()
    }
}

fn is_dev_mode() -> bool {
    std::env::var("DEVELOPMENT_MODE")
        .map(|v| v == "1")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::eyre;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::conflict("dup").status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::not_found("gone").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::UnprocessableCredential("bad".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::InvalidOperation("no".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Validation(vec!["x".into()]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unhandled(eyre!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unhandled_message_is_opaque() {
        std::env::remove_var("DEVELOPMENT_MODE");
        let err = ServiceError::Unhandled(eyre!("connection refused to 10.0.0.3"));

        assert_eq!(err.public_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_validation_message_joins_all_failures() {
        let err = ServiceError::Validation(vec![
            "Please provide your first name.".into(),
            "Please provide a password.".into(),
        ]);

        assert_eq!(
            err.public_message(),
            "Please provide your first name. Please provide a password."
        );
    }
}
