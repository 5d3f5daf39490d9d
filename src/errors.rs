use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::scheduling::SchedulingError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{message}")]
    Conflict {
        message: String,
        appointment_id: Option<String>,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal_error",
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict { .. } => "conflict",
            AppError::InvalidState(_) => "invalid_state",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
        }
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::Validation(msg) => AppError::Validation(msg),
            SchedulingError::NotFound(msg) => AppError::NotFound(msg),
            SchedulingError::Authorization(msg) => AppError::Forbidden(msg),
            SchedulingError::InvalidState(msg) => AppError::InvalidState(msg),
            SchedulingError::Conflict { appointment_id } => AppError::Conflict {
                message: format!("time slot overlaps existing appointment {appointment_id}"),
                appointment_id: Some(appointment_id),
            },
            SchedulingError::Storage(e) => AppError::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let mut body = serde_json::json!({ "error": message, "code": self.code() });
        if let AppError::Conflict {
            appointment_id: Some(id),
            ..
        } = &self
        {
            body["conflicting_appointment_id"] = serde_json::Value::String(id.clone());
        }
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduling_errors_map_to_statuses() {
        let cases = [
            (SchedulingError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                SchedulingError::Conflict {
                    appointment_id: "a1".into(),
                },
                StatusCode::CONFLICT,
            ),
            (SchedulingError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (SchedulingError::InvalidState("x".into()), StatusCode::CONFLICT),
            (SchedulingError::NotFound("x".into()), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_conflict_and_invalid_state_have_distinct_codes() {
        let conflict = AppError::from(SchedulingError::Conflict {
            appointment_id: "a1".into(),
        });
        let invalid = AppError::from(SchedulingError::InvalidState("cancelled".into()));
        assert_eq!(conflict.code(), "conflict");
        assert_eq!(invalid.code(), "invalid_state");
    }
}
