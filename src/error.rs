use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::model::absence::AbsenceStatus;

/// Every failure a caller of the absence workflow can observe.
#[derive(Debug, Display)]
pub enum AppError {
    /// Malformed input; never retried.
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{} {} not found", entity, id)]
    NotFound { entity: &'static str, id: String },

    /// Transition attempted from a state that does not allow it.
    #[display(fmt = "absence {} is {}, cannot {}", id, status, action)]
    InvalidState {
        id: String,
        status: AbsenceStatus,
        action: &'static str,
    },

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "storage failure: {}", _0)]
    Storage(String),
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        AppError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable machine-readable kind, used in response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound { .. } => "not_found",
            AppError::InvalidState { .. } => "invalid_state",
            AppError::Forbidden(_) => "forbidden",
            AppError::Storage(_) => "storage",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidState { .. } => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // storage details stay in the logs
        let message = match self {
            AppError::Storage(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": message,
        }))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_distinct_status_codes() {
        let cases = [
            (AppError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::not_found("absence", "42"), StatusCode::NOT_FOUND),
            (
                AppError::InvalidState {
                    id: "42".into(),
                    status: AbsenceStatus::Approved,
                    action: "approve",
                },
                StatusCode::CONFLICT,
            ),
            (AppError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (
                AppError::Storage("pool timed out".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{}", err.kind());
        }
    }

    #[test]
    fn invalid_state_message_names_the_status() {
        let err = AppError::InvalidState {
            id: "a1".into(),
            status: AbsenceStatus::Rejected,
            action: "approve",
        };
        assert_eq!(err.to_string(), "absence a1 is rejected, cannot approve");
    }
}
