use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the leave engine and its stores.
#[derive(Debug, Error)]
pub enum LeaveError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("insufficient leave balance: {remaining} days remaining")]
    InsufficientBalance { remaining: f64 },

    #[error("insufficient substitute leave: {shortfall} days could not be covered by grants")]
    InsufficientSubstituteBalance { shortfall: f64 },

    #[error("substitute leave grant {grant_id} has {used_days} used days and cannot be deleted")]
    CannotDelete { grant_id: u64, used_days: f64 },

    #[error("leave request {0} not found or already processed")]
    AlreadyProcessed(u64),

    #[error("failed to {context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl LeaveError {
    pub fn not_found(what: impl Into<String>) -> Self {
        LeaveError::NotFound(what.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        LeaveError::Validation(message.into())
    }

    /// Wraps a store failure with the step that was running.
    pub fn store(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| LeaveError::Store { context, source }
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::Validation(_)
            | LeaveError::InsufficientBalance { .. }
            | LeaveError::InsufficientSubstituteBalance { .. }
            | LeaveError::AlreadyProcessed(_) => StatusCode::BAD_REQUEST,
            LeaveError::CannotDelete { .. } => StatusCode::CONFLICT,
            LeaveError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            LeaveError::Store { context, source } => {
                tracing::error!(error = %source, context, "Leave store failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            LeaveError::not_found("leave type 9").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LeaveError::validation("reason required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LeaveError::InsufficientBalance { remaining: 1.5 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LeaveError::CannotDelete { grant_id: 1, used_days: 0.5 }.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LeaveError::store("save balance")(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_insufficient_balance_message_carries_remaining() {
        let err = LeaveError::InsufficientBalance { remaining: 2.5 };
        assert_eq!(
            err.to_string(),
            "insufficient leave balance: 2.5 days remaining"
        );
    }

    #[test]
    fn test_store_error_names_step() {
        let err = LeaveError::store("insert leave request")(sqlx::Error::RowNotFound);
        assert!(err.to_string().starts_with("failed to insert leave request"));
    }
}
