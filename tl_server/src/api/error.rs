//! JSON error responses shared by all handlers.

use axum::{Json, extract::rejection::JsonRejection, http::StatusCode};
use serde::Serialize;
use tourney_ledger::settlement::SettlementError;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable reason for conflicts, human text otherwise
    pub error: String,
    /// Human-readable conflict description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Handler error type
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Build an error response with only an `error` field
pub fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            message: None,
        }),
    )
}

pub fn bad_request(error: impl Into<String>) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, error)
}

pub fn not_found(error: impl Into<String>) -> ApiError {
    error_response(StatusCode::NOT_FOUND, error)
}

/// Map a malformed or missing JSON body to `400 Bad Request`
pub fn json_rejection(rejection: JsonRejection) -> ApiError {
    bad_request(rejection.body_text())
}

/// Map a settlement failure to its HTTP status.
///
/// Conflicts become `409 Conflict` carrying the stable reason code. Store
/// faults become a sanitized `500`; the settlement layer has already logged
/// the details.
pub fn settlement_error(err: SettlementError) -> ApiError {
    match err.conflict() {
        Some(conflict) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: conflict.reason().to_string(),
                message: Some(conflict.to_string()),
            }),
        ),
        None => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.client_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_ledger::db::StoreError;
    use tourney_ledger::ledger::Conflict;

    #[test]
    fn test_conflict_maps_to_409_with_reason() {
        let (status, Json(body)) = settlement_error(Conflict::NegativeBalance.into());
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.error, Conflict::NegativeBalance.reason());
        assert!(body.message.is_some());
    }

    #[test]
    fn test_fault_maps_to_sanitized_500() {
        let (status, Json(body)) = settlement_error(StoreError::Deadlock.into());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert!(body.message.is_none());
    }
}
