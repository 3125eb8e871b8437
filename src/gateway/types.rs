//! API response and error types.
//!
//! Success bodies follow the wire contract directly; failures are
//! `{status:"FAILED", error, message?}`. The adapter here is the only
//! place that maps transfer failure kinds to HTTP status codes — the
//! engine never sees HTTP.

use axum::{Json, http::StatusCode, response::IntoResponse};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::transfer::TransferError;

/// Type alias for handler return types.
pub type ApiResult<T> = Result<Json<T>, ApiError>;

fn is_false(b: &bool) -> bool {
    !*b
}

/// Successful transfer response.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResponseBody {
    /// Always "SUCCESS".
    #[schema(example = "SUCCESS")]
    pub status: &'static str,
    #[serde(rename = "txId")]
    pub tx_id: Uuid,
    /// Caller-facing balance after the transfer, as a decimal string.
    #[schema(example = "600.0000")]
    pub balance: Decimal,
    /// Present (true) only when this response replays a prior outcome.
    #[serde(rename = "_cached", skip_serializing_if = "is_false")]
    pub cached: bool,
}

impl TransferResponseBody {
    pub fn new(tx_id: Uuid, balance: Decimal, cached: bool) -> Self {
        Self {
            status: "SUCCESS",
            tx_id,
            balance,
            cached,
        }
    }
}

/// Error body: `{status:"FAILED", error, message?}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "FAILED")]
    pub status: &'static str,
    #[schema(example = "Insufficient funds.")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Unified API error with automatic IntoResponse.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            message: None,
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    pub fn internal(error: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ErrorBody {
            status: "FAILED",
            error: self.error,
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        let status = StatusCode::from_u16(err.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "Request failed");
        }

        Self::new(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_success_body_omits_cached_flag_when_fresh() {
        let body = TransferResponseBody::new(Uuid::nil(), dec!(600.0000), false);
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("_cached"));
        assert!(json.contains(r#""status":"SUCCESS""#));
    }

    #[test]
    fn test_success_body_carries_cached_flag_on_replay() {
        let body = TransferResponseBody::new(Uuid::nil(), dec!(600.0000), true);
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""_cached":true"#));
    }

    #[test]
    fn test_transfer_error_maps_to_status() {
        assert_eq!(
            ApiError::from(TransferError::InsufficientFunds).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(TransferError::InFlight).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(TransferError::TransactionNotFound).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TransferError::Contention).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_shape() {
        let err = ApiError::from(TransferError::InsufficientFunds);
        assert_eq!(err.error, "Insufficient funds.");
    }
}
