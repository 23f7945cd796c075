use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Relay error: {0}")]
    Relay(#[from] relay::error::RelayError),
    #[error("Exchange error: {0}")]
    Exchange(#[from] api_client::error::ApiError),
    #[error("The exchange proxy is not configured")]
    ExchangeDisabled,
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Relay(relay_err) => {
                tracing::error!(error = ?relay_err, "Internal relay error.");
                let body = Json(json!({
                    "success": false,
                    "error": "Internal server error",
                    "message": relay_err.to_string(),
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
            AppError::Exchange(api_client::error::ApiError::NotConfigured(message)) => {
                exchange_error(StatusCode::SERVICE_UNAVAILABLE, message)
            }
            AppError::Exchange(api_err) => {
                tracing::warn!(error = ?api_err, "Exchange request failed.");
                exchange_error(StatusCode::BAD_GATEWAY, api_err.to_string())
            }
            AppError::ExchangeDisabled => exchange_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Exchange API credentials are not configured".to_string(),
            ),
        }
    }
}

fn exchange_error(status: StatusCode, error: String) -> Response {
    (status, Json(json!({ "success": false, "error": error }))).into_response()
}
