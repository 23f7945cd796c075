use serde::Deserialize;

/// Represents an error response from the Binance API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub code: i64,
    pub msg: String,
}
