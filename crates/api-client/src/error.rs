use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to send the HTTP request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Binance returned error {0}: {1}")]
    BinanceError(i64, String),

    #[error("The API request returned an error (HTTP {0}): {1}")]
    ApiError(u16, String),

    #[error("Failed to deserialize the API response: {0}")]
    Deserialization(String),

    #[error("Failed to encode request parameters: {0}")]
    Encoding(String),

    #[error("The exchange client is not configured: {0}")]
    NotConfigured(String),
}
