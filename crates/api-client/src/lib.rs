use crate::auth::sign_request;
use crate::error::ApiError;
use crate::responses::ApiErrorResponse;
use async_trait::async_trait;
use chrono::Utc;
use configuration::ExchangeConfig;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

mod auth;
pub mod error;
pub mod responses;

/// The narrow, read-only interface to the exchange that the web server proxies.
///
/// Responses are returned as raw upstream JSON; nothing in this service
/// interprets account or trade data. The trait lets tests swap in a mock.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Fetches the futures account summary. (Authenticated)
    async fn get_futures_account(&self) -> Result<Value, ApiError>;

    /// Fetches the account's trade history for one symbol. (Authenticated)
    async fn get_user_trades(&self, symbol: &str) -> Result<Value, ApiError>;
}

/// A concrete implementation of the `ApiClient` for Binance USDⓈ-M futures.
#[derive(Clone)]
pub struct BinanceClient {
    client: reqwest::Client,
    base_url: String,
    api_secret: String,
}

impl BinanceClient {
    pub fn new(config: &ExchangeConfig) -> Result<Self, ApiError> {
        if !config.is_configured() {
            return Err(ApiError::NotConfigured(
                "an API key and secret are both required".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            ApiError::NotConfigured("the API key contains invalid header characters".to_string())
        })?;
        headers.insert("X-MBX-APIKEY", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_secret: config.api_secret.clone(),
        })
    }

    async fn _get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &mut BTreeMap<&str, String>,
    ) -> Result<T, ApiError> {
        let query = signed_query(&self.api_secret, params, Utc::now().timestamp_millis())?;
        let url = format!("{}{}?{}", self.base_url, path, query);
        tracing::debug!(path, "Sending signed exchange request.");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str::<T>(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            match serde_json::from_str::<ApiErrorResponse>(&text) {
                Ok(api_error) => Err(ApiError::BinanceError(api_error.code, api_error.msg)),
                Err(_) => Err(ApiError::ApiError(status.as_u16(), text)),
            }
        }
    }
}

/// Adds the timestamp to `params` and returns the query string with its signature appended.
fn signed_query(
    secret: &str,
    params: &mut BTreeMap<&str, String>,
    timestamp_millis: i64,
) -> Result<String, ApiError> {
    params.insert("timestamp", timestamp_millis.to_string());
    let query_string =
        serde_qs::to_string(params).map_err(|e| ApiError::Encoding(e.to_string()))?;
    let signature = sign_request(secret, &query_string);
    Ok(format!("{}&signature={}", query_string, signature))
}

#[async_trait]
impl ApiClient for BinanceClient {
    async fn get_futures_account(&self) -> Result<Value, ApiError> {
        let mut params = BTreeMap::new();
        self._get_signed("/fapi/v2/account", &mut params).await
    }

    async fn get_user_trades(&self, symbol: &str) -> Result<Value, ApiError> {
        let mut params = BTreeMap::new();
        params.insert("symbol", symbol.to_string());
        self._get_signed("/fapi/v1/userTrades", &mut params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &str, secret: &str) -> ExchangeConfig {
        ExchangeConfig {
            api_key: key.to_string(),
            api_secret: secret.to_string(),
            ..ExchangeConfig::default()
        }
    }

    #[test]
    fn signed_query_includes_timestamp_and_signature() {
        let mut params = BTreeMap::new();
        params.insert("symbol", "BTCUSDT".to_string());

        let query = signed_query("secret", &mut params, 1_700_000_000_000).unwrap();

        let unsigned = "symbol=BTCUSDT&timestamp=1700000000000";
        assert_eq!(
            query,
            format!("{}&signature={}", unsigned, sign_request("secret", unsigned))
        );
    }

    #[test]
    fn missing_credentials_are_rejected() {
        assert!(matches!(
            BinanceClient::new(&config("", "secret")),
            Err(ApiError::NotConfigured(_))
        ));
        assert!(matches!(
            BinanceClient::new(&config("key", "")),
            Err(ApiError::NotConfigured(_))
        ));
    }

    #[test]
    fn builds_with_credentials() {
        let client = BinanceClient::new(&config("key", "secret")).unwrap();
        assert_eq!(client.base_url, "https://fapi.binance.com");
    }
}
