use crate::{error::AppError, ingest, AppState};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use core_types::{EventHeaders, EventId, IncomingEvent, Payload, WebhookEvent};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    pub message: &'static str,
    pub message_id: EventId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestWebhookAck {
    pub success: bool,
    pub message: &'static str,
    pub data: Payload,
    pub message_id: EventId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Vec<WebhookEvent>,
    pub message_count: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub message_count: u64,
    pub last_message: Option<DateTime<Utc>>,
    /// Seconds since the server started.
    pub uptime: f64,
    pub connected_clients: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub uptime: f64,
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub success: bool,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
pub struct TradesQuery {
    #[serde(default = "default_symbol")]
    symbol: String,
}

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

/// # POST /webhook
/// Stores one webhook and broadcasts it. Any body is accepted.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let incoming = ingest::extract_incoming(connect_info, &headers, &body);
    tracing::info!(source = %incoming.source_addr, bytes = body.len(), "Webhook received.");

    let event = state.relay.ingest(incoming)?;
    Ok(Json(WebhookAck {
        success: true,
        message: "Webhook received successfully",
        message_id: event.id,
        timestamp: event.received_at,
    }))
}

/// # POST /test-webhook
/// Same as `/webhook`, but an empty body is replaced with a sample alert.
pub async fn test_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TestWebhookAck>, AppError> {
    let payload = match ingest::normalise_body(&body, None) {
        Payload::Structured(Value::Object(fields)) if fields.is_empty() => sample_alert(),
        payload => payload,
    };
    let incoming = IncomingEvent {
        payload,
        source_addr: "TEST".to_string(),
        headers: EventHeaders {
            content_type: Some("application/json".to_string()),
            user_agent: headers
                .get(axum::http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        },
    };

    let event = state.relay.ingest(incoming)?;
    Ok(Json(TestWebhookAck {
        success: true,
        message: "Test webhook sent",
        data: event.payload,
        message_id: event.id,
        timestamp: event.received_at,
    }))
}

fn sample_alert() -> Payload {
    Payload::Structured(json!({
        "action": "TEST",
        "symbol": "BTCUSDT",
        "price": rand::random_range(30_000u32..80_000),
        "timestamp": Utc::now(),
        "test": true,
    }))
}

/// # GET /api/messages
/// The retained history, newest first, with the lifetime count.
pub async fn get_messages(State(state): State<Arc<AppState>>) -> Json<MessagesResponse> {
    let snapshot = state.relay.snapshot();
    Json(MessagesResponse {
        messages: snapshot.events,
        message_count: snapshot.total_count,
        timestamp: Utc::now(),
    })
}

/// # DELETE /api/messages
pub async fn clear_messages(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    state.relay.clear()?;
    Ok(Json(json!({ "success": true, "message": "All messages cleared" })))
}

/// # GET /api/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.relay.stats();
    Json(StatsResponse {
        message_count: stats.message_count,
        last_message: stats.last_message,
        uptime: state.uptime_secs(),
        connected_clients: stats.connected_clients,
    })
}

/// # GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        uptime: state.uptime_secs(),
    })
}

/// # GET /binance/futures/account
pub async fn get_futures_account(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExchangeResponse>, AppError> {
    let exchange = state.exchange.as_ref().ok_or(AppError::ExchangeDisabled)?;
    let data = exchange.get_futures_account().await?;
    Ok(Json(ExchangeResponse { success: true, data }))
}

/// # GET /binance/futures/trades?symbol=BTCUSDT
pub async fn get_futures_trades(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TradesQuery>,
) -> Result<Json<ExchangeResponse>, AppError> {
    let exchange = state.exchange.as_ref().ok_or(AppError::ExchangeDisabled)?;
    let data = exchange.get_user_trades(&query.symbol).await?;
    Ok(Json(ExchangeResponse { success: true, data }))
}
