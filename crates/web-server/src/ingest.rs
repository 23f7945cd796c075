//! Turns a raw HTTP request into the `IncomingEvent` handed to the relay.
//!
//! Nothing here rejects a request: bodies that are not JSON are kept as text.

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap};
use core_types::{EventHeaders, IncomingEvent, Payload};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub fn extract_incoming(
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
    body: &[u8],
) -> IncomingEvent {
    let headers_meta = EventHeaders {
        content_type: header_str(headers, header::CONTENT_TYPE.as_str()),
        user_agent: header_str(headers, header::USER_AGENT.as_str()),
    };

    IncomingEvent {
        payload: normalise_body(body, headers_meta.content_type.as_deref()),
        source_addr: source_addr(connect_info, headers),
        headers: headers_meta,
    }
}

/// JSON bodies stay structured, form bodies become flat objects, an empty body
/// is `{}`, and anything else is kept verbatim as text.
///
/// Payloads are pushed to subscribers as JSON strings, so a body that is not
/// valid UTF-8 is stored with each invalid sequence replaced by U+FFFD.
pub fn normalise_body(body: &[u8], content_type: Option<&str>) -> Payload {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Payload::empty();
    }
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        return Payload::Structured(value);
    }
    if is_form(content_type) {
        if let Ok(fields) = serde_qs::from_bytes::<BTreeMap<String, String>>(body) {
            let object: Map<String, Value> = fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            return Payload::Structured(Value::Object(object));
        }
    }
    Payload::Text(String::from_utf8_lossy(body).into_owned())
}

fn is_form(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// The first `X-Forwarded-For` hop when behind a tunnel or proxy, otherwise the peer address.
fn source_addr(connect_info: Option<ConnectInfo<SocketAddr>>, headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());

    match (forwarded, connect_info) {
        (Some(hop), _) => hop.to_string(),
        (None, Some(ConnectInfo(addr))) => addr.ip().to_string(),
        (None, None) => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    #[test]
    fn json_body_is_structured_regardless_of_content_type() {
        let payload = normalise_body(br#"{"action":"BUY"}"#, Some("text/plain"));
        assert_eq!(payload, Payload::Structured(json!({ "action": "BUY" })));
    }

    #[test]
    fn plain_text_is_kept_verbatim() {
        assert_eq!(
            normalise_body(b"hello world", Some("text/plain")),
            Payload::Text("hello world".to_string())
        );
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let payload = normalise_body(b"price \xff\xfe 42", Some("application/octet-stream"));
        assert_eq!(payload, Payload::Text("price \u{FFFD}\u{FFFD} 42".to_string()));
    }

    #[test]
    fn empty_body_becomes_an_empty_object() {
        assert_eq!(normalise_body(b"", None), Payload::empty());
        assert_eq!(normalise_body(b"  \n", None), Payload::empty());
    }

    #[test]
    fn form_body_becomes_flat_object() {
        let payload = normalise_body(
            b"symbol=BTCUSDT&side=buy",
            Some("application/x-www-form-urlencoded; charset=utf-8"),
        );
        assert_eq!(
            payload,
            Payload::Structured(json!({ "symbol": "BTCUSDT", "side": "buy" }))
        );
    }

    #[test]
    fn source_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        let peer = Some(ConnectInfo(SocketAddr::from(([10, 0, 0, 5], 4000))));
        assert_eq!(source_addr(peer, &headers), "10.0.0.5");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(source_addr(peer, &headers), "203.0.113.9");
        assert_eq!(source_addr(None, &HeaderMap::new()), "unknown");
    }
}
