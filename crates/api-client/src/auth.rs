use hmac::{Hmac, Mac};
use sha2::Sha256;

// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

/// Creates an HMAC-SHA256 signature for a given query string.
///
/// Binance requires all private API calls to be signed. The signature covers
/// the full query string, including the `timestamp` parameter.
///
/// # Returns
///
/// A hexadecimal string representation of the signature.
pub fn sign_request(secret: &str, query_string: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(query_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
