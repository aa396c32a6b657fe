//! Payload codec: tweet bodies travel base64-encoded (standard alphabet, padded).

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::DecodeError;

/// Decode a transport-encoded tweet body into text.
pub fn decode_tweet(encoded: &str) -> Result<String, DecodeError> {
    let bytes = STANDARD.decode(encoded)?;
    Ok(String::from_utf8(bytes)?)
}

/// Inverse of [`decode_tweet`]; used by producers and tests.
pub fn encode_tweet(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}
