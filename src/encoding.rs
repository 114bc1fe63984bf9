//! Transfer encoding for inline image attachments
//!
//! Binary payloads travel inside JSON request bodies as standard base64.
//! Data URLs (`data:<type>;base64,<payload>`) are accepted on input, but only
//! the payload portion is ever sent to the backend.

use crate::error::{MedraxError, Result};
use base64::Engine;
use std::path::Path;

/// Encode raw bytes as standard padded base64
///
/// # Examples
///
/// ```
/// use medrax::encoding::encode_bytes;
///
/// assert_eq!(encode_bytes(b"xray"), "eHJheQ==");
/// ```
pub fn encode_bytes(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 payload back into bytes
///
/// A leading data-URL prefix is tolerated and stripped first.
///
/// # Errors
///
/// Returns `MedraxError::Encoding` if the payload is not valid base64
pub fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(strip_data_url_prefix(payload).trim())
        .map_err(|e| MedraxError::Encoding(format!("Invalid base64 payload: {}", e)).into())
}

/// Build a data URL for the given media type and bytes
///
/// # Examples
///
/// ```
/// use medrax::encoding::to_data_url;
///
/// assert_eq!(to_data_url("image/png", b"xray"), "data:image/png;base64,eHJheQ==");
/// ```
pub fn to_data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, encode_bytes(bytes))
}

/// Strip the metadata prefix of a data URL, leaving only the payload
///
/// Input without a `,` separator is returned unchanged.
///
/// # Examples
///
/// ```
/// use medrax::encoding::strip_data_url_prefix;
///
/// assert_eq!(strip_data_url_prefix("data:image/png;base64,AAAA"), "AAAA");
/// assert_eq!(strip_data_url_prefix("AAAA"), "AAAA");
/// ```
pub fn strip_data_url_prefix(encoded: &str) -> &str {
    encoded
        .split_once(',')
        .map(|(_, payload)| payload)
        .unwrap_or(encoded)
}

/// Read a file and return its content as a base64 payload
///
/// # Errors
///
/// Returns `MedraxError::FileRead` if the file cannot be read
pub async fn encode_file(path: &Path) -> Result<String> {
    let bytes = read_file(path).await?;
    tracing::debug!("Encoded {} ({} bytes)", path.display(), bytes.len());
    Ok(encode_bytes(&bytes))
}

pub(crate) async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        tracing::warn!("Failed to read {}: {}", path.display(), e);
        MedraxError::FileRead {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
