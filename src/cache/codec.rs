//! Text encoding of program binaries: zlib, then standard base64.

use std::io::Read;

use base64::Engine as _;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use flate2::Compression;

use crate::error::GlError;

/// Compress and encode a program binary for a string-valued store.
///
/// # Errors
///
/// [`GlError::CacheStore`] if compression fails.
pub fn encode_binary(bytes: &[u8]) -> Result<String, GlError> {
    let mut encoder = ZlibEncoder::new(bytes, Compression::default());
    let mut compressed = Vec::with_capacity(bytes.len() / 2);
    let _ = encoder
        .read_to_end(&mut compressed)
        .map_err(|e| GlError::CacheStore(format!("compression failed: {e}")))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
}

/// Inverse of [`encode_binary`].
///
/// # Errors
///
/// [`GlError::CacheStore`] if the text is not base64 or the payload is not
/// a zlib stream.
pub fn decode_binary(text: &str) -> Result<Vec<u8>, GlError> {
    let compressed = base64::engine::general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| GlError::CacheStore(format!("invalid base64: {e}")))?;
    let mut bytes = Vec::with_capacity(compressed.len() * 2);
    let _ = ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut bytes)
        .map_err(|e| GlError::CacheStore(format!("invalid zlib stream: {e}")))?;
    Ok(bytes)
}
