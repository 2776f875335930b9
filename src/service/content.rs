//! Content-type-driven canonicalization for hashing (spec.md §4.3 step 4).
//! Hashing always operates on bytes, never on parsed values (spec.md §9).

use crate::errors::{ApiError, Result};

const BINARY_PREFIXES: &[&str] = &["image/", "video/", "audio/"];
const BINARY_EXACT: &[&str] = &["application/pdf", "application/zip", "application/octet-stream"];

pub fn is_binary_content_type(content_type: &str) -> bool {
    let ct = content_type.split(';').next().unwrap_or(content_type).trim();
    BINARY_PREFIXES.iter().any(|p| ct.starts_with(p)) || BINARY_EXACT.contains(&ct)
}

pub fn is_json_content_type(content_type: &str) -> bool {
    content_type.split(';').next().unwrap_or(content_type).trim() == "application/json"
}

/// Returns the bytes actually stored (decoded, for binary content whose
/// wire body is base64) alongside the bytes to feed into `content_hash`.
/// For JSON and text the stored and hashed bytes are identical.
pub fn canonicalize(content_type: &str, body: &[u8]) -> Result<Vec<u8>> {
    if is_binary_content_type(content_type) {
        let text = std::str::from_utf8(body)
            .map_err(|_| ApiError::InvalidName("binary content must be base64-encoded".into()))?;
        return base64::Engine::decode(&base64::engine::general_purpose::STANDARD, text.trim())
            .map_err(|e| ApiError::InvalidName(format!("invalid base64 content: {e}")));
    }
    if is_json_content_type(content_type) {
        // Re-serializing would reorder keys; the wire bytes already are the
        // canonical JSON the client sent, so hash and store them verbatim.
        serde_json::from_slice::<serde_json::Value>(body)
            .map_err(|e| ApiError::InvalidName(format!("invalid JSON content: {e}")))?;
        return Ok(body.to_vec());
    }
    Ok(body.to_vec())
}

pub fn content_hash(bytes: &[u8]) -> String {
    sha256::digest(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_binary_types() {
        assert!(is_binary_content_type("image/png"));
        assert!(is_binary_content_type("application/pdf"));
        assert!(!is_binary_content_type("text/plain"));
    }

    #[test]
    fn json_canonicalization_roundtrips_bytes() {
        let body = br#"{"mode":"dark"}"#;
        let canon = canonicalize("application/json", body).unwrap();
        assert_eq!(canon, body);
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(canonicalize("application/json", b"{not json").is_err());
    }
}
