//! Two-stage payload format detection for log entries.
//!
//! Binary codec and JSON messages share one log with no out-of-band format
//! flag. The leading byte decides which decoder is tried first; whatever
//! neither decoder accepts is treated as plain text.

use crate::codec::{self, MAJOR_ARRAY, MAJOR_MAP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Binary,
    Json,
    PlainText,
}

/// A payload decoded by [`sniff_format`], tagged with the format that accepted it.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayload {
    Binary(codec::Value),
    Json(serde_json::Value),
    PlainText(String),
}

impl DecodedPayload {
    pub fn format(&self) -> PayloadFormat {
        match self {
            DecodedPayload::Binary(_) => PayloadFormat::Binary,
            DecodedPayload::Json(_) => PayloadFormat::Json,
            DecodedPayload::PlainText(_) => PayloadFormat::PlainText,
        }
    }

    /// JSON view of structured payloads; `None` for plain text.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            DecodedPayload::Binary(value) => Some(value.to_json()),
            DecodedPayload::Json(value) => Some(value.clone()),
            DecodedPayload::PlainText(_) => None,
        }
    }
}

// Only container heads count as binary candidates. Their head bytes
// (0x80..=0xbf) are never the first byte of valid UTF-8 text.
fn plausible_binary_head(byte: u8) -> bool {
    matches!(byte >> 5, MAJOR_ARRAY | MAJOR_MAP)
}

fn opens_json_text(byte: u8) -> bool {
    matches!(byte, b'{' | b'[' | b'"' | b' ' | b'\t' | b'\n' | b'\r')
}

pub fn sniff_format(bytes: &[u8]) -> DecodedPayload {
    let Some(&first) = bytes.first() else {
        return DecodedPayload::PlainText(String::new());
    };

    if plausible_binary_head(first) && !opens_json_text(first) {
        match codec::decode(bytes) {
            Ok(value) => return DecodedPayload::Binary(value),
            Err(e) => tracing::debug!(error = %e, "Binary decode failed, trying JSON"),
        }
    }

    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
        return DecodedPayload::Json(value);
    }

    DecodedPayload::PlainText(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;
    use serde_json::json;

    #[test]
    fn test_binary_map() {
        let bytes = codec::encode(&Value::Map(vec![("a".into(), Value::from(1u32))]));
        let decoded = sniff_format(&bytes);
        assert_eq!(decoded.format(), PayloadFormat::Binary);
        assert_eq!(decoded.to_json(), Some(json!({"a": 1})));
    }

    #[test]
    fn test_json_object() {
        let decoded = sniff_format(br#"{"type":"note","n":2}"#);
        assert_eq!(decoded, DecodedPayload::Json(json!({"type": "note", "n": 2})));
    }

    #[test]
    fn test_json_scalar() {
        assert_eq!(sniff_format(b"42"), DecodedPayload::Json(json!(42)));
        assert_eq!(sniff_format(b"true"), DecodedPayload::Json(json!(true)));
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            sniff_format(b"hello there"),
            DecodedPayload::PlainText("hello there".into())
        );
        assert_eq!(sniff_format(b"Bye"), DecodedPayload::PlainText("Bye".into()));
        assert_eq!(sniff_format(b""), DecodedPayload::PlainText(String::new()));
    }

    #[test]
    fn test_truncated_binary_falls_back_to_text() {
        // Map head announcing two pairs with nothing after it.
        let decoded = sniff_format(&[0xa2]);
        assert_eq!(decoded.format(), PayloadFormat::PlainText);
    }

    #[test]
    fn test_broken_json_is_plain_text() {
        let decoded = sniff_format(b"{not json");
        assert_eq!(decoded, DecodedPayload::PlainText("{not json".into()));
    }
}
