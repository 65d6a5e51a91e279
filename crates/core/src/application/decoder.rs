// Result Decoder - JSON with transparent gzip fallback

use crate::domain::error::Result;
use crate::domain::{DecodeError, ResponseMessage};
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;
use tracing::debug;

/// Decode a raw response payload
///
/// Plain JSON is tried first. Only when that parse fails are the bytes
/// gunzipped and parsed again; a failure there is final.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(parse_err) => {
            debug!(
                len = bytes.len(),
                error = %parse_err,
                "Payload is not plain JSON, trying gzip"
            );
            decode_compressed(bytes)
        }
    }
}

/// Decode and classify a payload as data or EOF sentinel
pub fn decode_message(bytes: &[u8]) -> Result<ResponseMessage> {
    decode(bytes).map(ResponseMessage::from_value)
}

fn decode_compressed(bytes: &[u8]) -> Result<Value> {
    let mut text = String::new();
    GzDecoder::new(bytes)
        .read_to_string(&mut text)
        .map_err(DecodeError::Decompress)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use std::io::Write;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decode_plain_json() {
        let value = decode(br#"{"row":1,"cols":["a","b"]}"#).unwrap();
        assert_eq!(value, json!({"row": 1, "cols": ["a", "b"]}));
    }

    #[test]
    fn test_decode_gzip_matches_plain() {
        let text = br#"{"row":2,"nested":{"ok":true}}"#;
        assert_eq!(decode(&gzip(text)).unwrap(), decode(text).unwrap());
    }

    #[test]
    fn test_garbage_fails_in_decompression_stage() {
        let err = decode(b"{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Decompress(_)), "got {:?}", err);
    }

    #[test]
    fn test_gzip_of_invalid_json_fails_in_parse_stage() {
        let err = decode(&gzip(b"still {not json")).unwrap_err();
        assert!(matches!(err, DecodeError::CompressedJson(_)), "got {:?}", err);
    }

    #[test]
    fn test_decode_message_recognizes_compressed_eof() {
        let message = decode_message(&gzip(br#"{"EOF":true}"#)).unwrap();
        assert!(message.is_eof());
    }
}
