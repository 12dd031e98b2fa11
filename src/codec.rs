//! Lookup key codec.
//!
//! The transactions store addresses objects by the unpadded URL-safe base64
//! form of their binary key: the raw digest bytes for record-keyed
//! resources, or the 8-byte little-endian sequence number for
//! checkpoint-keyed ones.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Textual form a node uses for record identifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdFormat {
    /// Base-58 digests, as emitted by current node versions
    #[default]
    Base58,
    /// Hex digests with an optional `0x` prefix, as emitted by older nodes
    Hex,
}

impl fmt::Display for IdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdFormat::Base58 => write!(f, "base58"),
            IdFormat::Hex => write!(f, "hex"),
        }
    }
}

/// Errors produced while deriving a lookup key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("empty identifier")]
    Empty,

    #[error("invalid base58 identifier '{input}': {reason}")]
    InvalidBase58 { input: String, reason: String },

    #[error("invalid hex identifier '{input}': {reason}")]
    InvalidHex { input: String, reason: String },

    #[error("not a non-negative integer: '{0}'")]
    InvalidSequence(String),
}

/// URL-safe, unpadded base64 key used in store URLs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey(String);

impl LookupKey {
    fn from_bytes(bytes: &[u8]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Raw binary value behind this key
    pub fn to_bytes(&self) -> Vec<u8> {
        // Every LookupKey is produced by from_bytes, so decoding cannot fail.
        URL_SAFE_NO_PAD.decode(&self.0).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decode a node-native record identifier into its raw bytes.
pub fn decode_record_id(id: &str, format: IdFormat) -> Result<Vec<u8>, EncodingError> {
    if id.is_empty() {
        return Err(EncodingError::Empty);
    }
    match format {
        IdFormat::Base58 => bs58::decode(id)
            .into_vec()
            .map_err(|e| EncodingError::InvalidBase58 {
                input: id.to_string(),
                reason: e.to_string(),
            }),
        IdFormat::Hex => {
            let digits = id.strip_prefix("0x").unwrap_or(id);
            if digits.is_empty() {
                return Err(EncodingError::Empty);
            }
            hex::decode(digits).map_err(|e| EncodingError::InvalidHex {
                input: id.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

/// Lookup key for a record identifier
pub fn encode_record_id(id: &str, format: IdFormat) -> Result<LookupKey, EncodingError> {
    let bytes = decode_record_id(id, format)?;
    Ok(LookupKey::from_bytes(&bytes))
}

/// Lookup key for a checkpoint sequence number (u64, little-endian)
pub fn encode_sequence_number(n: u64) -> LookupKey {
    LookupKey::from_bytes(&n.to_le_bytes())
}

/// Lookup key for a sequence number in the textual form nodes report it in
pub fn encode_sequence_str(raw: &str) -> Result<LookupKey, EncodingError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EncodingError::InvalidSequence(raw.to_string()));
    }
    let n: u64 = trimmed
        .parse()
        .map_err(|_| EncodingError::InvalidSequence(raw.to_string()))?;
    Ok(encode_sequence_number(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    // A 32-byte mainnet transaction digest
    const DIGEST: &str = "5EYrhhBXfbaQA4mFkDWdmETDNi2nmpY4d7ZzmS1SV8y7";

    #[test]
    fn test_encode_record_id_is_stable() {
        let a = encode_record_id("ABC123", IdFormat::Base58).unwrap();
        let b = encode_record_id("ABC123", IdFormat::Base58).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "AWb4ZTQ");
        assert_eq!(a.to_bytes(), vec![0x01, 0x66, 0xf8, 0x65, 0x34]);
    }

    #[test]
    fn test_encode_full_digest_known_key() {
        let key = encode_record_id(DIGEST, IdFormat::Base58).unwrap();
        assert_eq!(key.as_str(), "PudRp4QNkZO7xHAPuo6UO9jA9J-wlrg4uGGx9N76luI");

        let hex_key = encode_record_id(
            "0x3ee751a7840d9193bbc4700fba8e943bd8c0f49fb096b838b861b1f4defa96e2",
            IdFormat::Hex,
        )
        .unwrap();
        assert_eq!(hex_key, key);
    }

    #[test]
    fn test_record_id_round_trip() {
        let key = encode_record_id(DIGEST, IdFormat::Base58).unwrap();
        let bytes = key.to_bytes();
        assert_eq!(bytes, decode_record_id(DIGEST, IdFormat::Base58).unwrap());
        assert_eq!(bytes.len(), 32);
        assert_eq!(bs58::encode(&bytes).into_string(), DIGEST);
        assert_eq!(URL_SAFE_NO_PAD.encode(&bytes), key.as_str());
    }

    #[test]
    fn test_url_safe_alphabet() {
        // 0xfb 0xff encodes to "-_8" in the URL-safe alphabet
        let key = encode_record_id("fbff", IdFormat::Hex).unwrap();
        assert_eq!(key.as_str(), "-_8");
    }

    #[test]
    fn test_hex_with_prefix() {
        let plain = encode_record_id("00ff10", IdFormat::Hex).unwrap();
        let prefixed = encode_record_id("0x00ff10", IdFormat::Hex).unwrap();
        assert_eq!(plain, prefixed);
        assert_eq!(plain.as_str(), "AP8Q");
    }

    #[test]
    fn test_invalid_base58_characters() {
        // '0', 'O', 'I' and 'l' are outside the base58 alphabet
        for bad in ["ABC0", "OOPS", "Il1"] {
            let err = encode_record_id(bad, IdFormat::Base58).unwrap_err();
            assert!(matches!(err, EncodingError::InvalidBase58 { .. }), "{bad}");
        }
    }

    #[test]
    fn test_invalid_hex() {
        let err = encode_record_id("xyz", IdFormat::Hex).unwrap_err();
        assert!(matches!(err, EncodingError::InvalidHex { .. }));
        assert_eq!(encode_record_id("0x", IdFormat::Hex).unwrap_err(), EncodingError::Empty);
    }

    #[test]
    fn test_empty_identifier() {
        assert_eq!(encode_record_id("", IdFormat::Base58).unwrap_err(), EncodingError::Empty);
    }

    #[test]
    fn test_sequence_number_little_endian() {
        let key = encode_sequence_number(1);
        assert_eq!(key.to_bytes(), vec![1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(key.as_str(), "AQAAAAAAAAA");
    }

    #[test]
    fn test_sequence_str() {
        assert_eq!(encode_sequence_str("1").unwrap(), encode_sequence_number(1));
        assert_eq!(
            encode_sequence_str("184467440").unwrap(),
            encode_sequence_number(184_467_440)
        );
        assert_eq!(
            encode_sequence_str(&u64::MAX.to_string()).unwrap().to_bytes(),
            vec![0xff; 8]
        );
    }

    #[test]
    fn test_sequence_str_rejects_garbage() {
        for bad in ["", "-1", "+5", "12a", "1.5", "18446744073709551616"] {
            assert!(
                matches!(encode_sequence_str(bad), Err(EncodingError::InvalidSequence(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_sequence_key_reencodes_to_same_text() {
        let key = encode_sequence_number(1);
        assert_eq!(key.as_str(), "AQAAAAAAAAA");
        let bytes = URL_SAFE_NO_PAD.decode(key.as_str()).unwrap();
        assert_eq!(URL_SAFE_NO_PAD.encode(bytes), key.as_str());
    }
}
