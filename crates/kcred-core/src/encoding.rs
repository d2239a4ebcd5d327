//! # Encodings — `0x`-Hex and Base58
//!
//! Hash values travel as `0x`-prefixed lowercase hex in credentials and as
//! base58 (bitcoin alphabet) in attestation proofs and identifiers. Both
//! directions live here so every caller decodes with the same rules:
//! the `0x` prefix is mandatory, upper-case hex is accepted on input, and
//! output is always lowercase.

use base58::{FromBase58, ToBase58};

use crate::error::EncodingError;

/// Encode bytes as `0x`-prefixed lowercase hex.
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a `0x`-prefixed hex string.
///
/// # Errors
///
/// Returns [`EncodingError::MissingHexPrefix`] when the prefix is absent and
/// [`EncodingError::InvalidHex`] when the remainder is not hex.
pub fn from_prefixed_hex(value: &str) -> Result<Vec<u8>, EncodingError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| EncodingError::MissingHexPrefix(value.to_string()))?;
    hex::decode(digits).map_err(|e| EncodingError::InvalidHex {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Encode bytes as base58.
pub fn to_base58(bytes: &[u8]) -> String {
    bytes.to_base58()
}

/// Decode a base58 string.
///
/// # Errors
///
/// Returns [`EncodingError::InvalidBase58`] for characters outside the
/// alphabet or an empty input.
pub fn from_base58(value: &str) -> Result<Vec<u8>, EncodingError> {
    if value.is_empty() {
        return Err(EncodingError::InvalidBase58 {
            value: String::new(),
            reason: "empty input".into(),
        });
    }
    value.from_base58().map_err(|e| EncodingError::InvalidBase58 {
        value: value.to_string(),
        reason: format!("{e:?}"),
    })
}

/// Convert a decoded byte vector into a fixed-size array.
///
/// # Errors
///
/// Returns [`EncodingError::InvalidLength`] when `bytes.len() != N`.
pub fn fixed<const N: usize>(bytes: Vec<u8>) -> Result<[u8; N], EncodingError> {
    let actual = bytes.len();
    bytes
        .try_into()
        .map_err(|_| EncodingError::InvalidLength {
            expected: N,
            actual,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_requires_prefix() {
        assert_eq!(
            from_prefixed_hex("abcd"),
            Err(EncodingError::MissingHexPrefix("abcd".into()))
        );
    }

    #[test]
    fn test_hex_accepts_uppercase_and_emits_lowercase() {
        let bytes = from_prefixed_hex("0xABCD").unwrap();
        assert_eq!(bytes, vec![0xab, 0xcd]);
        assert_eq!(to_prefixed_hex(&bytes), "0xabcd");
    }

    #[test]
    fn test_hex_rejects_odd_length() {
        assert!(matches!(
            from_prefixed_hex("0xabc"),
            Err(EncodingError::InvalidHex { .. })
        ));
    }

    #[test]
    fn test_base58_known_vector() {
        // "hello world" in the bitcoin alphabet.
        assert_eq!(to_base58(b"hello world"), "StV1DL6CwTryKyV");
        assert_eq!(from_base58("StV1DL6CwTryKyV").unwrap(), b"hello world");
    }

    #[test]
    fn test_base58_rejects_invalid_alphabet() {
        // '0', 'O', 'I' and 'l' are not in the bitcoin alphabet.
        assert!(matches!(
            from_base58("0OIl"),
            Err(EncodingError::InvalidBase58 { .. })
        ));
        assert!(from_base58("").is_err());
    }

    #[test]
    fn test_fixed_length() {
        let arr: [u8; 2] = fixed(vec![1, 2]).unwrap();
        assert_eq!(arr, [1, 2]);
        assert_eq!(
            fixed::<32>(vec![0; 31]),
            Err(EncodingError::InvalidLength {
                expected: 32,
                actual: 31
            })
        );
    }
}
