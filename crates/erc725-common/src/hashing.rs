//! Hash-function registry used by verifiable URL content.
//!
//! Values with `JSONURL`, `AssetURL` or `VerifiableURI` content embed a 4-byte
//! signature naming the hash function next to the hash itself. The registry is a
//! fixed table, so lookups are plain matches.

use crate::error::{CodecError, Result};
use alloy_primitives::{B256, FixedBytes, hex, keccak256};
use serde::{Serialize, Serializer};
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

/// Signature of `keccak256(utf8)`
pub const KECCAK256_UTF8_SIG: FixedBytes<4> = FixedBytes([0x6f, 0x35, 0x7c, 0x6a]);

/// Signature of `keccak256(bytes)`
pub const KECCAK256_BYTES_SIG: FixedBytes<4> = FixedBytes([0x80, 0x19, 0xf9, 0xb1]);

/// A hash function referenced by verifiable URL content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashMethod {
    /// `keccak256(utf8)`, hash of the UTF-8 text of the referenced document
    Keccak256Utf8,
    /// `keccak256(bytes)`, hash of the raw bytes of the referenced file
    Keccak256Bytes,
    /// A signature not present in the registry; kept so decoding never loses data
    Unknown(FixedBytes<4>),
}

impl HashMethod {
    /// The 4-byte signature written on the wire
    pub fn sig(&self) -> FixedBytes<4> {
        match self {
            Self::Keccak256Utf8 => KECCAK256_UTF8_SIG,
            Self::Keccak256Bytes => KECCAK256_BYTES_SIG,
            Self::Unknown(sig) => *sig,
        }
    }

    /// Look up a method by its wire signature
    pub fn from_sig(sig: FixedBytes<4>) -> Self {
        if sig == KECCAK256_UTF8_SIG {
            Self::Keccak256Utf8
        } else if sig == KECCAK256_BYTES_SIG {
            Self::Keccak256Bytes
        } else {
            Self::Unknown(sig)
        }
    }

    /// Registry name, or the hex signature for unknown methods
    pub fn name(&self) -> SmolStr {
        match self {
            Self::Keccak256Utf8 => SmolStr::new_static("keccak256(utf8)"),
            Self::Keccak256Bytes => SmolStr::new_static("keccak256(bytes)"),
            Self::Unknown(sig) => SmolStr::new(hex::encode_prefixed(sig)),
        }
    }

    /// Hash `content` with this method. Unknown methods cannot hash.
    pub fn hash(&self, content: impl AsRef<[u8]>) -> Option<B256> {
        match self {
            Self::Keccak256Utf8 | Self::Keccak256Bytes => Some(keccak256(content)),
            Self::Unknown(_) => None,
        }
    }

    /// Check downloaded content against the hash that was published on-chain.
    ///
    /// Always false for methods outside the registry.
    pub fn verify(&self, content: impl AsRef<[u8]>, expected: &B256) -> bool {
        self.hash(content).is_some_and(|actual| actual == *expected)
    }

    /// Check a JSON document the way it was hashed when encoded: compact
    /// serialization, keys in insertion order.
    pub fn verify_json(&self, json: &serde_json::Value, expected: &B256) -> bool {
        match serde_json::to_string(json) {
            Ok(text) => self.verify(text.as_bytes(), expected),
            Err(_) => false,
        }
    }
}

/// Hash of a JSON document as stored in `JSONURL` content
pub fn hash_json(json: &serde_json::Value) -> Result<B256> {
    let text = serde_json::to_string(json)
        .map_err(|e| CodecError::InvalidUrlContent(format!("cannot serialize json: {e}")))?;
    Ok(keccak256(text.as_bytes()))
}

impl FromStr for HashMethod {
    type Err = CodecError;

    /// Accepts a registry name or a `0x`-prefixed 4-byte signature.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "keccak256(utf8)" => Ok(Self::Keccak256Utf8),
            "keccak256(bytes)" => Ok(Self::Keccak256Bytes),
            other => {
                let sig = other
                    .strip_prefix("0x")
                    .and_then(|h| hex::decode(h).ok())
                    .filter(|b| b.len() == 4)
                    .ok_or_else(|| CodecError::UnknownHashFunction(SmolStr::new(other)))?;
                match Self::from_sig(FixedBytes::from_slice(&sig)) {
                    Self::Unknown(_) => Err(CodecError::UnknownHashFunction(SmolStr::new(other))),
                    known => Ok(known),
                }
            }
        }
    }
}

impl fmt::Display for HashMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl Serialize for HashMethod {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_round_trip() {
        for method in [HashMethod::Keccak256Utf8, HashMethod::Keccak256Bytes] {
            assert_eq!(HashMethod::from_sig(method.sig()), method);
            assert_eq!(method.name().parse::<HashMethod>().unwrap(), method);
        }
        assert_eq!(
            "0x6f357c6a".parse::<HashMethod>().unwrap(),
            HashMethod::Keccak256Utf8
        );
        assert_eq!(
            "0x8019f9b1".parse::<HashMethod>().unwrap(),
            HashMethod::Keccak256Bytes
        );
    }

    #[test]
    fn unknown_signatures() {
        let sig = FixedBytes([0xde, 0xad, 0xbe, 0xef]);
        let method = HashMethod::from_sig(sig);
        assert_eq!(method, HashMethod::Unknown(sig));
        assert_eq!(method.name(), "0xdeadbeef");
        assert!(!method.verify(b"anything", &B256::ZERO));
        assert!("0xdeadbeef".parse::<HashMethod>().is_err());
        assert!("sha256".parse::<HashMethod>().is_err());
    }

    #[test]
    fn verify_content() {
        let content = br#"{"LSP3Profile":{"name":"alice"}}"#;
        let hash = keccak256(content);
        assert!(HashMethod::Keccak256Utf8.verify(content, &hash));
        assert!(!HashMethod::Keccak256Utf8.verify(b"tampered", &hash));

        let json: serde_json::Value = serde_json::from_slice(content).unwrap();
        assert!(HashMethod::Keccak256Utf8.verify_json(&json, &hash));
        assert_eq!(hash_json(&json).unwrap(), hash);
    }
}
