//! Schema descriptors: `keyType`, `valueType` and `valueContent`.
//!
//! Descriptor strings are parsed once, when a schema is loaded, into closed enums
//! that the codecs match on exhaustively.

use crate::error::{CodecError, Result};
use alloy_primitives::{Bytes, hex};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use smol_str::{SmolStr, format_smolstr};
use std::fmt;
use std::str::FromStr;

/// Decode a hex string, with or without a `0x` prefix
pub fn parse_hex(field: &str, input: &str) -> Result<Vec<u8>> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    hex::decode(digits).map_err(|e| CodecError::invalid_hex(field, format!("`{input}`: {e}")))
}

/// How a schema entry derives its key(s) and batches its values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// One name, one key
    Singleton,
    /// A length cell plus one key per element
    Array,
    /// `First:Second`
    #[serde(alias = "Bytes20Mapping")]
    Mapping,
    /// `First:Second:Third`
    #[serde(alias = "Bytes20MappingWithGrouping")]
    MappingWithGrouping,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Singleton => "Singleton",
            Self::Array => "Array",
            Self::Mapping => "Mapping",
            Self::MappingWithGrouping => "MappingWithGrouping",
        })
    }
}

/// Structural (ABI-like) descriptor of an encoded value
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum ValueType {
    /// UTF-8 text, no length prefix
    String,
    /// 20-byte address
    Address,
    /// Single byte, `0x01` / `0x00`
    Bool,
    /// Raw bytes
    Bytes,
    /// Unsigned integer of the given bit width
    Uint(u16),
    /// Two's complement signed integer of the given bit width
    Int(u16),
    /// `bytesN`, right-padded to N bytes
    FixedBytes(u8),
    /// `T[]`, ABI-encoded dynamic array
    Array(Box<ValueType>),
    /// `T[CompactBytesArray]`, every element prefixed by its `uint16` length
    CompactBytesArray(Box<ValueType>),
}

impl ValueType {
    /// Whether the ABI encoding of this type is dynamically sized
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Bytes | Self::Array(_) | Self::CompactBytesArray(_)
        )
    }

    /// Element type of an array form, `None` for scalars
    pub fn element(&self) -> Option<&ValueType> {
        match self {
            Self::Array(inner) | Self::CompactBytesArray(inner) => Some(inner),
            _ => None,
        }
    }

    /// The element type for array forms, the type itself for scalars
    pub fn scalar(&self) -> &ValueType {
        self.element().unwrap_or(self)
    }

    fn parse_scalar(s: &str) -> Result<Self> {
        let unsupported = || CodecError::UnsupportedValueType(SmolStr::new(s));
        let numeric = |d: &str| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit());
        match s {
            "string" => return Ok(Self::String),
            "address" => return Ok(Self::Address),
            "bool" => return Ok(Self::Bool),
            "bytes" => return Ok(Self::Bytes),
            "uint" => return Ok(Self::Uint(256)),
            "int" => return Ok(Self::Int(256)),
            _ => {}
        }
        let (ctor, digits): (fn(u16) -> Self, &str) = if let Some(d) = s.strip_prefix("uint") {
            (Self::Uint, d)
        } else if let Some(d) = s.strip_prefix("int") {
            (Self::Int, d)
        } else if let Some(d) = s.strip_prefix("bytes") {
            if !numeric(d) {
                return Err(unsupported());
            }
            let n: u8 = d.parse().map_err(|_| unsupported())?;
            return if (1..=32).contains(&n) && !d.starts_with('0') {
                Ok(Self::FixedBytes(n))
            } else {
                Err(unsupported())
            };
        } else {
            return Err(unsupported());
        };
        if !numeric(digits) {
            return Err(unsupported());
        }
        let bits: u16 = digits.parse().map_err(|_| unsupported())?;
        if bits == 0 || bits > 256 || bits % 8 != 0 || digits.starts_with('0') {
            return Err(unsupported());
        }
        Ok(ctor(bits))
    }
}

impl FromStr for ValueType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        let nested = |inner: &str| Self::parse_scalar(inner).map(Box::new);
        if let Some(inner) = s.strip_suffix("[CompactBytesArray]") {
            Ok(Self::CompactBytesArray(nested(inner)?))
        } else if let Some(inner) = s.strip_suffix("[]") {
            Ok(Self::Array(nested(inner)?))
        } else {
            Self::parse_scalar(s)
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Address => f.write_str("address"),
            Self::Bool => f.write_str("bool"),
            Self::Bytes => f.write_str("bytes"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::FixedBytes(n) => write!(f, "bytes{n}"),
            Self::Array(inner) => write!(f, "{inner}[]"),
            Self::CompactBytesArray(inner) => write!(f, "{inner}[CompactBytesArray]"),
        }
    }
}

/// Named semantic content tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentTag {
    Number,
    Address,
    String,
    Markdown,
    Url,
    JsonUrl,
    AssetUrl,
    VerifiableUri,
    Keccak256,
    Boolean,
    BitArray,
    Bytes,
    /// `BytesN`
    FixedBytes(u8),
}

impl ContentTag {
    /// The structural type this tag encodes to when the declared `valueType`
    /// cannot carry it directly
    pub fn natural_type(&self) -> ValueType {
        match self {
            Self::Number => ValueType::Uint(256),
            Self::Address => ValueType::Address,
            Self::String | Self::Markdown | Self::Url => ValueType::String,
            Self::JsonUrl | Self::AssetUrl | Self::VerifiableUri | Self::Bytes => ValueType::Bytes,
            Self::Keccak256 | Self::BitArray => ValueType::FixedBytes(32),
            Self::Boolean => ValueType::Bool,
            Self::FixedBytes(n) => ValueType::FixedBytes(*n),
        }
    }

    /// Whether a declared structural type can carry this content as-is
    pub fn accepts(&self, ty: &ValueType) -> bool {
        match (self, ty) {
            (Self::Number, ValueType::Uint(_) | ValueType::Int(_)) => true,
            (Self::Address, ValueType::Address) => true,
            (Self::String | Self::Markdown | Self::Url, ValueType::String) => true,
            (Self::JsonUrl | Self::AssetUrl | Self::VerifiableUri, ValueType::Bytes) => true,
            (
                Self::Keccak256 | Self::BitArray | Self::Bytes | Self::FixedBytes(_),
                ValueType::Bytes | ValueType::FixedBytes(_),
            ) => true,
            (Self::Boolean, ValueType::Bool) => true,
            _ => false,
        }
    }

    /// The structural type actually used for `declared`
    pub fn effective_type(&self, declared: &ValueType) -> ValueType {
        if self.accepts(declared) {
            declared.clone()
        } else {
            self.natural_type()
        }
    }

    /// Whether values carry an embedded hash plus a remote locator
    pub fn is_verifiable_url(&self) -> bool {
        matches!(self, Self::JsonUrl | Self::AssetUrl | Self::VerifiableUri)
    }

    /// Tag name as written in schemas
    pub fn as_str(&self) -> SmolStr {
        match self {
            Self::Number => SmolStr::new_static("Number"),
            Self::Address => SmolStr::new_static("Address"),
            Self::String => SmolStr::new_static("String"),
            Self::Markdown => SmolStr::new_static("Markdown"),
            Self::Url => SmolStr::new_static("URL"),
            Self::JsonUrl => SmolStr::new_static("JSONURL"),
            Self::AssetUrl => SmolStr::new_static("AssetURL"),
            Self::VerifiableUri => SmolStr::new_static("VerifiableURI"),
            Self::Keccak256 => SmolStr::new_static("Keccak256"),
            Self::Boolean => SmolStr::new_static("Boolean"),
            Self::BitArray => SmolStr::new_static("BitArray"),
            Self::Bytes => SmolStr::new_static("Bytes"),
            Self::FixedBytes(n) => format_smolstr!("Bytes{n}"),
        }
    }
}

impl FromStr for ContentTag {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "Number" => Self::Number,
            "Address" => Self::Address,
            "String" => Self::String,
            "Markdown" => Self::Markdown,
            "URL" => Self::Url,
            "JSONURL" => Self::JsonUrl,
            "AssetURL" => Self::AssetUrl,
            "VerifiableURI" => Self::VerifiableUri,
            "Keccak256" => Self::Keccak256,
            "Boolean" => Self::Boolean,
            "BitArray" => Self::BitArray,
            "Bytes" => Self::Bytes,
            other => {
                let n = other
                    .strip_prefix("Bytes")
                    .filter(|d| !d.starts_with('0') && d.bytes().all(|b| b.is_ascii_digit()))
                    .and_then(|d| d.parse::<u8>().ok())
                    .filter(|n| (1..=32).contains(n))
                    .ok_or_else(|| CodecError::UnsupportedValueContent(SmolStr::new(other)))?;
                Self::FixedBytes(n)
            }
        })
    }
}

impl fmt::Display for ContentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// Semantic descriptor of an encoded value, resolved once at schema load
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum ValueContent {
    /// A well-known tag
    Named(ContentTag),
    /// A `0x…` constant the stored value must equal
    Literal(Bytes),
    /// No semantic layer known; values decode structurally.
    ///
    /// Only produced by key resolution when the originating entry cannot be
    /// identified, never parsed from a schema file.
    Unspecified,
}

impl ValueContent {
    /// The named tag, if any
    pub fn tag(&self) -> Option<ContentTag> {
        match self {
            Self::Named(tag) => Some(*tag),
            _ => None,
        }
    }
}

impl FromStr for ValueContent {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        if s.starts_with("0x") {
            let bytes = parse_hex("valueContent literal", s)?;
            Ok(Self::Literal(Bytes::from(bytes)))
        } else {
            s.parse().map(Self::Named)
        }
    }
}

impl fmt::Display for ValueContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(tag) => fmt::Display::fmt(tag, f),
            Self::Literal(bytes) => f.write_str(&hex::encode_prefixed(bytes)),
            Self::Unspecified => f.write_str("??????"),
        }
    }
}
