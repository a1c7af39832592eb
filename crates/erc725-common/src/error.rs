//! Error types for the structural and semantic value codecs

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while parsing descriptors or transforming values
#[derive(Debug, Error, Diagnostic)]
pub enum CodecError {
    /// A `valueType` string that is not part of the supported set
    #[error("Unsupported value type `{0}`")]
    #[diagnostic(
        code(erc725::unsupported_value_type),
        help("Supported: string, address, bool, bytes, bytesN, uintN, intN, T[] and T[CompactBytesArray]")
    )]
    UnsupportedValueType(SmolStr),

    /// A `valueContent` tag that is neither a known name nor a `0x` literal
    #[error("Unsupported value content `{0}`")]
    #[diagnostic(code(erc725::unsupported_value_content))]
    UnsupportedValueContent(SmolStr),

    /// Hex input that could not be parsed
    #[error("Invalid hex for {field}: {message}")]
    #[diagnostic(code(erc725::invalid_hex))]
    InvalidHex {
        /// What the hex string was supposed to be
        field: SmolStr,
        /// Why parsing failed
        message: String,
    },

    /// A value that cannot be encoded as the requested type or content
    #[error("Invalid value for `{ty}`: {reason}")]
    #[diagnostic(code(erc725::invalid_value))]
    InvalidValue {
        /// Type or content tag the value was encoded against
        ty: SmolStr,
        /// Description of the problem
        reason: String,
    },

    /// Encoded bytes that do not decode as the requested type or content
    #[error("Malformed `{ty}` data: {reason}")]
    #[diagnostic(code(erc725::malformed_data))]
    MalformedData {
        /// Type or content tag used to decode
        ty: SmolStr,
        /// Description of the problem
        reason: String,
    },

    /// A hash function name or signature missing from the registry
    #[error("Unknown hash function `{0}`")]
    #[diagnostic(
        code(erc725::unknown_hash_function),
        help("Known hash functions: keccak256(utf8) (0x6f357c6a), keccak256(bytes) (0x8019f9b1)")
    )]
    UnknownHashFunction(SmolStr),

    /// Inconsistent input for JSONURL / AssetURL / VerifiableURI encoding
    #[error("Invalid URL content: {0}")]
    #[diagnostic(code(erc725::invalid_url_content))]
    InvalidUrlContent(String),
}

impl CodecError {
    /// Create an invalid hex error
    pub fn invalid_hex(field: impl Into<SmolStr>, message: impl Into<String>) -> Self {
        Self::InvalidHex {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(ty: impl Into<SmolStr>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            ty: ty.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed data error
    pub fn malformed(ty: impl Into<SmolStr>, reason: impl Into<String>) -> Self {
        Self::MalformedData {
            ty: ty.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;
