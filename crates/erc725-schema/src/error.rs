use erc725_common::CodecError;
use miette::{Diagnostic, SourceSpan};
use smol_str::SmolStr;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading schemas, deriving keys or encoding/decoding data
#[derive(Debug, Error, Diagnostic)]
pub enum SchemaError {
    /// IO error when reading schema files
    #[error("IO error: {0}")]
    #[diagnostic(code(erc725::schema::io))]
    Io(#[from] io::Error),

    /// Failed to parse schema JSON
    #[error("Failed to parse schema JSON in {}", path.display())]
    #[diagnostic(
        code(erc725::schema::parse_error),
        help("A schema file holds a JSON array of {{name, key, keyType, valueType, valueContent}} objects")
    )]
    ParseError {
        #[source]
        source: serde_json::Error,
        /// Path to the file that failed to parse
        path: PathBuf,
        /// Source text that failed to parse
        #[source_code]
        src: Option<String>,
        /// Location of the error in the source
        #[label("parse error here")]
        span: Option<SourceSpan>,
    },

    /// A schema entry that failed load-time validation
    #[error("Invalid schema `{name}`: {message}")]
    #[diagnostic(code(erc725::schema::invalid))]
    InvalidSchema {
        /// Name of the offending entry
        name: SmolStr,
        /// What is wrong with it
        message: String,
    },

    /// The declared key does not match the key derived from the name
    #[error("Schema `{name}` declares key {declared} but its name derives {derived}")]
    #[diagnostic(
        code(erc725::schema::key_mismatch),
        help("The key of a non-dynamic schema must equal the key derived from its name")
    )]
    KeyMismatch {
        /// Name of the offending entry
        name: SmolStr,
        /// Key written in the schema
        declared: String,
        /// Key derived from the name
        derived: String,
    },

    /// A key name whose shape maps to no derivation rule
    #[error("Unsupported key name `{name}`: {reason}")]
    #[diagnostic(
        code(erc725::schema::unsupported_key_name),
        help("Key names are `Name`, `Name[]`, `First:Second` or `First:Second:Third`")
    )]
    UnsupportedKeyName {
        /// The key name
        name: SmolStr,
        /// Why it was rejected
        reason: String,
    },

    /// No schema matches a name or key
    #[error("No schema found for `{0}`")]
    #[diagnostic(code(erc725::schema::unknown))]
    UnknownSchema(SmolStr),

    /// Wrong number of dynamic key parts for a template
    #[error("Key name `{name}` has {expected} dynamic parts, {given} given")]
    #[diagnostic(code(erc725::schema::dynamic_part_count))]
    DynamicPartCount {
        /// The key name template
        name: SmolStr,
        /// Placeholders in the template
        expected: usize,
        /// Values supplied
        given: usize,
    },

    /// A dynamic key part that cannot be encoded or decoded
    #[error("Invalid dynamic key part `<{kind}>`: {reason}")]
    #[diagnostic(code(erc725::schema::dynamic_part))]
    InvalidDynamicPart {
        /// Placeholder type
        kind: SmolStr,
        /// Description of the problem
        reason: String,
    },

    /// A `<string>` placeholder read back from a key
    #[error("Cannot decode `<string>` part of `{name}`: the key only holds its hash")]
    #[diagnostic(
        code(erc725::schema::non_invertible),
        help("String placeholders are hashed when encoding and cannot be recovered from a key")
    )]
    NonInvertiblePart {
        /// The key name template
        name: SmolStr,
    },

    /// A key that is not 32 bytes of hex
    #[error("Invalid key `{key}`: {reason}")]
    #[diagnostic(code(erc725::schema::invalid_key))]
    InvalidKey {
        /// The key as given
        key: String,
        /// Description of the problem
        reason: String,
    },

    /// Out-of-range array encoding parameters
    #[error("Invalid array range for `{name}`: {reason}")]
    #[diagnostic(
        code(erc725::schema::array_range),
        help("startingIndex must be non-negative and startingIndex + value length must not exceed totalArrayLength")
    )]
    ArrayRange {
        /// Schema name
        name: SmolStr,
        /// Description of the problem
        reason: String,
    },

    /// Input that does not fit the entry's key type
    #[error("Invalid input for `{name}`: {reason}")]
    #[diagnostic(code(erc725::schema::invalid_input))]
    InvalidInput {
        /// Schema name
        name: SmolStr,
        /// Description of the problem
        reason: String,
    },

    /// A value that differs from the literal `valueContent` of its schema
    #[error("Value of `{name}` does not match literal content {expected}")]
    #[diagnostic(code(erc725::schema::literal_mismatch))]
    LiteralMismatch {
        /// Schema name
        name: SmolStr,
        /// The literal the schema requires
        expected: String,
    },

    /// Value codec failure
    #[error(transparent)]
    #[diagnostic(transparent)]
    Codec(#[from] CodecError),
}

impl SchemaError {
    /// Create a parse error with source text, pointing at the failing position
    pub fn parse_error_with_source(
        source: serde_json::Error,
        path: impl Into<PathBuf>,
        src: String,
    ) -> Self {
        let span = source.line().checked_sub(1).map(|line| {
            let line_start: usize = src.split_inclusive('\n').take(line).map(str::len).sum();
            let offset = (line_start + source.column().saturating_sub(1)).min(src.len());
            SourceSpan::from((offset, 1))
        });

        Self::ParseError {
            source,
            path: path.into(),
            src: Some(src),
            span,
        }
    }

    /// Create an invalid schema error
    pub fn invalid_schema(name: impl Into<SmolStr>, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported key name error
    pub fn unsupported_key_name(name: impl Into<SmolStr>, reason: impl Into<String>) -> Self {
        Self::UnsupportedKeyName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid dynamic part error
    pub fn invalid_dynamic_part(kind: impl Into<SmolStr>, reason: impl Into<String>) -> Self {
        Self::InvalidDynamicPart {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid key error
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an array range error
    pub fn array_range(name: impl Into<SmolStr>, reason: impl Into<String>) -> Self {
        Self::ArrayRange {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(name: impl Into<SmolStr>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;
