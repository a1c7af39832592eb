//! Error type for client operations

use alloy_primitives::B256;
use erc725_common::CodecError;
use erc725_permissions::PermissionError;
use erc725_schema::SchemaError;
use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Boxed error returned by collaborator implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by [`crate::Erc725`] and its collaborators
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Permission(#[from] PermissionError),

    /// The data source failed to answer
    #[error("Data source error: {0}")]
    #[diagnostic(code(erc725::data_source))]
    DataSource(#[source] BoxError),

    /// A data source answered with the wrong number of values
    #[error("Data source returned {got} values for {expected} keys")]
    #[diagnostic(code(erc725::data_source_len))]
    DataSourceLength { expected: usize, got: usize },

    /// Remote content could not be retrieved
    #[error("Failed to fetch `{url}`")]
    #[diagnostic(code(erc725::fetch))]
    Fetch {
        url: String,
        #[source]
        source: BoxError,
    },

    /// A stored URL that cannot be turned into a fetchable address
    #[error("Invalid content URL `{url}`: {source}")]
    #[diagnostic(code(erc725::invalid_url))]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// No content fetcher was configured
    #[error("Cannot fetch `{0}`: no content fetcher configured")]
    #[diagnostic(
        code(erc725::no_fetcher),
        help("Attach one with Erc725::with_fetcher, e.g. a reqwest::Client with the `reqwest-client` feature")
    )]
    NoFetcher(String),

    /// Fetched content does not match the hash stored on chain
    #[error("Content at `{url}` does not match its {method} hash {expected}")]
    #[diagnostic(code(erc725::verification_failed))]
    Verification {
        url: String,
        method: SmolStr,
        expected: B256,
    },

    /// Fetched content that should be JSON is not
    #[error("Content at `{url}` is not valid JSON")]
    #[diagnostic(code(erc725::invalid_json))]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// An interface name outside the registry
    #[error("Unknown interface `{0}`")]
    #[diagnostic(
        code(erc725::unknown_interface),
        help("Use a registry name such as LSP0ERC725Account or a 4-byte id like 0x24871b3d")
    )]
    UnknownInterface(SmolStr),
}

impl Error {
    /// Wrap a data source failure
    pub fn data_source(source: impl Into<BoxError>) -> Self {
        Self::DataSource(source.into())
    }

    /// Wrap a content fetch failure
    pub fn fetch(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Fetch {
            url: url.into(),
            source: source.into(),
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;
