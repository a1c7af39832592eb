//! # erc725
//!
//! Read, write and interpret ERC725Y key/value data the way the LSP standards
//! lay it out.
//!
//! - [`common`]: value types, descriptors and the structural codec
//! - [`schema`]: LSP2 schemas, key derivation and schema-driven encoding
//! - [`permissions`]: the LSP6 permission bitmask
//! - [`Erc725`]: an async client reading through a [`DataSource`] and, for
//!   remote JSON and assets, a [`ContentFetcher`]
//!
//! ## Example
//!
//! ```rust
//! use erc725::schema::{DecodeInput, EncodeInput, SchemaSet};
//! use erc725::common::Value;
//!
//! let schemas = SchemaSet::builtin();
//! let encoded = schemas
//!     .encode_data(&[EncodeInput::new(
//!         "LSP5ReceivedAssets[]",
//!         Value::from(vec!["0xcafecafecafecafecafecafecafecafecafecafe"]),
//!     )
//!     .build()])
//!     .unwrap();
//! // count cell, then one element
//! assert_eq!(encoded.len(), 2);
//!
//! let decoded = schemas
//!     .decode_data(&[DecodeInput::new("LSP5ReceivedAssets[]", encoded).build()])
//!     .unwrap();
//! assert_eq!(decoded[0].value.as_array().map(|a| a.len()), Some(1));
//! ```

pub mod client;
pub mod error;
pub mod fetch;
pub mod interfaces;
pub mod options;
pub mod source;

pub use erc725_common as common;
pub use erc725_permissions as permissions;
pub use erc725_schema as schema;

pub use client::{DataRequest, Erc725};
pub use error::{BoxError, Error, Result};
pub use fetch::{ContentFetcher, NoFetcher, resolve_url};
pub use interfaces::{INTERFACE_IDS, interface_id};
pub use options::{DEFAULT_IPFS_GATEWAY, Erc725Options};
pub use source::{DataSource, MemoryDataSource};
