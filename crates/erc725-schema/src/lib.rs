//! # LSP2 schemas and schema-driven ERC725Y encoding
//!
//! - [`key`]: key names to 32-byte keys and back
//! - [`schema`]: schema entries, validated on load
//! - [`content`]: the `valueContent` layer of value encoding
//! - [`corpus`]: [`SchemaSet`], the built-in and caller-supplied schemas
//! - [`resolver`]: raw keys back to schema entries
//! - [`encode`] / [`decode`]: named values to `{key, value}` pairs and back
//!
//! ```
//! use erc725_schema::{EncodeInput, SchemaSet};
//!
//! let schemas = SchemaSet::builtin();
//! let encoded = schemas
//!     .encode_data(&[EncodeInput::new("LSP4TokenName", "My Token").build()])
//!     .unwrap();
//! assert_eq!(&encoded[0].value[..], b"My Token");
//! ```

pub mod builtin;
pub mod content;
pub mod corpus;
pub mod decode;
pub mod encode;
pub mod error;
pub mod key;
pub mod resolver;
pub mod schema;

pub use content::{ContentOutcome, decode_value_content, encode_value_content};
pub use corpus::SchemaSet;
pub use decode::{DecodeInput, DecodeValue, DecodedEntry, decode_entry};
pub use encode::{EncodeInput, EncodedEntry, encode_entry};
pub use error::{Result, SchemaError};
pub use key::{
    DynamicKeyPart, DynamicKeyType, KeyShape, decode_mapping_key, encode_array_key,
    encode_dynamic_key_part, encode_key_name, is_dynamic_key_name, parse_key,
};
pub use schema::SchemaEntry;
