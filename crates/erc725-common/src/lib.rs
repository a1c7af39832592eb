//! Common types for ERC725Y schema encoding
//!
//! - [`types`]: `keyType`, `valueType` and `valueContent` descriptors
//! - [`value`]: the typed [`Value`] model shared by encoders and decoders
//! - [`abi`]: the structural value codec
//! - [`hashing`]: hash functions referenced by verifiable URL content

pub use alloy_primitives;
pub use smol_str;

pub mod abi;
pub mod error;
pub mod hashing;
pub mod types;
pub mod value;

pub use abi::{decode_value_type, encode_value_type};
pub use error::{CodecError, Result};
pub use hashing::{HashMethod, hash_json};
pub use types::{ContentTag, KeyType, ValueContent, ValueType, parse_hex};
pub use value::{UrlValue, Value, Verification, parse_address, parse_int, parse_uint};
