//! Typed values produced by decoding and accepted by encoding.

use crate::error::{CodecError, Result};
use crate::hashing::HashMethod;
use crate::types::parse_hex;
use alloy_primitives::{Address, B256, Bytes, I256, U256, hex};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

/// A decoded ERC725Y value, or the input to an encode call.
///
/// Encoders are lenient about input representation (a `String` holding hex is
/// accepted wherever bytes are expected, a decimal `String` wherever a number is
/// expected); decoders always produce the most specific variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Empty (`0x`) or unset data
    Null,
    Bool(bool),
    /// Unsigned number, rendered as a canonical decimal string
    Number(U256),
    /// Signed number, rendered as a canonical decimal string
    Int(I256),
    String(String),
    /// Address, rendered with its EIP-55 checksum
    Address(Address),
    Bytes(Bytes),
    /// Hash-verifiable remote content locator
    Url(UrlValue),
    Array(Vec<Value>),
    /// Remote JSON content retrieved through a verifiable URL
    Json(serde_json::Value),
}

impl Value {
    /// Whether this is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the array payload
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the URL payload
    pub fn as_url(&self) -> Option<&UrlValue> {
        match self {
            Self::Url(url) => Some(url),
            _ => None,
        }
    }

    /// Interpret as an address (typed, or hex text)
    pub fn to_address(&self) -> Option<Address> {
        match self {
            Self::Address(addr) => Some(*addr),
            Self::String(s) => parse_address(s).ok(),
            Self::Bytes(b) if b.len() == 20 => Some(Address::from_slice(b)),
            _ => None,
        }
    }

    /// Interpret as raw bytes (typed, or `0x` hex text)
    pub fn to_bytes(&self) -> Option<Bytes> {
        match self {
            Self::Bytes(b) => Some(b.clone()),
            Self::String(s) if s.starts_with("0x") => {
                hex::decode(&s[2..]).ok().map(Bytes::from)
            }
            Self::Address(addr) => Some(Bytes::copy_from_slice(addr.as_slice())),
            _ => None,
        }
    }

    /// Interpret as an unsigned number
    pub fn to_u256(&self) -> Option<U256> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Int(i) if !i.is_negative() => Some(i.into_raw()),
            Self::String(s) => parse_uint(s).ok(),
            _ => None,
        }
    }

    /// Interpret as a signed number
    pub fn to_i256(&self) -> Option<I256> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Number(n) => I256::try_from(*n).ok(),
            Self::String(s) => parse_int(s).ok(),
            _ => None,
        }
    }

    /// Interpret as a boolean (typed, or `"true"`/`"false"`)
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Short description used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::Address(_) => "address",
            Self::Bytes(_) => "bytes",
            Self::Url(_) => "url",
            Self::Array(_) => "array",
            Self::Json(_) => "json",
        }
    }
}

/// Parse an address. All-lowercase and all-uppercase hex are accepted as-is,
/// mixed case must carry a valid EIP-55 checksum.
pub fn parse_address(input: &str) -> Result<Address> {
    let digits = input
        .strip_prefix("0x")
        .ok_or_else(|| CodecError::invalid_value("address", format!("`{input}` lacks 0x prefix")))?;
    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CodecError::invalid_value(
            "address",
            format!("`{input}` is not 20 bytes of hex"),
        ));
    }
    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        Address::parse_checksummed(input, None).map_err(|_| {
            CodecError::invalid_value("address", format!("`{input}` has an invalid checksum"))
        })
    } else {
        Address::from_str(input)
            .map_err(|e| CodecError::invalid_value("address", format!("`{input}`: {e}")))
    }
}

/// Parse an unsigned number from decimal or `0x` hex text
pub fn parse_uint(input: &str) -> Result<U256> {
    let trimmed = input.trim();
    let parsed = match trimmed.strip_prefix("0x") {
        Some(digits) if !digits.is_empty() => U256::from_str_radix(digits, 16),
        Some(_) => return Ok(U256::ZERO),
        None => U256::from_str_radix(trimmed, 10),
    };
    parsed.map_err(|e| CodecError::invalid_value("number", format!("`{input}`: {e}")))
}

/// Parse a signed number from decimal text, or `0x` hex read as unsigned
pub fn parse_int(input: &str) -> Result<I256> {
    let trimmed = input.trim();
    if trimmed.starts_with("0x") {
        let raw = parse_uint(trimmed)?;
        return I256::try_from(raw)
            .map_err(|_| CodecError::invalid_value("int", format!("`{input}` overflows int256")));
    }
    I256::from_dec_str(trimmed)
        .map_err(|e| CodecError::invalid_value("int", format!("`{input}`: {e}")))
}

/// Locator of remote content together with the hash that authenticates it.
///
/// Decoding always yields `hash_function` and `hash`. For encoding, supply
/// either `hash` (optionally with `hash_function`, default `keccak256(utf8)`)
/// or the `json` document itself, whose hash is computed.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
#[builder(start_fn = new)]
pub struct UrlValue {
    #[builder(start_fn, into)]
    pub url: String,
    pub hash_function: Option<HashMethod>,
    pub hash: Option<B256>,
    pub json: Option<serde_json::Value>,
}

impl UrlValue {
    /// Decoded form: method and hash both known
    pub fn verified(url: impl Into<String>, method: HashMethod, hash: B256) -> Self {
        Self {
            url: url.into(),
            hash_function: Some(method),
            hash: Some(hash),
            json: None,
        }
    }

    /// The `{method, data}` pair, present once both halves are known
    pub fn verification(&self) -> Option<Verification> {
        Some(Verification {
            method: self.hash_function?,
            data: self.hash?,
        })
    }
}

/// How remote content is authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub method: HashMethod,
    pub data: B256,
}

impl Serialize for UrlValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        if let Some(verification) = self.verification() {
            map.serialize_entry("verification", &verification)?;
        }
        if let Some(json) = &self.json {
            map.serialize_entry("json", json)?;
        }
        map.serialize_entry("url", &self.url)?;
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serializer.collect_str(n),
            Self::Int(i) => serializer.collect_str(i),
            Self::String(s) => serializer.serialize_str(s),
            Self::Address(addr) => serializer.serialize_str(&addr.to_checksum(None)),
            Self::Bytes(bytes) => serializer.serialize_str(&hex::encode_prefixed(bytes)),
            Self::Url(url) => url.serialize(serializer),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Json(json) => json.serialize(serializer),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::String(s) => f.write_str(s),
            Self::Address(addr) => f.write_str(&addr.to_checksum(None)),
            Self::Bytes(bytes) => f.write_str(&hex::encode_prefixed(bytes)),
            other => match serde_json::to_string(other) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Number(U256::from(value))
    }
}

impl From<U256> for Value {
    fn from(value: U256) -> Self {
        Self::Number(value)
    }
}

impl From<I256> for Value {
    fn from(value: I256) -> Self {
        Self::Int(value)
    }
}

impl From<Address> for Value {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<B256> for Value {
    fn from(value: B256) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value.as_slice()))
    }
}

impl From<UrlValue> for Value {
    fn from(value: UrlValue) -> Self {
        Self::Url(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = CodecError;

    /// Map plain JSON input onto encoder input. Objects carrying a `url` field
    /// become [`UrlValue`]s; numbers that are not unsigned integers stay text.
    fn try_from(json: serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;
        Ok(match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match n.as_u64() {
                Some(u) => Self::Number(U256::from(u)),
                None => Self::String(n.to_string()),
            },
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_>>()?,
            ),
            Json::Object(mut map) => match map.remove("url") {
                Some(Json::String(url)) => {
                    let hash_function = match map.get("hashFunction") {
                        None | Some(Json::Null) => None,
                        Some(Json::String(s)) => Some(s.parse::<HashMethod>()?),
                        Some(other) => {
                            return Err(CodecError::UnknownHashFunction(SmolStr::new(
                                other.to_string(),
                            )));
                        }
                    };
                    let hash = match map.get("hash") {
                        None | Some(Json::Null) => None,
                        Some(Json::String(s)) => Some(parse_hash(s)?),
                        Some(other) => {
                            return Err(CodecError::invalid_hex(
                                "hash",
                                format!("expected a hex string, got {other}"),
                            ));
                        }
                    };
                    Self::Url(UrlValue {
                        url,
                        hash_function,
                        hash,
                        json: map.remove("json"),
                    })
                }
                Some(other) => {
                    map.insert("url".into(), other);
                    Self::Json(Json::Object(map))
                }
                None => Self::Json(Json::Object(map)),
            },
        })
    }
}

fn parse_hash(input: &str) -> Result<B256> {
    let bytes = parse_hex("hash", input)?;
    B256::try_from(bytes.as_slice()).map_err(|_| {
        CodecError::invalid_hex(
            "hash",
            format!("`{input}`: expected 32 bytes, got {}", bytes.len()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn address_parsing_rules() {
        let lower = "0xcafecafecafecafecafecafecafecafecafecafe";
        assert!(parse_address(lower).is_ok());
        assert!(parse_address(&lower.to_uppercase().replacen("0X", "0x", 1)).is_ok());

        let checksummed = address!("0xcafecafecafecafecafecafecafecafecafecafe").to_checksum(None);
        assert_eq!(parse_address(&checksummed).unwrap().to_checksum(None), checksummed);

        // flip the case of one letter to break the checksum
        let broken: String = checksummed
            .char_indices()
            .map(|(i, c)| {
                if i == 2 {
                    if c.is_ascii_uppercase() {
                        c.to_ascii_lowercase()
                    } else {
                        c.to_ascii_uppercase()
                    }
                } else {
                    c
                }
            })
            .collect();
        assert!(parse_address(&broken).is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("cafecafecafecafecafecafecafecafecafecafe").is_err());
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_uint("42").unwrap(), U256::from(42u64));
        assert_eq!(parse_uint("0x2a").unwrap(), U256::from(42u64));
        assert!(parse_uint("-1").is_err());
        assert_eq!(parse_int("-5").unwrap(), I256::try_from(-5i64).unwrap());
    }

    #[test]
    fn serializes_to_json_shapes() {
        let value = Value::Array(vec![
            Value::Null,
            Value::Number(U256::from(1_000_000u64)),
            Value::Bytes(Bytes::from(vec![0xab, 0xcd])),
            Value::Url(UrlValue::verified(
                "ipfs://QmTest",
                HashMethod::Keccak256Utf8,
                B256::ZERO,
            )),
        ]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                null,
                "1000000",
                "0xabcd",
                {
                    "verification": {
                        "method": "keccak256(utf8)",
                        "data": "0x0000000000000000000000000000000000000000000000000000000000000000"
                    },
                    "url": "ipfs://QmTest"
                }
            ])
        );
    }

    #[test]
    fn json_input_with_url() {
        let value = Value::try_from(serde_json::json!({
            "url": "ifps://QmYr1VJLwerg6pEoscdhVGugo39pa6rycEZLjtRPDfW84UAx",
            "json": {"LSP3Profile": {"name": "alice"}}
        }))
        .unwrap();
        let url = value.as_url().expect("url object");
        assert!(url.json.is_some());
        assert!(url.hash.is_none());

        let hashed = Value::try_from(serde_json::json!({
            "url": "ipfs://x",
            "hashFunction": "keccak256(bytes)",
            "hash": format!("0x{}", "01".repeat(32))
        }))
        .unwrap();
        let url = hashed.as_url().unwrap();
        assert_eq!(url.hash_function, Some(HashMethod::Keccak256Bytes));
        assert_eq!(url.hash, Some(B256::repeat_byte(1)));
    }

    #[test]
    fn json_input_rejects_bad_url_fields() {
        let hash = format!("0x{}", "01".repeat(32));
        let unknown = Value::try_from(serde_json::json!({
            "url": "ipfs://x",
            "hashFunction": "sha256",
            "hash": hash
        }));
        assert!(matches!(
            unknown,
            Err(CodecError::UnknownHashFunction(ref name)) if name == "sha256"
        ));

        for bad in [serde_json::json!("0xzz"), serde_json::json!("0x0101"), serde_json::json!(7)] {
            let input = serde_json::json!({"url": "ipfs://x", "hash": bad});
            let err = Value::try_from(input).unwrap_err();
            assert!(
                matches!(err, CodecError::InvalidHex { ref field, .. } if field == "hash"),
                "{err}"
            );
        }

        // nested inputs fail the same way
        let nested = serde_json::json!([{"url": "ipfs://x", "hashFunction": 1}]);
        assert!(Value::try_from(nested).is_err());
    }
}
