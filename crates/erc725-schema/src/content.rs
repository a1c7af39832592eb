//! Semantic value codec, layered over the structural one.
//!
//! Every named tag has a structural type it naturally encodes to. When the schema
//! declares a different `valueType`, the tag's transform runs first and the
//! structural codec of the effective type second. Array types apply the tag
//! element-wise.

use alloy_primitives::{B256, Bytes, FixedBytes};
use erc725_common::{
    CodecError, ContentTag, HashMethod, Result, UrlValue, Value, ValueContent, ValueType,
    decode_value_type, encode_value_type, hash_json, parse_address,
};

/// Result of a content transform. A literal `valueContent` that the data does not
/// match is not an error: resolution uses it to move on to the next candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOutcome<T> {
    Matched(T),
    LiteralMismatch,
}

impl<T> ContentOutcome<T> {
    /// The matched value, if any
    pub fn matched(self) -> Option<T> {
        match self {
            Self::Matched(value) => Some(value),
            Self::LiteralMismatch => None,
        }
    }

    /// Whether this is the literal mismatch sentinel
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::LiteralMismatch)
    }
}

/// Encode `value` according to its content tag and declared structural type
pub fn encode_value_content(
    content: &ValueContent,
    declared: &ValueType,
    value: &Value,
) -> Result<ContentOutcome<Bytes>> {
    let tag = match content {
        ValueContent::Named(tag) => *tag,
        ValueContent::Unspecified => {
            return encode_value_type(declared, value).map(ContentOutcome::Matched);
        }
        ValueContent::Literal(expected) => {
            if value.is_null() {
                return Ok(ContentOutcome::Matched(Bytes::new()));
            }
            return Ok(match value.to_bytes() {
                Some(bytes) if bytes == *expected => ContentOutcome::Matched(bytes),
                _ => ContentOutcome::LiteralMismatch,
            });
        }
    };

    let bytes = match declared.element() {
        Some(element) => {
            let items = value.as_array().ok_or_else(|| {
                CodecError::invalid_value(
                    declared.to_string(),
                    format!("expected an array, got {}", value.kind()),
                )
            })?;
            let element_type = tag.effective_type(element);
            let structural = items
                .iter()
                .map(|item| to_structural(tag, &element_type, item))
                .collect::<Result<Vec<_>>>()?;
            let declared = match declared {
                ValueType::Array(_) => ValueType::Array(Box::new(element_type)),
                _ => ValueType::CompactBytesArray(Box::new(element_type)),
            };
            encode_value_type(&declared, &Value::Array(structural))?
        }
        None => {
            let effective = tag.effective_type(declared);
            encode_value_type(&effective, &to_structural(tag, &effective, value)?)?
        }
    };
    Ok(ContentOutcome::Matched(bytes))
}

/// Decode `data` according to its content tag and declared structural type.
///
/// Empty data decodes to [`Value::Null`] for every tag.
pub fn decode_value_content(
    content: &ValueContent,
    declared: &ValueType,
    data: &[u8],
) -> Result<ContentOutcome<Value>> {
    if data.is_empty() {
        return Ok(ContentOutcome::Matched(Value::Null));
    }
    let tag = match content {
        ValueContent::Named(tag) => *tag,
        ValueContent::Unspecified => {
            return decode_value_type(declared, data).map(ContentOutcome::Matched);
        }
        ValueContent::Literal(expected) => {
            return Ok(if data == &expected[..] {
                ContentOutcome::Matched(Value::Bytes(Bytes::copy_from_slice(data)))
            } else {
                ContentOutcome::LiteralMismatch
            });
        }
    };

    let value = match declared.element() {
        Some(element) => {
            let element_type = tag.effective_type(element);
            let declared = match declared {
                ValueType::Array(_) => ValueType::Array(Box::new(element_type.clone())),
                _ => ValueType::CompactBytesArray(Box::new(element_type.clone())),
            };
            match decode_value_type(&declared, data)? {
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| from_structural(tag, item))
                        .collect::<Result<_>>()?,
                ),
                other => other,
            }
        }
        None => {
            let effective = tag.effective_type(declared);
            from_structural(tag, decode_value_type(&effective, data)?)?
        }
    };
    Ok(ContentOutcome::Matched(value))
}

/// Map caller input onto the structural value the tag stores
fn to_structural(tag: ContentTag, ty: &ValueType, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let invalid = |what: &str| {
        CodecError::invalid_value(tag.as_str(), format!("expected {what}, got {}", value.kind()))
    };
    match tag {
        ContentTag::Number => match ty {
            ValueType::Int(_) => value.to_i256().map(Value::Int).ok_or_else(|| invalid("a number")),
            _ => value.to_u256().map(Value::Number).ok_or_else(|| invalid("a number")),
        },
        ContentTag::Address => match value {
            Value::Address(addr) => Ok(Value::Address(*addr)),
            Value::String(s) => parse_address(s).map(Value::Address),
            _ => Err(invalid("an address")),
        },
        ContentTag::String | ContentTag::Markdown | ContentTag::Url => match value {
            Value::String(s) => Ok(Value::String(s.clone())),
            _ => Err(invalid("a string")),
        },
        ContentTag::JsonUrl | ContentTag::AssetUrl => match value {
            Value::Url(url) => encode_url(url, false).map(Value::Bytes),
            other => other.to_bytes().map(Value::Bytes).ok_or_else(|| invalid("a URL value")),
        },
        ContentTag::VerifiableUri => match value {
            Value::Url(url) => encode_url(url, true).map(Value::Bytes),
            other => other.to_bytes().map(Value::Bytes).ok_or_else(|| invalid("a URL value")),
        },
        ContentTag::Boolean => value.to_bool().map(Value::Bool).ok_or_else(|| invalid("a boolean")),
        ContentTag::Keccak256
        | ContentTag::BitArray
        | ContentTag::Bytes
        | ContentTag::FixedBytes(_) => {
            value.to_bytes().map(Value::Bytes).ok_or_else(|| invalid("hex bytes"))
        }
    }
}

/// Map a structurally decoded value onto the tag's semantic value
fn from_structural(tag: ContentTag, value: Value) -> Result<Value> {
    match (tag, value) {
        (_, Value::Null) => Ok(Value::Null),
        (
            ContentTag::JsonUrl | ContentTag::AssetUrl | ContentTag::VerifiableUri,
            Value::Bytes(bytes),
        ) => decode_url(tag, &bytes).map(Value::Url),
        (_, value) => Ok(value),
    }
}

fn encode_url(url: &UrlValue, verifiable: bool) -> Result<Bytes> {
    let (method, hash) = match (&url.json, url.hash_function, url.hash) {
        (Some(_), Some(_), _) => {
            return Err(CodecError::InvalidUrlContent(
                "a hash function cannot be combined with json, the json hash is keccak256(utf8)"
                    .into(),
            ));
        }
        (Some(_), _, Some(_)) => {
            return Err(CodecError::InvalidUrlContent(
                "supply either a hash or json, not both".into(),
            ));
        }
        (Some(json), None, None) => (HashMethod::Keccak256Utf8, hash_json(json)?),
        (None, method, Some(hash)) => (method.unwrap_or(HashMethod::Keccak256Utf8), hash),
        (None, _, None) => {
            return Err(CodecError::InvalidUrlContent(
                "either a hash or json is required".into(),
            ));
        }
    };

    let mut out = Vec::with_capacity(40 + url.url.len());
    if verifiable {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(method.sig().as_slice());
        out.extend_from_slice(&(B256::len_bytes() as u16).to_be_bytes());
    } else {
        out.extend_from_slice(method.sig().as_slice());
    }
    out.extend_from_slice(hash.as_slice());
    out.extend_from_slice(url.url.as_bytes());
    Ok(out.into())
}

fn decode_url(tag: ContentTag, data: &[u8]) -> Result<UrlValue> {
    let malformed = |reason: &str| CodecError::malformed(tag.as_str(), reason);
    let (sig, hash, rest) = if data.starts_with(&[0, 0]) {
        let header = data.get(2..8).ok_or_else(|| malformed("truncated header"))?;
        let len = usize::from(u16::from_be_bytes([header[4], header[5]]));
        if len != B256::len_bytes() {
            return Err(malformed("only 32-byte verification data is supported"));
        }
        let hash = data.get(8..8 + len).ok_or_else(|| malformed("truncated hash"))?;
        (&header[..4], hash, &data[8 + len..])
    } else if data.len() >= 36 {
        (&data[..4], &data[4..36], &data[36..])
    } else {
        return Err(malformed("shorter than signature and hash"));
    };
    let url = std::str::from_utf8(rest).map_err(|e| malformed(&e.to_string()))?;
    Ok(UrlValue::verified(
        url,
        HashMethod::from_sig(FixedBytes::from_slice(sig)),
        B256::from_slice(hash),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{I256, address, hex, keccak256};

    fn content(s: &str) -> ValueContent {
        s.parse().unwrap()
    }

    fn ty(s: &str) -> ValueType {
        s.parse().unwrap()
    }

    fn encode(c: &str, t: &str, v: &Value) -> Bytes {
        encode_value_content(&content(c), &ty(t), v).unwrap().matched().unwrap()
    }

    fn decode(c: &str, t: &str, data: &[u8]) -> Value {
        decode_value_content(&content(c), &ty(t), data).unwrap().matched().unwrap()
    }

    #[test]
    fn number_is_padded_and_decimal() {
        let encoded = encode("Number", "uint256", &Value::from("255"));
        assert_eq!(encoded.len(), 32);
        assert_eq!(encoded[31], 0xff);
        let decoded = decode("Number", "uint256", &encoded);
        assert_eq!(serde_json::to_value(&decoded).unwrap(), serde_json::json!("255"));
    }

    #[test]
    fn number_composes_with_declared_bytes() {
        // declared `bytes` cannot carry a Number, so uint256 is used
        let encoded = encode("Number", "bytes", &Value::from(1u64));
        assert_eq!(encoded.len(), 32);
        assert_eq!(decode("Number", "bytes", &encoded), Value::from(1u64));
    }

    #[test]
    fn address_decodes_checksummed() {
        let lower = "0xcafecafecafecafecafecafecafecafecafecafe";
        let encoded = encode("Address", "address", &Value::from(lower));
        assert_eq!(hex::encode_prefixed(&encoded), lower);
        let decoded = decode("Address", "address", &encoded);
        let json = serde_json::to_value(&decoded).unwrap();
        assert_eq!(json.as_str().unwrap().to_lowercase(), lower);
        assert_ne!(json.as_str().unwrap(), lower);
    }

    #[test]
    fn strings_are_byte_exact() {
        let value = Value::from("# Héllo\n");
        let encoded = encode("Markdown", "string", &value);
        assert_eq!(&encoded[..], "# Héllo\n".as_bytes());
        assert_eq!(decode("Markdown", "string", &encoded), value);
    }

    #[test]
    fn jsonurl_from_json() {
        let json = serde_json::json!({"LSP3Profile": {"name": "alice", "description": ""}});
        let url = UrlValue::new("ipfs://QmProfile").json(json.clone()).build();
        let encoded = encode("JSONURL", "bytes", &Value::Url(url));
        let hash = keccak256(serde_json::to_string(&json).unwrap().as_bytes());
        assert_eq!(&encoded[..4], &hex!("6f357c6a"));
        assert_eq!(&encoded[4..36], hash.as_slice());
        assert_eq!(&encoded[36..], b"ipfs://QmProfile");

        let Value::Url(decoded) = decode("JSONURL", "bytes", &encoded) else {
            panic!("expected a URL value");
        };
        assert_eq!(decoded.url, "ipfs://QmProfile");
        let verification = decoded.verification().unwrap();
        assert_eq!(verification.method, HashMethod::Keccak256Utf8);
        assert_eq!(verification.data, hash);
    }

    #[test]
    fn url_input_rules() {
        let both = UrlValue::new("ipfs://x")
            .hash_function(HashMethod::Keccak256Bytes)
            .json(serde_json::json!({}))
            .build();
        let hash_and_json = UrlValue::new("ipfs://x")
            .hash(B256::ZERO)
            .json(serde_json::json!({}))
            .build();
        let neither = UrlValue::new("ipfs://x").build();
        for url in [both, hash_and_json, neither] {
            assert!(
                encode_value_content(&content("JSONURL"), &ty("bytes"), &Value::Url(url)).is_err()
            );
        }

        let bytes_hash = UrlValue::new("ipfs://x")
            .hash_function(HashMethod::Keccak256Bytes)
            .hash(B256::repeat_byte(1))
            .build();
        let encoded = encode("AssetURL", "bytes", &Value::Url(bytes_hash.clone()));
        assert_eq!(&encoded[..4], &hex!("8019f9b1"));
        assert_eq!(decode("AssetURL", "bytes", &encoded), Value::Url(bytes_hash));
    }

    #[test]
    fn verifiable_uri_framing() {
        let url =
            UrlValue::verified("ipfs://QmAsset", HashMethod::Keccak256Utf8, B256::repeat_byte(7));
        let encoded = encode("VerifiableURI", "bytes", &Value::Url(url.clone()));
        assert_eq!(&encoded[..8], &hex!("00006f357c6a0020"));
        assert_eq!(decode("VerifiableURI", "bytes", &encoded), Value::Url(url.clone()));
        // JSONURL also reads the framed form
        assert_eq!(decode("JSONURL", "bytes", &encoded), Value::Url(url));
        let truncated =
            decode_value_content(&content("VerifiableURI"), &ty("bytes"), &hex!("0000"));
        assert!(truncated.is_err());
    }

    #[test]
    fn literal_content() {
        let literal = content("0xabe425d6");
        let ok = encode_value_content(&literal, &ty("bytes4"), &Value::from("0xabe425d6")).unwrap();
        assert_eq!(ok, ContentOutcome::Matched(Bytes::from(hex!("abe425d6"))));
        let mismatch =
            encode_value_content(&literal, &ty("bytes4"), &Value::from("0x00000000")).unwrap();
        assert!(mismatch.is_mismatch());
        assert!(
            decode_value_content(&literal, &ty("bytes4"), &hex!("deadbeef"))
                .unwrap()
                .is_mismatch()
        );
    }

    #[test]
    fn array_content_is_element_wise() {
        let value = Value::Array(vec![
            Value::from("0xcafecafecafecafecafecafecafecafecafecafe"),
            Value::from("0xdeaddeaddeaddeaddeaddeaddeaddeaddeaddead"),
        ]);
        let encoded = encode("Address", "address[]", &value);
        let Value::Array(decoded) = decode("Address", "address[]", &encoded) else {
            panic!("expected an array");
        };
        assert_eq!(decoded.len(), 2);
        assert!(matches!(decoded[0], Value::Address(_)));

        let numbers = Value::Array(vec![Value::from(1u64), Value::from(65_535u64)]);
        let encoded = encode("Number", "uint16[CompactBytesArray]", &numbers);
        assert_eq!(&encoded[..], &hex!("000200010002ffff"));
        assert_eq!(decode("Number", "uint16[CompactBytesArray]", &encoded), numbers);
    }

    #[test]
    fn decode_inverts_encode() {
        let int = |n: i64| Value::Int(I256::try_from(n).unwrap());
        let strings = Value::from(vec!["alpha", "beta", "gamma"]);
        let url = Value::Url(UrlValue::verified(
            "ipfs://QmX",
            HashMethod::Keccak256Bytes,
            B256::repeat_byte(9),
        ));
        let address = Value::Address(address!("0xcafecafecafecafecafecafecafecafecafecafe"));
        let cases = [
            ("String", "string", Value::from("hello")),
            ("URL", "string", Value::from("https://example.com/a?b=c")),
            ("Markdown", "string", Value::from("*bold*")),
            ("Keccak256", "bytes32", Value::from(keccak256("x"))),
            ("Boolean", "bool", Value::Bool(true)),
            ("Boolean", "bool", Value::Bool(false)),
            ("BitArray", "bytes32", Value::from(B256::with_last_byte(0x05))),
            ("Bytes", "bytes", Value::Bytes(Bytes::from(hex!("0102ff")))),
            ("Bytes4", "bytes4", Value::Bytes(Bytes::from(hex!("abe425d6")))),
            ("Number", "uint8", Value::from(255u64)),
            ("Number", "uint128", Value::from(u64::MAX)),
            ("Number", "int8", int(-128)),
            ("Number", "int16", int(-2)),
            ("Number", "int32", int(7)),
            ("Number", "int256", int(i64::MIN)),
            ("Address", "address", address),
            ("String", "string[CompactBytesArray]", strings.clone()),
            ("String", "string[]", strings),
            ("Number", "uint256[]", Value::from(vec![0u64, 1, 1 << 40])),
            ("JSONURL", "bytes", url.clone()),
            ("AssetURL", "bytes", url.clone()),
            ("VerifiableURI", "bytes", url),
        ];
        for (tag, t, value) in cases {
            let encoded = encode(tag, t, &value);
            assert_eq!(decode(tag, t, &encoded), value, "{tag} as {t}");
        }
    }

    #[test]
    fn empty_is_null() {
        for (c, t) in [("JSONURL", "bytes"), ("Number", "uint256"), ("0xabe425d6", "bytes4")] {
            assert_eq!(decode(c, t, &[]), Value::Null, "{c}");
        }
    }
}
