//! Schema-driven decoding of `{key, value}` pairs into named values

use crate::content::{ContentOutcome, decode_value_content};
use crate::corpus::SchemaSet;
use crate::encode::{COUNT_TYPE, EncodedEntry};
use crate::error::{Result, SchemaError};
use crate::key::encode_array_key;
use crate::schema::SchemaEntry;
use alloy_primitives::{B256, Bytes};
use erc725_common::{CodecError, KeyType, Value, decode_value_type};
use serde::Serialize;
use smol_str::SmolStr;
use std::collections::HashMap;

/// Longest array a count cell may announce.
///
/// The count is read from untrusted storage and sizes the element key list
/// before any element is fetched. Larger counts are rejected as malformed so a
/// hostile cell cannot make a reader allocate or request billions of keys.
pub const MAX_ARRAY_LENGTH: u128 = 65_536;

/// A decoded value together with the key it was read from and its schema name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedEntry {
    pub key: B256,
    pub name: SmolStr,
    pub value: Value,
}

/// Stored data handed to the decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeValue {
    /// The raw value of the entry's own key
    Raw(Bytes),
    /// Every fetched `{key, value}` pair; arrays pick their count and element
    /// keys from it
    Entries(Vec<EncodedEntry>),
}

impl From<Bytes> for DecodeValue {
    fn from(value: Bytes) -> Self {
        Self::Raw(value)
    }
}

impl From<Vec<EncodedEntry>> for DecodeValue {
    fn from(entries: Vec<EncodedEntry>) -> Self {
        Self::Entries(entries)
    }
}

/// Stored data to decode, addressed like [`crate::EncodeInput`]
#[derive(Debug, Clone, PartialEq, bon::Builder)]
#[builder(start_fn = new)]
pub struct DecodeInput {
    #[builder(start_fn, into)]
    pub key_name: SmolStr,
    #[builder(start_fn, into)]
    pub value: DecodeValue,
    #[builder(default)]
    pub dynamic_key_parts: Vec<Value>,
}

impl SchemaSet {
    /// Decode several inputs, in order
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(count = inputs.len())))]
    pub fn decode_data(&self, inputs: &[DecodeInput]) -> Result<Vec<DecodedEntry>> {
        inputs
            .iter()
            .map(|input| {
                let entry = self.lookup(&input.key_name, &input.dynamic_key_parts)?;
                decode_entry(&entry, &input.value)
            })
            .collect()
    }

    /// Decode raw pairs whose schema is unknown to the caller.
    ///
    /// Every key goes through resolution and the first candidate whose content
    /// matches wins. Keys no schema describes or decodes are skipped, as are
    /// element keys of an array whose count key is part of the same batch.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(count = entries.len())))]
    pub fn decode_entries(&self, entries: &[EncodedEntry]) -> Result<Vec<DecodedEntry>> {
        let arrays: Vec<B256> = entries
            .iter()
            .filter(|e| self.get_by_key(&e.key).is_some_and(|s| s.key_type == KeyType::Array))
            .map(|e| e.key)
            .collect();

        let mut out = Vec::new();
        'entries: for raw in entries {
            let is_element = arrays
                .iter()
                .any(|base| base[..16] == raw.key[..16] && *base != raw.key);
            if is_element {
                continue;
            }
            for candidate in self.candidates(&raw.key) {
                let decoded = if candidate.key_type == KeyType::Array {
                    decode_array(&candidate, entries).map(Some)
                } else {
                    let (content, ty) = (&candidate.value_content, &candidate.value_type);
                    decode_value_content(content, ty, &raw.value)
                        .map(ContentOutcome::matched)
                        .map_err(SchemaError::from)
                };
                match decoded {
                    Ok(Some(value)) => {
                        out.push(DecodedEntry {
                            key: raw.key,
                            name: candidate.name,
                            value,
                        });
                        continue 'entries;
                    }
                    Ok(None) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(schema = %candidate.name, "literal content mismatch, trying next schema");
                    }
                    Err(_error) => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(schema = %candidate.name, error = %_error, "undecodable value, trying next schema");
                    }
                }
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(key = %raw.key, "skipping key without a matching schema");
        }
        Ok(out)
    }
}

/// Decode stored data against an already resolved entry
pub fn decode_entry(entry: &SchemaEntry, value: &DecodeValue) -> Result<DecodedEntry> {
    let value = match (entry.key_type, value) {
        (KeyType::Array, DecodeValue::Entries(entries)) => decode_array(entry, entries)?,
        (KeyType::Array, DecodeValue::Raw(count)) => {
            let len = decode_count(entry, count)?;
            vec![Value::Null; len].into()
        }
        (_, DecodeValue::Raw(raw)) => decode_single(entry, raw)?,
        (_, DecodeValue::Entries(entries)) => {
            let raw = entries
                .iter()
                .find(|e| e.key == entry.key)
                .map(|e| e.value.clone())
                .unwrap_or_default();
            decode_single(entry, &raw)?
        }
    };
    Ok(DecodedEntry {
        key: entry.key,
        name: entry.name.clone(),
        value,
    })
}

fn decode_single(entry: &SchemaEntry, raw: &[u8]) -> Result<Value> {
    match decode_value_content(&entry.value_content, &entry.value_type, raw)? {
        ContentOutcome::Matched(value) => Ok(value),
        ContentOutcome::LiteralMismatch => Err(SchemaError::LiteralMismatch {
            name: entry.name.clone(),
            expected: entry.value_content.to_string(),
        }),
    }
}

/// Array length from its count cell. Absent and empty cells mean an empty array.
pub fn decode_count(entry: &SchemaEntry, raw: &[u8]) -> Result<usize> {
    let count = match decode_value_type(&COUNT_TYPE, raw)? {
        Value::Number(n) => n,
        _ => return Ok(0),
    };
    let count = u128::try_from(count)
        .ok()
        .filter(|n| *n <= MAX_ARRAY_LENGTH)
        .ok_or_else(|| {
            CodecError::malformed(
                entry.name.as_str(),
                format!("array length {count} exceeds {MAX_ARRAY_LENGTH}"),
            )
        })?;
    Ok(count as usize)
}

/// Element keys of an array of `len` entries
pub fn array_element_keys(entry: &SchemaEntry, len: usize) -> Vec<B256> {
    (0..len as u128)
        .map(|index| encode_array_key(&entry.key, index))
        .collect()
}

fn decode_array(entry: &SchemaEntry, entries: &[EncodedEntry]) -> Result<Value> {
    let by_key: HashMap<B256, &Bytes> = entries.iter().map(|e| (e.key, &e.value)).collect();
    let len = match by_key.get(&entry.key) {
        Some(count) => decode_count(entry, count)?,
        None => 0,
    };

    let mut items = Vec::with_capacity(len);
    for key in array_element_keys(entry, len) {
        let value = match by_key.get(&key) {
            Some(raw) => decode_single(entry, raw)?,
            None => {
                #[cfg(feature = "tracing")]
                tracing::debug!(schema = %entry.name, %key, "array element missing, decoding as null");
                Value::Null
            }
        };
        items.push(value);
    }
    Ok(Value::Array(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::EncodeInput;
    use crate::key::encode_key_name;
    use alloy_primitives::hex;

    fn assets() -> Value {
        Value::from(vec![
            "0xcafecafecafecafecafecafecafecafecafecafe",
            "0xdeaddeaddeaddeaddeaddeaddeaddeaddeaddead",
        ])
    }

    #[test]
    fn array_round_trip() {
        let set = SchemaSet::builtin();
        let encoded = set
            .encode_data(&[EncodeInput::new("LSP3IssuedAssets[]", assets()).build()])
            .unwrap();
        let decoded = set
            .decode_data(&[DecodeInput::new("LSP3IssuedAssets[]", encoded).build()])
            .unwrap();
        let items = decoded[0].value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].to_address(), assets().as_array().unwrap()[0].to_address());
    }

    #[test]
    fn empty_array() {
        let set = SchemaSet::builtin();
        let key = set.get("LSP3IssuedAssets[]").unwrap().key;
        for entries in [vec![], vec![EncodedEntry::new(key, Bytes::new())]] {
            let decoded = set
                .decode_data(&[DecodeInput::new("LSP3IssuedAssets[]", entries).build()])
                .unwrap();
            assert_eq!(decoded[0].value, Value::Array(vec![]));
        }
    }

    #[test]
    fn missing_element_is_null() {
        let set = SchemaSet::builtin();
        let mut encoded = set
            .encode_data(&[EncodeInput::new("LSP3IssuedAssets[]", assets()).build()])
            .unwrap();
        encoded.remove(1);
        let decoded = set
            .decode_data(&[DecodeInput::new("LSP3IssuedAssets[]", encoded).build()])
            .unwrap();
        let items = decoded[0].value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_null());
        assert!(!items[1].is_null());
    }

    #[test]
    fn oversized_count_is_rejected() {
        let set = SchemaSet::builtin();
        let key = set.get("LSP3IssuedAssets[]").unwrap().key;
        let count = Bytes::from(hex!("00000000000000000000000000010001"));
        let input =
            DecodeInput::new("LSP3IssuedAssets[]", vec![EncodedEntry::new(key, count)]).build();
        assert!(set.decode_data(&[input]).is_err());
    }

    #[test]
    fn legacy_word_count() {
        let set = SchemaSet::builtin();
        let entry = set.get("LSP3IssuedAssets[]").unwrap();
        let mut word = [0u8; 32];
        word[31] = 3;
        assert_eq!(decode_count(entry, &word).unwrap(), 3);
    }

    #[test]
    fn decode_entries_resolves_and_skips() {
        let set = SchemaSet::builtin();
        let mut raw = set
            .encode_data(&[
                EncodeInput::new("SupportedStandards:LSP3UniversalProfile", "0xabe425d6").build(),
                EncodeInput::new("LSP3IssuedAssets[]", assets()).build(),
            ])
            .unwrap();
        raw.push(EncodedEntry::new(B256::repeat_byte(0x42), Bytes::from(hex!("01"))));

        let decoded = set.decode_entries(&raw).unwrap();
        let names: Vec<&str> = decoded.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["SupportedStandards:LSP3UniversalProfile", "LSP3IssuedAssets[]"]);
        assert_eq!(decoded[1].value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn decode_entries_tries_next_candidate() {
        // wrong literal for LSP3 falls through to the degraded mapping candidate
        let set = SchemaSet::builtin();
        let key = set.get("SupportedStandards:LSP3UniversalProfile").unwrap().key;
        let decoded = set
            .decode_entries(&[EncodedEntry::new(key, Bytes::from(hex!("deadbeef")))])
            .unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "SupportedStandards:??????");
        assert_eq!(decoded[0].value, Value::Bytes(Bytes::from(hex!("deadbeef"))));
    }

    #[test]
    fn decode_entries_skips_undecodable_values() {
        let set = SchemaSet::builtin();
        let mut raw = set
            .encode_data(&[EncodeInput::new("LSP4TokenName", "My Token").build()])
            .unwrap();
        // the only candidate for this key expects four bytes
        let key = encode_key_name("SupportedStandards:SomethingElse", &[]).unwrap();
        raw.push(EncodedEntry::new(key, Bytes::from(hex!("010101"))));

        let decoded = set.decode_entries(&raw).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "LSP4TokenName");
        assert_eq!(decoded[0].value, Value::from("My Token"));
    }
}
