//! Schema-driven encoding of named values into `{key, value}` pairs

use crate::content::{ContentOutcome, encode_value_content};
use crate::corpus::SchemaSet;
use crate::error::{Result, SchemaError};
use crate::key::encode_array_key;
use crate::schema::SchemaEntry;
use alloy_primitives::{B256, Bytes};
use erc725_common::{KeyType, Value, ValueType, encode_value_type};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// One storage slot as exchanged with a contract: a 32-byte key and its raw value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncodedEntry {
    pub key: B256,
    pub value: Bytes,
}

impl EncodedEntry {
    pub fn new(key: B256, value: impl Into<Bytes>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// A value to encode, addressed by schema name, hashed key or dynamic template
#[derive(Debug, Clone, PartialEq, bon::Builder)]
#[builder(start_fn = new)]
pub struct EncodeInput {
    /// Schema name, `0x` key, or template such as `LSP5ReceivedAssetsMap:<address>`
    #[builder(start_fn, into)]
    pub key_name: SmolStr,
    #[builder(start_fn, into)]
    pub value: Value,
    /// Values of the template's placeholders, in order
    #[builder(default)]
    pub dynamic_key_parts: Vec<Value>,
    /// Array index of the first element of `value`
    pub starting_index: Option<i64>,
    /// Length written to the array count cell
    pub total_array_length: Option<u128>,
}

/// Count cell width: arrays store their length as `uint128`
pub(crate) const COUNT_TYPE: ValueType = ValueType::Uint(128);

impl SchemaSet {
    /// Encode several values. Output follows input order, and an array's element
    /// keys follow its count key.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(count = inputs.len())))]
    pub fn encode_data(&self, inputs: &[EncodeInput]) -> Result<Vec<EncodedEntry>> {
        let mut out = Vec::new();
        for input in inputs {
            let entry = self.lookup(&input.key_name, &input.dynamic_key_parts)?;
            out.extend(encode_entry(&entry, input)?);
        }
        Ok(out)
    }
}

/// Encode one input against an already resolved entry
pub fn encode_entry(entry: &SchemaEntry, input: &EncodeInput) -> Result<Vec<EncodedEntry>> {
    if entry.key_type == KeyType::Array {
        return encode_array(entry, input);
    }
    if input.starting_index.is_some() || input.total_array_length.is_some() {
        return Err(SchemaError::invalid_input(
            entry.name.clone(),
            "startingIndex and totalArrayLength only apply to Array entries",
        ));
    }
    let value = encode_single(entry, &entry.value_type, &input.value)?;
    Ok(vec![EncodedEntry::new(entry.key, value)])
}

fn encode_single(entry: &SchemaEntry, value_type: &ValueType, value: &Value) -> Result<Bytes> {
    match encode_value_content(&entry.value_content, value_type, value)? {
        ContentOutcome::Matched(bytes) => Ok(bytes),
        ContentOutcome::LiteralMismatch => Err(SchemaError::LiteralMismatch {
            name: entry.name.clone(),
            expected: entry.value_content.to_string(),
        }),
    }
}

fn encode_array(entry: &SchemaEntry, input: &EncodeInput) -> Result<Vec<EncodedEntry>> {
    let items = match &input.value {
        Value::Null => return Ok(vec![EncodedEntry::new(entry.key, Bytes::new())]),
        Value::Array(items) => items,
        other => {
            return Err(SchemaError::invalid_input(
                entry.name.clone(),
                format!("an Array entry takes a list, got {}", other.kind()),
            ));
        }
    };

    let start = input.starting_index.unwrap_or(0);
    let start = u128::try_from(start).map_err(|_| {
        SchemaError::array_range(entry.name.clone(), format!("startingIndex {start} is negative"))
    })?;
    let len = items.len() as u128;
    let total = input.total_array_length.unwrap_or(start + len);
    if total < len {
        return Err(SchemaError::array_range(
            entry.name.clone(),
            format!("totalArrayLength {total} is smaller than the {len} values given"),
        ));
    }
    if start + len > total {
        return Err(SchemaError::array_range(
            entry.name.clone(),
            format!("indices {start}..{} exceed totalArrayLength {total}", start + len),
        ));
    }

    let mut out = Vec::with_capacity(items.len() + 1);
    out.push(EncodedEntry::new(
        entry.key,
        encode_value_type(&COUNT_TYPE, &Value::Number(alloy_primitives::U256::from(total)))?,
    ));
    for (offset, item) in items.iter().enumerate() {
        let key = encode_array_key(&entry.key, start + offset as u128);
        out.push(EncodedEntry::new(key, encode_single(entry, &entry.value_type, item)?));
    }
    Ok(out)
}
