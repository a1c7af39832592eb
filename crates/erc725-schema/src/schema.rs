//! LSP2 schema entries
//!
//! Entries are validated once, while deserializing: descriptors are parsed into
//! their enums and the key is checked against the name it should derive from.

use crate::error::{Result, SchemaError};
use crate::key::{
    DynamicKeyType, KeyShape, render_dynamic_part, substitute_dynamic_parts,
};
use alloy_primitives::{B256, hex};
use erc725_common::{KeyType, Value, ValueContent, ValueType, parse_hex};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use smol_str::SmolStr;

/// A schema entry as written in a schema file
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RawSchemaEntry {
    pub name: SmolStr,
    pub key: String,
    pub key_type: KeyType,
    pub value_type: String,
    pub value_content: String,
    pub description: Option<String>,
}

/// A validated schema entry.
///
/// For a dynamic name such as `LSP5ReceivedAssetsMap:<address>`, `key` holds the
/// static prefix of the key followed by zero bytes; use [`SchemaEntry::materialize`]
/// to obtain a concrete entry.
#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(try_from = "RawSchemaEntry", rename_all = "camelCase")]
pub struct SchemaEntry {
    pub name: SmolStr,
    pub key: B256,
    pub key_type: KeyType,
    pub value_type: ValueType,
    pub value_content: ValueContent,
    pub description: Option<String>,
}

impl TryFrom<RawSchemaEntry> for SchemaEntry {
    type Error = SchemaError;

    fn try_from(raw: RawSchemaEntry) -> Result<Self> {
        let name = raw.name;
        let invalid = |field: &str, e: erc725_common::CodecError| {
            SchemaError::invalid_schema(name.clone(), format!("{field}: {e}"))
        };
        let value_type: ValueType = raw.value_type.parse().map_err(|e| invalid("valueType", e))?;
        let value_content: ValueContent =
            raw.value_content.parse().map_err(|e| invalid("valueContent", e))?;

        let shape = KeyShape::parse(&name)?;
        if shape.key_type() != raw.key_type {
            return Err(SchemaError::invalid_schema(
                name.clone(),
                format!(
                    "name has the shape of a {}, keyType is {}",
                    shape.key_type(),
                    raw.key_type
                ),
            ));
        }
        // a hashed part cannot be read back, so such keys are only ever encoded
        if shape
            .dynamic_slots()
            .iter()
            .any(|(kind, _)| *kind == DynamicKeyType::String)
        {
            return Err(SchemaError::invalid_schema(
                name.clone(),
                "<string> placeholders are hashed into the key and cannot be resolved",
            ));
        }
        if raw.key_type == KeyType::Array && value_type.element().is_some() {
            return Err(SchemaError::invalid_schema(
                name.clone(),
                "valueType of an Array entry describes one element and cannot be an array",
            ));
        }

        let key = if shape.is_dynamic() {
            dynamic_template_key(&name, &shape, &raw.key)?
        } else {
            let declared = parse_hex("key", &raw.key)?;
            let derived = shape.encode(&name, &[])?;
            if declared.as_slice() != derived.as_slice() {
                return Err(SchemaError::KeyMismatch {
                    name: name.clone(),
                    declared: raw.key,
                    derived: derived.to_string(),
                });
            }
            derived
        };

        Ok(Self {
            name,
            key,
            key_type: raw.key_type,
            value_type,
            value_content,
            description: raw.description,
        })
    }
}

/// Dynamic keys are written as the hex prefix followed by the placeholders, for
/// instance `0x4b80742d0000000082ac0000<address>`. Only the prefix is checked.
fn dynamic_template_key(name: &SmolStr, shape: &KeyShape<'_>, written: &str) -> Result<B256> {
    let prefix = shape.static_prefix();
    let hex_part = written.split('<').next().unwrap_or_default();
    let declared = parse_hex("key", hex_part)?;
    let checked = declared.len().min(prefix.len());
    if declared[..checked] != prefix[..checked] {
        return Err(SchemaError::KeyMismatch {
            name: name.clone(),
            declared: written.to_owned(),
            derived: hex::encode_prefixed(&prefix),
        });
    }
    let mut key = [0u8; 32];
    key[..prefix.len()].copy_from_slice(&prefix);
    Ok(B256::from(key))
}

impl From<SchemaEntry> for RawSchemaEntry {
    fn from(entry: SchemaEntry) -> Self {
        Self {
            name: entry.name,
            key: entry.key.to_string(),
            key_type: entry.key_type,
            value_type: entry.value_type.to_string(),
            value_content: entry.value_content.to_string(),
            description: entry.description,
        }
    }
}

impl SchemaEntry {
    /// Build an entry from its name and descriptors, deriving the key
    pub fn new(
        name: impl Into<SmolStr>,
        key_type: KeyType,
        value_type: &str,
        value_content: &str,
    ) -> Result<Self> {
        let name = name.into();
        let key = {
            let shape = KeyShape::parse(&name)?;
            if shape.is_dynamic() {
                hex::encode_prefixed(shape.static_prefix())
            } else {
                shape.encode(&name, &[])?.to_string()
            }
        };
        RawSchemaEntry {
            name,
            key,
            key_type,
            value_type: value_type.to_owned(),
            value_content: value_content.to_owned(),
            description: None,
        }
        .try_into()
    }

    /// Classify the entry's name
    pub fn shape(&self) -> Result<KeyShape<'_>> {
        KeyShape::parse(&self.name)
    }

    /// Whether the name holds `<type>` placeholders
    pub fn is_dynamic(&self) -> bool {
        self.shape().is_ok_and(|shape| shape.is_dynamic())
    }

    /// Placeholder types of the name, in order
    pub fn dynamic_types(&self) -> Vec<DynamicKeyType> {
        self.shape()
            .map(|shape| shape.dynamic_slots().into_iter().map(|(kind, _)| kind).collect())
            .unwrap_or_default()
    }

    /// Concrete entry for a dynamic template, with placeholders filled from `parts`
    /// in both the name and the key
    pub fn materialize(&self, parts: &[Value]) -> Result<SchemaEntry> {
        let shape = self.shape()?;
        let key = shape.encode(&self.name, parts)?;
        let rendered: Vec<SmolStr> = shape
            .dynamic_slots()
            .into_iter()
            .zip(parts)
            .map(|((kind, _), value)| render_dynamic_part(kind, value))
            .collect();
        Ok(SchemaEntry {
            name: substitute_dynamic_parts(&self.name, rendered.iter().map(SmolStr::as_str)),
            key,
            ..self.clone()
        })
    }

    /// Copy of this entry under another name and key, keeping its descriptors
    pub fn renamed(&self, name: impl Into<SmolStr>, key: B256) -> SchemaEntry {
        SchemaEntry {
            name: name.into(),
            key,
            ..self.clone()
        }
    }
}
