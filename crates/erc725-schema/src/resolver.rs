//! Key to schema resolution.
//!
//! Entries are tried by key type, Singleton, then Array, then Mapping, then
//! MappingWithGrouping, and in load order within each. Keys that only match the
//! prefix of an entry produce a synthesized entry describing the concrete key.

use crate::corpus::SchemaSet;
use crate::key::{
    KeyShape, decode_dynamic_key_part, render_dynamic_part, substitute_dynamic_parts,
};
use crate::schema::SchemaEntry;
use alloy_primitives::{B256, hex};
use erc725_common::{KeyType, ValueContent};
use smol_str::{SmolStr, format_smolstr};

/// Length of the `keccak(First)[0:16] ++ 0x00 * 12` prefix of a literal Mapping key
const MAPPING_PREFIX: usize = 28;

impl SchemaSet {
    /// The entry describing `key`, if any
    pub fn get_schema(&self, key: &B256) -> Option<SchemaEntry> {
        self.candidates(key).into_iter().next()
    }

    /// [`SchemaSet::get_schema`] for several keys, in order
    pub fn get_schemas<'k>(
        &self,
        keys: impl IntoIterator<Item = &'k B256>,
    ) -> Vec<(B256, Option<SchemaEntry>)> {
        keys.into_iter()
            .map(|key| (*key, self.get_schema(key)))
            .collect()
    }

    /// Every entry that could describe `key`, best match first
    pub fn candidates(&self, key: &B256) -> Vec<SchemaEntry> {
        let mut found = Vec::new();
        for key_type in [
            KeyType::Singleton,
            KeyType::Array,
            KeyType::Mapping,
            KeyType::MappingWithGrouping,
        ] {
            for entry in self.iter().filter(|entry| entry.key_type == key_type) {
                let Ok(shape) = entry.shape() else { continue };
                let candidate = match key_type {
                    KeyType::Singleton => exact(entry, key),
                    KeyType::Array => exact(entry, key).or_else(|| array_element(entry, key)),
                    KeyType::Mapping | KeyType::MappingWithGrouping => {
                        exact(entry, key).or_else(|| prefixed(entry, &shape, key))
                    }
                };
                found.extend(candidate);
            }
        }
        #[cfg(feature = "tracing")]
        if found.is_empty() {
            tracing::trace!(%key, "no schema matches key");
        }
        found
    }
}

fn exact(entry: &SchemaEntry, key: &B256) -> Option<SchemaEntry> {
    (entry.key == *key && !entry.is_dynamic()).then(|| entry.clone())
}

fn array_element(entry: &SchemaEntry, key: &B256) -> Option<SchemaEntry> {
    if entry.key[..16] != key[..16] {
        return None;
    }
    let index = u128::from_be_bytes(key[16..].try_into().ok()?);
    let base = entry.name.strip_suffix("[]").unwrap_or(&entry.name);
    Some(SchemaEntry {
        key_type: KeyType::Singleton,
        ..entry.renamed(format_smolstr!("{base}[{index}]"), *key)
    })
}

fn prefixed(entry: &SchemaEntry, shape: &KeyShape<'_>, key: &B256) -> Option<SchemaEntry> {
    if shape.is_dynamic() {
        let prefix = shape.static_prefix();
        if key[..prefix.len()] != prefix[..] {
            return None;
        }
        let rendered: Vec<SmolStr> = shape
            .dynamic_slots()
            .into_iter()
            .map(|(kind, slot)| {
                let bytes = &key[slot];
                // parts that cannot be read back are shown as raw hex
                decode_dynamic_key_part(&entry.name, kind, bytes)
                    .map(|value| render_dynamic_part(kind, &value))
                    .unwrap_or_else(|_| SmolStr::new(hex::encode_prefixed(bytes)))
            })
            .collect();
        let name = substitute_dynamic_parts(&entry.name, rendered.iter().map(SmolStr::as_str));
        return Some(entry.renamed(name, *key));
    }

    match shape {
        KeyShape::Mapping { first, .. }
            if entry.key[..MAPPING_PREFIX] == key[..MAPPING_PREFIX] =>
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(%key, schema = %entry.name, "unresolved mapping key");
            Some(SchemaEntry {
                value_content: ValueContent::Unspecified,
                ..entry.renamed(format_smolstr!("{first}:??????"), *key)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{encode_array_key, encode_key_name};
    use alloy_primitives::{address, b256};
    use erc725_common::Value;

    fn set() -> SchemaSet {
        SchemaSet::builtin()
    }

    #[test]
    fn singleton_exact() {
        let key = b256!("0x5ef83ad9559033e6e941db7d7c495acdce616347d28e90c7ce47cbfcfcad3bc5");
        assert_eq!(set().get_schema(&key).unwrap().name, "LSP3Profile");
    }

    #[test]
    fn array_base_and_element() {
        let base = b256!("0x6460ee3c0aac563ccbf76d6e1d07bada78e3a9514e6382b736ed3f478ab7b90b");
        let entry = set().get_schema(&base).unwrap();
        assert_eq!(entry.name, "LSP5ReceivedAssets[]");
        assert_eq!(entry.key_type, KeyType::Array);

        let element = set().get_schema(&encode_array_key(&base, 3)).unwrap();
        assert_eq!(element.name, "LSP5ReceivedAssets[3]");
        assert_eq!(element.key_type, KeyType::Singleton);
        assert_eq!(element.value_type, entry.value_type);
    }

    #[test]
    fn unknown_literal_mapping_degrades() {
        let key = encode_key_name("SupportedStandards:SomethingElse", &[]).unwrap();
        let entry = set().get_schema(&key).unwrap();
        assert_eq!(entry.name, "SupportedStandards:??????");
        assert_eq!(entry.value_content, ValueContent::Unspecified);
        assert_eq!(entry.key, key);
    }

    #[test]
    fn dynamic_keys_name_their_parts() {
        let addr = address!("0xcafecafecafecafecafecafecafecafecafecafe");
        let key = encode_key_name(
            "AddressPermissions:Permissions:<address>",
            &[Value::Address(addr)],
        )
        .unwrap();
        let entry = set().get_schema(&key).unwrap();
        assert_eq!(
            entry.name,
            format!("AddressPermissions:Permissions:{}", addr.to_checksum(None))
        );
        assert_eq!(entry.key_type, KeyType::MappingWithGrouping);
    }

    #[test]
    fn grouped_templates_resolve_every_slot() {
        let name = "Grants:<bytes2>:<address>";
        let prefix = KeyShape::parse(name).unwrap().static_prefix();
        let schemas = SchemaSet::from_json_str(&format!(
            r#"[{{
                "name": "{name}",
                "key": "{}<bytes2>0000<address>",
                "keyType": "MappingWithGrouping",
                "valueType": "bool",
                "valueContent": "Boolean"
            }}]"#,
            hex::encode_prefixed(&prefix)
        ))
        .unwrap();

        let addr = address!("0xcafecafecafecafecafecafecafecafecafecafe");
        let key = encode_key_name(name, &[Value::from("0xbeef"), Value::Address(addr)]).unwrap();
        let entry = schemas.get_schema(&key).unwrap();
        assert_eq!(entry.name, format!("Grants:0xbeef:{}", addr.to_checksum(None)));
    }

    #[test]
    fn oversized_placeholder_templates_do_not_load() {
        let loaded = SchemaSet::from_json_str(
            r#"[{
                "name": "G:<address>:<address>",
                "key": "0x1234567800000000",
                "keyType": "MappingWithGrouping",
                "valueType": "bytes",
                "valueContent": "Bytes"
            }]"#,
        );
        assert!(loaded.is_err());
    }

    #[test]
    fn unknown_key() {
        assert!(set().get_schema(&B256::repeat_byte(0x42)).is_none());
    }
}
