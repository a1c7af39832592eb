//! Key derivation (LSP2) and its inverse.
//!
//! A key name is classified once into a [`KeyShape`], and every derivation rule is
//! a match over that shape. Layouts, byte offsets included:
//!
//! | shape | key |
//! |---|---|
//! | `Name`, `Name[]` | `keccak(name)` |
//! | `First:Second` | `keccak(First)[0:16] ++ 0x00 * 12 ++ keccak(Second)[0:4]` |
//! | `First:<type>`, `First:0x<20 bytes>` | `keccak(First)[0:8] ++ 0x00 * 4 ++ slot(20)` |
//! | `First:Second:Third` | `keccak(First)[0:4] ++ 0x00 * 4 ++ slot(2) ++ 0x00 * 2 ++ slot(20)` |
//!
//! In the grouped form, a word `Second` fills its slot with `keccak(Second)[0:2]`
//! and a word `Third` with `keccak(Third)[0:20]`.

use crate::error::{Result, SchemaError};
use alloy_primitives::{Address, B256, hex, keccak256};
use erc725_common::{KeyType, Value, parse_hex};
use serde::Serialize;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use smol_str::{SmolStr, format_smolstr};
use std::fmt;
use std::str::FromStr;

/// Width of the address-sized dynamic slot
pub const WIDE_SLOT: usize = 20;
/// Width of the grouping slot of `First:<type>:Third`
pub const GROUP_SLOT: usize = 2;

/// Primitive type of a `<type>` placeholder in a key name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum DynamicKeyType {
    Address,
    Bool,
    /// `uintN`, N bits
    Uint(u16),
    /// `bytesN`, N bytes
    FixedBytes(u8),
    /// Hashed into the slot, so it cannot be read back from a key
    String,
}

impl FromStr for DynamicKeyType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self> {
        let unsupported = || SchemaError::invalid_dynamic_part(s, "unsupported placeholder type");
        let digits = |rest: &str| -> Option<u16> {
            if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                rest.parse().ok()
            }
        };
        match s {
            "address" => Ok(Self::Address),
            "bool" => Ok(Self::Bool),
            "string" => Ok(Self::String),
            _ => {
                if let Some(rest) = s.strip_prefix("bool") {
                    // `boolN` is stored in a single byte whatever N is
                    digits(rest)
                        .filter(|bits| *bits > 0)
                        .map(|_| Self::Bool)
                        .ok_or_else(unsupported)
                } else if let Some(rest) = s.strip_prefix("uint") {
                    digits(rest)
                        .filter(|bits| *bits > 0 && *bits <= 256 && bits % 8 == 0)
                        .map(Self::Uint)
                        .ok_or_else(unsupported)
                } else if let Some(rest) = s.strip_prefix("bytes") {
                    digits(rest)
                        .filter(|n| (1..=32).contains(n))
                        .map(|n| Self::FixedBytes(n as u8))
                        .ok_or_else(unsupported)
                } else {
                    Err(unsupported())
                }
            }
        }
    }
}

impl DynamicKeyType {
    /// Bytes the value occupies in a key. Strings are hashed to fit any slot.
    pub fn width(&self) -> Option<usize> {
        match self {
            Self::Address => Some(WIDE_SLOT),
            Self::Bool => Some(1),
            Self::Uint(bits) => Some(usize::from(*bits) / 8),
            Self::FixedBytes(n) => Some(usize::from(*n)),
            Self::String => None,
        }
    }

    fn fits(&self, slot: usize) -> bool {
        self.width().is_none_or(|width| width <= slot)
    }
}

impl fmt::Display for DynamicKeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => f.write_str("address"),
            Self::Bool => f.write_str("bool"),
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::FixedBytes(n) => write!(f, "bytes{n}"),
            Self::String => f.write_str("string"),
        }
    }
}

/// A value filling one placeholder, as returned by [`decode_mapping_key`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DynamicKeyPart {
    #[serde(rename = "type")]
    pub kind: DynamicKeyType,
    pub value: Value,
}

/// One `:`-separated segment of a key name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'n> {
    /// Literal word, hashed into the key
    Word(&'n str),
    /// `<type>` placeholder
    Dynamic(DynamicKeyType),
}

impl<'n> Segment<'n> {
    fn parse(name: &str, segment: &'n str) -> Result<Self> {
        if segment.is_empty() {
            return Err(SchemaError::unsupported_key_name(name, "empty segment"));
        }
        match segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            Some(inner) => Ok(Self::Dynamic(inner.parse()?)),
            None if segment.contains(['<', '>']) => Err(SchemaError::unsupported_key_name(
                name,
                format!("malformed placeholder in `{segment}`"),
            )),
            None => Ok(Self::Word(segment)),
        }
    }

    fn hashed(&self, width: usize) -> Option<Vec<u8>> {
        match self {
            Self::Word(word) => Some(keccak256(word.as_bytes())[..width].to_vec()),
            Self::Dynamic(_) => None,
        }
    }
}

fn literal_address(segment: &str) -> Option<Address> {
    let digits = segment.strip_prefix("0x")?;
    if digits.len() == 40 && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        Address::from_str(segment).ok()
    } else {
        None
    }
}

/// The derivation rule a key name selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape<'n> {
    /// `Name`
    Singleton(&'n str),
    /// `Name[]`
    Array(&'n str),
    /// `First:Second`
    Mapping { first: &'n str, second: Segment<'n> },
    /// `First:0x<20 bytes>`
    Bytes20Mapping { first: &'n str, address: Address },
    /// `First:Second:Third`
    MappingWithGrouping {
        first: &'n str,
        second: Segment<'n>,
        third: Segment<'n>,
    },
    /// `First:Second:0x<20 bytes>`
    Bytes20MappingWithGrouping {
        first: &'n str,
        second: Segment<'n>,
        address: Address,
    },
}

impl<'n> KeyShape<'n> {
    /// Classify a key name. Placeholders too wide for their slot are rejected.
    pub fn parse(name: &'n str) -> Result<Self> {
        let shape = Self::classify(name)?;
        for (kind, slot) in shape.dynamic_slots() {
            if !kind.fits(slot.len()) {
                return Err(SchemaError::unsupported_key_name(
                    name,
                    format!("<{kind}> does not fit a {}-byte slot", slot.len()),
                ));
            }
        }
        Ok(shape)
    }

    fn classify(name: &'n str) -> Result<Self> {
        let segments: Vec<&str> = name.split(':').collect();
        let first = segments[0];
        if first.is_empty() {
            return Err(SchemaError::unsupported_key_name(name, "empty name"));
        }
        if first.contains(['<', '>']) {
            return Err(SchemaError::unsupported_key_name(
                name,
                "the first segment cannot be dynamic",
            ));
        }
        match segments[1..] {
            [] if first.ends_with("[]") => Ok(Self::Array(name)),
            [] => Ok(Self::Singleton(name)),
            [second] => Ok(match literal_address(second) {
                Some(address) => Self::Bytes20Mapping { first, address },
                None => Self::Mapping {
                    first,
                    second: Segment::parse(name, second)?,
                },
            }),
            [second, third] => {
                let second = Segment::parse(name, second)?;
                Ok(match literal_address(third) {
                    Some(address) => Self::Bytes20MappingWithGrouping {
                        first,
                        second,
                        address,
                    },
                    None => Self::MappingWithGrouping {
                        first,
                        second,
                        third: Segment::parse(name, third)?,
                    },
                })
            }
            _ => Err(SchemaError::unsupported_key_name(
                name,
                format!("{} segments", segments.len()),
            )),
        }
    }

    /// The schema `keyType` this shape belongs to
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Singleton(_) => KeyType::Singleton,
            Self::Array(_) => KeyType::Array,
            Self::Mapping { .. } | Self::Bytes20Mapping { .. } => KeyType::Mapping,
            Self::MappingWithGrouping { .. } | Self::Bytes20MappingWithGrouping { .. } => {
                KeyType::MappingWithGrouping
            }
        }
    }

    /// Placeholders in order, each with its byte range in the key
    pub fn dynamic_slots(&self) -> Vec<(DynamicKeyType, std::ops::Range<usize>)> {
        let mut slots = Vec::new();
        match self {
            Self::Mapping {
                second: Segment::Dynamic(kind),
                ..
            } => slots.push((*kind, 12..32)),
            Self::MappingWithGrouping { second, third, .. } => {
                if let Segment::Dynamic(kind) = second {
                    slots.push((*kind, 8..10));
                }
                if let Segment::Dynamic(kind) = third {
                    slots.push((*kind, 12..32));
                }
            }
            Self::Bytes20MappingWithGrouping {
                second: Segment::Dynamic(kind),
                ..
            } => slots.push((*kind, 8..10)),
            _ => {}
        }
        slots
    }

    /// Whether the name holds at least one placeholder
    pub fn is_dynamic(&self) -> bool {
        !self.dynamic_slots().is_empty()
    }

    /// Leading key bytes that do not depend on dynamic parts. For a fully static
    /// name this is the whole key.
    pub fn static_prefix(&self) -> Vec<u8> {
        let mut key = self.derive_with(|_, slot| vec![0; slot.len()]);
        let end = self.dynamic_slots().first().map_or(32, |(_, slot)| slot.start);
        key.truncate(end);
        key
    }

    /// Derive the key, filling placeholders from `parts` in order
    pub fn encode(&self, name: &str, parts: &[Value]) -> Result<B256> {
        let slots = self.dynamic_slots();
        if slots.len() != parts.len() {
            return Err(SchemaError::DynamicPartCount {
                name: SmolStr::new(name),
                expected: slots.len(),
                given: parts.len(),
            });
        }
        let mut encoded = Vec::with_capacity(parts.len());
        for ((kind, slot), value) in slots.iter().zip(parts) {
            encoded.push(encode_dynamic_key_part(*kind, value, slot.len())?);
        }
        let mut encoded = encoded.into_iter();
        let key = self.derive_with(|_, slot| {
            encoded.next().unwrap_or_else(|| vec![0; slot.len()])
        });
        Ok(B256::from_slice(&key))
    }

    fn derive_with(
        &self,
        mut fill: impl FnMut(DynamicKeyType, std::ops::Range<usize>) -> Vec<u8>,
    ) -> Vec<u8> {
        let hash = |s: &str| keccak256(s.as_bytes());
        let mut key = Vec::with_capacity(32);
        match self {
            Self::Singleton(name) | Self::Array(name) => {
                key.extend_from_slice(hash(name).as_slice())
            }
            Self::Mapping {
                first,
                second: Segment::Word(second),
            } => {
                key.extend_from_slice(&hash(first)[..16]);
                key.extend_from_slice(&[0; 12]);
                key.extend_from_slice(&hash(second)[..4]);
            }
            Self::Mapping {
                first,
                second: Segment::Dynamic(kind),
            } => {
                key.extend_from_slice(&hash(first)[..8]);
                key.extend_from_slice(&[0; 4]);
                key.extend(fill(*kind, 12..32));
            }
            Self::Bytes20Mapping { first, address } => {
                key.extend_from_slice(&hash(first)[..8]);
                key.extend_from_slice(&[0; 4]);
                key.extend_from_slice(address.as_slice());
            }
            Self::MappingWithGrouping {
                first,
                second,
                third,
            } => {
                key.extend_from_slice(&hash(first)[..4]);
                key.extend_from_slice(&[0; 4]);
                key.extend(grouped(second, GROUP_SLOT, 8..10, &mut fill));
                key.extend_from_slice(&[0; 2]);
                key.extend(grouped(third, WIDE_SLOT, 12..32, &mut fill));
            }
            Self::Bytes20MappingWithGrouping {
                first,
                second,
                address,
            } => {
                key.extend_from_slice(&hash(first)[..4]);
                key.extend_from_slice(&[0; 4]);
                key.extend(grouped(second, GROUP_SLOT, 8..10, &mut fill));
                key.extend_from_slice(&[0; 2]);
                key.extend_from_slice(address.as_slice());
            }
        }
        key
    }
}

fn grouped(
    segment: &Segment<'_>,
    width: usize,
    slot: std::ops::Range<usize>,
    fill: &mut impl FnMut(DynamicKeyType, std::ops::Range<usize>) -> Vec<u8>,
) -> Vec<u8> {
    match segment {
        Segment::Dynamic(kind) => fill(*kind, slot),
        word => word.hashed(width).unwrap_or_default(),
    }
}

/// Whether a key name contains a `<type>` placeholder
pub fn is_dynamic_key_name(name: &str) -> bool {
    KeyShape::parse(name).is_ok_and(|shape| shape.is_dynamic())
}

/// Derive the 32-byte key of a name, filling placeholders from `parts`
pub fn encode_key_name(name: &str, parts: &[Value]) -> Result<B256> {
    KeyShape::parse(name)?.encode(name, parts)
}

/// Key of element `index` of the array whose base key is `base`
pub fn encode_array_key(base: &B256, index: u128) -> B256 {
    let mut key = [0u8; 32];
    key[..16].copy_from_slice(&base[..16]);
    key[16..].copy_from_slice(&index.to_be_bytes());
    B256::from(key)
}

/// Parse a 32-byte key, with or without `0x`
pub fn parse_key(input: &str) -> Result<B256> {
    let bytes = parse_hex("key", input)?;
    if bytes.len() != 32 {
        return Err(SchemaError::invalid_key(
            input,
            format!("expected 32 bytes, got {}", bytes.len()),
        ));
    }
    Ok(B256::from_slice(&bytes))
}

/// Encode one placeholder value into a `slot`-byte key segment.
///
/// Numbers and booleans are right-aligned, `bytesN` left-aligned, addresses
/// need the full 20-byte slot, and strings contribute the head of their hash.
pub fn encode_dynamic_key_part(
    kind: DynamicKeyType,
    value: &Value,
    slot: usize,
) -> Result<Vec<u8>> {
    let invalid = |reason: String| SchemaError::invalid_dynamic_part(kind.to_string(), reason);
    let mut out = vec![0u8; slot];
    match kind {
        DynamicKeyType::Address => {
            if slot != WIDE_SLOT {
                return Err(invalid(format!("an address does not fit a {slot}-byte slot")));
            }
            let address = value
                .to_address()
                .ok_or_else(|| invalid(format!("`{value}` is not an address")))?;
            out.copy_from_slice(address.as_slice());
        }
        DynamicKeyType::Bool => {
            let b = value
                .to_bool()
                .ok_or_else(|| invalid(format!("`{value}` is not a boolean")))?;
            out[slot - 1] = u8::from(b);
        }
        DynamicKeyType::Uint(bits) => {
            let width = usize::from(bits) / 8;
            if width > slot {
                return Err(invalid(format!("{width} bytes do not fit a {slot}-byte slot")));
            }
            let n = value
                .to_u256()
                .ok_or_else(|| invalid(format!("`{value}` is not a number")))?;
            if n.bit_len() > usize::from(bits) {
                return Err(invalid(format!("{n} does not fit in {bits} bits")));
            }
            let word = n.to_be_bytes::<32>();
            out[slot - width..].copy_from_slice(&word[32 - width..]);
        }
        DynamicKeyType::FixedBytes(n) => {
            let width = usize::from(n);
            if width > slot {
                return Err(invalid(format!("{width} bytes do not fit a {slot}-byte slot")));
            }
            let bytes = value
                .to_bytes()
                .ok_or_else(|| invalid(format!("`{value}` is not hex")))?;
            if bytes.len() > width {
                return Err(invalid(format!("{} bytes exceed {width}", bytes.len())));
            }
            out[..bytes.len()].copy_from_slice(&bytes);
        }
        DynamicKeyType::String => {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.copy_from_slice(&keccak256(text.as_bytes())[..slot]);
        }
    }
    Ok(out)
}

/// Read one placeholder value back from its key segment
pub fn decode_dynamic_key_part(name: &str, kind: DynamicKeyType, slot: &[u8]) -> Result<Value> {
    if !kind.fits(slot.len()) {
        return Err(SchemaError::invalid_dynamic_part(
            kind.to_string(),
            format!("a {}-byte slot cannot hold it", slot.len()),
        ));
    }
    Ok(match kind {
        DynamicKeyType::Address => {
            let address = <[u8; WIDE_SLOT]>::try_from(slot).map(Address::from).map_err(|_| {
                SchemaError::invalid_dynamic_part(
                    kind.to_string(),
                    format!("expected {WIDE_SLOT} bytes, got {}", slot.len()),
                )
            })?;
            Value::Address(address)
        }
        DynamicKeyType::Bool => Value::Bool(slot.last().is_some_and(|b| *b != 0)),
        DynamicKeyType::Uint(bits) => {
            let width = (usize::from(bits) / 8).min(slot.len());
            Value::Number(alloy_primitives::U256::from_be_slice(&slot[slot.len() - width..]))
        }
        DynamicKeyType::FixedBytes(n) => {
            let width = usize::from(n).min(slot.len());
            Value::Bytes(alloy_primitives::Bytes::copy_from_slice(&slot[..width]))
        }
        DynamicKeyType::String => {
            return Err(SchemaError::NonInvertiblePart {
                name: SmolStr::new(name),
            });
        }
    })
}

/// Recover the dynamic parts of `key`, which was derived from template `name`.
///
/// Fails when the key is not 32 bytes, when the key does not belong to the
/// template, or when a placeholder is a `<string>`.
pub fn decode_mapping_key(key: &B256, name: &str) -> Result<Vec<DynamicKeyPart>> {
    let shape = KeyShape::parse(name)?;
    let slots = shape.dynamic_slots();
    if slots.is_empty() {
        return Err(SchemaError::unsupported_key_name(name, "no dynamic parts to decode"));
    }
    let prefix = shape.static_prefix();
    if key[..prefix.len()] != prefix[..] {
        return Err(SchemaError::invalid_key(
            key.to_string(),
            format!("not derived from `{name}`"),
        ));
    }
    slots
        .into_iter()
        .map(|(kind, slot)| {
            Ok(DynamicKeyPart {
                kind,
                value: decode_dynamic_key_part(name, kind, &key[slot])?,
            })
        })
        .collect()
}

/// Render a placeholder value as it appears in a concrete key name
pub fn render_dynamic_part(kind: DynamicKeyType, value: &Value) -> SmolStr {
    match (kind, value) {
        (DynamicKeyType::Address, v) => match v.to_address() {
            Some(addr) => SmolStr::new(addr.to_checksum(None)),
            None => format_smolstr!("{v}"),
        },
        (DynamicKeyType::FixedBytes(_), v) => match v.to_bytes() {
            Some(bytes) => SmolStr::new(hex::encode_prefixed(bytes)),
            None => format_smolstr!("{v}"),
        },
        (_, v) => format_smolstr!("{v}"),
    }
}

/// Substitute placeholders of `name` with rendered values, in order
pub fn substitute_dynamic_parts<'a>(
    name: &str,
    rendered: impl IntoIterator<Item = &'a str>,
) -> SmolStr {
    let mut rendered = rendered.into_iter();
    let segments: Vec<String> = name
        .split(':')
        .map(|segment| {
            if segment.starts_with('<') && segment.ends_with('>') {
                rendered.next().unwrap_or(segment).to_owned()
            } else {
                segment.to_owned()
            }
        })
        .collect();
    SmolStr::new(segments.join(":"))
}
