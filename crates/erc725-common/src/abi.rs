//! Structural value codec.
//!
//! Scalars are tightly packed (a `uint32` is 4 bytes, an `address` 20). `T[]` uses
//! the Solidity ABI encoding of a single dynamic array argument, so it is readable
//! by contracts. `T[CompactBytesArray]` prefixes every element with its length as
//! a big-endian `uint16`. Empty input always decodes to [`Value::Null`].

use crate::error::{CodecError, Result};
use crate::types::ValueType;
use crate::value::Value;
use alloy_primitives::{Address, Bytes, I256, U256};

const WORD: usize = 32;

/// Encode `value` as `ty`. [`Value::Null`] encodes to empty bytes for any type.
pub fn encode_value_type(ty: &ValueType, value: &Value) -> Result<Bytes> {
    if value.is_null() {
        return Ok(Bytes::new());
    }
    match ty {
        ValueType::Array(element) => encode_abi_array(ty, element, value),
        ValueType::CompactBytesArray(element) => encode_compact_array(ty, element, value),
        scalar => encode_scalar(scalar, value).map(Bytes::from),
    }
}

/// Decode `data` as `ty`
pub fn decode_value_type(ty: &ValueType, data: &[u8]) -> Result<Value> {
    if data.is_empty() {
        return Ok(Value::Null);
    }
    match ty {
        ValueType::Array(element) => decode_abi_array(ty, element, data),
        ValueType::CompactBytesArray(element) => decode_compact_array(ty, element, data),
        scalar => decode_scalar(scalar, data),
    }
}

fn items<'v>(ty: &ValueType, value: &'v Value) -> Result<&'v [Value]> {
    value.as_array().ok_or_else(|| {
        CodecError::invalid_value(
            ty.to_string(),
            format!("expected an array, got {}", value.kind()),
        )
    })
}

fn wrong_kind(ty: &ValueType, value: &Value) -> CodecError {
    CodecError::invalid_value(ty.to_string(), format!("cannot encode a {} value", value.kind()))
}

fn encode_scalar(ty: &ValueType, value: &Value) -> Result<Vec<u8>> {
    match ty {
        ValueType::String => match value {
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            other => Err(wrong_kind(ty, other)),
        },
        ValueType::Address => value
            .to_address()
            .map(|addr| addr.to_vec())
            .ok_or_else(|| wrong_kind(ty, value)),
        ValueType::Bool => value
            .to_bool()
            .map(|b| vec![u8::from(b)])
            .ok_or_else(|| wrong_kind(ty, value)),
        ValueType::Uint(bits) => {
            let n = value.to_u256().ok_or_else(|| wrong_kind(ty, value))?;
            if n.bit_len() > usize::from(*bits) {
                return Err(CodecError::invalid_value(
                    ty.to_string(),
                    format!("{n} does not fit in {bits} bits"),
                ));
            }
            let word = n.to_be_bytes::<WORD>();
            Ok(word[WORD - usize::from(*bits) / 8..].to_vec())
        }
        ValueType::Int(bits) => {
            let n = value.to_i256().ok_or_else(|| wrong_kind(ty, value))?;
            let width = usize::from(*bits) / 8;
            let word = n.into_raw().to_be_bytes::<WORD>();
            let packed = &word[WORD - width..];
            if sign_extend(packed) != n {
                return Err(CodecError::invalid_value(
                    ty.to_string(),
                    format!("{n} does not fit in {bits} bits"),
                ));
            }
            Ok(packed.to_vec())
        }
        ValueType::FixedBytes(n) => {
            let bytes = value.to_bytes().ok_or_else(|| wrong_kind(ty, value))?;
            let width = usize::from(*n);
            if bytes.len() > width {
                return Err(CodecError::invalid_value(
                    ty.to_string(),
                    format!("{} bytes do not fit in {width}", bytes.len()),
                ));
            }
            let mut out = bytes.to_vec();
            out.resize(width, 0);
            Ok(out)
        }
        ValueType::Bytes => value
            .to_bytes()
            .map(|b| b.to_vec())
            .ok_or_else(|| wrong_kind(ty, value)),
        ValueType::Array(_) | ValueType::CompactBytesArray(_) => Err(CodecError::invalid_value(
            ty.to_string(),
            "nested arrays are not supported",
        )),
    }
}

fn sign_extend(packed: &[u8]) -> I256 {
    let fill = if packed.first().is_some_and(|b| b & 0x80 != 0) {
        0xff
    } else {
        0
    };
    let mut word = [fill; WORD];
    word[WORD - packed.len()..].copy_from_slice(packed);
    I256::from_raw(U256::from_be_bytes(word))
}

fn decode_scalar(ty: &ValueType, data: &[u8]) -> Result<Value> {
    let malformed = |reason: String| CodecError::malformed(ty.to_string(), reason);
    match ty {
        ValueType::String => String::from_utf8(data.to_vec())
            .map(Value::String)
            .map_err(|e| malformed(e.to_string())),
        ValueType::Address => match data.len() {
            20 => Ok(Value::Address(Address::from_slice(data))),
            WORD if data[..12].iter().all(|b| *b == 0) => {
                Ok(Value::Address(Address::from_slice(&data[12..])))
            }
            len => Err(malformed(format!("expected 20 bytes, got {len}"))),
        },
        ValueType::Bool => {
            let (last, rest) = data
                .split_last()
                .ok_or_else(|| malformed("no data".into()))?;
            if rest.iter().any(|b| *b != 0) || *last > 1 {
                return Err(malformed(format!(
                    "not a boolean: 0x{}",
                    alloy_primitives::hex::encode(data)
                )));
            }
            Ok(Value::Bool(*last == 1))
        }
        ValueType::Uint(bits) => {
            let n = U256::try_from_be_slice(data)
                .ok_or_else(|| malformed(format!("{} bytes exceed 32", data.len())))?;
            if n.bit_len() > usize::from(*bits) {
                return Err(malformed(format!("{n} does not fit in {bits} bits")));
            }
            Ok(Value::Number(n))
        }
        ValueType::Int(bits) => {
            let width = usize::from(*bits) / 8;
            if data.len() != width && data.len() != WORD {
                return Err(malformed(format!("expected {width} bytes, got {}", data.len())));
            }
            Ok(Value::Int(sign_extend(data)))
        }
        ValueType::FixedBytes(n) => {
            if data.len() != usize::from(*n) {
                return Err(malformed(format!("expected {n} bytes, got {}", data.len())));
            }
            Ok(Value::Bytes(Bytes::copy_from_slice(data)))
        }
        ValueType::Bytes => Ok(Value::Bytes(Bytes::copy_from_slice(data))),
        ValueType::Array(_) | ValueType::CompactBytesArray(_) => {
            Err(malformed("nested arrays are not supported".into()))
        }
    }
}

fn word_of(n: usize) -> [u8; WORD] {
    U256::from(n).to_be_bytes::<WORD>()
}

fn pad_to_word(bytes: &mut Vec<u8>) {
    let rem = bytes.len() % WORD;
    if rem != 0 {
        bytes.resize(bytes.len() + WORD - rem, 0);
    }
}

/// One static element widened to a full ABI word
fn encode_word(ty: &ValueType, value: &Value) -> Result<[u8; WORD]> {
    let packed = encode_scalar(ty, value)?;
    let mut word = [0u8; WORD];
    match ty {
        ValueType::FixedBytes(_) => word[..packed.len()].copy_from_slice(&packed),
        ValueType::Int(_) => word = sign_extend(&packed).into_raw().to_be_bytes::<WORD>(),
        _ => word[WORD - packed.len()..].copy_from_slice(&packed),
    }
    Ok(word)
}

fn decode_word(ty: &ValueType, word: &[u8]) -> Result<Value> {
    match ty {
        ValueType::FixedBytes(n) => {
            let width = usize::from(*n);
            if word[width..].iter().any(|b| *b != 0) {
                return Err(CodecError::malformed(ty.to_string(), "dirty padding"));
            }
            decode_scalar(ty, &word[..width])
        }
        ValueType::Int(bits) => {
            let n = sign_extend(word);
            let width = usize::from(*bits) / 8;
            if sign_extend(&word[WORD - width..]) != n {
                return Err(CodecError::malformed(
                    ty.to_string(),
                    format!("{n} does not fit in {bits} bits"),
                ));
            }
            Ok(Value::Int(n))
        }
        _ => decode_scalar(ty, word),
    }
}

fn encode_abi_array(ty: &ValueType, element: &ValueType, value: &Value) -> Result<Bytes> {
    let items = items(ty, value)?;
    let mut out = Vec::with_capacity(WORD * (2 + items.len()));
    out.extend_from_slice(&word_of(WORD));
    out.extend_from_slice(&word_of(items.len()));

    if !element.is_dynamic() {
        for item in items {
            out.extend_from_slice(&encode_word(element, item)?);
        }
        return Ok(out.into());
    }

    let mut heads = Vec::with_capacity(WORD * items.len());
    let mut tails = Vec::new();
    for item in items {
        let data = match item {
            Value::Null => Vec::new(),
            item => encode_scalar(element, item)?,
        };
        heads.extend_from_slice(&word_of(WORD * items.len() + tails.len()));
        tails.extend_from_slice(&word_of(data.len()));
        tails.extend_from_slice(&data);
        pad_to_word(&mut tails);
    }
    out.extend_from_slice(&heads);
    out.extend_from_slice(&tails);
    Ok(out.into())
}

fn read_usize(ty: &ValueType, data: &[u8], at: usize) -> Result<usize> {
    let word = data
        .get(at..at + WORD)
        .ok_or_else(|| CodecError::malformed(ty.to_string(), format!("truncated at byte {at}")))?;
    let n = U256::from_be_slice(word);
    usize::try_from(n)
        .ok()
        .filter(|n| *n <= data.len())
        .ok_or_else(|| CodecError::malformed(ty.to_string(), format!("out of range offset {n}")))
}

fn decode_abi_array(ty: &ValueType, element: &ValueType, data: &[u8]) -> Result<Value> {
    let offset = read_usize(ty, data, 0)?;
    let len = read_usize(ty, data, offset)?;
    let body = offset + WORD;
    let slice = |at: usize, n: usize| {
        data.get(at..at + n)
            .ok_or_else(|| CodecError::malformed(ty.to_string(), format!("truncated at byte {at}")))
    };

    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let head = body + i * WORD;
        if element.is_dynamic() {
            let at = body + read_usize(ty, data, head)?;
            let n = read_usize(ty, data, at)?;
            out.push(decode_value_type(element, slice(at + WORD, n)?)?);
        } else {
            out.push(decode_word(element, slice(head, WORD)?)?);
        }
    }
    Ok(Value::Array(out))
}

fn encode_compact_array(ty: &ValueType, element: &ValueType, value: &Value) -> Result<Bytes> {
    let mut out = Vec::new();
    for item in items(ty, value)? {
        let data = encode_value_type(element, item)?;
        let len = u16::try_from(data.len()).map_err(|_| {
            CodecError::invalid_value(
                ty.to_string(),
                format!("element of {} bytes exceeds 65535", data.len()),
            )
        })?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&data);
    }
    Ok(out.into())
}

fn decode_compact_array(ty: &ValueType, element: &ValueType, data: &[u8]) -> Result<Value> {
    let mut out = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let (len, tail) = rest
            .split_first_chunk::<2>()
            .ok_or_else(|| CodecError::malformed(ty.to_string(), "truncated length prefix"))?;
        let len = usize::from(u16::from_be_bytes(*len));
        if tail.len() < len {
            return Err(CodecError::malformed(
                ty.to_string(),
                format!("element of {len} bytes overruns {} remaining", tail.len()),
            ));
        }
        let (item, tail) = tail.split_at(len);
        out.push(decode_value_type(element, item)?);
        rest = tail;
    }
    Ok(Value::Array(out))
}
