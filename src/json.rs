//! Bridging between JSON documents and value trees.
//!
//! There is one textual form: integers are JSON numbers when they fit in 64
//! bits and decimal strings otherwise, addresses are lowercase `0x` hex, and
//! `bytes`/`bytesN` are standard base64. On input, binary fields also accept
//! `hex://` or `0x` hex and an explicit `base64://` prefix.

use crate::error::{AbiError, Result};
use crate::path::ValuePath;
use crate::types::{SolidityType, TupleField};
use crate::value::{check_int_range, check_uint_range, parse_address, SolidityValue};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ethers::types::{I256, U256};
use serde_json::{Map, Value};

pub const HEX_PREFIX: &str = "hex://";
pub const BASE64_PREFIX: &str = "base64://";

/// Build a value tree for `ty` from JSON.
pub fn from_json(ty: &SolidityType, json: &Value) -> Result<SolidityValue> {
    from_json_at(ty, json, &ValuePath::root())
}

/// Read an argument list given either as a JSON array or an object keyed by parameter name.
pub fn params_from_json(params: &[TupleField], json: &Value) -> Result<Vec<SolidityValue>> {
    match from_json(&SolidityType::Tuple(params.to_vec()), json)? {
        SolidityValue::Tuple(values) => Ok(values),
        other => Err(AbiError::mismatch(ValuePath::root(), "argument list", other.kind())),
    }
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "JSON boolean",
        Value::Number(_) => "JSON number",
        Value::String(_) => "JSON string",
        Value::Array(_) => "JSON array",
        Value::Object(_) => "JSON object",
    }
}

fn from_json_at(ty: &SolidityType, json: &Value, path: &ValuePath) -> Result<SolidityValue> {
    let mismatch = || AbiError::mismatch(path, ty, json_kind(json));

    match ty {
        SolidityType::Bool => match json {
            Value::Bool(b) => Ok(SolidityValue::Bool(*b)),
            Value::String(s) if s == "true" => Ok(SolidityValue::Bool(true)),
            Value::String(s) if s == "false" => Ok(SolidityValue::Bool(false)),
            _ => Err(mismatch()),
        },
        SolidityType::Uint(bits) => {
            let v = parse_uint(json, path, ty)?;
            check_uint_range(v, *bits, path)?;
            Ok(SolidityValue::Uint(v))
        }
        SolidityType::Int(bits) => {
            let v = parse_int(json, path, ty)?;
            check_int_range(v, *bits, path)?;
            Ok(SolidityValue::Int(v))
        }
        SolidityType::Address => match json {
            Value::String(s) => Ok(SolidityValue::Address(parse_address(s.trim(), path)?)),
            _ => Err(mismatch()),
        },
        SolidityType::FixedBytes(len) => {
            let bytes = match json {
                Value::String(s) => parse_binary(s, path)?,
                _ => return Err(mismatch()),
            };
            if bytes.len() != *len {
                return Err(AbiError::mismatch(path, ty, format!("{} bytes", bytes.len())));
            }
            Ok(SolidityValue::FixedBytes(bytes))
        }
        SolidityType::Bytes => match json {
            Value::String(s) => Ok(SolidityValue::Bytes(parse_binary(s, path)?)),
            _ => Err(mismatch()),
        },
        SolidityType::String => match json {
            Value::String(s) => Ok(SolidityValue::String(s.clone())),
            _ => Err(mismatch()),
        },
        SolidityType::FixedArray(inner, len) => {
            let items = json.as_array().ok_or_else(mismatch)?;
            if items.len() != *len {
                return Err(AbiError::ListLengthMismatch {
                    path: path.to_string(),
                    expected: *len,
                    actual: items.len(),
                });
            }
            Ok(SolidityValue::FixedArray(list_from_json(inner, items, path)?))
        }
        SolidityType::Array(inner) => {
            let items = json.as_array().ok_or_else(mismatch)?;
            Ok(SolidityValue::Array(list_from_json(inner, items, path)?))
        }
        SolidityType::Tuple(fields) => match json {
            Value::Array(items) => {
                if items.len() != fields.len() {
                    return Err(AbiError::mismatch(
                        path,
                        format!("{} tuple fields", fields.len()),
                        format!("{} JSON values", items.len()),
                    ));
                }
                let values = fields
                    .iter()
                    .zip(items)
                    .enumerate()
                    .map(|(i, (field, item))| from_json_at(&field.ty, item, &path.member(&field.name, i)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SolidityValue::Tuple(values))
            }
            Value::Object(map) => tuple_from_object(fields, map, path),
            _ => Err(mismatch()),
        },
    }
}

fn list_from_json(inner: &SolidityType, items: &[Value], path: &ValuePath) -> Result<Vec<SolidityValue>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| from_json_at(inner, item, &path.index(i)))
        .collect()
}

fn tuple_from_object(fields: &[TupleField], map: &Map<String, Value>, path: &ValuePath) -> Result<SolidityValue> {
    let mut values = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        // unnamed members can only be addressed by position
        let key = if field.name.is_empty() {
            i.to_string()
        } else {
            field.name.clone()
        };
        let item = map.get(&key).ok_or_else(|| AbiError::MissingField {
            path: path.to_string(),
            field: key.clone(),
        })?;
        values.push(from_json_at(&field.ty, item, &path.member(&field.name, i))?);
    }
    Ok(SolidityValue::Tuple(values))
}

fn parse_uint(json: &Value, path: &ValuePath, ty: &SolidityType) -> Result<U256> {
    match json {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| AbiError::mismatch(path, ty, format!("number {}", n))),
        Value::String(s) => {
            let s = s.trim();
            let parsed = match strip_hex(s) {
                Some(digits) => U256::from_str_radix(digits, 16).ok(),
                None => U256::from_dec_str(s).ok(),
            };
            parsed.ok_or_else(|| AbiError::mismatch(path, ty, format!("'{}'", s)))
        }
        other => Err(AbiError::mismatch(path, ty, json_kind(other))),
    }
}

fn parse_int(json: &Value, path: &ValuePath, ty: &SolidityType) -> Result<I256> {
    match json {
        Value::Number(n) => n
            .as_i64()
            .map(I256::from)
            // positive numbers above i64::MAX still fit the wider signed widths
            .or_else(|| n.as_u64().map(|u| I256::from_raw(U256::from(u))))
            .ok_or_else(|| AbiError::mismatch(path, ty, format!("number {}", n))),
        Value::String(s) => {
            let s = s.trim();
            let parsed = match strip_hex(s) {
                Some(digits) => U256::from_str_radix(digits, 16)
                    .ok()
                    .filter(|raw| raw.bits() < 256)
                    .map(I256::from_raw),
                None => I256::from_dec_str(s).ok(),
            };
            parsed.ok_or_else(|| AbiError::mismatch(path, ty, format!("'{}'", s)))
        }
        other => Err(AbiError::mismatch(path, ty, json_kind(other))),
    }
}

fn strip_hex(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

fn parse_binary(s: &str, path: &ValuePath) -> Result<Vec<u8>> {
    if let Some(digits) = s.strip_prefix(HEX_PREFIX).or_else(|| strip_hex(s)) {
        return hex::decode(digits).map_err(|e| AbiError::mismatch(path, "hex bytes", e));
    }
    let text = s.strip_prefix(BASE64_PREFIX).unwrap_or(s);
    STANDARD
        .decode(text)
        .map_err(|e| AbiError::mismatch(path, "base64 bytes", e))
}

/// Render a value tree as JSON; tuples become arrays.
pub fn to_json(value: &SolidityValue) -> Value {
    match value {
        SolidityValue::Bool(b) => Value::Bool(*b),
        SolidityValue::Uint(v) => {
            if *v <= U256::from(u64::MAX) {
                Value::from(v.as_u64())
            } else {
                Value::String(v.to_string())
            }
        }
        SolidityValue::Int(v) => {
            let text = v.to_string();
            match text.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => Value::String(text),
            }
        }
        SolidityValue::Address(addr) => Value::String(format!("0x{}", hex::encode(addr.as_bytes()))),
        SolidityValue::FixedBytes(bytes) | SolidityValue::Bytes(bytes) => Value::String(STANDARD.encode(bytes)),
        SolidityValue::String(s) => Value::String(s.clone()),
        SolidityValue::FixedArray(items) | SolidityValue::Array(items) | SolidityValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect())
        }
    }
}

/// Render a value tree as JSON with named tuple members rendered as objects.
///
/// Tuples with any unnamed member stay arrays.
pub fn to_json_named(ty: &SolidityType, value: &SolidityValue) -> Value {
    match (ty, value) {
        (SolidityType::Tuple(fields), SolidityValue::Tuple(items))
            if fields.len() == items.len() && fields.iter().all(|f| !f.name.is_empty()) =>
        {
            let map = fields
                .iter()
                .zip(items)
                .map(|(field, item)| (field.name.clone(), to_json_named(&field.ty, item)))
                .collect::<Map<_, _>>();
            Value::Object(map)
        }
        (SolidityType::Tuple(fields), SolidityValue::Tuple(items)) if fields.len() == items.len() => Value::Array(
            fields
                .iter()
                .zip(items)
                .map(|(field, item)| to_json_named(&field.ty, item))
                .collect(),
        ),
        (SolidityType::FixedArray(inner, _), SolidityValue::FixedArray(items))
        | (SolidityType::Array(inner), SolidityValue::Array(items)) => {
            Value::Array(items.iter().map(|item| to_json_named(inner, item)).collect())
        }
        _ => to_json(value),
    }
}
