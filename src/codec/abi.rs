//! Ethereum-style head/tail ABI encoding.
//!
//! Every scalar occupies one 32-byte word. Sequences (tuples, fixed arrays and
//! the element region of dynamic arrays) are laid out as a head of fixed-size
//! slots followed by a tail holding the contents of dynamic members; the head
//! slot of a dynamic member stores its tail offset relative to the start of the
//! sequence.

use super::WireFormat;
use crate::error::{AbiError, Result};
use crate::path::ValuePath;
use crate::types::{SolidityType, WORD};
use crate::value::{check_int_range, check_uint_range, int_fits, SolidityValue};
use ethers::types::{Address, I256, U256};
use std::cell::Cell;

#[derive(Debug, Clone, Copy, Default)]
pub struct AbiFormat;

impl WireFormat for AbiFormat {
    fn encode(&self, ty: &SolidityType, value: &SolidityValue) -> Result<Vec<u8>> {
        encode(ty, value)
    }

    fn decode(&self, ty: &SolidityType, data: &[u8]) -> Result<SolidityValue> {
        decode(ty, data, 0)
    }
}

/// Encode `value` against `ty`.
///
/// Tuples passed here are laid out exactly like a parameter list, so a
/// function's arguments are encoded as one tuple of its inputs.
pub fn encode(ty: &SolidityType, value: &SolidityValue) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded_len(ty, value));
    out.extend(encode_at(ty, value, &ValuePath::root())?);
    Ok(out)
}

/// Number of bytes `encode` produces for a conforming value.
pub fn encoded_len(ty: &SolidityType, value: &SolidityValue) -> usize {
    match (ty, value) {
        (SolidityType::Bytes, SolidityValue::Bytes(b)) => WORD + padded_len(b.len()),
        (SolidityType::String, SolidityValue::String(s)) => WORD + padded_len(s.len()),
        (SolidityType::FixedArray(inner, _), SolidityValue::FixedArray(items)) => {
            sequence_len(items.iter().map(|item| (inner.as_ref(), item)))
        }
        (SolidityType::Array(inner), SolidityValue::Array(items)) => {
            WORD + sequence_len(items.iter().map(|item| (inner.as_ref(), item)))
        }
        (SolidityType::Tuple(fields), SolidityValue::Tuple(items)) => {
            sequence_len(fields.iter().map(|f| &f.ty).zip(items))
        }
        _ => WORD,
    }
}

fn sequence_len<'a>(members: impl Iterator<Item = (&'a SolidityType, &'a SolidityValue)>) -> usize {
    members
        .map(|(ty, value)| {
            if ty.is_dynamic() {
                WORD + encoded_len(ty, value)
            } else {
                ty.head_size()
            }
        })
        .sum()
}

fn padded_len(len: usize) -> usize {
    (len + WORD - 1) / WORD * WORD
}

fn encode_at(ty: &SolidityType, value: &SolidityValue, path: &ValuePath) -> Result<Vec<u8>> {
    match (ty, value) {
        (SolidityType::Bool, SolidityValue::Bool(b)) => {
            let mut word = [0u8; WORD];
            word[WORD - 1] = u8::from(*b);
            Ok(word.to_vec())
        }
        (SolidityType::Uint(bits), SolidityValue::Uint(v)) => {
            check_uint_range(*v, *bits, path)?;
            Ok(u256_word(*v).to_vec())
        }
        (SolidityType::Int(bits), SolidityValue::Int(v)) => {
            check_int_range(*v, *bits, path)?;
            Ok(u256_word(v.into_raw()).to_vec())
        }
        (SolidityType::Address, SolidityValue::Address(addr)) => {
            let mut word = [0u8; WORD];
            word[WORD - 20..].copy_from_slice(addr.as_bytes());
            Ok(word.to_vec())
        }
        (SolidityType::FixedBytes(len), SolidityValue::FixedBytes(bytes)) => {
            if bytes.len() != *len {
                return Err(AbiError::mismatch(path, ty, format!("{} bytes", bytes.len())));
            }
            let mut word = [0u8; WORD];
            word[..*len].copy_from_slice(bytes);
            Ok(word.to_vec())
        }
        (SolidityType::Bytes, SolidityValue::Bytes(bytes)) => Ok(encode_dynamic_bytes(bytes)),
        (SolidityType::String, SolidityValue::String(s)) => Ok(encode_dynamic_bytes(s.as_bytes())),
        (SolidityType::FixedArray(inner, len), SolidityValue::FixedArray(items)) => {
            if items.len() != *len {
                return Err(AbiError::ListLengthMismatch {
                    path: path.to_string(),
                    expected: *len,
                    actual: items.len(),
                });
            }
            let members: Vec<_> = items
                .iter()
                .enumerate()
                .map(|(i, item)| (inner.as_ref(), item, path.index(i)))
                .collect();
            encode_sequence(&members)
        }
        (SolidityType::Array(inner), SolidityValue::Array(items)) => {
            let members: Vec<_> = items
                .iter()
                .enumerate()
                .map(|(i, item)| (inner.as_ref(), item, path.index(i)))
                .collect();
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_sequence(&members)?);
            Ok(out)
        }
        (SolidityType::Tuple(fields), SolidityValue::Tuple(items)) => {
            if fields.len() != items.len() {
                return Err(AbiError::mismatch(
                    path,
                    format!("{} tuple fields", fields.len()),
                    format!("{} values", items.len()),
                ));
            }
            let members: Vec<_> = fields
                .iter()
                .zip(items)
                .enumerate()
                .map(|(i, (field, item))| (&field.ty, item, path.member(&field.name, i)))
                .collect();
            encode_sequence(&members)
        }
        _ => Err(AbiError::mismatch(path, ty, value.kind())),
    }
}

/// Head/tail layout over a sequence of members; a static sequence is head-only.
fn encode_sequence(members: &[(&SolidityType, &SolidityValue, ValuePath)]) -> Result<Vec<u8>> {
    let head_len: usize = members.iter().map(|(ty, _, _)| ty.head_size()).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (ty, value, path) in members {
        let encoded = encode_at(ty, value, path)?;
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_dynamic_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(WORD + padded_len(bytes.len()));
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded_len(bytes.len()), 0);
    out
}

fn u256_word(v: U256) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    v.to_big_endian(&mut word);
    word
}

fn usize_word(n: usize) -> [u8; WORD] {
    u256_word(U256::from(n as u64))
}

/// Decode a value of type `ty` whose encoding starts at `base_offset`.
///
/// Offsets may alias, so the decoder charges every word and byte slice it
/// reads (plus one unit per node) against a budget proportional to
/// `data.len()` and fails once it is spent.
pub fn decode(ty: &SolidityType, data: &[u8], base_offset: usize) -> Result<SolidityValue> {
    let budget = data
        .len()
        .saturating_mul(READ_BUDGET_FACTOR)
        .saturating_add(READ_BUDGET_SLACK);
    Decoder {
        data,
        budget: Cell::new(budget),
    }
    .decode_at(ty, base_offset)
}

const READ_BUDGET_FACTOR: usize = 4;
const READ_BUDGET_SLACK: usize = 4096;

struct Decoder<'a> {
    data: &'a [u8],
    budget: Cell<usize>,
}

impl<'a> Decoder<'a> {
    fn charge(&self, offset: usize, units: usize) -> Result<()> {
        let left = self.budget.get().checked_sub(units).ok_or_else(|| {
            AbiError::decode(
                offset,
                format!("aliased offsets would expand a {}-byte buffer past its read budget", self.data.len()),
            )
        })?;
        self.budget.set(left);
        Ok(())
    }

    fn word(&self, offset: usize) -> Result<&'a [u8]> {
        self.charge(offset, WORD)?;
        let data = self.data;
        offset
            .checked_add(WORD)
            .filter(|end| *end <= data.len())
            .map(|end| &data[offset..end])
            .ok_or_else(|| {
                AbiError::decode(
                    offset,
                    format!("need a 32-byte word but the buffer is {} bytes", data.len()),
                )
            })
    }

    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        self.charge(offset, len)?;
        let data = self.data;
        offset
            .checked_add(len)
            .filter(|end| *end <= data.len())
            .map(|end| &data[offset..end])
            .ok_or_else(|| {
                AbiError::decode(
                    offset,
                    format!("need {} bytes but the buffer is {} bytes", len, data.len()),
                )
            })
    }

    /// Read a length or offset word, rejecting values that cannot index the buffer.
    fn read_usize(&self, offset: usize, what: &str) -> Result<usize> {
        let v = U256::from_big_endian(self.word(offset)?);
        if v > U256::from(self.data.len() as u64) {
            return Err(AbiError::decode(
                offset,
                format!("{} {} exceeds the buffer length {}", what, v, self.data.len()),
            ));
        }
        Ok(v.as_usize())
    }

    fn decode_at(&self, ty: &SolidityType, offset: usize) -> Result<SolidityValue> {
        self.charge(offset, 1)?;
        match ty {
            SolidityType::Bool => {
                let word = self.word(offset)?;
                if word[..WORD - 1].iter().any(|b| *b != 0) || word[WORD - 1] > 1 {
                    return Err(AbiError::decode(offset, "invalid boolean word"));
                }
                Ok(SolidityValue::Bool(word[WORD - 1] == 1))
            }
            SolidityType::Uint(bits) => {
                let v = U256::from_big_endian(self.word(offset)?);
                if v.bits() > *bits {
                    return Err(AbiError::decode(offset, format!("value does not fit uint{}", bits)));
                }
                Ok(SolidityValue::Uint(v))
            }
            SolidityType::Int(bits) => {
                let v = I256::from_raw(U256::from_big_endian(self.word(offset)?));
                if !int_fits(v, *bits) {
                    return Err(AbiError::decode(offset, format!("value does not fit int{}", bits)));
                }
                Ok(SolidityValue::Int(v))
            }
            SolidityType::Address => {
                let word = self.word(offset)?;
                if word[..WORD - 20].iter().any(|b| *b != 0) {
                    return Err(AbiError::decode(offset, "address word has non-zero padding"));
                }
                Ok(SolidityValue::Address(Address::from_slice(&word[WORD - 20..])))
            }
            SolidityType::FixedBytes(len) => {
                let word = self.word(offset)?;
                if word[*len..].iter().any(|b| *b != 0) {
                    return Err(AbiError::decode(offset, format!("bytes{} word has non-zero padding", len)));
                }
                Ok(SolidityValue::FixedBytes(word[..*len].to_vec()))
            }
            SolidityType::Bytes => Ok(SolidityValue::Bytes(self.dynamic_bytes(offset)?.to_vec())),
            SolidityType::String => {
                let bytes = self.dynamic_bytes(offset)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| AbiError::decode(offset + WORD + e.valid_up_to(), "invalid UTF-8 in string"))?;
                Ok(SolidityValue::String(s.to_string()))
            }
            SolidityType::FixedArray(inner, len) => {
                let types = std::iter::repeat(inner.as_ref()).take(*len);
                Ok(SolidityValue::FixedArray(self.decode_sequence(types, offset)?))
            }
            SolidityType::Array(inner) => {
                let len = self.read_usize(offset, "array length")?;
                let start = offset + WORD;
                let needed = len
                    .checked_mul(inner.head_size())
                    .ok_or_else(|| AbiError::decode(offset, "array length overflows"))?;
                if needed > self.data.len().saturating_sub(start) || (needed == 0 && len > self.data.len()) {
                    return Err(AbiError::decode(
                        offset,
                        format!("array of {} elements does not fit the buffer", len),
                    ));
                }
                let types = std::iter::repeat(inner.as_ref()).take(len);
                Ok(SolidityValue::Array(self.decode_sequence(types, start)?))
            }
            SolidityType::Tuple(fields) => {
                let types = fields.iter().map(|f| &f.ty);
                Ok(SolidityValue::Tuple(self.decode_sequence(types, offset)?))
            }
        }
    }

    fn dynamic_bytes(&self, offset: usize) -> Result<&'a [u8]> {
        let len = self.read_usize(offset, "byte length")?;
        self.slice(offset + WORD, len)
    }

    /// Walk the head of a sequence starting at `base`; dynamic members are
    /// dereferenced relative to `base`.
    fn decode_sequence<'t>(
        &self,
        types: impl Iterator<Item = &'t SolidityType>,
        base: usize,
    ) -> Result<Vec<SolidityValue>> {
        let mut head = base;
        let mut values = Vec::new();
        for ty in types {
            let value = if ty.is_dynamic() {
                let rel = self.read_usize(head, "offset")?;
                let target = base
                    .checked_add(rel)
                    .ok_or_else(|| AbiError::decode(head, "offset overflows"))?;
                self.decode_at(ty, target)?
            } else {
                self.decode_at(ty, head)?
            };
            values.push(value);
            head += ty.head_size();
        }
        Ok(values)
    }
}
