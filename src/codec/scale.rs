//! SCALE-style layout used by WASM contracts.
//!
//! Integers are fixed-width little-endian (`bits / 8` bytes), booleans one byte,
//! addresses their raw 20 bytes and `bytesN` its raw N bytes. Dynamic bytes,
//! strings and dynamic arrays carry a compact length prefix; fixed arrays and
//! tuples are plain concatenations with no offsets.

use super::WireFormat;
use crate::error::{AbiError, Result};
use crate::path::ValuePath;
use crate::types::SolidityType;
use crate::value::{check_int_range, check_uint_range, SolidityValue};
use ethers::types::{Address, I256, U256};
use parity_scale_codec::{Compact, Decode, Encode};

#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleFormat;

impl WireFormat for ScaleFormat {
    fn encode(&self, ty: &SolidityType, value: &SolidityValue) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        encode_into(ty, value, &ValuePath::root(), &mut out)?;
        Ok(out)
    }

    fn decode(&self, ty: &SolidityType, data: &[u8]) -> Result<SolidityValue> {
        let mut cursor = Cursor { data, offset: 0 };
        cursor.decode(ty)
    }
}

fn compact_len(len: usize, path: &ValuePath) -> Result<Vec<u8>> {
    let len = u32::try_from(len)
        .map_err(|_| AbiError::mismatch(path, "length below 2^32", len))?;
    Ok(Compact(len).encode())
}

fn encode_into(ty: &SolidityType, value: &SolidityValue, path: &ValuePath, out: &mut Vec<u8>) -> Result<()> {
    match (ty, value) {
        (SolidityType::Bool, SolidityValue::Bool(b)) => out.push(u8::from(*b)),
        (SolidityType::Uint(bits), SolidityValue::Uint(v)) => {
            check_uint_range(*v, *bits, path)?;
            let mut le = [0u8; 32];
            v.to_little_endian(&mut le);
            out.extend_from_slice(&le[..bits / 8]);
        }
        (SolidityType::Int(bits), SolidityValue::Int(v)) => {
            check_int_range(*v, *bits, path)?;
            let mut le = [0u8; 32];
            v.into_raw().to_little_endian(&mut le);
            out.extend_from_slice(&le[..bits / 8]);
        }
        (SolidityType::Address, SolidityValue::Address(addr)) => out.extend_from_slice(addr.as_bytes()),
        (SolidityType::FixedBytes(len), SolidityValue::FixedBytes(bytes)) => {
            if bytes.len() != *len {
                return Err(AbiError::mismatch(path, ty, format!("{} bytes", bytes.len())));
            }
            out.extend_from_slice(bytes);
        }
        (SolidityType::Bytes, SolidityValue::Bytes(bytes)) => {
            out.extend(compact_len(bytes.len(), path)?);
            out.extend_from_slice(bytes);
        }
        (SolidityType::String, SolidityValue::String(s)) => {
            out.extend(compact_len(s.len(), path)?);
            out.extend_from_slice(s.as_bytes());
        }
        (SolidityType::FixedArray(inner, len), SolidityValue::FixedArray(items)) => {
            if items.len() != *len {
                return Err(AbiError::ListLengthMismatch {
                    path: path.to_string(),
                    expected: *len,
                    actual: items.len(),
                });
            }
            for (i, item) in items.iter().enumerate() {
                encode_into(inner, item, &path.index(i), out)?;
            }
        }
        (SolidityType::Array(inner), SolidityValue::Array(items)) => {
            out.extend(compact_len(items.len(), path)?);
            for (i, item) in items.iter().enumerate() {
                encode_into(inner, item, &path.index(i), out)?;
            }
        }
        (SolidityType::Tuple(fields), SolidityValue::Tuple(items)) => {
            if fields.len() != items.len() {
                return Err(AbiError::mismatch(
                    path,
                    format!("{} tuple fields", fields.len()),
                    format!("{} values", items.len()),
                ));
            }
            for (i, (field, item)) in fields.iter().zip(items).enumerate() {
                encode_into(&field.ty, item, &path.member(&field.name, i), out)?;
            }
        }
        _ => return Err(AbiError::mismatch(path, ty, value.kind())),
    }
    Ok(())
}

struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let data = self.data;
        let start = self.offset;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= data.len())
            .ok_or_else(|| {
                AbiError::decode(start, format!("need {} bytes but the buffer is {} bytes", len, data.len()))
            })?;
        self.offset = end;
        Ok(&data[start..end])
    }

    fn compact_len(&mut self) -> Result<usize> {
        let start = self.offset;
        let mut input = &self.data[start..];
        let before = input.len();
        let Compact(len) = Compact::<u32>::decode(&mut input)
            .map_err(|e| AbiError::decode(start, format!("invalid compact length: {}", e)))?;
        self.offset += before - input.len();
        let len = len as usize;
        if len > self.data.len() {
            return Err(AbiError::decode(start, format!("length {} exceeds the buffer", len)));
        }
        Ok(len)
    }

    fn decode(&mut self, ty: &SolidityType) -> Result<SolidityValue> {
        let start = self.offset;
        match ty {
            SolidityType::Bool => match self.take(1)?[0] {
                0 => Ok(SolidityValue::Bool(false)),
                1 => Ok(SolidityValue::Bool(true)),
                _ => Err(AbiError::decode(start, "invalid boolean byte")),
            },
            SolidityType::Uint(bits) => {
                let mut le = [0u8; 32];
                le[..bits / 8].copy_from_slice(self.take(bits / 8)?);
                Ok(SolidityValue::Uint(U256::from_little_endian(&le)))
            }
            SolidityType::Int(bits) => {
                let bytes = self.take(bits / 8)?;
                let fill = if bytes[bytes.len() - 1] & 0x80 != 0 { 0xff } else { 0 };
                let mut le = [fill; 32];
                le[..bytes.len()].copy_from_slice(bytes);
                Ok(SolidityValue::Int(I256::from_raw(U256::from_little_endian(&le))))
            }
            SolidityType::Address => Ok(SolidityValue::Address(Address::from_slice(self.take(20)?))),
            SolidityType::FixedBytes(len) => Ok(SolidityValue::FixedBytes(self.take(*len)?.to_vec())),
            SolidityType::Bytes => {
                let len = self.compact_len()?;
                Ok(SolidityValue::Bytes(self.take(len)?.to_vec()))
            }
            SolidityType::String => {
                let len = self.compact_len()?;
                let body = self.offset;
                let bytes = self.take(len)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| AbiError::decode(body + e.valid_up_to(), "invalid UTF-8 in string"))?;
                Ok(SolidityValue::String(s.to_string()))
            }
            SolidityType::FixedArray(inner, len) => {
                let items = (0..*len).map(|_| self.decode(inner)).collect::<Result<Vec<_>>>()?;
                Ok(SolidityValue::FixedArray(items))
            }
            SolidityType::Array(inner) => {
                let len = self.compact_len()?;
                let items = (0..len).map(|_| self.decode(inner)).collect::<Result<Vec<_>>>()?;
                Ok(SolidityValue::Array(items))
            }
            SolidityType::Tuple(fields) => {
                let items = fields.iter().map(|f| self.decode(&f.ty)).collect::<Result<Vec<_>>>()?;
                Ok(SolidityValue::Tuple(items))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TupleField;

    #[test]
    fn integers_are_little_endian_and_width_sized() {
        let encoded = ScaleFormat.encode(&SolidityType::Uint(32), &SolidityValue::uint(0x01020304)).unwrap();
        assert_eq!(encoded, vec![0x04, 0x03, 0x02, 0x01]);
        let encoded = ScaleFormat.encode(&SolidityType::Int(16), &SolidityValue::int(-2)).unwrap();
        assert_eq!(encoded, vec![0xfe, 0xff]);
        assert_eq!(
            ScaleFormat.decode(&SolidityType::Int(16), &encoded).unwrap(),
            SolidityValue::int(-2)
        );
    }

    #[test]
    fn strings_carry_compact_length() {
        let encoded = ScaleFormat.encode(&SolidityType::String, &SolidityValue::string("abc")).unwrap();
        assert_eq!(encoded, vec![0x0c, b'a', b'b', b'c']);
    }

    #[test]
    fn struct_round_trip() {
        let ty = SolidityType::Tuple(vec![
            TupleField::new("name", SolidityType::String),
            TupleField::new("count", SolidityType::Int(256)),
            TupleField::new(
                "items",
                SolidityType::Array(Box::new(SolidityType::FixedArray(Box::new(SolidityType::Uint(64)), 2))),
            ),
        ]);
        let value = SolidityValue::Tuple(vec![
            SolidityValue::string("Hello world!"),
            SolidityValue::int(-100),
            SolidityValue::Array(vec![SolidityValue::FixedArray(vec![
                SolidityValue::uint(1),
                SolidityValue::uint(u64::MAX),
            ])]),
        ]);
        let encoded = ScaleFormat.encode(&ty, &value).unwrap();
        assert_eq!(ScaleFormat.decode(&ty, &encoded).unwrap(), value);
    }

    #[test]
    fn truncated_input_fails() {
        assert!(matches!(
            ScaleFormat.decode(&SolidityType::Uint(64), &[1, 2, 3]),
            Err(AbiError::Decode { offset: 0, .. })
        ));
        assert!(matches!(
            ScaleFormat.decode(&SolidityType::Bytes, &[0x10, 1]),
            Err(AbiError::Decode { offset: 0, .. })
        ));
        assert!(ScaleFormat.decode(&SolidityType::Bool, &[2]).is_err());
    }
}
