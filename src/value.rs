use crate::error::{AbiError, Result};
use crate::path::ValuePath;
use crate::types::{SolidityType, TupleField};
use ethers::types::{Address, I256, U256};
use std::collections::HashMap;
use std::fmt;

/// Concrete value tree mirroring a [`SolidityType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolidityValue {
    Bool(bool),
    Uint(U256),
    Int(I256),
    Address(Address),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    FixedArray(Vec<SolidityValue>),
    Array(Vec<SolidityValue>),
    Tuple(Vec<SolidityValue>),
}

impl SolidityValue {
    pub fn uint(v: u64) -> Self {
        SolidityValue::Uint(U256::from(v))
    }

    pub fn int(v: i64) -> Self {
        SolidityValue::Int(I256::from(v))
    }

    pub fn string(s: impl Into<String>) -> Self {
        SolidityValue::String(s.into())
    }

    pub fn address_from_str(s: &str) -> Result<Self> {
        Ok(SolidityValue::Address(parse_address(s, &ValuePath::root())?))
    }

    /// Short name of the value's kind, used in mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            SolidityValue::Bool(_) => "bool",
            SolidityValue::Uint(_) => "uint",
            SolidityValue::Int(_) => "int",
            SolidityValue::Address(_) => "address",
            SolidityValue::FixedBytes(_) => "fixed bytes",
            SolidityValue::Bytes(_) => "bytes",
            SolidityValue::String(_) => "string",
            SolidityValue::FixedArray(_) => "fixed array",
            SolidityValue::Array(_) => "array",
            SolidityValue::Tuple(_) => "tuple",
        }
    }

    /// Check that this value structurally conforms to `ty`.
    pub fn type_check(&self, ty: &SolidityType) -> Result<()> {
        self.type_check_at(ty, &ValuePath::root())
    }

    pub(crate) fn type_check_at(&self, ty: &SolidityType, path: &ValuePath) -> Result<()> {
        match (ty, self) {
            (SolidityType::Bool, SolidityValue::Bool(_))
            | (SolidityType::Address, SolidityValue::Address(_))
            | (SolidityType::Bytes, SolidityValue::Bytes(_))
            | (SolidityType::String, SolidityValue::String(_)) => Ok(()),
            (SolidityType::Uint(bits), SolidityValue::Uint(v)) => check_uint_range(*v, *bits, path),
            (SolidityType::Int(bits), SolidityValue::Int(v)) => check_int_range(*v, *bits, path),
            (SolidityType::FixedBytes(len), SolidityValue::FixedBytes(bytes)) => {
                if bytes.len() == *len {
                    Ok(())
                } else {
                    Err(AbiError::mismatch(path, ty, format!("{} bytes", bytes.len())))
                }
            }
            (SolidityType::FixedArray(inner, len), SolidityValue::FixedArray(items)) => {
                if items.len() != *len {
                    return Err(AbiError::ListLengthMismatch {
                        path: path.to_string(),
                        expected: *len,
                        actual: items.len(),
                    });
                }
                check_items(inner, items, path)
            }
            (SolidityType::Array(inner), SolidityValue::Array(items)) => check_items(inner, items, path),
            (SolidityType::Tuple(fields), SolidityValue::Tuple(items)) => {
                if fields.len() != items.len() {
                    return Err(AbiError::mismatch(
                        path,
                        format!("{} tuple fields", fields.len()),
                        format!("{} values", items.len()),
                    ));
                }
                for (i, (field, item)) in fields.iter().zip(items).enumerate() {
                    item.type_check_at(&field.ty, &path.member(&field.name, i))?;
                }
                Ok(())
            }
            _ => Err(AbiError::mismatch(path, ty, self.kind())),
        }
    }
}

fn check_items(inner: &SolidityType, items: &[SolidityValue], path: &ValuePath) -> Result<()> {
    for (i, item) in items.iter().enumerate() {
        item.type_check_at(inner, &path.index(i))?;
    }
    Ok(())
}

pub(crate) fn check_uint_range(v: U256, bits: usize, path: &ValuePath) -> Result<()> {
    if v.bits() <= bits {
        Ok(())
    } else {
        Err(AbiError::mismatch(path, format!("uint{}", bits), format!("out-of-range value {}", v)))
    }
}

pub(crate) fn check_int_range(v: I256, bits: usize, path: &ValuePath) -> Result<()> {
    if int_fits(v, bits) {
        Ok(())
    } else {
        Err(AbiError::mismatch(path, format!("int{}", bits), format!("out-of-range value {}", v)))
    }
}

/// A two's-complement value fits in `bits` when every bit above the sign bit
/// repeats the sign.
pub(crate) fn int_fits(v: I256, bits: usize) -> bool {
    if bits >= 256 {
        return true;
    }
    let high = v.into_raw() >> (bits - 1);
    high.is_zero() || high == (U256::MAX >> (bits - 1))
}

pub(crate) fn parse_address(s: &str, path: &ValuePath) -> Result<Address> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|_| AbiError::mismatch(path, "address", format!("'{}'", s)))?;
    if bytes.len() != 20 {
        return Err(AbiError::mismatch(path, "20-byte address", format!("{} bytes", bytes.len())));
    }
    Ok(Address::from_slice(&bytes))
}

/// Builds a tuple value from named members in the descriptor's declared order.
#[derive(Debug)]
pub struct TupleBuilder<'a> {
    fields: &'a [TupleField],
    values: HashMap<String, SolidityValue>,
}

impl<'a> TupleBuilder<'a> {
    pub fn new(ty: &'a SolidityType) -> Result<Self> {
        match ty {
            SolidityType::Tuple(fields) => Ok(Self {
                fields,
                values: HashMap::new(),
            }),
            other => Err(AbiError::mismatch(ValuePath::root(), "tuple", other)),
        }
    }

    pub fn set(mut self, name: &str, value: SolidityValue) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn build(mut self) -> Result<SolidityValue> {
        let path = ValuePath::root();
        let mut items = Vec::with_capacity(self.fields.len());
        for (i, field) in self.fields.iter().enumerate() {
            let value = self.values.remove(&field.name).ok_or_else(|| AbiError::MissingField {
                path: path.to_string(),
                field: field.name.clone(),
            })?;
            value.type_check_at(&field.ty, &path.member(&field.name, i))?;
            items.push(value);
        }
        if let Some(unknown) = self.values.keys().next() {
            return Err(AbiError::mismatch(path.field(unknown), "no such field", "a value"));
        }
        Ok(SolidityValue::Tuple(items))
    }
}

impl fmt::Display for SolidityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::json::to_json(self))
    }
}
