// type definitions

use crate::definition::AbiParam;
use crate::error::{AbiError, Result};
use std::fmt;

/// Size of one ABI word.
pub const WORD: usize = 32;

/// Schema node describing one ABI type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolidityType {
    Bool,
    Uint(usize),
    Int(usize),
    Address,
    FixedBytes(usize),
    Bytes,
    String,
    FixedArray(Box<SolidityType>, usize),
    Array(Box<SolidityType>),
    Tuple(Vec<TupleField>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleField {
    pub name: String,
    pub ty: SolidityType,
}

impl TupleField {
    pub fn new(name: impl Into<String>, ty: SolidityType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl SolidityType {
    /// Build a descriptor from a JSON ABI `type` string and its `components`.
    ///
    /// Array suffixes are peeled right to left, so `tuple[2][]` is a dynamic array
    /// of two-element fixed arrays of tuples.
    pub fn parse(type_str: &str, components: &[AbiParam]) -> Result<Self> {
        let ty = type_str.trim();

        if let Some(stripped) = ty.strip_suffix(']') {
            let open = stripped
                .rfind('[')
                .ok_or_else(|| AbiError::UnrecognizedType(ty.to_string()))?;
            let inner = Box::new(Self::parse(&stripped[..open], components)?);
            let len = &stripped[open + 1..];
            if len.is_empty() {
                return Ok(SolidityType::Array(inner));
            }
            let len: usize = len
                .parse()
                .map_err(|_| AbiError::invalid_type(ty, "array length is not a number"))?;
            if len == 0 {
                return Err(AbiError::invalid_type(ty, "fixed array length must be positive"));
            }
            return Ok(SolidityType::FixedArray(inner, len));
        }

        match ty {
            "bool" => Ok(SolidityType::Bool),
            "address" => Ok(SolidityType::Address),
            "string" => Ok(SolidityType::String),
            "bytes" => Ok(SolidityType::Bytes),
            "tuple" => {
                let fields = components
                    .iter()
                    .map(|c| Ok(TupleField::new(c.name.clone(), Self::parse(&c.ty, &c.components)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SolidityType::Tuple(fields))
            }
            _ => Self::parse_elementary(ty),
        }
    }

    fn parse_elementary(ty: &str) -> Result<Self> {
        if let Some(width) = ty.strip_prefix("uint") {
            return Ok(SolidityType::Uint(parse_int_width(ty, width)?));
        }
        if let Some(width) = ty.strip_prefix("int") {
            return Ok(SolidityType::Int(parse_int_width(ty, width)?));
        }
        if let Some(len) = ty.strip_prefix("bytes") {
            if !is_digits(len) {
                return Err(AbiError::UnrecognizedType(ty.to_string()));
            }
            let len: usize = len
                .parse()
                .map_err(|_| AbiError::invalid_type(ty, "byte length out of range"))?;
            if !(1..=32).contains(&len) {
                return Err(AbiError::invalid_type(ty, "bytesN requires 1 <= N <= 32"));
            }
            return Ok(SolidityType::FixedBytes(len));
        }
        Err(AbiError::UnrecognizedType(ty.to_string()))
    }

    /// Parse the canonical selector form, e.g. `(string,int256)[]` or `uint`.
    ///
    /// Tuple members parsed this way carry no names.
    pub fn from_canonical(type_str: &str) -> Result<Self> {
        let ty = type_str.trim();

        if ty.ends_with(']') {
            // the suffix belongs to the outermost type only if the brackets are not inside a tuple
            let stripped = &ty[..ty.len() - 1];
            let open = stripped
                .rfind('[')
                .ok_or_else(|| AbiError::UnrecognizedType(ty.to_string()))?;
            if !stripped[open..].contains(')') {
                let inner = Box::new(Self::from_canonical(&stripped[..open])?);
                let len = &stripped[open + 1..];
                if len.is_empty() {
                    return Ok(SolidityType::Array(inner));
                }
                let len: usize = len
                    .parse()
                    .map_err(|_| AbiError::invalid_type(ty, "array length is not a number"))?;
                if len == 0 {
                    return Err(AbiError::invalid_type(ty, "fixed array length must be positive"));
                }
                return Ok(SolidityType::FixedArray(inner, len));
            }
        }

        let body = ty.strip_prefix("tuple").unwrap_or(ty);
        if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
            let fields = split_top_level(inner)
                .into_iter()
                .map(|part| Ok(TupleField::new("", Self::from_canonical(part)?)))
                .collect::<Result<Vec<_>>>()?;
            return Ok(SolidityType::Tuple(fields));
        }

        Self::parse(ty, &[])
    }

    /// True when the encoded length is not known from the type alone.
    pub fn is_dynamic(&self) -> bool {
        match self {
            SolidityType::Bytes | SolidityType::String | SolidityType::Array(_) => true,
            SolidityType::FixedArray(inner, _) => inner.is_dynamic(),
            SolidityType::Tuple(fields) => fields.iter().any(|f| f.ty.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of an enclosing sequence.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return WORD;
        }
        match self {
            SolidityType::FixedArray(inner, len) => inner.head_size() * len,
            SolidityType::Tuple(fields) => fields.iter().map(|f| f.ty.head_size()).sum(),
            _ => WORD,
        }
    }

    /// Canonical form used in signatures: `(uint256,string)[]`.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SolidityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolidityType::Bool => f.write_str("bool"),
            SolidityType::Uint(bits) => write!(f, "uint{}", bits),
            SolidityType::Int(bits) => write!(f, "int{}", bits),
            SolidityType::Address => f.write_str("address"),
            SolidityType::FixedBytes(len) => write!(f, "bytes{}", len),
            SolidityType::Bytes => f.write_str("bytes"),
            SolidityType::String => f.write_str("string"),
            SolidityType::FixedArray(inner, len) => write!(f, "{}[{}]", inner, len),
            SolidityType::Array(inner) => write!(f, "{}[]", inner),
            SolidityType::Tuple(fields) => {
                f.write_str("(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", field.ty)?;
                }
                f.write_str(")")
            }
        }
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_int_width(ty: &str, width: &str) -> Result<usize> {
    if width.is_empty() {
        return Ok(256);
    }
    if !is_digits(width) {
        return Err(AbiError::UnrecognizedType(ty.to_string()));
    }
    match width.parse::<usize>() {
        Ok(bits) if (8..=256).contains(&bits) && bits % 8 == 0 => Ok(bits),
        _ => Err(AbiError::invalid_type(ty, "bit width must be a multiple of 8 in [8, 256]")),
    }
}

/// Split `a,(b,c),d[]` on commas that are not nested in parentheses.
fn split_top_level(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
