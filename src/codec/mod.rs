pub mod abi;
pub mod scale;

use crate::error::{AbiError, Result};
use crate::path::ValuePath;
use crate::types::{SolidityType, TupleField};
use crate::value::SolidityValue;
use std::fmt;

pub use abi::AbiFormat;
pub use scale::ScaleFormat;

/// A binary layout for value trees.
pub trait WireFormat: Send + Sync {
    fn encode(&self, ty: &SolidityType, value: &SolidityValue) -> Result<Vec<u8>>;

    fn decode(&self, ty: &SolidityType, data: &[u8]) -> Result<SolidityValue>;
}

/// Wire format selection: Solidity contracts use `Abi`, WASM contracts use `Scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Abi,
    Scale,
}

impl Backend {
    fn wire_format(self) -> Box<dyn WireFormat> {
        match self {
            Backend::Abi => Box::new(AbiFormat),
            Backend::Scale => Box::new(ScaleFormat),
        }
    }
}

/// Value codec bound to one backend for its whole lifetime.
pub struct Codec {
    backend: Backend,
    format: Box<dyn WireFormat>,
}

impl Codec {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            format: backend.wire_format(),
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn encode(&self, ty: &SolidityType, value: &SolidityValue) -> Result<Vec<u8>> {
        self.format.encode(ty, value)
    }

    pub fn decode(&self, ty: &SolidityType, data: &[u8]) -> Result<SolidityValue> {
        self.format.decode(ty, data)
    }

    /// Encode a parameter list, laid out as a tuple of the parameters.
    pub fn encode_params(&self, params: &[TupleField], values: &[SolidityValue]) -> Result<Vec<u8>> {
        if params.len() != values.len() {
            return Err(AbiError::mismatch(
                ValuePath::root(),
                format!("{} argument(s)", params.len()),
                format!("{} value(s)", values.len()),
            ));
        }
        self.encode(&SolidityType::Tuple(params.to_vec()), &SolidityValue::Tuple(values.to_vec()))
    }

    pub fn decode_params(&self, params: &[TupleField], data: &[u8]) -> Result<Vec<SolidityValue>> {
        match self.decode(&SolidityType::Tuple(params.to_vec()), data)? {
            SolidityValue::Tuple(values) => Ok(values),
            other => Err(AbiError::decode(0, format!("expected a parameter tuple, decoded {}", other.kind()))),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(Backend::Abi)
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").field("backend", &self.backend).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<TupleField> {
        vec![
            TupleField::new("to", SolidityType::Address),
            TupleField::new("amount", SolidityType::Uint(256)),
            TupleField::new("memo", SolidityType::String),
        ]
    }

    fn values() -> Vec<SolidityValue> {
        vec![
            SolidityValue::address_from_str("0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc").unwrap(),
            SolidityValue::uint(1_000_000),
            SolidityValue::string("rent"),
        ]
    }

    #[test]
    fn both_backends_round_trip_params() {
        for backend in [Backend::Abi, Backend::Scale] {
            let codec = Codec::new(backend);
            let encoded = codec.encode_params(&params(), &values()).unwrap();
            assert_eq!(codec.decode_params(&params(), &encoded).unwrap(), values(), "{:?}", backend);
        }
    }

    #[test]
    fn argument_count_mismatch() {
        let codec = Codec::default();
        assert!(matches!(
            codec.encode_params(&params(), &values()[..2]),
            Err(AbiError::ArgumentMismatch { .. })
        ));
    }

    #[test]
    fn param_mismatch_path_uses_param_name() {
        let codec = Codec::default();
        let mut args = values();
        args[1] = SolidityValue::Bool(true);
        match codec.encode_params(&params(), &args) {
            Err(AbiError::ArgumentMismatch { path, .. }) => assert_eq!(path, "ROOT.amount"),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
