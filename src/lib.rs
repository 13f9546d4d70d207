//! Contract ABI codec for FISCO BCOS.
//!
//! Encodes and decodes contract call data, return values, constructor
//! payloads and event logs. Solidity contracts use the Ethereum ABI head/tail
//! layout; WASM contracts use SCALE. Values can be built directly as
//! [`SolidityValue`] trees or bridged from JSON.

pub mod codec;
pub mod contract;
pub mod definition;
pub mod error;
pub mod hash;
pub mod json;
pub mod path;
pub mod types;
pub mod value;

pub use codec::{Backend, Codec, WireFormat};
pub use contract::{decode_hex, encode_hex, ContractCodec, EventLog};
pub use definition::{
    parse_signature, AbiEntry, AbiParam, ConstructorDefinition, ContractAbiDefinition, EventDefinition, EventParam,
    FunctionDefinition, StateMutability,
};
pub use error::{AbiError, Result};
pub use hash::{calculate_selector, Keccak256, SignatureHasher};
pub use json::{from_json, params_from_json, to_json, to_json_named};
pub use path::ValuePath;
pub use types::{SolidityType, TupleField};
pub use value::{SolidityValue, TupleBuilder};
