use crate::codec::{abi, Backend, Codec};
use crate::definition::{ContractAbiDefinition, EventDefinition, FunctionDefinition};
use crate::error::{AbiError, Result};
use crate::json::{params_from_json, to_json_named};
use crate::path::ValuePath;
use crate::types::{SolidityType, TupleField};
use crate::value::SolidityValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Event log as returned by the node: hex `data` and hex `topics`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl EventLog {
    pub fn new(data: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            address: None,
            data: data.into(),
            topics,
        }
    }

    pub fn data_bytes(&self) -> Result<Vec<u8>> {
        decode_hex(&self.data)
    }

    pub fn topic_words(&self) -> Result<Vec<[u8; 32]>> {
        self.topics
            .iter()
            .enumerate()
            .map(|(i, topic)| {
                let bytes = decode_hex(topic)?;
                <[u8; 32]>::try_from(bytes.as_slice())
                    .map_err(|_| AbiError::decode(i, format!("topic {} is {} bytes, expected 32", i, bytes.len())))
            })
            .collect()
    }
}

/// Decode hex text with an optional `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    Ok(hex::decode(digits)?)
}

/// Lowercase `0x`-prefixed hex.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Encodes calls and decodes results and logs for contracts described by a
/// [`ContractAbiDefinition`].
#[derive(Debug, Default)]
pub struct ContractCodec {
    codec: Codec,
}

impl ContractCodec {
    pub fn new(backend: Backend) -> Self {
        Self {
            codec: Codec::new(backend),
        }
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Deployment payload: `bytecode` followed by the encoded constructor arguments.
    pub fn encode_constructor(
        &self,
        abi: &ContractAbiDefinition,
        bytecode: &[u8],
        args: &[SolidityValue],
    ) -> Result<Vec<u8>> {
        let mut out = bytecode.to_vec();
        out.extend(self.codec.encode_params(&abi.constructor().inputs, args)?);
        Ok(out)
    }

    pub fn encode_constructor_from_json(
        &self,
        abi: &ContractAbiDefinition,
        bytecode: &[u8],
        args: &Value,
    ) -> Result<Vec<u8>> {
        let values = params_from_json(&abi.constructor().inputs, args)?;
        self.encode_constructor(abi, bytecode, &values)
    }

    pub fn decode_constructor_input(
        &self,
        abi: &ContractAbiDefinition,
        bytecode: &[u8],
        input: &[u8],
    ) -> Result<Vec<SolidityValue>> {
        let args = input
            .strip_prefix(bytecode)
            .ok_or_else(|| AbiError::decode(0, "deployment input does not start with the contract bytecode"))?;
        self.codec.decode_params(&abi.constructor().inputs, args)
    }

    /// Selector followed by the encoded arguments of `function`.
    pub fn encode_call(&self, function: &FunctionDefinition, args: &[SolidityValue]) -> Result<Vec<u8>> {
        let mut out = function.selector.to_vec();
        out.extend(self.codec.encode_params(&function.inputs, args)?);
        Ok(out)
    }

    /// Encode a call to the first overload of `name` taking `args.len()` arguments.
    pub fn encode_method(&self, abi: &ContractAbiDefinition, name: &str, args: &[SolidityValue]) -> Result<Vec<u8>> {
        let function = abi.function(name, args.len())?;
        debug!("Encoding call to {}", function);
        self.encode_call(function, args)
    }

    pub fn encode_method_by_selector(
        &self,
        abi: &ContractAbiDefinition,
        selector: &[u8; 4],
        args: &[SolidityValue],
    ) -> Result<Vec<u8>> {
        self.encode_call(abi.function_by_selector(selector)?, args)
    }

    pub fn encode_method_by_signature(
        &self,
        abi: &ContractAbiDefinition,
        signature: &str,
        args: &[SolidityValue],
    ) -> Result<Vec<u8>> {
        self.encode_call(abi.function_by_signature(signature)?, args)
    }

    /// Encode a call from JSON arguments given as an array or an object keyed by parameter name.
    ///
    /// Arrays pick the overload by arity. Objects pick the overload whose parameter names
    /// match the keys, falling back to the one sharing the most names so that a misspelled
    /// key surfaces as `MissingField` rather than a different overload.
    pub fn encode_method_from_json(&self, abi: &ContractAbiDefinition, name: &str, args: &Value) -> Result<Vec<u8>> {
        let function = match args {
            Value::Array(items) => abi.function(name, items.len())?,
            Value::Null => abi.function(name, 0)?,
            Value::Object(map) => function_by_keys(abi, name, map)?,
            _ => {
                return Err(AbiError::mismatch(
                    ValuePath::root(),
                    "JSON array or object of arguments",
                    args,
                ))
            }
        };
        let values = match args {
            Value::Null => Vec::new(),
            _ => params_from_json(&function.inputs, args)?,
        };
        if let Value::Object(map) = args {
            let keys: Vec<String> = function.inputs.iter().enumerate().map(|(i, f)| param_key(f, i)).collect();
            if let Some(unknown) = map.keys().find(|k| !keys.contains(k)) {
                return Err(AbiError::mismatch(
                    ValuePath::root().field(unknown),
                    format!("a parameter of {}", function.signature()),
                    "unknown argument",
                ));
            }
        }
        self.encode_call(function, &values)
    }

    /// Resolve the selector at the front of `calldata` and decode the arguments behind it.
    pub fn decode_method_input<'a>(
        &self,
        abi: &'a ContractAbiDefinition,
        calldata: &[u8],
    ) -> Result<(&'a FunctionDefinition, Vec<SolidityValue>)> {
        if calldata.len() < 4 {
            return Err(AbiError::decode(0, "call data is shorter than a selector"));
        }
        let selector = [calldata[0], calldata[1], calldata[2], calldata[3]];
        let function = abi.function_by_selector(&selector)?;
        let values = self
            .codec
            .decode_params(&function.inputs, &calldata[4..])
            .map_err(|e| shift_offset(e, 4))?;
        Ok((function, values))
    }

    pub fn decode_function_output(&self, function: &FunctionDefinition, output: &[u8]) -> Result<Vec<SolidityValue>> {
        self.codec.decode_params(&function.outputs, output)
    }

    /// Decode the return data of `name`, using its first overload.
    pub fn decode_method_output(
        &self,
        abi: &ContractAbiDefinition,
        name: &str,
        output: &[u8],
    ) -> Result<Vec<SolidityValue>> {
        self.decode_function_output(first_overload(abi, name)?, output)
    }

    /// Decode return data to JSON, rendering named struct members as objects.
    pub fn decode_method_output_to_json(
        &self,
        abi: &ContractAbiDefinition,
        name: &str,
        output: &[u8],
    ) -> Result<Value> {
        let function = first_overload(abi, name)?;
        let values = self.decode_function_output(function, output)?;
        Ok(Value::Array(
            function
                .outputs
                .iter()
                .zip(&values)
                .map(|(field, value)| to_json_named(&field.ty, value))
                .collect(),
        ))
    }

    /// Decode a log of event `name`; overloads are told apart by the first topic.
    pub fn decode_event(&self, abi: &ContractAbiDefinition, name: &str, log: &EventLog) -> Result<Vec<SolidityValue>> {
        let overloads = abi.events(name);
        let topics = log.topic_words()?;
        // only anonymous overloads may match a log whose first topic is not theirs
        let event = overloads
            .iter()
            .find(|e| !e.anonymous && topics.first() == Some(&e.topic))
            .or_else(|| overloads.iter().find(|e| e.anonymous))
            .ok_or_else(|| match topics.first() {
                Some(topic) if !overloads.is_empty() => {
                    AbiError::EventNotFound(format!("{} with topic 0x{}", name, hex::encode(topic)))
                }
                _ => AbiError::EventNotFound(name.to_string()),
            })?;
        self.decode_event_with(event, log)
    }

    /// Find the event from the log's first topic and decode it.
    pub fn decode_event_by_topic<'a>(
        &self,
        abi: &'a ContractAbiDefinition,
        log: &EventLog,
    ) -> Result<(&'a EventDefinition, Vec<SolidityValue>)> {
        let topics = log.topic_words()?;
        let first = topics
            .first()
            .ok_or_else(|| AbiError::EventNotFound("log without topics".to_string()))?;
        let event = abi.event_by_topic(first)?;
        Ok((event, self.decode_event_with(event, log)?))
    }

    /// Merge decoded `data` fields with indexed `topics` in declared order.
    ///
    /// Indexed parameters that are not value types are stored in topics as the
    /// hash of their encoding; those come back as the raw 32-byte topic.
    pub fn decode_event_with(&self, event: &EventDefinition, log: &EventLog) -> Result<Vec<SolidityValue>> {
        let topics = log.topic_words()?;
        let skip = usize::from(!event.anonymous);
        let indexed = event.indexed_inputs().count();
        if topics.len() < skip + indexed {
            return Err(AbiError::decode(
                topics.len(),
                format!(
                    "event {} needs {} topic(s), the log carries {}",
                    event.signature(),
                    skip + indexed,
                    topics.len()
                ),
            ));
        }

        let data = log.data_bytes()?;
        let data_inputs: Vec<TupleField> = event.data_inputs();
        let mut data_values = self.codec.decode_params(&data_inputs, &data)?.into_iter();
        let mut topic_words = topics[skip..].iter();

        let mut values = Vec::with_capacity(event.inputs.len());
        for param in &event.inputs {
            let value = if param.indexed {
                let word = topic_words
                    .next()
                    .ok_or_else(|| AbiError::decode(0, "ran out of topics"))?;
                decode_topic(&param.field.ty, word)?
            } else {
                data_values
                    .next()
                    .ok_or_else(|| AbiError::decode(data.len(), "ran out of data fields"))?
            };
            values.push(value);
        }
        Ok(values)
    }
}

/// JSON key of a parameter; unnamed parameters are keyed by position.
fn param_key(field: &TupleField, index: usize) -> String {
    if field.name.is_empty() {
        index.to_string()
    } else {
        field.name.clone()
    }
}

fn function_by_keys<'a>(
    abi: &'a ContractAbiDefinition,
    name: &str,
    map: &serde_json::Map<String, Value>,
) -> Result<&'a FunctionDefinition> {
    let matched = |f: &FunctionDefinition| {
        f.inputs
            .iter()
            .enumerate()
            .filter(|(i, field)| map.contains_key(&param_key(field, *i)))
            .count()
    };
    let overloads = abi.functions(name);
    overloads
        .iter()
        .find(|f| f.inputs.len() == map.len() && matched(f) == map.len())
        .or_else(|| {
            // earliest overload among those sharing the most keys
            overloads
                .iter()
                .rev()
                .max_by_key(|f| (matched(f), std::cmp::Reverse(f.inputs.len().abs_diff(map.len()))))
        })
        .ok_or_else(|| AbiError::NoMatchingOverload {
            name: name.to_string(),
            arg_count: map.len(),
        })
}

fn first_overload<'a>(abi: &'a ContractAbiDefinition, name: &str) -> Result<&'a FunctionDefinition> {
    abi.functions(name)
        .first()
        .ok_or_else(|| AbiError::NoMatchingOverload {
            name: name.to_string(),
            arg_count: 0,
        })
}

fn decode_topic(ty: &SolidityType, word: &[u8; 32]) -> Result<SolidityValue> {
    match ty {
        SolidityType::Bool
        | SolidityType::Uint(_)
        | SolidityType::Int(_)
        | SolidityType::Address
        | SolidityType::FixedBytes(_) => abi::decode(ty, word, 0),
        _ => Ok(SolidityValue::FixedBytes(word.to_vec())),
    }
}

fn shift_offset(err: AbiError, by: usize) -> AbiError {
    match err {
        AbiError::Decode { offset, reason } => AbiError::Decode {
            offset: offset + by,
            reason,
        },
        other => other,
    }
}
