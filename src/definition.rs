use crate::error::{AbiError, Result};
use crate::hash::{Keccak256, SignatureHasher};
use crate::types::{SolidityType, TupleField};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// One `inputs`/`outputs`/`components` entry of a JSON ABI document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<AbiParam>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub indexed: bool,
    #[serde(rename = "internalType", default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
}

/// One top-level entry of a JSON ABI document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbiEntry {
    #[serde(rename = "type", default = "function_entry")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inputs: Vec<AbiParam>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outputs: Vec<AbiParam>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub constant: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub payable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub anonymous: bool,
    #[serde(rename = "stateMutability", default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<String>,
}

fn function_entry() -> String {
    "function".to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateMutability {
    Pure,
    View,
    #[default]
    NonPayable,
    Payable,
}

impl StateMutability {
    fn from_entry(entry: &AbiEntry) -> Self {
        match entry.state_mutability.as_deref() {
            Some("pure") => StateMutability::Pure,
            Some("view") => StateMutability::View,
            Some("payable") => StateMutability::Payable,
            Some(_) => StateMutability::NonPayable,
            // legacy documents only carry `constant` and `payable`
            None if entry.payable => StateMutability::Payable,
            None if entry.constant => StateMutability::View,
            None => StateMutability::NonPayable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorDefinition {
    pub inputs: Vec<TupleField>,
    pub state_mutability: StateMutability,
}

impl Default for ConstructorDefinition {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            state_mutability: StateMutability::NonPayable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub name: String,
    pub inputs: Vec<TupleField>,
    pub outputs: Vec<TupleField>,
    pub state_mutability: StateMutability,
    pub selector: [u8; 4],
}

impl FunctionDefinition {
    /// Canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        signature(&self.name, self.inputs.iter().map(|f| &f.ty))
    }

    pub fn selector_hex(&self) -> String {
        hex::encode(self.selector)
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.state_mutability, StateMutability::Pure | StateMutability::View)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventParam {
    pub field: TupleField,
    pub indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    pub name: String,
    pub inputs: Vec<EventParam>,
    pub anonymous: bool,
    pub topic: [u8; 32],
}

impl EventDefinition {
    pub fn signature(&self) -> String {
        signature(&self.name, self.inputs.iter().map(|p| &p.field.ty))
    }

    pub fn indexed_inputs(&self) -> impl Iterator<Item = &EventParam> {
        self.inputs.iter().filter(|p| p.indexed)
    }

    /// Non-indexed inputs in declaration order; these make up the log `data`.
    pub fn data_inputs(&self) -> Vec<TupleField> {
        self.inputs
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.field.clone())
            .collect()
    }
}

fn signature<'a>(name: &str, types: impl Iterator<Item = &'a SolidityType>) -> String {
    let types: Vec<String> = types.map(|ty| ty.canonical()).collect();
    format!("{}({})", name, types.join(","))
}

fn fields(params: &[AbiParam]) -> Result<Vec<TupleField>> {
    params
        .iter()
        .map(|p| Ok(TupleField::new(p.name.clone(), SolidityType::parse(&p.ty, &p.components)?)))
        .collect()
}

/// Functions, events and the constructor of one contract, indexed for lookup.
///
/// Built once from a JSON ABI document and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ContractAbiDefinition {
    constructor: ConstructorDefinition,
    functions: HashMap<String, Vec<FunctionDefinition>>,
    events: HashMap<String, Vec<EventDefinition>>,
    method_ids: HashMap<[u8; 4], (String, usize)>,
    event_topics: HashMap<[u8; 32], (String, usize)>,
}

impl ContractAbiDefinition {
    /// Load an ABI document, hashing signatures with Keccak-256.
    pub fn load(json: &str) -> Result<Self> {
        Self::load_with_hasher(json, &Keccak256)
    }

    pub fn load_with_hasher(json: &str, hasher: &dyn SignatureHasher) -> Result<Self> {
        let entries: Vec<AbiEntry> = serde_json::from_str(json)?;
        Self::from_entries(&entries, hasher)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ABI from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::load(&json)
    }

    pub fn from_entries(entries: &[AbiEntry], hasher: &dyn SignatureHasher) -> Result<Self> {
        let mut abi = Self::default();
        let mut has_constructor = false;

        for entry in entries {
            match entry.kind.as_str() {
                "constructor" => {
                    if has_constructor {
                        warn!("ABI declares more than one constructor, keeping the last one");
                    }
                    has_constructor = true;
                    abi.constructor = ConstructorDefinition {
                        inputs: fields(&entry.inputs)?,
                        state_mutability: StateMutability::from_entry(entry),
                    };
                }
                "function" => {
                    let mut function = FunctionDefinition {
                        name: entry.name.clone(),
                        inputs: fields(&entry.inputs)?,
                        outputs: fields(&entry.outputs)?,
                        state_mutability: StateMutability::from_entry(entry),
                        selector: [0; 4],
                    };
                    function.selector = hasher.selector(&function.signature());
                    abi.add_function(function);
                }
                "event" => {
                    let inputs = entry
                        .inputs
                        .iter()
                        .map(|p| {
                            Ok(EventParam {
                                field: TupleField::new(p.name.clone(), SolidityType::parse(&p.ty, &p.components)?),
                                indexed: p.indexed,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    let mut event = EventDefinition {
                        name: entry.name.clone(),
                        inputs,
                        anonymous: entry.anonymous,
                        topic: [0; 32],
                    };
                    event.topic = hasher.topic(&event.signature());
                    abi.add_event(event);
                }
                other => debug!("Skipping ABI entry of type '{}'", other),
            }
        }

        debug!(
            "Loaded ABI with {} function(s) and {} event(s)",
            abi.method_ids.len(),
            abi.events.values().map(Vec::len).sum::<usize>()
        );
        Ok(abi)
    }

    fn add_function(&mut self, function: FunctionDefinition) {
        let overloads = self.functions.entry(function.name.clone()).or_default();
        let key = (function.name.clone(), overloads.len());
        if let Some((prev, _)) = self.method_ids.get(&function.selector) {
            warn!(
                "Selector 0x{} of {} collides with {}, the later definition wins",
                function.selector_hex(),
                function.signature(),
                prev
            );
        }
        self.method_ids.insert(function.selector, key);
        overloads.push(function);
    }

    fn add_event(&mut self, event: EventDefinition) {
        let overloads = self.events.entry(event.name.clone()).or_default();
        if !event.anonymous {
            self.event_topics.insert(event.topic, (event.name.clone(), overloads.len()));
        }
        overloads.push(event);
    }

    pub fn constructor(&self) -> &ConstructorDefinition {
        &self.constructor
    }

    /// All overloads of `name`, in document order.
    pub fn functions(&self, name: &str) -> &[FunctionDefinition] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// First overload of `name` taking `arg_count` inputs.
    ///
    /// Overloads sharing an arity cannot be told apart here; use
    /// [`Self::function_by_signature`] or [`Self::function_by_selector`] for those.
    pub fn function(&self, name: &str, arg_count: usize) -> Result<&FunctionDefinition> {
        self.functions(name)
            .iter()
            .find(|f| f.inputs.len() == arg_count)
            .ok_or_else(|| AbiError::NoMatchingOverload {
                name: name.to_string(),
                arg_count,
            })
    }

    /// Look a function up by signature such as `transfer(address, uint)`.
    pub fn function_by_signature(&self, sig: &str) -> Result<&FunctionDefinition> {
        let (name, types) = parse_signature(sig)?;
        let canonical = signature(&name, types.iter());
        self.functions(&name)
            .iter()
            .find(|f| f.signature() == canonical)
            .ok_or(AbiError::NoMatchingOverload {
                name,
                arg_count: types.len(),
            })
    }

    pub fn function_by_selector(&self, selector: &[u8; 4]) -> Result<&FunctionDefinition> {
        self.method_ids
            .get(selector)
            .and_then(|(name, idx)| self.functions.get(name).and_then(|v| v.get(*idx)))
            .ok_or_else(|| AbiError::SelectorNotFound(hex::encode(selector)))
    }

    pub fn events(&self, name: &str) -> &[EventDefinition] {
        self.events.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// First overload of event `name` declaring `arg_count` inputs.
    pub fn event(&self, name: &str, arg_count: usize) -> Result<&EventDefinition> {
        self.events(name)
            .iter()
            .find(|e| e.inputs.len() == arg_count)
            .ok_or_else(|| AbiError::NoMatchingOverload {
                name: name.to_string(),
                arg_count,
            })
    }

    pub fn event_by_topic(&self, topic: &[u8; 32]) -> Result<&EventDefinition> {
        self.event_topics
            .get(topic)
            .and_then(|(name, idx)| self.events.get(name).and_then(|v| v.get(*idx)))
            .ok_or_else(|| AbiError::EventNotFound(format!("topic 0x{}", hex::encode(topic))))
    }
}

/// Split `name(type,...)` into its name and parsed parameter types.
pub fn parse_signature(sig: &str) -> Result<(String, Vec<SolidityType>)> {
    let sig: String = sig.chars().filter(|c| !c.is_whitespace()).collect();
    let open = sig
        .find('(')
        .filter(|_| sig.ends_with(')'))
        .ok_or_else(|| AbiError::UnrecognizedType(sig.clone()))?;
    let name = sig[..open].to_string();
    match SolidityType::from_canonical(&sig[open..])? {
        SolidityType::Tuple(fields) => Ok((name, fields.into_iter().map(|f| f.ty).collect())),
        _ => Err(AbiError::UnrecognizedType(sig)),
    }
}

impl fmt::Display for FunctionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{})", self.signature(), self.selector_hex())
    }
}
