use anyhow::{Context, Result};
use fisco_abi::{
    calculate_selector, AbiError, ContractAbiDefinition, ContractCodec, Keccak256, SignatureHasher, SolidityValue,
};
use std::io::Write;

const OVERLOADED_ABI: &str = r#"[
  {"type":"function","name":"set","inputs":[{"name":"v","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"set","inputs":[{"name":"v","type":"string"}],"outputs":[]},
  {"type":"function","name":"set","inputs":[{"name":"k","type":"string"},{"name":"v","type":"uint256"}],"outputs":[]},
  {"type":"function","name":"get","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}
]"#;

#[test]
fn loads_definition_from_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(OVERLOADED_ABI.as_bytes())?;
    let abi = ContractAbiDefinition::from_file(file.path()).context("loading ABI file")?;
    assert_eq!(abi.functions("set").len(), 3);
    assert!(abi.function("get", 0)?.is_constant());
    Ok(())
}

#[test]
fn missing_file_surfaces_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.abi");
    assert!(matches!(ContractAbiDefinition::from_file(missing), Err(AbiError::Io(_))));
}

#[test]
fn malformed_json_is_rejected() {
    assert!(matches!(ContractAbiDefinition::load("[{"), Err(AbiError::Json(_))));
    assert!(matches!(
        ContractAbiDefinition::load(r#"[{"type":"function","name":"f","inputs":[{"name":"x","type":"uint7"}]}]"#),
        Err(AbiError::InvalidType { .. })
    ));
    assert!(matches!(
        ContractAbiDefinition::load(r#"[{"type":"function","name":"f","inputs":[{"name":"x","type":"money"}]}]"#),
        Err(AbiError::UnrecognizedType(_))
    ));
}

#[test]
fn overloads_resolve_by_arity_first_match() -> Result<()> {
    let abi = ContractAbiDefinition::load(OVERLOADED_ABI)?;
    let codec = ContractCodec::default();

    // two one-argument overloads: the first declared wins
    let by_name = codec.encode_method(&abi, "set", &[SolidityValue::uint(5)])?;
    assert_eq!(by_name[..4], calculate_selector("set(uint256)"));

    // the string overload has to be named explicitly
    let by_sig = codec.encode_method_by_signature(&abi, "set(string)", &[SolidityValue::string("five")])?;
    assert_eq!(by_sig[..4], calculate_selector("set(string)"));
    let by_selector =
        codec.encode_method_by_selector(&abi, &calculate_selector("set(string)"), &[SolidityValue::string("five")])?;
    assert_eq!(by_selector, by_sig);

    let two = codec.encode_method(&abi, "set", &[SolidityValue::string("k"), SolidityValue::uint(1)])?;
    assert_eq!(two[..4], calculate_selector("set(string,uint256)"));

    assert!(matches!(
        codec.encode_method(&abi, "set", &[]),
        Err(AbiError::NoMatchingOverload { arg_count: 0, .. })
    ));
    assert!(matches!(
        codec.encode_method(&abi, "set", &[SolidityValue::string("not a number")]),
        Err(AbiError::ArgumentMismatch { .. })
    ));
    Ok(())
}

#[test]
fn selectors_follow_the_configured_hasher() -> Result<()> {
    struct Reversed;

    impl SignatureHasher for Reversed {
        fn hash(&self, data: &[u8]) -> [u8; 32] {
            let mut digest = Keccak256.hash(data);
            digest.reverse();
            digest
        }
    }

    let abi = ContractAbiDefinition::load_with_hasher(OVERLOADED_ABI, &Reversed)?;
    let get = abi.function("get", 0)?;
    let mut expected = Keccak256.hash(b"get()");
    expected.reverse();
    assert_eq!(get.selector, expected[..4]);
    assert_eq!(abi.function_by_selector(&get.selector)?.name, "get");
    Ok(())
}

#[test]
fn short_output_fails_to_decode() -> Result<()> {
    let abi = ContractAbiDefinition::load(OVERLOADED_ABI)?;
    let codec = ContractCodec::default();
    assert!(matches!(
        codec.decode_method_output(&abi, "get", &[0u8; 31]),
        Err(AbiError::Decode { offset: 0, .. })
    ));
    assert_eq!(
        codec.decode_method_output(&abi, "get", &[0u8; 32])?,
        vec![SolidityValue::uint(0)]
    );
    Ok(())
}
