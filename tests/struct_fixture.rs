use anyhow::Result;
use fisco_abi::{
    decode_hex, encode_hex, from_json, AbiError, ContractAbiDefinition, ContractCodec, EventLog, SolidityType,
    SolidityValue, TupleBuilder, TupleField,
};
use serde_json::json;

const TEST_ABI: &str = r#"[
  {
    "type": "function",
    "name": "test",
    "constant": false,
    "stateMutability": "nonpayable",
    "inputs": [
      {"name": "a", "type": "int256"},
      {"name": "b", "type": "tuple[]", "internalType": "struct Test.Info[]", "components": [
        {"name": "name", "type": "string"},
        {"name": "count", "type": "int256"},
        {"name": "items", "type": "tuple[]", "internalType": "struct Test.Item[]", "components": [
          {"name": "a", "type": "int256"},
          {"name": "b", "type": "int256"},
          {"name": "c", "type": "int256"}
        ]}
      ]},
      {"name": "c", "type": "string"}
    ],
    "outputs": [
      {"name": "", "type": "int256"},
      {"name": "", "type": "tuple[]", "components": [
        {"name": "name", "type": "string"},
        {"name": "count", "type": "int256"},
        {"name": "items", "type": "tuple[]", "components": [
          {"name": "a", "type": "int256"},
          {"name": "b", "type": "int256"},
          {"name": "c", "type": "int256"}
        ]}
      ]},
      {"name": "", "type": "string"}
    ]
  },
  {
    "type": "event",
    "name": "LogTest",
    "anonymous": false,
    "inputs": [
      {"name": "a", "type": "int256", "indexed": true},
      {"name": "b", "type": "tuple[]", "indexed": false, "components": [
        {"name": "name", "type": "string"},
        {"name": "count", "type": "int256"},
        {"name": "items", "type": "tuple[]", "components": [
          {"name": "a", "type": "int256"},
          {"name": "b", "type": "int256"},
          {"name": "c", "type": "int256"}
        ]}
      ]},
      {"name": "c", "type": "string", "indexed": false}
    ]
  }
]"#;

const TEST_BODY: [&str; WORDS] = [
    "0000000000000000000000000000000000000000000000000000000000000064",
    "0000000000000000000000000000000000000000000000000000000000000060",
    "0000000000000000000000000000000000000000000000000000000000000300",
    "0000000000000000000000000000000000000000000000000000000000000002",
    "0000000000000000000000000000000000000000000000000000000000000040",
    "0000000000000000000000000000000000000000000000000000000000000160",
    "0000000000000000000000000000000000000000000000000000000000000060",
    "0000000000000000000000000000000000000000000000000000000000000064",
    "00000000000000000000000000000000000000000000000000000000000000a0",
    "000000000000000000000000000000000000000000000000000000000000000c",
    "48656c6c6f20776f726c64210000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000001",
    "0000000000000000000000000000000000000000000000000000000000000001",
    "0000000000000000000000000000000000000000000000000000000000000002",
    "0000000000000000000000000000000000000000000000000000000000000003",
    "0000000000000000000000000000000000000000000000000000000000000060",
    "00000000000000000000000000000000000000000000000000000000000000c8",
    "00000000000000000000000000000000000000000000000000000000000000a0",
    "000000000000000000000000000000000000000000000000000000000000000c",
    "48656c6c6f20776f726c64320000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000001",
    "0000000000000000000000000000000000000000000000000000000000000005",
    "0000000000000000000000000000000000000000000000000000000000000006",
    "0000000000000000000000000000000000000000000000000000000000000007",
    "000000000000000000000000000000000000000000000000000000000000000c",
    "48656c6c6f20776f726c64210000000000000000000000000000000000000000",
];
const WORDS: usize = 26;

fn body() -> String {
    TEST_BODY.concat()
}

fn item(a: i64, b: i64, c: i64) -> SolidityValue {
    SolidityValue::Tuple(vec![SolidityValue::int(a), SolidityValue::int(b), SolidityValue::int(c)])
}

fn info(name: &str, count: i64, items: Vec<SolidityValue>) -> SolidityValue {
    SolidityValue::Tuple(vec![
        SolidityValue::string(name),
        SolidityValue::int(count),
        SolidityValue::Array(items),
    ])
}

fn test_args() -> Vec<SolidityValue> {
    vec![
        SolidityValue::int(100),
        SolidityValue::Array(vec![
            info("Hello world!", 100, vec![item(1, 2, 3)]),
            info("Hello world2", 200, vec![item(5, 6, 7)]),
        ]),
        SolidityValue::string("Hello world!"),
    ]
}

#[test]
fn selector_of_struct_function() -> Result<()> {
    let abi = ContractAbiDefinition::load(TEST_ABI)?;
    let function = abi.function("test", 3)?;
    assert_eq!(
        function.signature(),
        "test(int256,(string,int256,(int256,int256,int256)[])[],string)"
    );
    assert_eq!(function.selector_hex(), "00a3c75d");
    Ok(())
}

#[test]
fn encodes_struct_call_to_known_bytes() -> Result<()> {
    let abi = ContractAbiDefinition::load(TEST_ABI)?;
    let codec = ContractCodec::default();
    let calldata = codec.encode_method(&abi, "test", &test_args())?;
    assert_eq!(encode_hex(&calldata), format!("0x00a3c75d{}", body()));
    Ok(())
}

#[test]
fn encodes_struct_call_from_json() -> Result<()> {
    let abi = ContractAbiDefinition::load(TEST_ABI)?;
    let codec = ContractCodec::default();
    let args = json!([
        100,
        [
            {"name": "Hello world!", "count": 100, "items": [{"a": 1, "b": 2, "c": 3}]},
            ["Hello world2", 200, [[5, 6, 7]]]
        ],
        "Hello world!"
    ]);
    let calldata = codec.encode_method_from_json(&abi, "test", &args)?;
    assert_eq!(hex::encode(&calldata[4..]), body());
    Ok(())
}

#[test]
fn decodes_known_bytes_against_outputs() -> Result<()> {
    let abi = ContractAbiDefinition::load(TEST_ABI)?;
    let codec = ContractCodec::default();
    let output = decode_hex(&body())?;
    assert_eq!(codec.decode_method_output(&abi, "test", &output)?, test_args());

    let calldata = decode_hex(&format!("0x00a3c75d{}", body()))?;
    let (function, inputs) = codec.decode_method_input(&abi, &calldata)?;
    assert_eq!(function.name, "test");
    assert_eq!(inputs, test_args());

    assert_eq!(
        codec.decode_method_output_to_json(&abi, "test", &output)?,
        json!([
            100,
            [
                {"name": "Hello world!", "count": 100, "items": [{"a": 1, "b": 2, "c": 3}]},
                {"name": "Hello world2", "count": 200, "items": [{"a": 5, "b": 6, "c": 7}]}
            ],
            "Hello world!"
        ])
    );
    Ok(())
}

#[test]
fn decodes_log_with_indexed_head() -> Result<()> {
    let abi = ContractAbiDefinition::load(TEST_ABI)?;
    let codec = ContractCodec::default();
    let event = abi.event("LogTest", 3)?;
    assert_eq!(
        hex::encode(event.topic),
        "5235bfd5aa9eff5fb89e4b7150d0024894820edd545190e45b1cc29aa377909d"
    );

    // data carries (b, c); the indexed `a` lives in the second topic
    let args = test_args();
    let data = codec.codec().encode_params(&event.data_inputs(), &args[1..])?;
    let log = EventLog::new(
        encode_hex(&data),
        vec![encode_hex(&event.topic), format!("0x{:064x}", 100)],
    );
    let (found, values) = codec.decode_event_by_topic(&abi, &log)?;
    assert_eq!(found.name, "LogTest");
    assert_eq!(values, args);
    Ok(())
}

fn info_type() -> SolidityType {
    let item = SolidityType::Tuple(vec![
        TupleField::new("a", SolidityType::Int(256)),
        TupleField::new("b", SolidityType::Int(256)),
        TupleField::new("c", SolidityType::Int(256)),
    ]);
    SolidityType::Tuple(vec![
        TupleField::new("name", SolidityType::String),
        TupleField::new("count", SolidityType::Int(256)),
        TupleField::new("items", SolidityType::Array(Box::new(item))),
    ])
}

#[test]
fn struct_with_zero_one_and_two_items() -> Result<()> {
    let codec = fisco_abi::Codec::default();
    let ty = SolidityType::Tuple(vec![TupleField::new("info", info_type())]);
    for n in 0..3i64 {
        let items = (0..n).map(|i| item(i + 1, i + 2, i + 3)).collect();
        let value = SolidityValue::Tuple(vec![info("x", 1, items)]);
        let encoded = codec.encode(&ty, &value)?;
        // outer offset, inner `name` offset, count, `items` offset
        assert_eq!(hex::encode(&encoded[..32]), format!("{:064x}", 0x20));
        assert_eq!(hex::encode(&encoded[32..64]), format!("{:064x}", 0x60));
        assert_eq!(hex::encode(&encoded[96..128]), format!("{:064x}", 0xa0));
        assert_eq!(encoded.len(), 32 * (7 + 3 * n as usize));
        assert_eq!(codec.decode(&ty, &encoded)?, value);
    }
    Ok(())
}

#[test]
fn builder_pairs_names_with_declared_fields() -> Result<()> {
    let ty = info_type();
    let built = TupleBuilder::new(&ty)?
        .set("items", SolidityValue::Array(vec![]))
        .set("name", SolidityValue::string("x"))
        .set("count", SolidityValue::int(1))
        .build()?;
    assert_eq!(built, info("x", 1, vec![]));
    assert_eq!(from_json(&ty, &json!({"name": "x", "count": 1, "items": []}))?, built);
    Ok(())
}

#[test]
fn fixed_list_arity_is_enforced() {
    let ty = SolidityType::from_canonical("(int256,int256,int256)[2]").unwrap();
    let value = SolidityValue::FixedArray(vec![item(1, 2, 3)]);
    assert!(matches!(
        fisco_abi::Codec::default().encode(&ty, &value),
        Err(AbiError::ListLengthMismatch { expected: 2, actual: 1, .. })
    ));
}

#[test]
fn truncated_output_is_a_decode_error() -> Result<()> {
    let abi = ContractAbiDefinition::load(TEST_ABI)?;
    let codec = ContractCodec::default();
    let output = decode_hex(&body())?;
    for cut in [0, 31, 64, 95, 400, 805] {
        assert!(
            matches!(
                codec.decode_method_output(&abi, "test", &output[..cut]),
                Err(AbiError::Decode { .. })
            ),
            "cut at {}",
            cut
        );
    }
    Ok(())
}
