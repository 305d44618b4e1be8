//! Call logs and spec-list mocks, driven through raw calldata the way a calling contract would.

use crate::utils::*;
use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Bytes, U256};
use foundry_mock::{
    CallResult, ContractFactory, DeployedContract, MockContract, MockError, MockFunctionSpec,
    MockOptions, Producer, ReturnData,
};
use similar_asserts::assert_eq;

/// Sends `name(args)` as raw calldata and returns the raw return data.
async fn call_mock(mock: &MockContract, name: &str, args: &[DynSolValue]) -> Bytes {
    let calldata = mock.calldata(name, args).unwrap();
    match mock.call_raw(calldata).await.unwrap() {
        CallResult::Success(data) => data,
        CallResult::Revert(data) => panic!("{name} reverted: {data}"),
    }
}

fn encode(types: &str, values: Vec<DynSolValue>) -> Bytes {
    let ty = DynSolType::parse(types).unwrap();
    let value = DynSolValue::Tuple(values);
    assert!(ty.matches(&value));
    value.abi_encode_params().into()
}

fn address_spec(name: &str, inputs: &[&str]) -> MockFunctionSpec {
    MockFunctionSpec::new(
        name,
        inputs.iter().copied(),
        ["address"],
        ReturnData::Values(vec![DynSolValue::Address(NON_ZERO_ADDRESS)]),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn fixed_return_spec() {
    let mock = factory()
        .from_spec_list(vec![address_spec("someFunction", &[])], MockOptions::default())
        .unwrap();
    let expected = encode("(address)", vec![DynSolValue::Address(NON_ZERO_ADDRESS)]);
    assert_eq!(call_mock(&mock, "someFunction", &[]).await, expected);

    let mock = factory()
        .from_spec_list(vec![address_spec("someFunction", &["uint256"])], MockOptions::default())
        .unwrap();
    assert_eq!(call_mock(&mock, "someFunction", &[uint(1234)]).await, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn dynamic_return_spec() {
    let spec = MockFunctionSpec::new(
        "someFunction",
        ["uint256"],
        ["uint256"],
        Producer::from_fn(|args| Ok(ReturnData::Values(args.to_vec()))),
    );
    let mock = factory().from_spec_list(vec![spec], MockOptions::default()).unwrap();

    let timestamp = uint(1_700_000_000_000);
    let expected = encode("(uint256)", vec![timestamp.clone()]);
    assert_eq!(call_mock(&mock, "someFunction", &[timestamp]).await, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn contract_and_factory_spec() {
    let deployed = DeployedContract {
        address: NON_ZERO_ADDRESS,
        abi: simple_storage_abi(),
        provider: None,
    };
    let mock = factory().from_contract(&deployed, MockOptions::default()).unwrap();
    assert_ne!(mock.address(), deployed.address);
    assert_eq!(call_mock(&mock, "getStorage", &[]).await, Bytes::from(vec![0u8; 32]));

    let contract_factory = ContractFactory {
        abi: simple_storage_abi(),
        bytecode: Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]),
        provider: None,
    };
    let mock = factory().from_factory(&contract_factory, MockOptions::default()).unwrap();
    assert_eq!(call_mock(&mock, "getStorage", &[]).await, Bytes::from(vec![0u8; 32]));
}

#[tokio::test(flavor = "multi_thread")]
async fn get_call_count() {
    let mock = factory()
        .from_spec_list(
            vec![address_spec("firstFunction", &[]), address_spec("secondFunction", &[])],
            MockOptions::default(),
        )
        .unwrap();
    assert_eq!(mock.get_call_count("firstFunction").unwrap(), 0);

    call_mock(&mock, "firstFunction", &[]).await;
    assert_eq!(mock.get_call_count("firstFunction").unwrap(), 1);

    for _ in 0..10 {
        call_mock(&mock, "firstFunction", &[]).await;
        call_mock(&mock, "secondFunction", &[]).await;
    }
    assert_eq!(mock.get_call_count("firstFunction").unwrap(), 11);
    assert_eq!(mock.get_call_count("secondFunction").unwrap(), 10);

    let err = mock.get_call_count("thirdFunction").unwrap_err();
    assert!(matches!(err, MockError::UnknownFunction(_)), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn get_call_data() {
    let spec = MockFunctionSpec::new(
        "firstFunction",
        ["address"],
        Vec::<String>::new(),
        ReturnData::Values(vec![]),
    );
    let mock = factory().from_spec_list(vec![spec], MockOptions::default()).unwrap();

    let err = mock.get_call_data("firstFunction", 0).unwrap_err();
    assert!(matches!(err, MockError::CallIndexOutOfRange { index: 0, count: 0, .. }), "{err}");

    let arg = DynSolValue::Address(NON_ZERO_ADDRESS);
    for _ in 0..10 {
        let out = call_mock(&mock, "firstFunction", &[arg.clone()]).await;
        assert!(out.is_empty());
    }
    for i in 0..10 {
        assert_eq!(mock.get_call_data("firstFunction", i).unwrap(), vec![arg.clone()]);
    }
    let err = mock.get_call_data("firstFunction", 10).unwrap_err();
    assert!(matches!(err, MockError::CallIndexOutOfRange { index: 10, count: 10, .. }), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn set_return_values() {
    let spec = MockFunctionSpec::new(
        "firstFunction",
        Vec::<String>::new(),
        ["uint256"],
        ReturnData::Values(vec![uint(1234)]),
    );
    let mock = factory().from_spec_list(vec![spec], MockOptions::default()).unwrap();
    assert_eq!(call_mock(&mock, "firstFunction", &[]).await, encode("(uint256)", vec![uint(1234)]));

    mock.set_return_values("firstFunction", uint(5678)).unwrap();
    assert_eq!(call_mock(&mock, "firstFunction", &[]).await, encode("(uint256)", vec![uint(5678)]));

    // resetting a spec-list function restores its declared return values
    mock.function("firstFunction").unwrap().reset();
    assert_eq!(call_mock(&mock, "firstFunction", &[]).await, encode("(uint256)", vec![uint(1234)]));
}

#[tokio::test(flavor = "multi_thread")]
async fn calldata_roundtrip() {
    let mock = basic_return_mock();
    let f = mock.function("getInputtedUint256").unwrap();

    let arg = DynSolValue::Uint(U256::MAX, 256);
    let calldata = f.calldata(&[arg.clone()]).unwrap();
    assert_eq!(&calldata[..4], f.signature().unwrap().selector().as_slice());

    mock.call_raw(calldata).await.unwrap();
    assert_eq!(f.call_data(0).unwrap(), vec![arg]);
}

#[tokio::test(flavor = "multi_thread")]
async fn raw_return_data() {
    let mock = basic_return_mock();
    let f = mock.function("getUint256").unwrap();

    // pre-encoded data is returned verbatim, even if it does not decode
    f.will_return_with(Bytes::from_static(&[0xff; 3]));
    let out = mock.call_raw(f.calldata(&[]).unwrap()).await.unwrap();
    assert_eq!(out, CallResult::Success(Bytes::from_static(&[0xff; 3])));

    let err = f.call(&[]).await.unwrap_err();
    assert!(matches!(err, MockError::Decode { .. }), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_selectors() {
    let mock = factory().from_abi(&simple_storage_abi(), MockOptions::default()).unwrap();
    let unknown = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);

    let err = mock.call_raw(unknown.clone()).await.unwrap_err();
    assert!(matches!(err, MockError::UnknownSelector { address, .. } if address == mock.address()));

    // configuring the fallback routes unknown selectors to it
    mock.fallback().will_return_with(Bytes::from_static(&[0x01]));
    let out = mock.call_raw(unknown.clone()).await.unwrap();
    assert_eq!(out, CallResult::Success(Bytes::from_static(&[0x01])));

    // resetting it restores the unconfigured routing
    mock.fallback().will_revert_with("x");
    mock.fallback().reset();
    let err = mock.call_raw(unknown.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        MockError::UnknownSelector { selector, .. } if selector.as_slice() == &unknown[..]
    ));

    // the fallback still saw the calls it answered
    assert_eq!(mock.fallback().call_count(), 1);
}
