//! The mocks as seen by an execution context sharing their registry.

use crate::{init_tracing, utils::*};
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use foundry_mock::{
    CallProvider, CallResult, DeployedContract, HookedProvider, InterceptResult, MockError,
    MockFactory, MockOptions, MockRegistry,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// A backend that records every call it receives and succeeds with `0x01`.
#[derive(Default)]
struct RecordingBackend {
    calls: Mutex<Vec<(Address, Bytes)>>,
}

#[async_trait]
impl CallProvider for RecordingBackend {
    async fn call(&self, to: Address, input: Bytes) -> Result<CallResult, MockError> {
        self.calls.lock().push((to, input));
        Ok(CallResult::Success(Bytes::from_static(&[0x01])))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn intercepts_before_backend() {
    init_tracing();
    let registry = Arc::new(MockRegistry::new());
    let backend = Arc::new(RecordingBackend::default());
    let provider = Arc::new(HookedProvider::with_backend(registry.clone(), backend.clone()));

    let factory = MockFactory::new(registry.clone());
    let options = MockOptions::default().with_provider(provider.clone());
    let mock = factory.from_abi(&simple_storage_abi(), options).unwrap();
    mock.function("getStorage").unwrap().will_return_with(word([0xab; 32].into()));

    let calldata = mock.calldata("getStorage", &[]).unwrap();
    let out = provider.call(mock.address(), calldata.clone()).await.unwrap();
    assert_eq!(out, CallResult::Success(Bytes::from(vec![0xab; 32])));
    assert!(backend.calls.lock().is_empty());

    // other addresses reach the backend untouched
    let other = Address::repeat_byte(0x22);
    let out = provider.call(other, calldata.clone()).await.unwrap();
    assert_eq!(out, CallResult::Success(Bytes::from_static(&[0x01])));
    assert_eq!(*backend.calls.lock(), [(other, calldata.clone())]);

    // once unregistered, the mock's address is an ordinary account again
    registry.unregister(&mock.address());
    assert_eq!(
        registry.intercept(mock.address(), &calldata).await.unwrap(),
        InterceptResult::NotIntercepted
    );
    provider.call(mock.address(), calldata).await.unwrap();
    assert_eq!(backend.calls.lock().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn reverts_surface_as_revert_data() {
    let registry = Arc::new(MockRegistry::new());
    let mock = MockFactory::new(registry.clone())
        .from_abi(&simple_storage_abi(), MockOptions::default())
        .unwrap();
    mock.function("setStorage").unwrap().will_revert_with("read only");

    let calldata = mock.calldata("setStorage", &[word([0x01; 32].into())]).unwrap();
    let result = registry.intercept(mock.address(), &calldata).await.unwrap();
    assert_eq!(result, InterceptResult::Reverted("read only".into()));

    let out = HookedProvider::new(registry).call(mock.address(), calldata).await.unwrap();
    assert!(!out.is_success());
    assert_eq!(out.data(), &foundry_mock::RevertReason::from("read only").abi_encode());
}

#[tokio::test(flavor = "multi_thread")]
async fn provider_precedence() {
    let registry = Arc::new(MockRegistry::new());
    let factory = MockFactory::new(registry.clone());
    let contract_provider: Arc<dyn CallProvider> = Arc::new(RecordingBackend::default());
    let deployed = DeployedContract {
        address: NON_ZERO_ADDRESS,
        abi: simple_storage_abi(),
        provider: Some(contract_provider.clone()),
    };

    // the handle's provider is inherited
    let mock = factory.from_contract(&deployed, MockOptions::default()).unwrap();
    assert!(Arc::ptr_eq(mock.provider(), &contract_provider));

    // an explicit provider wins
    let explicit: Arc<dyn CallProvider> = Arc::new(HookedProvider::new(registry.clone()));
    let mock = factory
        .from_contract(&deployed, MockOptions::default().with_provider(explicit.clone()))
        .unwrap();
    assert!(Arc::ptr_eq(mock.provider(), &explicit));

    // without either, calls go through the registry
    let mock = factory.from_abi(&simple_storage_abi(), MockOptions::default()).unwrap();
    mock.function("getStorage").unwrap().will_revert();
    assert!(mock.call("getStorage", &[]).await.unwrap_err().is_revert());
}

#[tokio::test(flavor = "multi_thread")]
async fn replacing_a_mock_at_the_same_address() {
    let registry = Arc::new(MockRegistry::new());
    let factory = MockFactory::new(registry.clone());
    let options = MockOptions::default().with_address(NON_ZERO_ADDRESS);

    let first = factory.from_abi(&simple_storage_abi(), options.clone()).unwrap();
    first.function("getStorage").unwrap().will_revert();
    let second = factory.from_abi(&simple_storage_abi(), options).unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(second.call("getStorage", &[]).await.unwrap(), [word(Default::default())]);
    // the replaced mock's facade now reaches the new instance
    assert_eq!(first.call("getStorage", &[]).await.unwrap(), [word(Default::default())]);
    assert_eq!(second.get_call_count("getStorage").unwrap(), 2);
    assert_eq!(first.get_call_count("getStorage").unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_calls_are_all_recorded() {
    let mock = basic_return_mock();
    mock.function("getInputtedUint256").unwrap().will_return_with_async(|args| async move {
        tokio::task::yield_now().await;
        Ok::<_, eyre::Report>(args)
    });

    let handles = (0..32u64)
        .map(|i| {
            let mock = mock.clone();
            tokio::spawn(async move { mock.call("getInputtedUint256", &[uint(i)]).await })
        })
        .collect::<Vec<_>>();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), [uint(i as u64)]);
    }

    let mut seen = mock
        .function("getInputtedUint256")
        .unwrap()
        .calls()
        .into_iter()
        .map(|args| match args.as_slice() {
            [DynSolValue::Uint(value, _)] => value.to::<u64>(),
            args => panic!("unexpected arguments: {args:?}"),
        })
        .collect::<Vec<_>>();
    seen.sort_unstable();
    assert_eq!(seen, (0..32).collect::<Vec<_>>());
}
