use crate::{
    Behavior, BehaviorRegistry, CallProvider, CallResult, FunctionSignature, MockError,
    MockInstance, Producer, Result, ReturnData, RevertReason,
};
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes};
use std::{fmt, future::Future, sync::Arc};

/// A registered mock, as seen by the test.
///
/// Functions are addressed by name, or by full signature when overloaded. Each is configured
/// through a [`MockFunction`] handle.
#[derive(Clone)]
pub struct MockContract {
    instance: Arc<MockInstance>,
    provider: Arc<dyn CallProvider>,
}

impl fmt::Debug for MockContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockContract").field("address", &self.address()).finish_non_exhaustive()
    }
}

impl MockContract {
    pub(crate) fn new(instance: Arc<MockInstance>, provider: Arc<dyn CallProvider>) -> Self {
        Self { instance, provider }
    }

    pub fn address(&self) -> Address {
        self.instance.address()
    }

    /// The registered mock backing this contract.
    pub fn instance(&self) -> &Arc<MockInstance> {
        &self.instance
    }

    /// The execution context calls are sent through.
    pub fn provider(&self) -> &Arc<dyn CallProvider> {
        &self.provider
    }

    /// All mocked functions, ordered by name.
    pub fn functions(&self) -> impl Iterator<Item = &Arc<FunctionSignature>> {
        self.instance.functions().iter()
    }

    /// Returns the handle of a function by name or signature.
    pub fn function(&self, name: &str) -> Result<MockFunction<'_>> {
        let func = self.instance.functions().find(name)?;
        let registry = self
            .instance
            .registry(&func.selector())
            .ok_or_else(|| MockError::UnknownFunction(name.to_string()))?;
        Ok(MockFunction { contract: self, func: Some(func), registry })
    }

    /// Returns the handle of the fallback function.
    ///
    /// The fallback receives the raw calldata as its only `bytes` argument. Configuring it
    /// routes calls with unknown selectors to it, even if the ABI declares no fallback.
    pub fn fallback(&self) -> MockFunction<'_> {
        MockFunction { contract: self, func: None, registry: self.instance.fallback() }
    }

    pub fn get_call_count(&self, name: &str) -> Result<usize> {
        Ok(self.function(name)?.call_count())
    }

    pub fn get_call_data(&self, name: &str, index: usize) -> Result<Vec<DynSolValue>> {
        self.function(name)?.call_data(index)
    }

    /// Shorthand for [`MockFunction::will_return_with`].
    pub fn set_return_values(&self, name: &str, data: impl Into<ReturnData>) -> Result<()> {
        self.function(name)?.will_return_with(data);
        Ok(())
    }

    /// Encodes a call to the named function.
    pub fn calldata(&self, name: &str, args: &[DynSolValue]) -> Result<Bytes> {
        self.function(name)?.calldata(args)
    }

    /// Calls the named function through the provider and decodes its return values.
    pub async fn call(&self, name: &str, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        self.function(name)?.call(args).await
    }

    /// Sends raw calldata to the mock through the provider.
    pub async fn call_raw(&self, calldata: impl Into<Bytes>) -> Result<CallResult> {
        self.provider.call(self.address(), calldata.into()).await
    }
}

/// Control surface of a single mocked function.
pub struct MockFunction<'a> {
    contract: &'a MockContract,
    func: Option<&'a Arc<FunctionSignature>>,
    registry: &'a BehaviorRegistry,
}

impl fmt::Debug for MockFunction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockFunction")
            .field("address", &self.contract.address())
            .field("function", &self.registry.name())
            .finish_non_exhaustive()
    }
}

impl<'a> MockFunction<'a> {
    /// The function's signature, `None` for the fallback.
    pub fn signature(&self) -> Option<&'a Arc<FunctionSignature>> {
        self.func
    }

    pub fn name(&self) -> &str {
        self.func.map_or("fallback", |func| func.name())
    }

    /// Returns the zero value of every output, or empty data for the fallback.
    pub fn will_return(&self) {
        let data = match self.func {
            Some(func) => ReturnData::Values(func.zero_outputs()),
            None => ReturnData::Raw(Bytes::new()),
        };
        self.registry.set(Behavior::Return(data.into()));
    }

    /// Returns the given values, or raw bytes, on every call.
    pub fn will_return_with(&self, data: impl Into<ReturnData>) {
        self.registry.set(Behavior::Return(Producer::Literal(data.into())));
    }

    /// Coerces the JSON into the function's outputs on every call.
    pub fn will_return_with_json(&self, value: serde_json::Value) {
        self.will_return_with(ReturnData::Json(value));
    }

    /// Computes the return values from the call's arguments.
    pub fn will_return_with_fn<F, R>(&self, f: F)
    where
        F: Fn(&[DynSolValue]) -> eyre::Result<R> + Send + Sync + 'static,
        R: Into<ReturnData>,
    {
        self.registry.set(Behavior::Return(Producer::from_fn(move |args| f(args).map(Into::into))));
    }

    /// Computes the return values from the call's arguments, asynchronously.
    pub fn will_return_with_async<F, Fut, R>(&self, f: F)
    where
        F: Fn(Vec<DynSolValue>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<R>> + Send + 'static,
        R: Into<ReturnData> + 'static,
    {
        self.registry.set(Behavior::Return(Producer::from_async(move |args| {
            let fut = f(args);
            async move { fut.await.map(Into::into) }
        })));
    }

    /// Reverts without data.
    pub fn will_revert(&self) {
        self.registry.set(Behavior::reverts(RevertReason::Empty));
    }

    /// Reverts with the given message or raw data.
    pub fn will_revert_with(&self, reason: impl Into<RevertReason>) {
        self.registry.set(Behavior::reverts(reason));
    }

    /// Computes the revert reason from the call's arguments.
    pub fn will_revert_with_fn<F, R>(&self, f: F)
    where
        F: Fn(&[DynSolValue]) -> eyre::Result<R> + Send + Sync + 'static,
        R: Into<RevertReason>,
    {
        self.registry.set(Behavior::Revert(Producer::from_fn(move |args| f(args).map(Into::into))));
    }

    /// Computes the revert reason from the call's arguments, asynchronously.
    pub fn will_revert_with_async<F, Fut, R>(&self, f: F)
    where
        F: Fn(Vec<DynSolValue>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<R>> + Send + 'static,
        R: Into<RevertReason> + 'static,
    {
        self.registry.set(Behavior::Revert(Producer::from_async(move |args| {
            let fut = f(args);
            async move { fut.await.map(Into::into) }
        })));
    }

    /// Restores the default behavior. Recorded calls are kept.
    pub fn reset(&self) {
        self.registry.reset();
    }

    pub fn call_count(&self) -> usize {
        self.registry.call_count()
    }

    /// The decoded arguments of the call at `index`.
    pub fn call_data(&self, index: usize) -> Result<Vec<DynSolValue>> {
        self.registry.call_data(index)
    }

    pub fn calls(&self) -> Vec<Vec<DynSolValue>> {
        self.registry.calls()
    }

    /// Encodes a call to this function. The fallback takes the calldata as a single `bytes`
    /// argument.
    pub fn calldata(&self, args: &[DynSolValue]) -> Result<Bytes> {
        match (self.func, args) {
            (Some(func), args) => func.encode_calldata(args),
            (None, [DynSolValue::Bytes(data)]) => Ok(data.clone().into()),
            (None, _) => Err(MockError::encode("fallback", "expected a single `bytes` argument")),
        }
    }

    /// Calls this function through the provider and decodes its return values.
    ///
    /// The fallback's return data is returned undecoded, as a single `bytes` value.
    pub async fn call(&self, args: &[DynSolValue]) -> Result<Vec<DynSolValue>> {
        let calldata = self.calldata(args)?;
        match self.contract.call_raw(calldata).await? {
            CallResult::Success(data) => match self.func {
                Some(func) => func.decode_outputs(&data),
                None => Ok(vec![DynSolValue::Bytes(data.to_vec())]),
            },
            CallResult::Revert(data) => {
                let reason = RevertReason::decode(&data).message().map(str::to_string);
                Err(MockError::Reverted { reason, data })
            }
        }
    }
}
