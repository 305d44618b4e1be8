//! Call dispatch hook.
//!
//! [`MockRegistry`] maps addresses to [`MockInstance`]s. The execution pipeline asks it to
//! [`intercept`](MockRegistry::intercept) every outbound call; calls to a registered address are
//! answered by the mock and never reach real execution.

use crate::{
    Behavior, BehaviorRegistry, FunctionSignature, FunctionTable, MockConfig, MockError, Outcome,
    Result, ReturnData, RevertReason,
    abi::SELECTOR_LEN,
    coerce::coerce_outputs,
};
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, Selector, map::HashMap};
use parking_lot::{Mutex, RwLock};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use std::sync::Arc;

/// The answer of the hook to a single call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterceptResult {
    /// The mock returned the given ABI-encoded data.
    Returned(Bytes),
    /// The mock reverted.
    Reverted(RevertReason),
    /// The destination is not a mock, the call proceeds to real execution.
    NotIntercepted,
}

/// A mock bound to an address: its functions, their behaviors and call logs.
#[derive(Debug)]
pub struct MockInstance {
    address: Address,
    functions: FunctionTable,
    registries: HashMap<Selector, BehaviorRegistry>,
    fallback: BehaviorRegistry,
    has_fallback: bool,
}

impl MockInstance {
    /// Creates a mock whose functions return the zero value of their outputs until configured.
    ///
    /// `has_fallback` is whether the ABI declares a `fallback` or `receive` function.
    pub fn new(address: Address, functions: FunctionTable, has_fallback: bool) -> Self {
        Self::with_defaults(address, functions, has_fallback, |func| {
            Behavior::returns(func.zero_outputs())
        })
    }

    /// Creates a mock with a custom default behavior per function. The default is also what
    /// [`BehaviorRegistry::reset`] restores.
    pub fn with_defaults(
        address: Address,
        functions: FunctionTable,
        has_fallback: bool,
        mut default: impl FnMut(&FunctionSignature) -> Behavior,
    ) -> Self {
        let registries = functions
            .iter()
            .map(|func| {
                (func.selector(), BehaviorRegistry::new(func.signature(), default(func)))
            })
            .collect();
        let fallback = BehaviorRegistry::new(
            "fallback",
            Behavior::Return(ReturnData::Raw(Bytes::new()).into()),
        );
        Self { address, functions, registries, fallback, has_fallback }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// The registry of the function with the given selector.
    pub fn registry(&self, selector: &Selector) -> Option<&BehaviorRegistry> {
        self.registries.get(selector)
    }

    /// The registry answering calls that match no function.
    pub fn fallback(&self) -> &BehaviorRegistry {
        &self.fallback
    }

    /// Whether the ABI declares a `fallback` or `receive` function.
    pub fn has_fallback(&self) -> bool {
        self.has_fallback
    }

    /// Whether calls with an unknown selector are routed to the fallback.
    pub fn fallback_enabled(&self) -> bool {
        self.has_fallback || self.fallback.is_configured()
    }

    /// Routes a call to the matching function, or to the fallback.
    pub async fn dispatch(&self, calldata: &[u8]) -> Result<InterceptResult> {
        if calldata.is_empty() {
            return self.dispatch_fallback(calldata).await;
        }

        let Some((selector, args)) = calldata.split_first_chunk::<SELECTOR_LEN>() else {
            return self.unknown_selector(Selector::right_padding_from(calldata), calldata).await;
        };
        let selector = Selector::from(*selector);
        let (Some(func), Some(registry)) =
            (self.functions.get(&selector), self.registries.get(&selector))
        else {
            return self.unknown_selector(selector, calldata).await;
        };

        let args = func.decode_inputs(args)?;
        match registry.resolve(args).await {
            Outcome::Return(data) => encode_return(func, data).map(InterceptResult::Returned),
            Outcome::Revert(reason) => Ok(InterceptResult::Reverted(reason)),
        }
    }

    async fn unknown_selector(
        &self,
        selector: Selector,
        calldata: &[u8],
    ) -> Result<InterceptResult> {
        if self.fallback_enabled() {
            self.dispatch_fallback(calldata).await
        } else {
            Err(MockError::UnknownSelector { address: self.address, selector })
        }
    }

    async fn dispatch_fallback(&self, calldata: &[u8]) -> Result<InterceptResult> {
        let args = vec![DynSolValue::Bytes(calldata.to_vec())];
        match self.fallback.resolve(args).await {
            // the fallback has no declared outputs: values are encoded by their own types
            Outcome::Return(ReturnData::Values(values)) => {
                Ok(InterceptResult::Returned(DynSolValue::Tuple(values).abi_encode_params().into()))
            }
            Outcome::Return(ReturnData::Raw(data)) => Ok(InterceptResult::Returned(data)),
            Outcome::Return(ReturnData::Json(_)) => Err(MockError::encode(
                "fallback",
                "JSON return values need declared outputs, use raw bytes instead",
            )),
            Outcome::Revert(reason) => Ok(InterceptResult::Reverted(reason)),
        }
    }
}

fn encode_return(func: &FunctionSignature, data: ReturnData) -> Result<Bytes> {
    match data {
        ReturnData::Values(values) => func.encode_outputs(&values),
        ReturnData::Raw(data) => Ok(data),
        ReturnData::Json(value) => func.encode_outputs(&coerce_outputs(func, &value)?),
    }
}

/// The table of live mocks, keyed by address.
///
/// One registry is shared by the factory that registers mocks and the execution context that
/// intercepts calls to them.
#[derive(Debug)]
pub struct MockRegistry {
    mocks: RwLock<HashMap<Address, Arc<MockInstance>>>,
    rng: Mutex<StdRng>,
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRegistry {
    /// Creates an empty registry allocating addresses from OS randomness.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Creates an empty registry configured by `config`.
    pub fn with_config(config: &MockConfig) -> Self {
        match config.seed {
            Some(seed) => Self::with_rng(StdRng::seed_from_u64(seed)),
            None => Self::new(),
        }
    }

    fn with_rng(rng: StdRng) -> Self {
        Self { mocks: Default::default(), rng: Mutex::new(rng) }
    }

    /// Returns a random non-zero address no registered mock uses.
    pub fn allocate_address(&self) -> Address {
        let mut rng = self.rng.lock();
        loop {
            let mut bytes = [0u8; 20];
            rng.fill_bytes(&mut bytes);
            let address = Address::from(bytes);
            if !address.is_zero() && !self.is_mocked(&address) {
                return address;
            }
        }
    }

    /// Registers a mock at its address, replacing any mock already there.
    pub fn register(&self, mock: Arc<MockInstance>) {
        let address = mock.address();
        if self.mocks.write().insert(address, mock).is_some() {
            warn!(target: "mock", %address, "replaced existing mock");
        } else {
            debug!(target: "mock", %address, "registered mock");
        }
    }

    /// Removes the mock at `address`, returning it if there was one.
    pub fn unregister(&self, address: &Address) -> Option<Arc<MockInstance>> {
        let removed = self.mocks.write().remove(address);
        if removed.is_some() {
            debug!(target: "mock", %address, "unregistered mock");
        }
        removed
    }

    /// Removes every mock.
    pub fn clear(&self) {
        self.mocks.write().clear();
        debug!(target: "mock", "cleared all mocks");
    }

    pub fn get(&self, address: &Address) -> Option<Arc<MockInstance>> {
        self.mocks.read().get(address).cloned()
    }

    pub fn is_mocked(&self, address: &Address) -> bool {
        self.mocks.read().contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.mocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mocks.read().is_empty()
    }

    /// Answers a call to `address` if a mock is registered there.
    pub async fn intercept(&self, address: Address, calldata: &[u8]) -> Result<InterceptResult> {
        let Some(mock) = self.get(&address) else {
            return Ok(InterceptResult::NotIntercepted);
        };
        let selector = &calldata[..calldata.len().min(SELECTOR_LEN)];
        trace!(
            target: "mock",
            %address,
            selector = %alloy_primitives::hex::encode(selector),
            "intercepted call",
        );
        mock.dispatch(calldata).await
    }
}
