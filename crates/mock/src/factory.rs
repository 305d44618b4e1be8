use crate::{
    Behavior, CallProvider, FunctionSignature, FunctionTable, HookedProvider, MockContract,
    MockError, MockInstance, MockRegistry, Producer, Result, ReturnData, coerce::coerce_outputs,
};
use alloy_json_abi::{Function, JsonAbi};
use alloy_primitives::{Address, Bytes, Selector, map::HashMap};
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Solidity data locations, accepted and ignored in spec-list type strings.
const DATA_LOCATIONS: [&str; 3] = ["memory", "calldata", "storage"];

/// Overrides for a single mock.
#[derive(Clone, Default)]
pub struct MockOptions {
    /// Address to register the mock at. A fresh address is allocated when unset.
    pub address: Option<Address>,
    /// Execution context the mock's facade sends calls through.
    pub provider: Option<Arc<dyn CallProvider>>,
}

impl fmt::Debug for MockOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockOptions")
            .field("address", &self.address)
            .field("provider", &self.provider.as_ref().map(|_| ".."))
            .finish()
    }
}

impl MockOptions {
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn CallProvider>) -> Self {
        self.provider = Some(provider);
        self
    }
}

/// A handle to a deployed contract.
///
/// Mocking it copies its interface and execution context; the mock gets its own address unless
/// [`MockOptions::address`] says otherwise.
#[derive(Clone)]
pub struct DeployedContract {
    pub address: Address,
    pub abi: JsonAbi,
    pub provider: Option<Arc<dyn CallProvider>>,
}

/// A contract that has been compiled but not deployed.
#[derive(Clone)]
pub struct ContractFactory {
    pub abi: JsonAbi,
    pub bytecode: Bytes,
    pub provider: Option<Arc<dyn CallProvider>>,
}

/// An explicit function description for [`MockFactory::from_spec_list`].
#[derive(Clone, Debug)]
pub struct MockFunctionSpec {
    pub function_name: String,
    /// Solidity types of the inputs, e.g. `uint256` or `(bool,bytes32)[] memory`.
    pub input_types: Vec<String>,
    pub output_types: Vec<String>,
    /// Returned on every call until reconfigured, and restored by `reset`.
    pub return_values: Producer<ReturnData>,
}

impl MockFunctionSpec {
    pub fn new(
        function_name: impl Into<String>,
        input_types: impl IntoIterator<Item = impl Into<String>>,
        output_types: impl IntoIterator<Item = impl Into<String>>,
        return_values: impl Into<Producer<ReturnData>>,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            input_types: input_types.into_iter().map(Into::into).collect(),
            output_types: output_types.into_iter().map(Into::into).collect(),
            return_values: return_values.into(),
        }
    }

    /// Resolves the declared types into a function signature.
    fn signature(&self) -> Result<FunctionSignature> {
        let inputs = strip_data_locations(&self.input_types);
        let outputs = strip_data_locations(&self.output_types);
        let mut sig = format!("function {}({inputs})", self.function_name);
        if !self.output_types.is_empty() {
            sig.push_str(&format!(" returns ({outputs})"));
        }
        let function = Function::parse(&sig)
            .map_err(|e| MockError::invalid_spec(&self.function_name, format!("{sig:?}: {e}")))?;
        FunctionSignature::new(function)
            .map_err(|e| MockError::invalid_spec(&self.function_name, e))
    }

    /// Checks literal return values against the declared outputs.
    fn validate(&self, func: &FunctionSignature) -> Result<()> {
        let Producer::Literal(data) = &self.return_values else { return Ok(()) };
        let checked = match data {
            ReturnData::Values(values) => {
                if values.len() != func.outputs().len() {
                    return Err(MockError::invalid_spec(
                        func.signature(),
                        format!(
                            "{} return value(s) provided for {} output(s)",
                            values.len(),
                            func.outputs().len()
                        ),
                    ));
                }
                func.encode_outputs(values).map(drop)
            }
            ReturnData::Json(value) => coerce_outputs(func, value).map(drop),
            ReturnData::Raw(_) => Ok(()),
        };
        checked.map_err(|e| MockError::invalid_spec(func.signature(), e))
    }
}

fn strip_data_locations(types: &[String]) -> String {
    types
        .iter()
        .map(|ty| {
            ty.split_whitespace()
                .filter(|word| !DATA_LOCATIONS.contains(word))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds mocks and registers them with a [`MockRegistry`].
#[derive(Clone, Debug)]
pub struct MockFactory {
    registry: Arc<MockRegistry>,
}

impl MockFactory {
    pub fn new(registry: Arc<MockRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<MockRegistry> {
        &self.registry
    }

    /// Mocks every function of `abi`. Unconfigured functions return zero values.
    pub fn from_abi(&self, abi: &JsonAbi, options: MockOptions) -> Result<MockContract> {
        self.build(abi, None, options)
    }

    /// Mocks the ABI in `json`, either a bare ABI array or a compiler artifact with an `abi` key.
    pub fn from_abi_json(&self, json: &str, options: MockOptions) -> Result<MockContract> {
        let mut value: Value =
            serde_json::from_str(json).map_err(|e| MockError::InvalidAbi(e.to_string()))?;
        if let Some(abi) = value.get_mut("abi") {
            value = abi.take();
        }
        let abi: JsonAbi =
            serde_json::from_value(value).map_err(|e| MockError::InvalidAbi(e.to_string()))?;
        self.from_abi(&abi, options)
    }

    /// Mocks the interface of a deployed contract.
    pub fn from_contract(
        &self,
        contract: &DeployedContract,
        options: MockOptions,
    ) -> Result<MockContract> {
        self.build(&contract.abi, contract.provider.clone(), options)
    }

    /// Mocks the interface of an undeployed contract.
    pub fn from_factory(
        &self,
        factory: &ContractFactory,
        options: MockOptions,
    ) -> Result<MockContract> {
        self.build(&factory.abi, factory.provider.clone(), options)
    }

    /// Mocks the explicitly described functions. Each function returns its `return_values`
    /// until configured otherwise.
    pub fn from_spec_list(
        &self,
        specs: Vec<MockFunctionSpec>,
        options: MockOptions,
    ) -> Result<MockContract> {
        let mut defaults = HashMap::<Selector, Behavior>::default();
        let mut signatures = Vec::with_capacity(specs.len());
        for spec in specs {
            let func = spec.signature()?;
            spec.validate(&func)?;
            defaults.insert(func.selector(), Behavior::Return(spec.return_values));
            signatures.push(func);
        }
        let functions = FunctionTable::from_signatures(signatures)?;

        let address = self.address(&options);
        let instance = MockInstance::with_defaults(address, functions, false, |func| {
            defaults
                .remove(&func.selector())
                .unwrap_or_else(|| Behavior::returns(func.zero_outputs()))
        });
        Ok(self.register(instance, None, options))
    }

    fn build(
        &self,
        abi: &JsonAbi,
        provider: Option<Arc<dyn CallProvider>>,
        options: MockOptions,
    ) -> Result<MockContract> {
        let functions = FunctionTable::from_abi(abi)?;
        let has_fallback = abi.fallback.is_some() || abi.receive.is_some();
        let instance = MockInstance::new(self.address(&options), functions, has_fallback);
        Ok(self.register(instance, provider, options))
    }

    fn address(&self, options: &MockOptions) -> Address {
        options.address.unwrap_or_else(|| self.registry.allocate_address())
    }

    fn register(
        &self,
        instance: MockInstance,
        provider: Option<Arc<dyn CallProvider>>,
        options: MockOptions,
    ) -> MockContract {
        let instance = Arc::new(instance);
        self.registry.register(instance.clone());
        let provider = options.provider.or(provider).unwrap_or_else(|| {
            Arc::new(HookedProvider::new(self.registry.clone())) as Arc<dyn CallProvider>
        });
        debug!(
            target: "mock",
            address = %instance.address(),
            functions = instance.functions().len(),
            "created mock",
        );
        MockContract::new(instance, provider)
    }
}
