//! ABI codec adapter.
//!
//! Wraps [`alloy_json_abi`] function descriptions into [`FunctionSignature`]s with cached
//! selectors and resolved [`DynSolType`]s, and exposes the encode/decode operations the dispatch
//! hook needs. The byte-level encoding itself is delegated to [`alloy_dyn_abi`].

use crate::{MockError, Result};
use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::{Function, JsonAbi, Param};
use alloy_primitives::{Address, B256, Bytes, I256, Selector, U256, map::HashMap};
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Length of a function selector, in bytes.
pub const SELECTOR_LEN: usize = 4;

/// An immutable function description with its selector and resolved types.
///
/// Identity is the selector: two signatures may share a name (overloads) but never a selector.
#[derive(Clone, Debug)]
pub struct FunctionSignature {
    function: Function,
    signature: String,
    selector: Selector,
    inputs: Vec<DynSolType>,
    outputs: Vec<DynSolType>,
}

impl PartialEq for FunctionSignature {
    fn eq(&self, other: &Self) -> bool {
        self.selector == other.selector
    }
}

impl Eq for FunctionSignature {}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature)
    }
}

impl FunctionSignature {
    /// Resolves the function's parameter types and computes its selector.
    pub fn new(function: Function) -> Result<Self> {
        let signature = function.signature();
        let inputs = resolve_params(&signature, &function.inputs)?;
        let outputs = resolve_params(&signature, &function.outputs)?;
        let selector = function.selector();
        Ok(Self { function, signature, selector, inputs, outputs })
    }

    /// Parses a human-readable signature, e.g. `function foo(uint256) returns (bool)`.
    pub fn parse(sig: &str) -> Result<Self> {
        let function =
            Function::parse(sig).map_err(|e| MockError::InvalidAbi(format!("{sig:?}: {e}")))?;
        Self::new(function)
    }

    /// The function's name.
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// The canonical signature, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The 4-byte selector.
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// The underlying ABI item.
    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn inputs(&self) -> &[DynSolType] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[DynSolType] {
        &self.outputs
    }

    /// Names of the output parameters, empty strings for unnamed ones.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.function.outputs.iter().map(|p| p.name.as_str())
    }

    /// The zero value of every output, in order.
    pub fn zero_outputs(&self) -> Vec<DynSolValue> {
        self.outputs.iter().map(zero_value).collect()
    }

    /// Decodes the arguments of a call, without the selector.
    pub fn decode_inputs(&self, data: &[u8]) -> Result<Vec<DynSolValue>> {
        decode_sequence(&self.inputs, data).map_err(|e| MockError::decode(&self.signature, e))
    }

    /// Decodes the return data of a call.
    pub fn decode_outputs(&self, data: &[u8]) -> Result<Vec<DynSolValue>> {
        decode_sequence(&self.outputs, data).map_err(|e| MockError::decode(&self.signature, e))
    }

    /// ABI-encodes the return values against the declared outputs.
    pub fn encode_outputs(&self, values: &[DynSolValue]) -> Result<Bytes> {
        encode_sequence(&self.signature, &self.outputs, values)
    }

    /// Builds the calldata for a call to this function: the selector followed by the encoded
    /// arguments.
    pub fn encode_calldata(&self, args: &[DynSolValue]) -> Result<Bytes> {
        let encoded = encode_sequence(&self.signature, &self.inputs, args)?;
        let mut calldata = Vec::with_capacity(SELECTOR_LEN + encoded.len());
        calldata.extend_from_slice(self.selector.as_slice());
        calldata.extend_from_slice(&encoded);
        Ok(calldata.into())
    }
}

fn resolve_params(signature: &str, params: &[Param]) -> Result<Vec<DynSolType>> {
    params
        .iter()
        .map(|param| {
            param.resolve().map_err(|e| MockError::InvalidAbi(format!("{signature}: {e}")))
        })
        .collect()
}

fn decode_sequence(types: &[DynSolType], data: &[u8]) -> alloy_dyn_abi::Result<Vec<DynSolValue>> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    match DynSolType::Tuple(types.to_vec()).abi_decode_params(data)? {
        DynSolValue::Tuple(values) => Ok(values),
        value => Ok(vec![value]),
    }
}

/// Normalizes `values` against `types` and ABI-encodes them as a parameter sequence.
pub(crate) fn encode_sequence(
    signature: &str,
    types: &[DynSolType],
    values: &[DynSolValue],
) -> Result<Bytes> {
    if types.len() != values.len() {
        return Err(MockError::ArityMismatch {
            signature: signature.to_string(),
            expected: types.len(),
            actual: values.len(),
        });
    }
    let values = std::iter::zip(types, values)
        .enumerate()
        .map(|(i, (ty, value))| {
            normalize(ty, value).map_err(|e| MockError::encode(signature, format!("#{i}: {e}")))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DynSolValue::Tuple(values).abi_encode_params().into())
}

/// Returns the canonical default of a type.
///
/// Static types default to their all-zero encoding; dynamic types (`bytes`, `string`, `T[]`)
/// default to an empty sequence. Fixed arrays, tuples and structs are filled recursively.
pub fn zero_value(ty: &DynSolType) -> DynSolValue {
    match ty {
        DynSolType::Bool => DynSolValue::Bool(false),
        DynSolType::Int(size) => DynSolValue::Int(I256::ZERO, *size),
        DynSolType::Uint(size) => DynSolValue::Uint(U256::ZERO, *size),
        DynSolType::FixedBytes(size) => DynSolValue::FixedBytes(B256::ZERO, *size),
        DynSolType::Address => DynSolValue::Address(Address::ZERO),
        DynSolType::Function => DynSolValue::Function(Default::default()),
        DynSolType::Bytes => DynSolValue::Bytes(Vec::new()),
        DynSolType::String => DynSolValue::String(String::new()),
        DynSolType::Array(_) => DynSolValue::Array(Vec::new()),
        DynSolType::FixedArray(inner, len) => {
            DynSolValue::FixedArray(vec![zero_value(inner); *len])
        }
        DynSolType::Tuple(types) => DynSolValue::Tuple(types.iter().map(zero_value).collect()),
        DynSolType::CustomStruct { name, prop_names, tuple } => DynSolValue::CustomStruct {
            name: name.clone(),
            prop_names: prop_names.clone(),
            tuple: tuple.iter().map(zero_value).collect(),
        },
    }
}

/// Checks `value` against `ty` and returns it in the exact shape the encoder expects.
///
/// Integers are re-sized when the value fits the declared width, dynamic arrays of the right
/// length are accepted for fixed arrays, and tuples and structs convert into each other when
/// their field counts agree. Anything else that does not match is an error.
pub fn normalize(ty: &DynSolType, value: &DynSolValue) -> Result<DynSolValue, String> {
    let mismatch = || format!("expected `{ty}`, got {}", describe(value));
    let normalized = match (ty, value) {
        (DynSolType::Bool, DynSolValue::Bool(_))
        | (DynSolType::Address, DynSolValue::Address(_))
        | (DynSolType::Function, DynSolValue::Function(_))
        | (DynSolType::Bytes, DynSolValue::Bytes(_))
        | (DynSolType::String, DynSolValue::String(_)) => value.clone(),

        (DynSolType::Uint(size), DynSolValue::Uint(v, _)) => {
            if v.bit_len() > *size {
                return Err(format!("{v} does not fit in `{ty}`"));
            }
            DynSolValue::Uint(*v, *size)
        }
        (DynSolType::Int(size), DynSolValue::Int(v, _)) => {
            if !fits_signed(*v, *size) {
                return Err(format!("{v} does not fit in `{ty}`"));
            }
            DynSolValue::Int(*v, *size)
        }
        (DynSolType::FixedBytes(size), DynSolValue::FixedBytes(word, from)) => {
            if from != size {
                return Err(mismatch());
            }
            DynSolValue::FixedBytes(*word, *size)
        }

        (DynSolType::Array(inner), DynSolValue::Array(values)) => {
            DynSolValue::Array(normalize_elements(inner, values)?)
        }
        (DynSolType::FixedArray(inner, len), DynSolValue::FixedArray(values))
        | (DynSolType::FixedArray(inner, len), DynSolValue::Array(values)) => {
            if values.len() != *len {
                return Err(format!("expected {len} element(s) for `{ty}`, got {}", values.len()));
            }
            DynSolValue::FixedArray(normalize_elements(inner, values)?)
        }

        (DynSolType::Tuple(types), DynSolValue::Tuple(values))
        | (DynSolType::Tuple(types), DynSolValue::CustomStruct { tuple: values, .. }) => {
            DynSolValue::Tuple(normalize_fields(ty, types, values)?)
        }
        (
            DynSolType::CustomStruct { name, prop_names, tuple: types },
            DynSolValue::CustomStruct { tuple: values, .. } | DynSolValue::Tuple(values),
        ) => DynSolValue::CustomStruct {
            name: name.clone(),
            prop_names: prop_names.clone(),
            tuple: normalize_fields(ty, types, values)?,
        },

        _ => return Err(mismatch()),
    };
    Ok(normalized)
}

fn normalize_elements(
    inner: &DynSolType,
    values: &[DynSolValue],
) -> Result<Vec<DynSolValue>, String> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| normalize(inner, value).map_err(|e| format!("[{i}]: {e}")))
        .collect()
}

fn normalize_fields(
    ty: &DynSolType,
    types: &[DynSolType],
    values: &[DynSolValue],
) -> Result<Vec<DynSolValue>, String> {
    if types.len() != values.len() {
        return Err(format!("expected {} field(s) for `{ty}`, got {}", types.len(), values.len()));
    }
    std::iter::zip(types, values)
        .enumerate()
        .map(|(i, (ty, value))| normalize(ty, value).map_err(|e| format!(".{i}: {e}")))
        .collect()
}

fn fits_signed(value: I256, bits: usize) -> bool {
    if bits >= 256 {
        return true;
    }
    let bound = I256::from_raw(U256::from(1) << (bits - 1));
    value >= -bound && value < bound
}

fn describe(value: &DynSolValue) -> String {
    match value.as_type() {
        Some(ty) => format!("a value of type `{ty}`"),
        None => "a value of unknown type".to_string(),
    }
}

/// Functions of an ABI, indexed by selector and by name.
#[derive(Clone, Debug, Default)]
pub struct FunctionTable {
    by_selector: HashMap<Selector, Arc<FunctionSignature>>,
    by_name: BTreeMap<String, Vec<Selector>>,
}

impl FunctionTable {
    /// Builds the table from every function of the ABI.
    pub fn from_abi(abi: &JsonAbi) -> Result<Self> {
        Self::from_signatures(
            abi.functions().cloned().map(FunctionSignature::new).collect::<Result<Vec<_>>>()?,
        )
    }

    /// Builds the table from resolved signatures, rejecting duplicate selectors.
    pub fn from_signatures(
        signatures: impl IntoIterator<Item = FunctionSignature>,
    ) -> Result<Self> {
        let mut table = Self::default();
        for signature in signatures {
            let selector = signature.selector();
            if let Some(existing) = table.by_selector.get(&selector) {
                return Err(MockError::invalid_spec(
                    signature.name(),
                    format!(
                        "selector {selector} of `{signature}` collides with `{existing}`",
                    ),
                ));
            }
            table.by_name.entry(signature.name().to_string()).or_default().push(selector);
            table.by_selector.insert(selector, Arc::new(signature));
        }
        Ok(table)
    }

    /// Looks up a function by selector.
    pub fn get(&self, selector: &Selector) -> Option<&Arc<FunctionSignature>> {
        self.by_selector.get(selector)
    }

    /// Looks up a function by name or by full signature (`name(types)`).
    ///
    /// A bare name must refer to a single function; overloaded functions must be named by their
    /// signature.
    pub fn find(&self, name: &str) -> Result<&Arc<FunctionSignature>> {
        if name.contains('(') {
            let sig = FunctionSignature::parse(name)
                .map_err(|_| MockError::UnknownFunction(name.to_string()))?;
            return self
                .get(&sig.selector())
                .ok_or_else(|| MockError::UnknownFunction(name.to_string()));
        }
        match self.by_name.get(name).map(Vec::as_slice) {
            Some([selector]) => Ok(&self.by_selector[selector]),
            Some(selectors) if !selectors.is_empty() => Err(MockError::AmbiguousFunction {
                name: name.to_string(),
                candidates: selectors
                    .iter()
                    .map(|selector| self.by_selector[selector].signature().to_string())
                    .collect(),
            }),
            _ => Err(MockError::UnknownFunction(name.to_string())),
        }
    }

    /// Iterates over all functions, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FunctionSignature>> {
        self.by_name.values().flatten().map(|selector| &self.by_selector[selector])
    }

    pub fn len(&self) -> usize {
        self.by_selector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_selector.is_empty()
    }
}
