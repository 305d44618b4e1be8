//! Coercion of JSON return values into typed ABI values.
//!
//! Lets tests configure return values without constructing [`DynSolValue`]s by hand:
//! `{"a": 1, "b": "0x1234"}` becomes a struct, `["1", true]` a tuple, and so on.

use crate::{FunctionSignature, MockError, Result, zero_value};
use alloy_dyn_abi::{DynSolType, DynSolValue};
use serde_json::Value;

/// Converts a JSON value into the outputs of `func`.
///
/// For a function with a single output the JSON describes that output directly. With several
/// outputs it must be an array with one element per output, or an object keyed by the output
/// names.
pub fn coerce_outputs(func: &FunctionSignature, value: &Value) -> Result<Vec<DynSolValue>> {
    let outputs = func.outputs();
    let err = |e: String| MockError::encode(func.signature(), e);
    match (outputs, value) {
        ([], Value::Null) => Ok(Vec::new()),
        ([], Value::Array(values)) if values.is_empty() => Ok(Vec::new()),
        ([ty], value) => Ok(vec![coerce_value(ty, value).map_err(err)?]),
        (types, Value::Array(values)) => {
            if types.len() != values.len() {
                return Err(MockError::ArityMismatch {
                    signature: func.signature().to_string(),
                    expected: types.len(),
                    actual: values.len(),
                });
            }
            std::iter::zip(types, values)
                .map(|(ty, value)| coerce_value(ty, value).map_err(err))
                .collect()
        }
        (types, Value::Object(map)) => {
            let names = func.output_names().collect::<Vec<_>>();
            if names.iter().any(|name| name.is_empty()) {
                return Err(err("outputs are unnamed, provide an array instead".to_string()));
            }
            std::iter::zip(types, names)
                .map(|(ty, name)| {
                    let value = map.get(name).unwrap_or(&Value::Null);
                    coerce_value(ty, value).map_err(|e| err(format!("{name}: {e}")))
                })
                .collect()
        }
        (types, value) => Err(err(format!(
            "expected an array of {} value(s), got {value}",
            types.len()
        ))),
    }
}

/// Converts a JSON value into a value of type `ty`.
///
/// `null` stands for the zero value. Numbers, booleans and strings go through the same parser as
/// command line arguments, so `"1 ether"`, `"0x..."` and plain decimals are all accepted where
/// the type allows it.
pub fn coerce_value(ty: &DynSolType, value: &Value) -> Result<DynSolValue, String> {
    match (ty, value) {
        (ty, Value::Null) => Ok(zero_value(ty)),
        (DynSolType::String, Value::String(s)) => Ok(DynSolValue::String(s.clone())),
        (_, Value::String(s)) => coerce_str(ty, s),
        (_, Value::Number(n)) => coerce_str(ty, &n.to_string()),
        (_, Value::Bool(b)) => coerce_str(ty, if *b { "true" } else { "false" }),

        (DynSolType::Array(inner), Value::Array(values)) => {
            Ok(DynSolValue::Array(coerce_elements(inner, values)?))
        }
        (DynSolType::FixedArray(inner, len), Value::Array(values)) => {
            if values.len() != *len {
                return Err(format!("expected {len} element(s) for `{ty}`, got {}", values.len()));
            }
            Ok(DynSolValue::FixedArray(coerce_elements(inner, values)?))
        }
        (DynSolType::Tuple(types), Value::Array(values)) => {
            Ok(DynSolValue::Tuple(coerce_fields(ty, types, values)?))
        }
        (DynSolType::CustomStruct { name, prop_names, tuple }, Value::Array(values)) => {
            Ok(DynSolValue::CustomStruct {
                name: name.clone(),
                prop_names: prop_names.clone(),
                tuple: coerce_fields(ty, tuple, values)?,
            })
        }
        (DynSolType::CustomStruct { name, prop_names, tuple }, Value::Object(map)) => {
            if let Some(unknown) = map.keys().find(|key| !prop_names.contains(key)) {
                return Err(format!("struct `{name}` has no field `{unknown}`"));
            }
            let fields = std::iter::zip(prop_names, tuple)
                .map(|(prop, ty)| {
                    coerce_value(ty, map.get(prop).unwrap_or(&Value::Null))
                        .map_err(|e| format!("{prop}: {e}"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(DynSolValue::CustomStruct {
                name: name.clone(),
                prop_names: prop_names.clone(),
                tuple: fields,
            })
        }

        (ty, value) => Err(format!("cannot convert {value} to `{ty}`")),
    }
}

fn coerce_str(ty: &DynSolType, s: &str) -> Result<DynSolValue, String> {
    ty.coerce_str(s).map_err(|e| format!("cannot parse {s:?} as `{ty}`: {e}"))
}

fn coerce_elements(inner: &DynSolType, values: &[Value]) -> Result<Vec<DynSolValue>, String> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| coerce_value(inner, value).map_err(|e| format!("[{i}]: {e}")))
        .collect()
}

fn coerce_fields(
    ty: &DynSolType,
    types: &[DynSolType],
    values: &[Value],
) -> Result<Vec<DynSolValue>, String> {
    if types.len() != values.len() {
        return Err(format!("expected {} field(s) for `{ty}`, got {}", types.len(), values.len()));
    }
    std::iter::zip(types, values)
        .enumerate()
        .map(|(i, (ty, value))| coerce_value(ty, value).map_err(|e| format!(".{i}: {e}")))
        .collect()
}
