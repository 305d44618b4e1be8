//! # foundry-mock
//!
//! Programmable mock contracts for EVM test environments.
//!
//! A mock is an address that answers calls like a deployed contract would, but every function's
//! response is configured by the test: a literal value, a value computed from the decoded
//! arguments (synchronously or asynchronously), or a revert. Every call's decoded arguments are
//! recorded and can be asserted on afterwards.
//!
//! ```no_run
//! # async fn example() -> Result<(), foundry_mock::MockError> {
//! use alloy_dyn_abi::DynSolValue;
//! use alloy_json_abi::JsonAbi;
//! use alloy_primitives::U256;
//! use foundry_mock::{MockFactory, MockOptions, MockRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(MockRegistry::new());
//! let factory = MockFactory::new(registry);
//!
//! let abi = JsonAbi::parse(["function getUint256() returns (uint256)"]).unwrap();
//! let mock = factory.from_abi(&abi, MockOptions::default())?;
//!
//! mock.function("getUint256")?.will_return_with(DynSolValue::Uint(U256::from(1234), 256));
//! let out = mock.call("getUint256", &[]).await?;
//! assert_eq!(out, [DynSolValue::Uint(U256::from(1234), 256)]);
//! assert_eq!(mock.get_call_count("getUint256")?, 1);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate tracing;

pub mod abi;
pub use abi::{FunctionSignature, FunctionTable, zero_value};

pub mod behavior;
pub use behavior::{Behavior, BehaviorRegistry, Outcome, Producer, ReturnData, RevertReason};

pub mod coerce;

mod config;
pub use config::MockConfig;

mod contract;
pub use contract::{MockContract, MockFunction};

mod error;
pub use error::{MockError, Result};

mod factory;
pub use factory::{ContractFactory, DeployedContract, MockFactory, MockFunctionSpec, MockOptions};

pub mod hook;
pub use hook::{InterceptResult, MockInstance, MockRegistry};

pub mod provider;
pub use provider::{CallProvider, CallResult, EmptyAccounts, HookedProvider};
