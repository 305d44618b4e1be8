//! Per-function behaviors and call logs.

use crate::{MockError, Result};
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::Bytes;
use alloy_sol_types::{Revert, SolError};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::{fmt, future::Future, sync::Arc};

/// Synchronous producer callback, invoked with the decoded call arguments.
pub type SyncProducer<T> = Arc<dyn Fn(&[DynSolValue]) -> eyre::Result<T> + Send + Sync>;

/// Asynchronous producer callback, invoked with the decoded call arguments.
pub type AsyncProducer<T> =
    Arc<dyn Fn(Vec<DynSolValue>) -> BoxFuture<'static, eyre::Result<T>> + Send + Sync>;

/// Source of a return value or revert reason: a fixed value, or a function of the call's
/// arguments.
pub enum Producer<T> {
    Literal(T),
    Sync(SyncProducer<T>),
    Async(AsyncProducer<T>),
}

impl<T: Clone> Clone for Producer<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Sync(f) => Self::Sync(f.clone()),
            Self::Async(f) => Self::Async(f.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Sync(_) => f.write_str("Sync(<fn>)"),
            Self::Async(_) => f.write_str("Async(<fn>)"),
        }
    }
}

impl<T> From<T> for Producer<T> {
    fn from(value: T) -> Self {
        Self::Literal(value)
    }
}

impl<T: Clone + Send + 'static> Producer<T> {
    /// Wraps a synchronous callback.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[DynSolValue]) -> eyre::Result<T> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Wraps an asynchronous callback.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<DynSolValue>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<T>> + Send + 'static,
    {
        Self::Async(Arc::new(move |args| Box::pin(f(args))))
    }

    /// Produces a value for a call with the given arguments.
    pub async fn produce(&self, args: &[DynSolValue]) -> eyre::Result<T> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Sync(f) => f(args),
            Self::Async(f) => f(args.to_vec()).await,
        }
    }
}

/// Data returned by a successful mocked call.
#[derive(Clone, Debug, PartialEq)]
pub enum ReturnData {
    /// Values encoded against the function's declared outputs.
    Values(Vec<DynSolValue>),
    /// Bytes returned verbatim, without encoding.
    Raw(Bytes),
    /// JSON coerced into the function's declared outputs.
    Json(serde_json::Value),
}

impl From<Vec<DynSolValue>> for ReturnData {
    fn from(values: Vec<DynSolValue>) -> Self {
        Self::Values(values)
    }
}

impl From<DynSolValue> for ReturnData {
    fn from(value: DynSolValue) -> Self {
        Self::Values(vec![value])
    }
}

impl From<Bytes> for ReturnData {
    fn from(data: Bytes) -> Self {
        Self::Raw(data)
    }
}

impl From<serde_json::Value> for ReturnData {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

/// Reason attached to a mocked revert.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RevertReason {
    /// Revert without data.
    #[default]
    Empty,
    /// Revert with a message, encoded as `Error(string)`.
    Message(String),
    /// Revert with the given bytes verbatim, e.g. an encoded custom error.
    Raw(Bytes),
}

impl RevertReason {
    /// Returns the revert data as seen by the caller.
    pub fn abi_encode(&self) -> Bytes {
        match self {
            Self::Empty => Bytes::new(),
            Self::Message(message) => Revert::from(message.clone()).abi_encode().into(),
            Self::Raw(data) => data.clone(),
        }
    }

    /// Decodes revert data back into a reason.
    ///
    /// `Error(string)` payloads become [`RevertReason::Message`], anything else is kept raw.
    pub fn decode(data: &[u8]) -> Self {
        if data.is_empty() {
            return Self::Empty;
        }
        if data.starts_with(&Revert::SELECTOR)
            && let Ok(revert) = Revert::abi_decode(data)
        {
            return Self::Message(revert.reason);
        }
        Self::Raw(Bytes::copy_from_slice(data))
    }

    /// The human-readable message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<empty revert data>"),
            Self::Message(message) => f.write_str(message),
            Self::Raw(data) => write!(f, "custom error {data}"),
        }
    }
}

impl From<&str> for RevertReason {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

impl From<String> for RevertReason {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<Bytes> for RevertReason {
    fn from(data: Bytes) -> Self {
        Self::Raw(data)
    }
}

/// How a mocked function answers a call.
#[derive(Clone, Debug)]
pub enum Behavior {
    Return(Producer<ReturnData>),
    Revert(Producer<RevertReason>),
}

impl Behavior {
    /// Returns the given values on every call.
    pub fn returns(values: Vec<DynSolValue>) -> Self {
        Self::Return(Producer::Literal(ReturnData::Values(values)))
    }

    /// Reverts with the given reason on every call.
    pub fn reverts(reason: impl Into<RevertReason>) -> Self {
        Self::Revert(Producer::Literal(reason.into()))
    }

    /// Runs the behavior's producer against the call's arguments.
    ///
    /// A failing producer turns into a revert carrying the error message.
    pub async fn resolve(&self, args: &[DynSolValue]) -> Outcome {
        let produced = match self {
            Self::Return(producer) => producer.produce(args).await.map(Outcome::Return),
            Self::Revert(producer) => producer.produce(args).await.map(Outcome::Revert),
        };
        produced.unwrap_or_else(|err| {
            warn!(target: "mock", %err, "mock producer failed, reverting");
            Outcome::Revert(RevertReason::Message(err.to_string()))
        })
    }
}

/// The resolved answer to a single call.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Return(ReturnData),
    Revert(RevertReason),
}

#[derive(Debug)]
struct State {
    behavior: Behavior,
    calls: Vec<Vec<DynSolValue>>,
    configured: bool,
}

/// The current behavior of a single function together with its call log.
///
/// Recording a call and reading the behavior happen atomically; the producer then runs without
/// holding the lock, so producers may freely call back into the mock.
#[derive(Debug)]
pub struct BehaviorRegistry {
    name: String,
    default: Behavior,
    state: Mutex<State>,
}

impl BehaviorRegistry {
    /// Creates a registry whose initial and reset behavior is `default`.
    pub fn new(name: impl Into<String>, default: Behavior) -> Self {
        let state = State { behavior: default.clone(), calls: Vec::new(), configured: false };
        Self { name: name.into(), default, state: Mutex::new(state) }
    }

    /// The name of the function this registry belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the current behavior. Affects subsequent calls only.
    pub fn set(&self, behavior: Behavior) {
        debug!(target: "mock", function = %self.name, ?behavior, "configured behavior");
        let mut state = self.state.lock();
        state.behavior = behavior;
        state.configured = true;
    }

    /// Restores the behavior the registry was created with and clears the configured flag. The
    /// call log is kept.
    pub fn reset(&self) {
        debug!(target: "mock", function = %self.name, "reset behavior");
        let mut state = self.state.lock();
        state.behavior = self.default.clone();
        state.configured = false;
    }

    /// The behavior the next call will use.
    pub fn behavior(&self) -> Behavior {
        self.state.lock().behavior.clone()
    }

    /// Whether a behavior was explicitly configured since creation or the last reset.
    pub fn is_configured(&self) -> bool {
        self.state.lock().configured
    }

    /// Records a call and resolves it against the current behavior.
    pub async fn resolve(&self, args: Vec<DynSolValue>) -> Outcome {
        let behavior = {
            let mut state = self.state.lock();
            let behavior = state.behavior.clone();
            state.calls.push(args.clone());
            behavior
        };
        behavior.resolve(&args).await
    }

    /// Number of calls recorded so far.
    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    /// The decoded arguments of the call at `index`, in arrival order.
    pub fn call_data(&self, index: usize) -> Result<Vec<DynSolValue>> {
        let state = self.state.lock();
        state.calls.get(index).cloned().ok_or_else(|| MockError::CallIndexOutOfRange {
            function: self.name.clone(),
            index,
            count: state.calls.len(),
        })
    }

    /// All recorded calls, in arrival order.
    pub fn calls(&self) -> Vec<Vec<DynSolValue>> {
        self.state.lock().calls.clone()
    }
}
