//! Execution-pipeline seam.
//!
//! Contract handles send calls through a [`CallProvider`]. [`HookedProvider`] routes every call
//! through the [`MockRegistry`] first and only forwards calls it does not intercept.

use crate::{InterceptResult, MockError, MockRegistry};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use std::sync::Arc;

/// The result of a message call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallResult {
    /// The call succeeded with the given return data.
    Success(Bytes),
    /// The call reverted with the given data.
    Revert(Bytes),
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The return or revert data.
    pub fn data(&self) -> &Bytes {
        match self {
            Self::Success(data) | Self::Revert(data) => data,
        }
    }
}

/// Executes message calls.
#[async_trait]
pub trait CallProvider: Send + Sync {
    async fn call(&self, to: Address, input: Bytes) -> Result<CallResult, MockError>;
}

/// A chain where no account has code: every call succeeds with empty return data.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyAccounts;

#[async_trait]
impl CallProvider for EmptyAccounts {
    async fn call(&self, to: Address, _input: Bytes) -> Result<CallResult, MockError> {
        trace!(target: "mock", %to, "call to account without code");
        Ok(CallResult::Success(Bytes::new()))
    }
}

/// Answers calls to mocks from the registry and forwards everything else to a backend.
#[derive(Clone)]
pub struct HookedProvider {
    registry: Arc<MockRegistry>,
    backend: Arc<dyn CallProvider>,
}

impl std::fmt::Debug for HookedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookedProvider")
            .field("mocks", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl HookedProvider {
    /// Hooks the registry in front of [`EmptyAccounts`].
    pub fn new(registry: Arc<MockRegistry>) -> Self {
        Self::with_backend(registry, Arc::new(EmptyAccounts))
    }

    /// Hooks the registry in front of `backend`.
    pub fn with_backend(registry: Arc<MockRegistry>, backend: Arc<dyn CallProvider>) -> Self {
        Self { registry, backend }
    }

    pub fn registry(&self) -> &Arc<MockRegistry> {
        &self.registry
    }
}

#[async_trait]
impl CallProvider for HookedProvider {
    async fn call(&self, to: Address, input: Bytes) -> Result<CallResult, MockError> {
        match self.registry.intercept(to, &input).await? {
            InterceptResult::Returned(data) => Ok(CallResult::Success(data)),
            InterceptResult::Reverted(reason) => Ok(CallResult::Revert(reason.abi_encode())),
            InterceptResult::NotIntercepted => self.backend.call(to, input).await,
        }
    }
}
