use alloy_primitives::{Address, Bytes, Selector};

/// Result alias used throughout the crate.
pub type Result<T, E = MockError> = std::result::Result<T, E>;

/// Errors surfaced by mock construction, call dispatch and call-log queries.
///
/// Reverts configured on a mock are not errors at the dispatch level: the hook reports them as
/// [`InterceptResult::Reverted`](crate::InterceptResult::Reverted). Only callers going through
/// the [`MockContract`](crate::MockContract) facade see them, as [`MockError::Reverted`].
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// The mock definition is inconsistent, e.g. literal return values whose count differs from
    /// the declared output types.
    #[error("invalid mock spec for `{function}`: {reason}")]
    InvalidMockSpec { function: String, reason: String },
    /// The ABI could not be parsed or one of its types could not be resolved.
    #[error("invalid ABI: {0}")]
    InvalidAbi(String),
    /// Calldata or return data does not match the declared types.
    #[error("failed to decode data for `{signature}`: {reason}")]
    Decode { signature: String, reason: String },
    /// A value's runtime shape disagrees with its declared type.
    #[error("failed to encode data for `{signature}`: {reason}")]
    Encode { signature: String, reason: String },
    /// The selector matched no function and the mock has no fallback.
    #[error("mock at {address} has no function with selector {selector} and no fallback")]
    UnknownSelector { address: Address, selector: Selector },
    /// A producer supplied a different number of values than the function declares.
    #[error("`{signature}` declares {expected} output(s), but the mock produced {actual}")]
    ArityMismatch { signature: String, expected: usize, actual: usize },
    /// A call-log query asked for a call that was never made.
    #[error("call index {index} out of range for `{function}`: only {count} call(s) recorded")]
    CallIndexOutOfRange { function: String, index: usize, count: usize },
    /// No function with the given name or signature exists on the mock.
    #[error("mock has no function named `{0}`")]
    UnknownFunction(String),
    /// The name refers to several overloads, a full signature is required.
    #[error("`{name}` is overloaded, use one of: {}", .candidates.join(", "))]
    AmbiguousFunction { name: String, candidates: Vec<String> },
    /// A call made through the facade reverted.
    #[error("call reverted{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Reverted { reason: Option<String>, data: Bytes },
    /// The execution context failed to carry out the call.
    #[error(transparent)]
    Provider(#[from] Box<dyn std::error::Error + Send + Sync>),
    /// The configuration could not be extracted.
    #[error(transparent)]
    Config(#[from] figment::Error),
}

impl MockError {
    pub(crate) fn invalid_spec(function: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidMockSpec { function: function.into(), reason: reason.to_string() }
    }

    pub(crate) fn decode(signature: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode { signature: signature.into(), reason: reason.to_string() }
    }

    pub(crate) fn encode(signature: impl Into<String>, reason: impl ToString) -> Self {
        Self::Encode { signature: signature.into(), reason: reason.to_string() }
    }

    /// Returns the decoded revert message, if this is a [`MockError::Reverted`] carrying one.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            Self::Reverted { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` if this error is a revert of a call made through the facade.
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Reverted { .. })
    }
}
