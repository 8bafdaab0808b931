use thiserror::Error;

/// Errors handed to callers of a compatibility check.
///
/// All variants are `Clone`: a failed check is sticky, and the same error
/// is re-served to every caller until an explicit re-check clears it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckError {
    #[error("Check already in flight; retry after it settles")]
    AlreadyRunning,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Failures produced by a transport strategy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Direct-request failure; `kind` carries the HTTP client's own
    /// discriminator (status text, "timeout", "connect", "decode").
    #[error("Request failed ({kind}): {detail}")]
    Request { kind: String, detail: String },

    /// The callback-wrapped response failed to load at all.
    #[error("Callback response failed to load: {0}")]
    JsonpLoad(String),

    /// The callback-wrapped response loaded but never invoked the
    /// expected callback.
    #[error("Response never invoked the expected callback")]
    CallbackNotInvoked,

    /// The transport failed outside its own error channel.
    #[error("Transport aborted: {0}")]
    Aborted(String),
}
