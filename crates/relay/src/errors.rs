//! Error and retry-policy types for the relay domain.
//!
//! [`RelayError`] covers every condition that stops a relay run. [`ApiError`]
//! is what the port traits return: a typed failure that distinguishes a
//! transport failure from a non-2xx protocol response, so callers can tell the
//! two apart instead of receiving a bare failure signal.
//!
//! [`RetryPolicy`] is a cross-cutting concern: infrastructure uses it to decide
//! whether a failed request may be sent again.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry.
///
/// ## Rules
///
/// - `Retryable`: the request never reached the server (connection could not
///   be established).
/// - `NonRetryable`: anything the server may have seen, including every
///   protocol error. Retrying a dispatch the server already accepted would
///   start the remote workflow twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// The operation may be retried after the caller's fixed delay.
    Retryable,
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// API errors
// ---------------------------------------------------------------------------

/// A failed GitHub API call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be completed at the transport level (DNS,
    /// connect, TLS, timeout, or a broken response stream).
    #[error("transport failure: {source}")]
    Transport {
        /// Underlying transport error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        /// `true` when the failure happened before the request was sent.
        retryable: bool,
    },

    /// The server answered with a status code outside `2xx`.
    #[error("unexpected status code {status}, expected 2xx")]
    Protocol {
        /// Observed HTTP status code.
        status: u16,
        /// Response body, lossily decoded as UTF-8. Often a JSON error message.
        body: String,
    },
}

impl ApiError {
    /// Returns whether the failed call may be sent again.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transport {
                retryable: true, ..
            } => RetryPolicy::Retryable,
            Self::Transport { .. } | Self::Protocol { .. } => RetryPolicy::NonRetryable,
        }
    }

    /// Returns the HTTP status code for protocol errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Relay errors
// ---------------------------------------------------------------------------

/// Errors that stop a relay run.
///
/// Nothing is recovered locally: every variant propagates to the binary,
/// which reports it and exits with a failure status.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required setting is missing or invalid.
    ///
    /// Produced at load time; no request is made with an invalid config.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// The caller-supplied inputs already use the reserved phone-home name.
    ///
    /// The reserved field is never silently overwritten.
    #[error("inputs must not contain the reserved phone-home input '{name}'")]
    ReservedInputName {
        /// The reserved input name.
        name: String,
    },

    /// The `inputs` value is not a JSON object.
    #[error("inputs are not a valid JSON object: {source}")]
    MalformedInputs {
        /// Parse failure reported by `serde_json`.
        #[source]
        source: serde_json::Error,
    },

    /// A return-address component contains the `;` delimiter and could not be
    /// decoded unambiguously by the dispatched workflow.
    #[error("{field} must not contain ';'")]
    DelimiterInReturnAddress {
        /// Name of the offending component.
        field: &'static str,
    },

    /// A phone-home value did not split into four non-empty components.
    #[error("malformed phone-home value: {reason}")]
    MalformedReturnAddress {
        /// What was wrong with the value.
        reason: String,
    },

    /// The workflow dispatch call failed.
    #[error("workflow dispatch failed")]
    Dispatch(#[source] ApiError),

    /// The commit-status call failed.
    #[error("commit status report failed")]
    StatusReport(#[source] ApiError),
}

impl RelayError {
    /// Convenience constructor for [`RelayError::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
