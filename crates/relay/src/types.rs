//! Shared value types for the relay domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! structure: the dispatch target, the commit-status record, the typed input
//! mapping sent to the dispatched workflow, and the raw API response.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CommitSha, GitRef, InputName, InvocationId, RepositoryId, StatusContext, WorkflowId};

// ---------------------------------------------------------------------------
// Dispatch types
// ---------------------------------------------------------------------------

/// Where a workflow dispatch is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTarget {
    /// Repository owning the workflow.
    pub repository: RepositoryId,
    /// Branch, tag, or SHA the workflow runs on.
    pub git_ref: GitRef,
    /// Workflow file name or numeric id.
    pub workflow: WorkflowId,
}

// ---------------------------------------------------------------------------

/// A scalar value accepted as a workflow-dispatch input.
///
/// The dispatch API only accepts flat string-valued inputs, so anything that
/// is not one of these variants is dropped before transmission.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// A JSON string, sent as-is.
    Text(String),
    /// A JSON number, sent in canonical decimal form.
    Number(serde_json::Number),
    /// A JSON boolean, sent as `"true"` or `"false"`.
    Bool(bool),
}

impl InputValue {
    /// Classifies a JSON value, returning `None` for null, arrays, and objects.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::Text(s)),
            serde_json::Value::Number(n) => Some(Self::Number(n)),
            serde_json::Value::Bool(b) => Some(Self::Bool(b)),
            serde_json::Value::Null
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => None,
        }
    }

    /// Returns the string form transmitted to the dispatch API.
    pub fn into_wire_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => canonical_number(&n),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// Formats a number the way a JSON number prints in JavaScript.
///
/// Integers keep every digit. Other values use the shortest round-trip digits,
/// written positionally for magnitudes in `[1e-6, 1e21)` and in exponent form
/// (`1e+21`, `1.5e-7`) outside it. Negative zero prints as `"0"`.
fn canonical_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_owned(),
        Some(f) if f.is_finite() => format_js_float(f),
        _ => n.to_string(),
    }
}

fn format_js_float(f: f64) -> String {
    let sign = if f < 0.0 { "-" } else { "" };
    // `{:e}` yields the shortest round-trip digits, e.g. `1.5e300`, `1e-7`.
    let scientific = format!("{:e}", f.abs());
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return f.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return f.to_string();
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    // Position of the decimal point relative to the first digit.
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let exp_sign = if n - 1 >= 0 { "+" } else { "-" };
        let (first, rest) = digits.split_at(1);
        let rest = if rest.is_empty() {
            String::new()
        } else {
            format!(".{rest}")
        };
        format!("{first}{rest}e{exp_sign}{}", (n - 1).abs())
    };
    format!("{sign}{body}")
}

// ---------------------------------------------------------------------------

/// The finalised, string-valued input mapping sent with a workflow dispatch.
///
/// Backed by a `BTreeMap` so log output and request bodies are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchInputs(BTreeMap<String, String>);

impl DispatchInputs {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an input, replacing any previous value under `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Returns the value of an input, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Returns `true` if an input with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no inputs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates inputs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a copy suitable for logging, with the value under `secret`
    /// replaced by `***`.
    pub fn redacted(&self, secret: &InputName) -> BTreeMap<&str, &str> {
        self.iter()
            .map(|(k, v)| if k == secret.as_str() { (k, "***") } else { (k, v) })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Status types
// ---------------------------------------------------------------------------

/// State of a commit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusState {
    /// Work has started but not finished. Posted right after a dispatch.
    Pending,
    /// The remote work succeeded.
    Success,
    /// The remote work could not run to completion.
    Error,
    /// The remote work ran and failed.
    Failure,
}

impl StatusState {
    /// Returns the wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Error => "error",
            Self::Failure => "failure",
        }
    }
}

impl std::fmt::Display for StatusState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`StatusState`] name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status state '{0}', expected one of: pending, success, error, failure")]
pub struct UnknownStatusState(pub String);

impl FromStr for StatusState {
    type Err = UnknownStatusState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "failure" => Ok(Self::Failure),
            other => Err(UnknownStatusState(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------

/// A single commit-status record.
///
/// Multiple updates to the same `(repository, sha, context)` are independent
/// posts; GitHub keeps them all and shows the latest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Repository owning the commit.
    pub repository: RepositoryId,
    /// Commit the status is attached to.
    pub sha: CommitSha,
    /// Status stream label.
    pub context: StatusContext,
    /// New state.
    pub state: StatusState,
    /// Short human-readable description.
    pub description: String,
    /// Link shown next to the status. `None` is sent as JSON `null`.
    pub target_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A successful (2xx) response from the GitHub API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body. Empty for `204 No Content`.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Parses the body as JSON. Returns `None` for an empty or non-JSON body.
    pub fn json(&self) -> Option<serde_json::Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}

// ---------------------------------------------------------------------------

/// Record of a completed dispatch-and-report exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayReceipt {
    /// Identifier of the invocation that produced this receipt.
    pub invocation: InvocationId,
    /// When the dispatch was accepted.
    pub dispatched_at: Timestamp,
    /// When the pending status was accepted.
    pub reported_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
