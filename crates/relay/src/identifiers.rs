//! Newtype identifiers and credentials.
//!
//! Every value that names something on the GitHub side is a distinct newtype
//! wrapping a `String`. This prevents accidentally passing, for example, a
//! [`CommitSha`] where a [`GitRef`] is expected even though both are strings
//! under the hood.
//!
//! Credentials get the same treatment with one extra rule: they never print.
//! [`DispatchToken`] and [`StatusToken`] are separate types so the credential
//! for the dispatch target can never be handed to the status target (or the
//! other way round).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for bearer credentials.
// Generates: struct, new() returning Option<Self>, expose_secret(), and a
// redacting Debug. No Display and no Serialize, so a token cannot end up in a
// log line or a JSON body by accident.
// ---------------------------------------------------------------------------
macro_rules! secret_token {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(String);

        impl $name {
            /// Wraps a credential, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the raw credential for placing in an `Authorization` header.
            pub fn expose_secret(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "(***)"))
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single relay invocation.
///
/// Generated fresh for every process run and attached to the executor's span
/// so all log lines from one dispatch-and-report exchange can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Generates a new random invocation identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed (GitHub names)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a GitHub repository in `"owner/repo"` format.
    RepositoryId
}

string_id! {
    /// A Git commit SHA (40-character lowercase hex string).
    CommitSha
}

string_id! {
    /// A Git ref to run a dispatched workflow on: a branch name, tag, or SHA.
    GitRef
}

string_id! {
    /// Identifies a workflow in the target repository.
    ///
    /// Either the workflow file name (e.g. `"build.yml"`) or its numeric id.
    WorkflowId
}

string_id! {
    /// The label distinguishing one commit-status stream from another on the
    /// same commit (e.g. `"ci/dispatch"`).
    StatusContext
}

string_id! {
    /// The name of a workflow-dispatch input.
    ///
    /// Used for the reserved phone-home field.
    InputName
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

secret_token! {
    /// Bearer token authorised to dispatch workflows on the target repository.
    DispatchToken
}

secret_token! {
    /// Bearer token authorised to post commit statuses on the origin repository.
    ///
    /// This is the credential that travels inside the phone-home field.
    StatusToken
}
