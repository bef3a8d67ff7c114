//! Core domain for the workflow relay.
//!
//! The relay triggers a `workflow_dispatch` run in a remote repository and
//! posts a commit status back on the originating commit. The dispatched
//! workflow receives a "phone-home" input carrying everything it needs to post
//! its own final status later, without holding a credential of its own.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; the `github` crate defines *how* to talk to
//! the API and the binary wires everything together.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers and credentials (`RepositoryId`, `StatusToken`, etc.) |
//! | [`types`] | Shared value types (`DispatchInputs`, `StatusUpdate`, `ApiResponse`, etc.) |
//! | [`errors`] | Error and retry-policy types |
//! | [`config`] | The run configuration built once by the binary |
//! | [`phone_home`] | Return-address encoding and input finalisation |
//! | [`ports`] | Traits implemented by infrastructure |
//! | [`executor`] | The dispatch-and-report sequence |

pub mod config;
pub mod errors;
pub mod executor;
pub mod identifiers;
pub mod phone_home;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{RawRelayConfig, RelayConfig};
pub use errors::{ApiError, RelayError, RetryPolicy};
pub use executor::{report_via_phone_home, PhoneHomeReport, RelayExecutor, DISPATCHED_DESCRIPTION};
pub use identifiers::{
    CommitSha, DispatchToken, GitRef, InputName, InvocationId, RepositoryId, StatusContext,
    StatusToken, WorkflowId,
};
pub use phone_home::{encode_dispatch_inputs, ReturnAddress};
pub use ports::{Console, StatusReporter, WorkflowDispatcher};
pub use types::{
    ApiResponse, DispatchInputs, DispatchTarget, InputValue, RelayReceipt, StatusState,
    StatusUpdate, Timestamp, UnknownStatusState,
};
