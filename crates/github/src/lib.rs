//! Workflow relay GitHub infrastructure adapter.
//!
//! Implements the port traits defined in the [`relay`] crate
//! ([`relay::WorkflowDispatcher`], [`relay::StatusReporter`]) directly over
//! the GitHub REST API with `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! Headers, timeouts, connection retries, and response handling live here;
//! the [`relay`] crate never sees them.
//!
//! ## Endpoints
//!
//! | Call | Endpoint | Success |
//! |------|----------|---------|
//! | Dispatch | `POST /repos/{repository}/actions/workflows/{workflow}/dispatches` | `204`, empty body |
//! | Status | `POST /repos/{repository}/statuses/{sha}` | `201`, status object |
//!
//! Every request carries `User-Agent`, `Accept: application/vnd.github+json`,
//! `Authorization: Bearer <token>`, and `X-GitHub-Api-Version`.

mod client;
mod requests;

pub use client::{
    ClientError, ClientSettings, GithubClient, API_VERSION, DEFAULT_API_URL, GITHUB_MEDIA_TYPE,
};
pub use requests::{dispatch_path, status_path, DispatchBody, StatusBody};
