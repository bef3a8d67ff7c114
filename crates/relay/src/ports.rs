//! Port traits implemented by infrastructure crates.
//!
//! The executor only sees these traits. The `github` crate implements
//! [`WorkflowDispatcher`] and [`StatusReporter`] over the GitHub REST API; the
//! binary implements [`Console`] for the GitHub Actions log.

use async_trait::async_trait;

use crate::{
    ApiError, ApiResponse, DispatchInputs, DispatchTarget, DispatchToken, StatusToken,
    StatusUpdate,
};

/// Triggers a `workflow_dispatch` run in a remote repository.
#[async_trait]
pub trait WorkflowDispatcher: Send + Sync {
    /// Dispatches `target.workflow` on `target.git_ref` with `inputs`.
    ///
    /// Resolves once GitHub has accepted the dispatch (usually `204`); it does
    /// not wait for the run to start or finish.
    async fn dispatch(
        &self,
        token: &DispatchToken,
        target: &DispatchTarget,
        inputs: &DispatchInputs,
    ) -> Result<ApiResponse, ApiError>;
}

/// Posts commit statuses.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Creates one commit status. Each call is an independent record.
    async fn report(
        &self,
        token: &StatusToken,
        update: &StatusUpdate,
    ) -> Result<ApiResponse, ApiError>;
}

/// Structured console output around each phase of a run.
pub trait Console: Send + Sync {
    /// Registers a secret so the log never shows it.
    fn mask(&self, secret: &str);

    /// Opens a collapsible log group.
    fn open_group(&self, title: &str);

    /// Closes the most recently opened log group.
    fn close_group(&self);
}
