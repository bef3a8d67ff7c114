//! Request bodies and endpoint paths for the two calls the relay makes, and
//! the port implementations built on them.

use async_trait::async_trait;
use relay::{
    ApiError, ApiResponse, DispatchInputs, DispatchTarget, DispatchToken, StatusReporter,
    StatusState, StatusToken, StatusUpdate, WorkflowDispatcher,
};
use serde::Serialize;

use crate::GithubClient;

/// `POST /repos/{repository}/actions/workflows/{workflow}/dispatches` body.
#[derive(Debug, Serialize)]
pub struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    pub git_ref: &'a str,
    pub inputs: &'a DispatchInputs,
}

/// `POST /repos/{repository}/statuses/{sha}` body.
///
/// `target_url` is always serialised, as `null` when absent.
#[derive(Debug, Serialize)]
pub struct StatusBody<'a> {
    pub state: StatusState,
    pub description: &'a str,
    pub context: &'a str,
    pub target_url: Option<&'a str>,
}

pub fn dispatch_path(target: &DispatchTarget) -> String {
    format!(
        "/repos/{}/actions/workflows/{}/dispatches",
        target.repository, target.workflow
    )
}

pub fn status_path(update: &StatusUpdate) -> String {
    format!("/repos/{}/statuses/{}", update.repository, update.sha)
}

#[async_trait]
impl WorkflowDispatcher for GithubClient {
    async fn dispatch(
        &self,
        token: &DispatchToken,
        target: &DispatchTarget,
        inputs: &DispatchInputs,
    ) -> Result<ApiResponse, ApiError> {
        let body = DispatchBody {
            git_ref: target.git_ref.as_str(),
            inputs,
        };
        self.post_json(&dispatch_path(target), token.expose_secret(), &body)
            .await
    }
}

#[async_trait]
impl StatusReporter for GithubClient {
    async fn report(
        &self,
        token: &StatusToken,
        update: &StatusUpdate,
    ) -> Result<ApiResponse, ApiError> {
        let body = StatusBody {
            state: update.state,
            description: &update.description,
            context: update.context.as_str(),
            target_url: update.target_url.as_deref(),
        };
        self.post_json(&status_path(update), token.expose_secret(), &body)
            .await
    }
}
