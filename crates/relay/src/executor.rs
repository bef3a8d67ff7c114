//! The dispatch-and-report executor.
//!
//! One run is strictly linear:
//!
//! 1. **Parse Inputs**: encode the caller inputs plus the phone-home field.
//! 2. **Dispatch**: trigger the remote workflow and wait for GitHub to accept.
//! 3. **Report**: post a `pending` status on the origin commit.
//!
//! The `pending` status means "dispatch accepted", not "remote work done"; the
//! dispatched workflow posts the final state itself through the phone-home
//! address (see [`report_via_phone_home`]). Any failure stops the run. There is
//! no compensating status when the dispatch fails.

use tracing::Instrument;

use crate::phone_home::{encode_dispatch_inputs, ReturnAddress};
use crate::{
    ApiResponse, Console, DispatchInputs, InvocationId, RelayConfig, RelayError, RelayReceipt,
    StatusReporter, StatusState, StatusUpdate, Timestamp, WorkflowDispatcher,
};

/// Description of the status posted after a successful dispatch.
pub const DISPATCHED_DESCRIPTION: &str = "Dispatched";

/// Drives one dispatch-and-report exchange through the port traits.
pub struct RelayExecutor<D, R, C> {
    dispatcher: D,
    reporter: R,
    console: C,
}

impl<D, R, C> RelayExecutor<D, R, C>
where
    D: WorkflowDispatcher,
    R: StatusReporter,
    C: Console,
{
    pub fn new(dispatcher: D, reporter: R, console: C) -> Self {
        Self {
            dispatcher,
            reporter,
            console,
        }
    }

    /// Runs the full exchange.
    ///
    /// Input problems fail before any request is made. A failed dispatch
    /// means no status is posted.
    pub async fn execute(&self, config: &RelayConfig) -> Result<RelayReceipt, RelayError> {
        let invocation = InvocationId::new_random();
        let span = tracing::info_span!("relay", %invocation);
        self.run(invocation, config).instrument(span).await
    }

    async fn run(
        &self,
        invocation: InvocationId,
        config: &RelayConfig,
    ) -> Result<RelayReceipt, RelayError> {
        self.console.mask(config.dispatch_token.expose_secret());
        self.console.mask(config.status_token.expose_secret());

        self.console.open_group("Parse Inputs");
        let encoded = self.encode_inputs(config);
        self.console.close_group();
        let inputs = encoded?;

        let target = &config.target;
        self.console.open_group(&format!(
            "Dispatch {} on {}",
            target.workflow, target.repository
        ));
        tracing::info!(git_ref = %target.git_ref, "dispatching workflow");
        let dispatched = self
            .dispatcher
            .dispatch(&config.dispatch_token, target, &inputs)
            .await;
        self.console.close_group();
        dispatched.map_err(RelayError::Dispatch)?;
        let dispatched_at = Timestamp::now();

        let update = StatusUpdate {
            repository: config.status_repository.clone(),
            sha: config.status_sha.clone(),
            context: config.status_context.clone(),
            state: StatusState::Pending,
            description: DISPATCHED_DESCRIPTION.to_owned(),
            target_url: None,
        };
        self.console.open_group("Report dispatched status to self");
        tracing::info!(context = %update.context, "reporting dispatched status");
        let reported = self.reporter.report(&config.status_token, &update).await;
        self.console.close_group();
        reported.map_err(RelayError::StatusReport)?;

        let receipt = RelayReceipt {
            invocation,
            dispatched_at,
            reported_at: Timestamp::now(),
        };
        tracing::info!(dispatched_at = %receipt.dispatched_at, "relay complete");
        Ok(receipt)
    }

    fn encode_inputs(&self, config: &RelayConfig) -> Result<DispatchInputs, RelayError> {
        let address = ReturnAddress::new(
            config.status_token.clone(),
            config.status_repository.clone(),
            config.status_sha.clone(),
            config.status_context.clone(),
        )?;
        let inputs =
            encode_dispatch_inputs(&config.raw_inputs, &config.phone_home_field, &address)
                .inspect_err(|e| tracing::error!(error = %e, "cannot encode inputs"))?;

        tracing::info!(
            inputs = ?inputs.redacted(&config.phone_home_field),
            "encoded dispatch inputs"
        );
        Ok(inputs)
    }
}

/// A status the dispatched workflow sends back to its origin commit.
#[derive(Debug, Clone)]
pub struct PhoneHomeReport {
    /// Decoded phone-home value.
    pub address: ReturnAddress,
    /// State to post.
    pub state: StatusState,
    /// Short description shown next to the status.
    pub description: String,
    /// Optional link, e.g. to the remote run.
    pub target_url: Option<String>,
}

/// Posts a status using only the information carried in the phone-home field.
pub async fn report_via_phone_home<R, C>(
    reporter: &R,
    console: &C,
    report: &PhoneHomeReport,
) -> Result<ApiResponse, RelayError>
where
    R: StatusReporter,
    C: Console,
{
    let address = &report.address;
    console.mask(address.token().expose_secret());

    let update = StatusUpdate {
        repository: address.repository().clone(),
        sha: address.sha().clone(),
        context: address.context().clone(),
        state: report.state,
        description: report.description.clone(),
        target_url: report.target_url.clone(),
    };

    console.open_group(&format!(
        "Report {} status to {}",
        update.state, update.repository
    ));
    tracing::info!(context = %update.context, sha = %update.sha, "reporting status");
    let reported = reporter.report(address.token(), &update).await;
    console.close_group();

    reported.map_err(RelayError::StatusReport)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        ApiError, CommitSha, DispatchInputs, DispatchTarget, DispatchToken, GitRef, InputName,
        RepositoryId, StatusContext, StatusToken, WorkflowId,
    };

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Dispatch {
            token: String,
            target: DispatchTarget,
            inputs: DispatchInputs,
        },
        Report {
            token: String,
            update: StatusUpdate,
        },
    }

    /// Fake GitHub that records calls and answers with fixed status codes.
    #[derive(Clone)]
    struct FakeGithub {
        calls: Arc<Mutex<Vec<Call>>>,
        dispatch_status: u16,
        report_status: u16,
    }

    impl FakeGithub {
        fn answering(dispatch_status: u16, report_status: u16) -> Self {
            Self {
                calls: Arc::default(),
                dispatch_status,
                report_status,
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn respond(status: u16) -> Result<ApiResponse, ApiError> {
        if (200..300).contains(&status) {
            Ok(ApiResponse {
                status,
                body: Vec::new(),
            })
        } else {
            Err(ApiError::Protocol {
                status,
                body: String::new(),
            })
        }
    }

    #[async_trait]
    impl WorkflowDispatcher for FakeGithub {
        async fn dispatch(
            &self,
            token: &DispatchToken,
            target: &DispatchTarget,
            inputs: &DispatchInputs,
        ) -> Result<ApiResponse, ApiError> {
            self.calls.lock().unwrap().push(Call::Dispatch {
                token: token.expose_secret().to_owned(),
                target: target.clone(),
                inputs: inputs.clone(),
            });
            respond(self.dispatch_status)
        }
    }

    #[async_trait]
    impl StatusReporter for FakeGithub {
        async fn report(
            &self,
            token: &StatusToken,
            update: &StatusUpdate,
        ) -> Result<ApiResponse, ApiError> {
            self.calls.lock().unwrap().push(Call::Report {
                token: token.expose_secret().to_owned(),
                update: update.clone(),
            });
            respond(self.report_status)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingConsole {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingConsole {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    impl Console for RecordingConsole {
        fn mask(&self, secret: &str) {
            self.lines.lock().unwrap().push(format!("mask {secret}"));
        }

        fn open_group(&self, title: &str) {
            self.lines.lock().unwrap().push(format!("group {title}"));
        }

        fn close_group(&self) {
            self.lines.lock().unwrap().push("endgroup".to_owned());
        }
    }

    fn config(raw_inputs: &str) -> RelayConfig {
        RelayConfig {
            dispatch_token: DispatchToken::new("D").unwrap(),
            target: DispatchTarget {
                repository: RepositoryId::new("org/target").unwrap(),
                git_ref: GitRef::new("main").unwrap(),
                workflow: WorkflowId::new("build.yml").unwrap(),
            },
            raw_inputs: raw_inputs.to_owned(),
            phone_home_field: InputName::new("__status__").unwrap(),
            status_token: StatusToken::new("T").unwrap(),
            status_repository: RepositoryId::new("org/origin").unwrap(),
            status_sha: CommitSha::new("abc123").unwrap(),
            status_context: StatusContext::new("ci/dispatch").unwrap(),
        }
    }

    fn executor(github: &FakeGithub) -> RelayExecutor<FakeGithub, FakeGithub, RecordingConsole> {
        RelayExecutor::new(github.clone(), github.clone(), RecordingConsole::default())
    }

    #[tokio::test]
    async fn dispatches_then_reports_pending() {
        let github = FakeGithub::answering(204, 201);

        executor(&github)
            .execute(&config(r#"{"env": "prod", "retries": 3, "dryRun": true}"#))
            .await
            .unwrap();

        let calls = github.calls();
        assert_eq!(calls.len(), 2);

        let Call::Dispatch {
            token,
            target,
            inputs,
        } = &calls[0]
        else {
            panic!("first call must be the dispatch: {calls:?}");
        };
        assert_eq!(token, "D");
        assert_eq!(target.workflow.as_str(), "build.yml");
        assert_eq!(
            serde_json::to_value(inputs).unwrap(),
            serde_json::json!({
                "env": "prod",
                "retries": "3",
                "dryRun": "true",
                "__status__": "T;org/origin;abc123;ci/dispatch",
            })
        );

        let Call::Report { token, update } = &calls[1] else {
            panic!("second call must be the status report: {calls:?}");
        };
        assert_eq!(token, "T");
        assert_eq!(update.repository.as_str(), "org/origin");
        assert_eq!(update.sha.as_str(), "abc123");
        assert_eq!(update.context.as_str(), "ci/dispatch");
        assert_eq!(update.state, StatusState::Pending);
        assert_eq!(update.description, "Dispatched");
        assert_eq!(update.target_url, None);
    }

    #[tokio::test]
    async fn failed_dispatch_skips_the_status_report() {
        let github = FakeGithub::answering(404, 201);

        let err = executor(&github).execute(&config("{}")).await.unwrap_err();

        assert!(matches!(
            err,
            RelayError::Dispatch(ApiError::Protocol { status: 404, .. })
        ));
        assert_eq!(github.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_status_report_is_an_error() {
        let github = FakeGithub::answering(204, 404);

        let err = executor(&github).execute(&config("{}")).await.unwrap_err();

        assert!(matches!(
            err,
            RelayError::StatusReport(ApiError::Protocol { status: 404, .. })
        ));
        assert_eq!(github.calls().len(), 2);
    }

    #[tokio::test]
    async fn reserved_input_fails_before_any_request() {
        let github = FakeGithub::answering(204, 201);

        let err = executor(&github)
            .execute(&config(r#"{"__status__": "x"}"#))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::ReservedInputName { .. }));
        assert!(github.calls().is_empty());
    }

    #[tokio::test]
    async fn malformed_inputs_fail_before_any_request() {
        let github = FakeGithub::answering(204, 201);

        let err = executor(&github)
            .execute(&config("{not json"))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::MalformedInputs { .. }));
        assert!(github.calls().is_empty());
    }

    #[tokio::test]
    async fn delimiter_in_context_fails_before_any_request() {
        let github = FakeGithub::answering(204, 201);
        let mut config = config("{}");
        config.status_context = StatusContext::new("ci;dispatch").unwrap();

        let err = executor(&github).execute(&config).await.unwrap_err();

        assert!(matches!(err, RelayError::DelimiterInReturnAddress { .. }));
        assert!(github.calls().is_empty());
    }

    #[tokio::test]
    async fn every_phase_is_wrapped_in_a_closed_group() {
        let github = FakeGithub::answering(204, 201);
        let console = RecordingConsole::default();
        let executor = RelayExecutor::new(github.clone(), github, console.clone());

        executor.execute(&config("{}")).await.unwrap();

        assert_eq!(
            console.lines(),
            [
                "mask D",
                "mask T",
                "group Parse Inputs",
                "endgroup",
                "group Dispatch build.yml on org/target",
                "endgroup",
                "group Report dispatched status to self",
                "endgroup",
            ]
        );
    }

    #[tokio::test]
    async fn group_is_closed_when_the_dispatch_fails() {
        let github = FakeGithub::answering(500, 201);
        let console = RecordingConsole::default();
        let executor = RelayExecutor::new(github.clone(), github, console.clone());

        executor.execute(&config("{}")).await.unwrap_err();

        let lines = console.lines();
        assert_eq!(lines.last().map(String::as_str), Some("endgroup"));
        assert!(!lines.iter().any(|l| l.starts_with("group Report")));
    }

    #[tokio::test]
    async fn phone_home_report_uses_the_decoded_address() {
        let github = FakeGithub::answering(204, 201);
        let console = RecordingConsole::default();
        let report = PhoneHomeReport {
            address: ReturnAddress::decode("T;org/origin;abc123;ci/dispatch").unwrap(),
            state: StatusState::Success,
            description: "Remote build passed".to_owned(),
            target_url: Some("https://example.com/run/1".to_owned()),
        };

        report_via_phone_home(&github, &console, &report)
            .await
            .unwrap();

        let calls = github.calls();
        let [Call::Report { token, update }] = calls.as_slice() else {
            panic!("expected exactly one status report: {calls:?}");
        };
        assert_eq!(token, "T");
        assert_eq!(update.repository.as_str(), "org/origin");
        assert_eq!(update.state, StatusState::Success);
        assert_eq!(
            update.target_url.as_deref(),
            Some("https://example.com/run/1")
        );
        assert_eq!(
            console.lines(),
            [
                "mask T",
                "group Report success status to org/origin",
                "endgroup"
            ]
        );
    }
}
