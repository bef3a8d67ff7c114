//! Run configuration.
//!
//! [`RelayConfig`] is built once by the binary and handed to the executor.
//! Nothing below the binary reads the environment.

use crate::{
    CommitSha, DispatchTarget, DispatchToken, GitRef, InputName, RelayError, RepositoryId,
    StatusContext, StatusToken, WorkflowId,
};

/// Everything one dispatch-and-report run needs.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Credential for the dispatch target.
    pub dispatch_token: DispatchToken,
    /// Repository, ref, and workflow to dispatch.
    pub target: DispatchTarget,
    /// Caller inputs as a JSON object string, parsed during the run.
    pub raw_inputs: String,
    /// Name of the reserved input carrying the return address.
    pub phone_home_field: InputName,
    /// Credential for the origin repository's commit statuses.
    pub status_token: StatusToken,
    /// Origin repository.
    pub status_repository: RepositoryId,
    /// Origin commit.
    pub status_sha: CommitSha,
    /// Status context on the origin commit.
    pub status_context: StatusContext,
}

/// Untyped settings as they arrive from the action inputs.
///
/// Every field is optional here; [`RelayConfig::from_raw`] decides which ones
/// are required.
#[derive(Debug, Clone, Default)]
pub struct RawRelayConfig {
    pub dispatch_token: Option<String>,
    pub dispatch_repository: Option<String>,
    pub dispatch_ref: Option<String>,
    pub dispatch_workflow: Option<String>,
    pub status_context: Option<String>,
    pub status_token: Option<String>,
    pub status_repository: Option<String>,
    pub status_sha: Option<String>,
    pub inputs: Option<String>,
    pub phone_home_input_name: Option<String>,
}

impl RelayConfig {
    /// Trims and validates raw settings.
    ///
    /// All missing settings are reported together in one
    /// [`RelayError::Configuration`].
    pub fn from_raw(raw: RawRelayConfig) -> Result<Self, RelayError> {
        let mut missing = Vec::new();

        let dispatch_token = required(raw.dispatch_token, "dispatch-token", &mut missing)
            .and_then(DispatchToken::new);
        let repository = required(raw.dispatch_repository, "dispatch-repository", &mut missing)
            .and_then(RepositoryId::new);
        let git_ref =
            required(raw.dispatch_ref, "dispatch-ref", &mut missing).and_then(GitRef::new);
        let workflow = required(raw.dispatch_workflow, "dispatch-workflow", &mut missing)
            .and_then(WorkflowId::new);
        let status_context = required(raw.status_context, "status-context", &mut missing)
            .and_then(StatusContext::new);
        let status_token =
            required(raw.status_token, "status-token", &mut missing).and_then(StatusToken::new);
        let status_repository = required(raw.status_repository, "status-repository", &mut missing)
            .and_then(RepositoryId::new);
        let status_sha =
            required(raw.status_sha, "status-sha", &mut missing).and_then(CommitSha::new);
        let phone_home_field =
            required(raw.phone_home_input_name, "phone-home-input-name", &mut missing)
                .and_then(InputName::new);

        let (
            Some(dispatch_token),
            Some(repository),
            Some(git_ref),
            Some(workflow),
            Some(status_context),
            Some(status_token),
            Some(status_repository),
            Some(status_sha),
            Some(phone_home_field),
        ) = (
            dispatch_token,
            repository,
            git_ref,
            workflow,
            status_context,
            status_token,
            status_repository,
            status_sha,
            phone_home_field,
        )
        else {
            return Err(RelayError::configuration(format!(
                "missing required input(s): {}",
                missing.join(", ")
            )));
        };

        let raw_inputs = raw
            .inputs
            .map(|s| s.trim().to_owned())
            .unwrap_or_else(|| "{}".to_owned());

        Ok(Self {
            dispatch_token,
            target: DispatchTarget {
                repository,
                git_ref,
                workflow,
            },
            raw_inputs,
            phone_home_field,
            status_token,
            status_repository,
            status_sha,
            status_context,
        })
    }
}

/// Returns the trimmed value, or records `name` as missing when absent or blank.
fn required(
    value: Option<String>,
    name: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(name);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> RawRelayConfig {
        RawRelayConfig {
            dispatch_token: Some("D".into()),
            dispatch_repository: Some("org/target".into()),
            dispatch_ref: Some("main".into()),
            dispatch_workflow: Some("build.yml".into()),
            status_context: Some("ci/dispatch".into()),
            status_token: Some("T".into()),
            status_repository: Some("org/origin".into()),
            status_sha: Some("abc123".into()),
            inputs: Some(r#"{"env": "prod"}"#.into()),
            phone_home_input_name: Some("__status__".into()),
        }
    }

    #[test]
    fn builds_a_typed_config_from_complete_inputs() {
        let config = RelayConfig::from_raw(complete()).unwrap();

        assert_eq!(config.dispatch_token.expose_secret(), "D");
        assert_eq!(config.target.repository.as_str(), "org/target");
        assert_eq!(config.target.git_ref.as_str(), "main");
        assert_eq!(config.target.workflow.as_str(), "build.yml");
        assert_eq!(config.raw_inputs, r#"{"env": "prod"}"#);
        assert_eq!(config.phone_home_field.as_str(), "__status__");
        assert_eq!(config.status_sha.as_str(), "abc123");
    }

    #[test]
    fn values_are_trimmed() {
        let raw = RawRelayConfig {
            dispatch_repository: Some("  org/target\n".into()),
            inputs: Some("  {}  ".into()),
            ..complete()
        };
        let config = RelayConfig::from_raw(raw).unwrap();

        assert_eq!(config.target.repository.as_str(), "org/target");
        assert_eq!(config.raw_inputs, "{}");
    }

    #[test]
    fn absent_inputs_default_to_an_empty_object() {
        let raw = RawRelayConfig {
            inputs: None,
            ..complete()
        };
        assert_eq!(RelayConfig::from_raw(raw).unwrap().raw_inputs, "{}");
    }

    #[test]
    fn reports_every_missing_setting() {
        let raw = RawRelayConfig {
            dispatch_token: None,
            status_sha: Some("   ".into()),
            ..complete()
        };
        let err = RelayConfig::from_raw(raw).unwrap_err();

        let RelayError::Configuration { message } = &err else {
            panic!("expected a configuration error, got {err:?}");
        };
        assert!(message.contains("dispatch-token"), "{message}");
        assert!(message.contains("status-sha"), "{message}");
    }
}
