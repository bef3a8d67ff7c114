//! Phone-home input encoding.
//!
//! The dispatched workflow has no credential of its own for the origin
//! repository. To let it report back, the relay adds one synthetic input to
//! the dispatch: a "return address" made of the status token, the origin
//! repository, the commit SHA, and the status context, joined with `;`.
//!
//! ```text
//! <status token>;<status repository>;<status sha>;<status context>
//! ```
//!
//! No component may contain `;`. [`ReturnAddress::new`] enforces that, so
//! every encoded value splits back into exactly four parts.

use crate::{
    CommitSha, DispatchInputs, InputName, InputValue, RelayError, RepositoryId, StatusContext,
    StatusToken,
};

/// Separator between the four return-address components.
pub const DELIMITER: char = ';';

/// Where and how the dispatched workflow reports its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnAddress {
    token: StatusToken,
    repository: RepositoryId,
    sha: CommitSha,
    context: StatusContext,
}

impl ReturnAddress {
    /// Builds a return address, rejecting any component containing `;`.
    pub fn new(
        token: StatusToken,
        repository: RepositoryId,
        sha: CommitSha,
        context: StatusContext,
    ) -> Result<Self, RelayError> {
        let components = [
            ("status-token", token.expose_secret()),
            ("status-repository", repository.as_str()),
            ("status-sha", sha.as_str()),
            ("status-context", context.as_str()),
        ];
        for (field, value) in components {
            if value.contains(DELIMITER) {
                return Err(RelayError::DelimiterInReturnAddress { field });
            }
        }

        Ok(Self {
            token,
            repository,
            sha,
            context,
        })
    }

    /// Parses an encoded phone-home value.
    pub fn decode(encoded: &str) -> Result<Self, RelayError> {
        let parts: Vec<&str> = encoded.split(DELIMITER).collect();
        let [token, repository, sha, context] = parts.as_slice() else {
            return Err(RelayError::MalformedReturnAddress {
                reason: format!("expected 4 ';'-separated components, found {}", parts.len()),
            });
        };

        let missing = |name: &str| RelayError::MalformedReturnAddress {
            reason: format!("{name} is empty"),
        };
        Ok(Self {
            token: StatusToken::new(*token).ok_or_else(|| missing("status token"))?,
            repository: RepositoryId::new(*repository).ok_or_else(|| missing("repository"))?,
            sha: CommitSha::new(*sha).ok_or_else(|| missing("sha"))?,
            context: StatusContext::new(*context).ok_or_else(|| missing("context"))?,
        })
    }

    /// Returns the encoded form, in the fixed order token, repository, SHA,
    /// context.
    pub fn encode(&self) -> String {
        [
            self.token.expose_secret(),
            self.repository.as_str(),
            self.sha.as_str(),
            self.context.as_str(),
        ]
        .join(";")
    }

    pub fn token(&self) -> &StatusToken {
        &self.token
    }

    pub fn repository(&self) -> &RepositoryId {
        &self.repository
    }

    pub fn sha(&self) -> &CommitSha {
        &self.sha
    }

    pub fn context(&self) -> &StatusContext {
        &self.context
    }
}

/// Turns the caller's JSON `inputs` into the mapping sent with the dispatch.
///
/// Fails if `raw_inputs` is not a JSON object, or if it already has a key
/// named `phone_home_field`. String, number, and boolean entries are kept
/// (numbers and booleans as their string form); null, array, and object
/// entries are dropped. The encoded `address` is added under
/// `phone_home_field`.
pub fn encode_dispatch_inputs(
    raw_inputs: &str,
    phone_home_field: &InputName,
    address: &ReturnAddress,
) -> Result<DispatchInputs, RelayError> {
    let parsed: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(raw_inputs).map_err(|source| RelayError::MalformedInputs { source })?;

    if parsed.contains_key(phone_home_field.as_str()) {
        return Err(RelayError::ReservedInputName {
            name: phone_home_field.to_string(),
        });
    }

    let mut inputs = DispatchInputs::new();
    for (name, value) in parsed {
        match InputValue::from_json(value) {
            Some(value) => inputs.insert(name, value.into_wire_string()),
            None => tracing::debug!(input = %name, "dropping non-scalar input"),
        }
    }
    inputs.insert(phone_home_field.as_str(), address.encode());

    Ok(inputs)
}
