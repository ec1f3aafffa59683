use thiserror::Error;

/// Failure taxonomy for the harness.
///
/// Everything that goes wrong below the orchestrator boundary is converted
/// into a recorded assertion outcome and never escapes as an uncaught fault.
/// Only setup-time problems (configuration, input files) abort the run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The subject failed to install. Fatal to the one test, not to the run.
    #[error("deployment failed: {0}")]
    Deployment(String),

    /// The remote runtime rejected or reverted a call. Expected and asserted
    /// upon in negative test cases, unexpected otherwise.
    #[error("call failed: {0}")]
    CallFailed(String),

    /// Transport-level failure: connection refused, non-JSON body, timeout
    /// while polling for a receipt.
    #[error("rpc transport error: {0}")]
    Transport(String),

    /// Remote payload was missing an expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
