//! Error types for the acquisition chain and pipeline.

use std::time::Duration;

use thiserror::Error;

/// Why a single strategy gave up.
///
/// These never leave the chain: each one is turned into a transition to the
/// next stage.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// Connection failure or per-call timeout.
    #[error("Network error: {0}")]
    TransientNetwork(String),
    /// The portal rejected the session (HTTP 403).
    #[error("Session rejected by portal (HTTP 403)")]
    AuthExpired,
    /// Any other non-success status.
    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),
    /// The body was unreadable or lacked recognisable fields.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// A strategy ran to completion without finding bill figures.
    #[error("No usable bill data")]
    NoUsableData,
}

impl From<gzwater_api::Error> for StrategyError {
    fn from(e: gzwater_api::Error) -> Self {
        Self::TransientNetwork(e.to_string())
    }
}

/// Failures surfaced to the caller of the pipeline.
///
/// Exhausting every strategy is not one of them; that yields a synthetic
/// record instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The chain did not finish within the overall budget.
    #[error("Retrieval timed out after {0:?}")]
    Timeout(Duration),
    /// The cycle was cancelled by the host before it finished.
    #[error("Retrieval cancelled")]
    Cancelled,
    /// Anything else that prevented a record from being produced.
    #[error("Retrieval failed: {0}")]
    Failure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transient() {
        let err: StrategyError = gzwater_api::Error::Timeout.into();
        assert!(matches!(err, StrategyError::TransientNetwork(_)));
    }

    #[test]
    fn display_messages() {
        assert!(StrategyError::AuthExpired.to_string().contains("403"));
        assert!(StrategyError::UnexpectedStatus(502).to_string().contains("502"));
        assert!(PipelineError::Timeout(Duration::from_secs(120))
            .to_string()
            .contains("timed out"));
        assert!(PipelineError::Failure("boom".into())
            .to_string()
            .contains("boom"));
    }
}
