//! Errors raised while driving a test case

use crate::error::TfplugError;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AcctestError {
    #[error("Reference to undeclared input variable \"{0}\"")]
    UndefinedVariable(String),

    #[error("Reference to unknown value {0}")]
    UnresolvedReference(String),

    #[error("Cycle between resources: {0}")]
    DependencyCycle(String),

    #[error("Invalid resource type \"{0}\": the provider does not support it")]
    UnknownResourceType(String),

    #[error("Error configuring provider: {0}")]
    ProviderConfigure(String),

    #[error("{address}: invalid configuration: {message}")]
    Configuration { address: String, message: String },

    #[error("{address}: error during {action}: {message}")]
    Apply {
        address: String,
        action: String,
        message: String,
    },

    #[error("{address}: error refreshing state: {message}")]
    Refresh { address: String, message: String },

    #[error("After applying this test step, the plan was not empty: {address} will be {action}{detail}")]
    NonEmptyPlan {
        address: String,
        action: String,
        detail: String,
    },

    #[error("Not found: {0} in state")]
    ResourceNotInState(String),

    #[error("{0}")]
    CheckFailed(String),

    #[error("{0}")]
    Aggregate(AggregateErrors),

    #[error("{0}: resource does not support import")]
    ImportNotSupported(String),

    #[error("{address}: import failed: {message}")]
    Import { address: String, message: String },

    #[error("ImportStateVerify attributes not equivalent for {address}:\n{diff}")]
    ImportStateVerify { address: String, diff: String },

    #[error("Expected an error matching /{0}/ but the step succeeded")]
    ExpectedErrorNotRaised(String),

    #[error("Expected an error matching /{pattern}/, got: {message}")]
    UnexpectedError { pattern: String, message: String },

    #[error("Error running post-test destroy, there may be dangling resources: {0}")]
    Destroy(String),

    #[error("Test case timed out after {0:?}")]
    Timeout(Duration),

    #[error("Test case cancelled")]
    Cancelled,

    #[error(transparent)]
    Framework(#[from] TfplugError),
}

impl AcctestError {
    pub fn check(message: impl Into<String>) -> Self {
        AcctestError::CheckFailed(message.into())
    }
}

/// Every failure reported by an aggregate check, one per line
#[derive(Debug)]
pub struct AggregateErrors(pub Vec<AcctestError>);

impl std::fmt::Display for AggregateErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}
