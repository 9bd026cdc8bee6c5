/// Everything that can end a single account's claim attempt.
///
/// None of these abort the batch; the runner logs them against the
/// claimant's public address and moves on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("invalid account configuration: {0}")]
    Configuration(String),
    #[error("signature request failed: {0}")]
    Fetch(String),
    #[error("could not encode claim transaction: {0}")]
    Encoding(String),
    #[error("rpc query failed: {0}")]
    Rpc(String),
    /// Carries the node's message verbatim.
    #[error("{0}")]
    Submission(String),
    #[error("receipt lookup failed: {0}")]
    Confirmation(String),
}

impl From<reqwest::Error> for ClaimError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}
