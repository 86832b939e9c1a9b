use serde_json::Value;

/// Errors talking to the Host agent.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HostError {
    /// The request never produced a response (DNS, connect, timeout, ...).
    #[error("Host request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The Host answered with a non-2xx status.
    #[error("Host error {status}")]
    Status { status: u16, body: String },
}

/// Errors from the prompt-to-artifact flow.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GenerateError {
    #[error(transparent)]
    Host(#[from] HostError),

    /// The Host succeeded but named no artifact we recognize.
    #[error("Unrecognized Host response")]
    Unrecognized(Value),
}

/// Errors resolving a path to a deliverable artifact.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DeliveryError {
    #[error("Not found: {path}: {reason}")]
    NotFound { path: String, reason: String },
}

impl DeliveryError {
    pub(crate) fn not_found(path: &str, err: impl std::fmt::Display) -> Self {
        DeliveryError::NotFound {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }

    /// The underlying reason, suitable for an error body's `details`.
    pub fn reason(&self) -> &str {
        match self {
            DeliveryError::NotFound { reason, .. } => reason,
        }
    }
}

/// Errors from the Discord login flow.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("Failed to fetch token: {0}")]
    TokenTransport(#[source] reqwest::Error),

    /// Discord answered the code exchange without an access token.
    #[error("Failed to get access token")]
    TokenRejected(Value),

    #[error("Failed to fetch user info: {0}")]
    ProfileTransport(#[source] reqwest::Error),

    /// Discord answered `/users/@me` without a user id.
    #[error("Failed to fetch user info from Discord")]
    ProfileRejected(Value),

    #[error("Failed to upsert user into database")]
    Store { status: Option<u16>, body: Value },
}
