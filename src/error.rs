use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },
    #[error("rate limit exceeded, retry later")]
    RateLimited,
    /// Message stays generic: the response body must never name the missing
    /// credential.
    #[error("server configuration error")]
    Misconfigured,
    #[error("upstream error: {message}")]
    Upstream { message: String },
}

pub type Result<T> = std::result::Result<T, GatewayError>;
