use thiserror::Error;

/// Storage failures. These propagate to the caller: a message that cannot
/// be durably recorded must not be silently dropped.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("write rejected: {0}")]
    WriteRejected(String),
}

/// Generation-capability failures. These never propagate past the context
/// core — every caller resolves them through a degraded fallback.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request failed: {0}")]
    Transient(String),

    #[error("generation call timed out after {0}s")]
    Timeout(u64),

    #[error("malformed generation response: {0}")]
    Malformed(String),
}
