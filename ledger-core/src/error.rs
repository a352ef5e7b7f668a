//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced public key is not in the account registry
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// Signature does not verify against the reconstructed payload
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Post-append consistency check failed
    #[error("Chain verification failed: {0}")]
    ChainVerificationFailed(String),

    /// Public key already bound to a different fingerprint
    #[error("Account already registered: {0}")]
    AccountAlreadyRegistered(String),

    /// Amount is not a well-formed non-negative decimal
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Malformed key material
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Serialization error (JSON document or canonical encoding)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short machine-friendly label, used as a metrics dimension
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnknownAccount(_) => "unknown_account",
            Error::InvalidSignature(_) => "invalid_signature",
            Error::ChainVerificationFailed(_) => "chain_verification_failed",
            Error::AccountAlreadyRegistered(_) => "account_already_registered",
            Error::InvalidAmount(_) => "invalid_amount",
            Error::Crypto(_) => "crypto",
            Error::Serialization(_) => "serialization",
            Error::Concurrency(_) => "concurrency",
            Error::Config(_) => "config",
            Error::Metrics(_) => "metrics",
            Error::Io(_) => "io",
        }
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}
