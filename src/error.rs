// ⚠️ Error taxonomy for the assistant core
//
// Only ledger-threatening failures are hard errors. Low classification
// confidence is a clarification outcome, and a broken preference store
// degrades to the base classifier (see engine.rs).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TellerError {
    /// Neither an exact account number nor a type keyword resolved to a row.
    #[error("account not found: {0}")]
    AccountNotFound(String),

    /// Malformed or non-positive amount, rejected before the transfer engine runs.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The atomic transfer could not commit. Everything was rolled back.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// Underlying store failure outside a transfer scope.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TellerError>;
