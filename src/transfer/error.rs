//! Transfer Error Types
//!
//! Closed sum of failure kinds for the transfer engine. The HTTP adapter
//! maps kinds to status codes; the engine never touches HTTP.

use thiserror::Error;
use uuid::Uuid;

/// Transfer failure kinds.
///
/// Display strings are caller-facing; `code()` gives the stable machine
/// code and `http_status()` the suggested status for the HTTP adapter.
#[derive(Error, Debug)]
pub enum TransferError {
    // === Validation ===
    #[error("Idempotency-Key header is required")]
    MissingIdempotencyKey,

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Amount precision exceeds 4 decimal places")]
    PrecisionOverflow,

    #[error("Amount exceeds the maximum allowed")]
    AmountTooLarge,

    #[error("Source and destination users cannot be the same")]
    SameUser,

    // === Not found ===
    #[error("Asset not found: {0}")]
    UnknownAsset(String),

    #[error("Wallet not found for user {user_id}")]
    WalletNotFound { user_id: Uuid },

    #[error("Transaction not found")]
    TransactionNotFound,

    // === Business ===
    #[error("Insufficient funds.")]
    InsufficientFunds,

    // === Concurrency ===
    #[error("A request with this idempotency key is already being processed")]
    InFlight,

    #[error("Transfer aborted after repeated lock contention")]
    Contention,

    // === Integrity ===
    #[error("Ledger corruption: negative balance on wallet {0}")]
    Corruption(Uuid),

    // === Infrastructure ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TransferError {
    /// Stable machine-readable code for logs and cached outcomes.
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::MissingIdempotencyKey => "MISSING_IDEMPOTENCY_KEY",
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::PrecisionOverflow => "PRECISION_OVERFLOW",
            TransferError::AmountTooLarge => "AMOUNT_TOO_LARGE",
            TransferError::SameUser => "SAME_USER",
            TransferError::UnknownAsset(_) => "UNKNOWN_ASSET",
            TransferError::WalletNotFound { .. } => "WALLET_NOT_FOUND",
            TransferError::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            TransferError::InsufficientFunds => "INSUFFICIENT_FUNDS",
            TransferError::InFlight => "IN_FLIGHT",
            TransferError::Contention => "CONTENTION",
            TransferError::Corruption(_) => "CORRUPTION",
            TransferError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Suggested HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::MissingIdempotencyKey
            | TransferError::InvalidAmount
            | TransferError::PrecisionOverflow
            | TransferError::AmountTooLarge
            | TransferError::SameUser
            | TransferError::UnknownAsset(_)
            | TransferError::WalletNotFound { .. }
            | TransferError::InsufficientFunds => 400,
            TransferError::TransactionNotFound => 404,
            TransferError::InFlight => 409,
            TransferError::Contention
            | TransferError::Corruption(_)
            | TransferError::Database(_) => 500,
        }
    }

    /// Whether this failure is a terminal client outcome that should be
    /// cached under the idempotency key. Transient conditions (contention,
    /// infrastructure, in-flight duplicates) are never cached so a retry
    /// can reprocess.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferError::MissingIdempotencyKey
                | TransferError::InvalidAmount
                | TransferError::PrecisionOverflow
                | TransferError::AmountTooLarge
                | TransferError::SameUser
                | TransferError::UnknownAsset(_)
                | TransferError::WalletNotFound { .. }
                | TransferError::InsufficientFunds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(TransferError::InsufficientFunds.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(TransferError::SameUser.code(), "SAME_USER");
        assert_eq!(TransferError::Contention.code(), "CONTENTION");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::InvalidAmount.http_status(), 400);
        assert_eq!(TransferError::InsufficientFunds.http_status(), 400);
        assert_eq!(TransferError::TransactionNotFound.http_status(), 404);
        assert_eq!(TransferError::InFlight.http_status(), 409);
        assert_eq!(TransferError::Contention.http_status(), 500);
        assert_eq!(TransferError::Corruption(Uuid::nil()).http_status(), 500);
    }

    #[test]
    fn test_terminal_kinds_are_cacheable() {
        assert!(TransferError::InsufficientFunds.is_terminal());
        assert!(TransferError::UnknownAsset("X".into()).is_terminal());
        assert!(!TransferError::Contention.is_terminal());
        assert!(!TransferError::InFlight.is_terminal());
        assert!(!TransferError::Database(sqlx::Error::RowNotFound).is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TransferError::InsufficientFunds.to_string(),
            "Insufficient funds."
        );
    }
}
