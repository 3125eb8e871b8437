//! Data models for the wallet ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Direction of a wallet transfer relative to the treasury.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Treasury credits the user (purchased currency).
    TopUp,
    /// Treasury credits the user (promotional grant).
    Bonus,
    /// User pays the treasury.
    Spend,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::TopUp => "TOP_UP",
            TransactionType::Bonus => "BONUS",
            TransactionType::Spend => "SPEND",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TOP_UP" => Ok(TransactionType::TopUp),
            "BONUS" => Ok(TransactionType::Bonus),
            "SPEND" => Ok(TransactionType::Spend),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DEBIT takes funds out of a wallet, CREDIT puts funds in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Debit,
    Credit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Debit => "DEBIT",
            EntryType::Credit => "CREDIT",
        }
    }
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBIT" => Ok(EntryType::Debit),
            "CREDIT" => Ok(EntryType::Credit),
            _ => Err(format!("Invalid entry type: {}", s)),
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Fungible virtual asset (GOLD, DIAMOND, ...)
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Asset {
    pub id: Uuid,
    /// Upper-case unique symbol.
    pub symbol: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Per-(user, asset) balance row. The balance column is a cached
/// projection of the ledger and is never written outside a transfer
/// transaction.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub asset_id: Uuid,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Committed transfer between two wallets. Append-only.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub idempotency_key: String,
    pub from_wallet_id: Uuid,
    pub to_wallet_id: Uuid,
    pub amount: Decimal,
    pub tx_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn tx_type_enum(&self) -> Result<TransactionType, String> {
        self.tx_type.parse()
    }
}

/// One side of a committed transfer. Exactly two entries exist per
/// transaction: a DEBIT on the source wallet and a CREDIT on the
/// destination wallet, both for the transaction amount.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub entry_type: String,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn entry_type_enum(&self) -> Result<EntryType, String> {
        self.entry_type.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_round_trip() {
        for t in [
            TransactionType::TopUp,
            TransactionType::Bonus,
            TransactionType::Spend,
        ] {
            assert_eq!(t.as_str().parse::<TransactionType>().unwrap(), t);
        }
    }

    #[test]
    fn test_transaction_type_rejects_unknown() {
        assert!("WITHDRAW".parse::<TransactionType>().is_err());
        assert!("top_up".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_entry_type_round_trip() {
        assert_eq!("DEBIT".parse::<EntryType>().unwrap(), EntryType::Debit);
        assert_eq!("CREDIT".parse::<EntryType>().unwrap(), EntryType::Credit);
        assert!("debit".parse::<EntryType>().is_err());
    }

    #[test]
    fn test_transaction_type_serde_names() {
        let json = serde_json::to_string(&TransactionType::TopUp).unwrap();
        assert_eq!(json, "\"TOP_UP\"");
        let back: TransactionType = serde_json::from_str("\"SPEND\"").unwrap();
        assert_eq!(back, TransactionType::Spend);
    }
}
