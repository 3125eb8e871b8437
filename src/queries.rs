//! Read projections over the wallet ledger.
//!
//! All reads are served straight from PostgreSQL snapshot reads; no row
//! locks are taken here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{LedgerEntry, Transaction, TransactionType};
use crate::transfer::TransferError;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

/// Page window as requested by the caller, before clamping.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRequest {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageRequest {
    /// Clamp to limit in [1, 500] and offset >= 0.
    pub fn clamp(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: i64, limit: i64, offset: i64, returned: i64) -> Self {
        Self {
            total,
            limit,
            offset,
            has_more: offset + returned < total,
        }
    }
}

/// Ledger entry joined with its wallet's asset symbol.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryView {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub wallet_id: Uuid,
    pub entry_type: String,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub asset_symbol: String,
    pub created_at: DateTime<Utc>,
}

/// Transaction joined with its asset symbol.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub id: Uuid,
    pub tx_type: String,
    pub amount: Decimal,
    pub asset_symbol: String,
    pub from_wallet_id: Uuid,
    pub to_wallet_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub asset_symbol: Option<String>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub tx_type: Option<TransactionType>,
    pub asset_symbol: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

pub struct WalletQueries;

impl WalletQueries {
    /// Current balance of the user's wallet for one asset.
    ///
    /// A negative balance is reported but not rejected here; the transfer
    /// engine is the component that refuses to act on corruption.
    pub async fn get_balance(
        pool: &PgPool,
        user_id: Uuid,
        asset_symbol: &str,
    ) -> Result<Decimal, TransferError> {
        let asset_id: Uuid = sqlx::query_scalar("SELECT id FROM assets WHERE symbol = UPPER($1)")
            .bind(asset_symbol)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| TransferError::UnknownAsset(asset_symbol.to_string()))?;

        let balance: Decimal = sqlx::query_scalar(
            "SELECT balance FROM wallets WHERE user_id = $1 AND asset_id = $2",
        )
        .bind(user_id)
        .bind(asset_id)
        .fetch_optional(pool)
        .await?
        .ok_or(TransferError::WalletNotFound { user_id })?;

        if balance < Decimal::ZERO {
            tracing::error!(
                user_id = %user_id,
                asset = %asset_symbol,
                balance = %balance,
                "Negative balance observed in read path"
            );
        }

        Ok(balance)
    }

    /// Ledger entries across the user's wallets, newest first, optionally
    /// filtered by asset.
    pub async fn get_ledger(
        pool: &PgPool,
        user_id: Uuid,
        filter: &LedgerFilter,
    ) -> Result<(Vec<LedgerEntryView>, Pagination), TransferError> {
        let (limit, offset) = filter.page.clamp();

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) \
             FROM ledger_entries le \
             JOIN wallets w ON w.id = le.wallet_id \
             JOIN assets a ON a.id = w.asset_id \
             WHERE w.user_id = $1 \
               AND ($2::text IS NULL OR a.symbol = UPPER($2))",
        )
        .bind(user_id)
        .bind(filter.asset_symbol.as_deref())
        .fetch_one(pool)
        .await?;

        let entries: Vec<LedgerEntryView> = sqlx::query_as(
            "SELECT le.id, le.transaction_id, le.wallet_id, le.entry_type, \
                    le.amount, le.balance_after, a.symbol AS asset_symbol, le.created_at \
             FROM ledger_entries le \
             JOIN wallets w ON w.id = le.wallet_id \
             JOIN assets a ON a.id = w.asset_id \
             WHERE w.user_id = $1 \
               AND ($2::text IS NULL OR a.symbol = UPPER($2)) \
             ORDER BY le.created_at DESC, le.id DESC \
             LIMIT $3 OFFSET $4",
        )
        .bind(user_id)
        .bind(filter.asset_symbol.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let pagination = Pagination::new(total, limit, offset, entries.len() as i64);
        Ok((entries, pagination))
    }

    /// Transactions where the user is on either side, newest first. All
    /// filters are part of the SQL predicate so pagination totals count
    /// the filtered set.
    pub async fn get_transaction_history(
        pool: &PgPool,
        user_id: Uuid,
        filter: &HistoryFilter,
    ) -> Result<(Vec<TransactionView>, Pagination), TransferError> {
        let (limit, offset) = filter.page.clamp();
        let tx_type = filter.tx_type.map(|t| t.as_str());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) \
             FROM transactions t \
             JOIN wallets fw ON fw.id = t.from_wallet_id \
             JOIN wallets tw ON tw.id = t.to_wallet_id \
             JOIN assets a ON a.id = fw.asset_id \
             WHERE (fw.user_id = $1 OR tw.user_id = $1) \
               AND ($2::text IS NULL OR t.tx_type = $2) \
               AND ($3::text IS NULL OR a.symbol = UPPER($3)) \
               AND ($4::timestamptz IS NULL OR t.created_at >= $4) \
               AND ($5::timestamptz IS NULL OR t.created_at <= $5)",
        )
        .bind(user_id)
        .bind(tx_type)
        .bind(filter.asset_symbol.as_deref())
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_one(pool)
        .await?;

        let transactions: Vec<TransactionView> = sqlx::query_as(
            "SELECT t.id, t.tx_type, t.amount, a.symbol AS asset_symbol, \
                    t.from_wallet_id, t.to_wallet_id, t.status, t.created_at \
             FROM transactions t \
             JOIN wallets fw ON fw.id = t.from_wallet_id \
             JOIN wallets tw ON tw.id = t.to_wallet_id \
             JOIN assets a ON a.id = fw.asset_id \
             WHERE (fw.user_id = $1 OR tw.user_id = $1) \
               AND ($2::text IS NULL OR t.tx_type = $2) \
               AND ($3::text IS NULL OR a.symbol = UPPER($3)) \
               AND ($4::timestamptz IS NULL OR t.created_at >= $4) \
               AND ($5::timestamptz IS NULL OR t.created_at <= $5) \
             ORDER BY t.created_at DESC \
             LIMIT $6 OFFSET $7",
        )
        .bind(user_id)
        .bind(tx_type)
        .bind(filter.asset_symbol.as_deref())
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let pagination = Pagination::new(total, limit, offset, transactions.len() as i64);
        Ok((transactions, pagination))
    }

    /// A single transaction and its two ledger entries.
    pub async fn get_transaction_by_id(
        pool: &PgPool,
        tx_id: Uuid,
    ) -> Result<(Transaction, Vec<LedgerEntry>), TransferError> {
        let transaction: Transaction = sqlx::query_as(
            "SELECT id, idempotency_key, from_wallet_id, to_wallet_id, \
                    amount, tx_type, status, created_at \
             FROM transactions WHERE id = $1",
        )
        .bind(tx_id)
        .fetch_optional(pool)
        .await?
        .ok_or(TransferError::TransactionNotFound)?;

        let ledger: Vec<LedgerEntry> = sqlx::query_as(
            "SELECT id, transaction_id, wallet_id, entry_type, amount, balance_after, created_at \
             FROM ledger_entries WHERE transaction_id = $1 \
             ORDER BY entry_type",
        )
        .bind(tx_id)
        .fetch_all(pool)
        .await?;

        Ok((transaction, ledger))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps_limit() {
        let page = PageRequest {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(page.clamp(), (MAX_PAGE_SIZE, 0));

        let page = PageRequest {
            limit: Some(0),
            offset: None,
        };
        assert_eq!(page.clamp(), (1, 0));

        let page = PageRequest::default();
        assert_eq!(page.clamp(), (DEFAULT_PAGE_SIZE, 0));
    }

    #[test]
    fn test_has_more_contract() {
        // hasMore = offset + returned < total
        assert!(Pagination::new(10, 5, 0, 5).has_more);
        assert!(!Pagination::new(10, 5, 5, 5).has_more);
        assert!(!Pagination::new(3, 5, 0, 3).has_more);
        assert!(Pagination::new(7, 5, 0, 5).has_more);
    }
}
