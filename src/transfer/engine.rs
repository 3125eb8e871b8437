//! Transfer Engine
//!
//! Executes one idempotent wallet-to-wallet transfer as a single database
//! transaction: durable idempotency probe, canonically ordered row locks,
//! balance checks, paired ledger entries. The whole transaction is wrapped
//! in a bounded retry loop for deadlock / lock-timeout conditions.

use rust_decimal::Decimal;
use sqlx::postgres::PgConnection;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

use crate::context::ServiceContext;
use crate::db;
use crate::models::TransactionType;
use crate::transfer::error::TransferError;
use crate::transfer::router::Route;

/// Fixed-point scale for all monetary values.
pub const AMOUNT_SCALE: u32 = 4;

/// Validated transfer request. The HTTP adapter parses and types the
/// payload; the engine only sees these fields.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub idempotency_key: String,
    pub user_id: Uuid,
    pub tx_type: TransactionType,
    pub asset_symbol: String,
    pub amount: Decimal,
}

/// Committed transfer result.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub tx_id: Uuid,
    /// The requesting user's wallet balance after this transaction.
    pub balance: Decimal,
    /// True when the store already held a committed transaction for this
    /// idempotency key and no new rows were written.
    pub replayed: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct WalletRow {
    id: Uuid,
    user_id: Uuid,
    balance: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct CommittedTx {
    id: Uuid,
    tx_type: String,
    from_wallet_id: Uuid,
    to_wallet_id: Uuid,
}

pub struct TransferEngine;

impl TransferEngine {
    /// Execute an idempotent transfer.
    ///
    /// Validation and asset resolution fail fast without touching wallet
    /// rows. Contention (deadlock or lock timeout) retries the whole
    /// transaction with exponential backoff; the durable idempotency probe
    /// makes re-entry safe.
    pub async fn execute(
        ctx: &ServiceContext,
        req: &TransferRequest,
    ) -> Result<TransferOutcome, TransferError> {
        Self::validate(req, ctx.config.max_amount)?;

        let pool = ctx.db.pool();

        let asset_id: Uuid = sqlx::query_scalar("SELECT id FROM assets WHERE symbol = UPPER($1)")
            .bind(&req.asset_symbol)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| TransferError::UnknownAsset(req.asset_symbol.clone()))?;

        let route = Route::resolve(ctx.treasury_user_id, req.user_id, req.tx_type)?;

        let max_attempts = ctx.config.max_transfer_retries;
        let mut attempt = 0;

        loop {
            attempt += 1;

            match Self::run_attempt(pool, asset_id, &route, req, ctx.config.lock_timeout_ms).await {
                Ok(outcome) => return Ok(outcome),
                Err(TransferError::Database(err)) if db::is_contention(&err) => {
                    if attempt >= max_attempts {
                        tracing::warn!(
                            idempotency_key = %req.idempotency_key,
                            attempts = attempt,
                            error = %err,
                            "Transfer retry budget exhausted"
                        );
                        return Err(TransferError::Contention);
                    }
                    let delay = Self::backoff_delay(attempt);
                    tracing::warn!(
                        idempotency_key = %req.idempotency_key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transfer contention, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(TransferError::Database(err)) if db::is_unique_violation(&err) => {
                    // A concurrent attempt with the same key won the insert
                    // race and committed; replay its outcome.
                    tracing::debug!(
                        idempotency_key = %req.idempotency_key,
                        "Lost idempotency insert race, replaying committed outcome"
                    );
                    let mut conn = pool.acquire().await?;
                    match Self::find_committed(&mut *conn, &req.idempotency_key).await? {
                        Some(outcome) => return Ok(outcome),
                        None => return Err(TransferError::Database(err)),
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Input contracts: non-empty key, positive amount within scale and
    /// configured maximum.
    fn validate(req: &TransferRequest, max_amount: Decimal) -> Result<(), TransferError> {
        if req.idempotency_key.trim().is_empty() {
            return Err(TransferError::MissingIdempotencyKey);
        }
        if req.amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }
        if req.amount.normalize().scale() > AMOUNT_SCALE {
            return Err(TransferError::PrecisionOverflow);
        }
        if req.amount > max_amount {
            return Err(TransferError::AmountTooLarge);
        }
        Ok(())
    }

    /// Exponential backoff: 2^attempt * 100 ms.
    fn backoff_delay(attempt: u32) -> Duration {
        Duration::from_millis(100u64 * (1u64 << attempt))
    }

    /// One full attempt inside a single database transaction.
    async fn run_attempt(
        pool: &PgPool,
        asset_id: Uuid,
        route: &Route,
        req: &TransferRequest,
        lock_timeout_ms: u64,
    ) -> Result<TransferOutcome, TransferError> {
        let mut tx = pool.begin().await?;

        // Fail fast on lock waits instead of hanging the connection.
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", lock_timeout_ms))
            .execute(&mut *tx)
            .await?;

        // Durable idempotency probe: the backstop for cache misses. A hit
        // replays the committed outcome without further writes.
        if let Some(prior) = Self::find_committed(&mut *tx, &req.idempotency_key).await? {
            tx.commit().await?;
            return Ok(prior);
        }

        // Single locking read in canonical (sorted user id) order.
        let (lock_a, lock_b) = route.lock_order();
        let wallets: Vec<WalletRow> = sqlx::query_as(
            "SELECT id, user_id, balance FROM wallets \
             WHERE user_id IN ($1, $2) AND asset_id = $3 \
             ORDER BY user_id \
             FOR UPDATE",
        )
        .bind(lock_a)
        .bind(lock_b)
        .bind(asset_id)
        .fetch_all(&mut *tx)
        .await?;

        let from = wallets
            .iter()
            .find(|w| w.user_id == route.from_user_id)
            .ok_or(TransferError::WalletNotFound {
                user_id: route.from_user_id,
            })?;
        let to = wallets
            .iter()
            .find(|w| w.user_id == route.to_user_id)
            .ok_or(TransferError::WalletNotFound {
                user_id: route.to_user_id,
            })?;

        if from.balance < Decimal::ZERO {
            tracing::error!(
                wallet_id = %from.id,
                balance = %from.balance,
                "Negative balance observed under lock, refusing to transfer"
            );
            return Err(TransferError::Corruption(from.id));
        }
        if from.balance < req.amount {
            return Err(TransferError::InsufficientFunds);
        }

        let new_from = from.balance - req.amount;
        let new_to = to.balance + req.amount;

        sqlx::query("UPDATE wallets SET balance = $1, updated_at = NOW() WHERE id = $2")
            .bind(new_from)
            .bind(from.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE wallets SET balance = $1, updated_at = NOW() WHERE id = $2")
            .bind(new_to)
            .bind(to.id)
            .execute(&mut *tx)
            .await?;

        // UNIQUE(idempotency_key) is the authoritative dedup guard: of two
        // attempts racing past the cache, exactly one insert succeeds.
        let tx_id: Uuid = sqlx::query_scalar(
            "INSERT INTO transactions \
                 (idempotency_key, from_wallet_id, to_wallet_id, amount, tx_type, status) \
             VALUES ($1, $2, $3, $4, $5, 'SUCCESS') \
             RETURNING id",
        )
        .bind(&req.idempotency_key)
        .bind(from.id)
        .bind(to.id)
        .bind(req.amount)
        .bind(req.tx_type.as_str())
        .fetch_one(&mut *tx)
        .await?;

        // Both ledger sides land in one statement.
        sqlx::query(
            "INSERT INTO ledger_entries \
                 (transaction_id, wallet_id, entry_type, amount, balance_after) \
             VALUES ($1, $2, 'DEBIT', $3, $4), ($1, $5, 'CREDIT', $3, $6)",
        )
        .bind(tx_id)
        .bind(from.id)
        .bind(req.amount)
        .bind(new_from)
        .bind(to.id)
        .bind(new_to)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let balance = if route.from_user_id == req.user_id {
            new_from
        } else {
            new_to
        };

        tracing::info!(
            tx_id = %tx_id,
            tx_type = %req.tx_type,
            amount = %req.amount,
            user_id = %req.user_id,
            "Transfer committed"
        );

        Ok(TransferOutcome {
            tx_id,
            balance,
            replayed: false,
        })
    }

    /// Look up a committed transaction for this idempotency key and derive
    /// the caller-facing balance from its ledger entry. The stored
    /// transaction type decides which wallet faces the caller, so replays
    /// with mismatched arguments still report the original outcome.
    async fn find_committed(
        conn: &mut PgConnection,
        idempotency_key: &str,
    ) -> Result<Option<TransferOutcome>, TransferError> {
        let committed: Option<CommittedTx> = sqlx::query_as(
            "SELECT id, tx_type, from_wallet_id, to_wallet_id \
             FROM transactions WHERE idempotency_key = $1",
        )
        .bind(idempotency_key)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(committed) = committed else {
            return Ok(None);
        };

        let caller_wallet_id = match committed.tx_type.parse::<TransactionType>() {
            Ok(TransactionType::TopUp) | Ok(TransactionType::Bonus) => committed.to_wallet_id,
            Ok(TransactionType::Spend) => committed.from_wallet_id,
            Err(err) => {
                tracing::error!(tx_id = %committed.id, error = %err, "Stored transaction type is unreadable");
                return Err(TransferError::Corruption(committed.from_wallet_id));
            }
        };

        let balance: Decimal = sqlx::query_scalar(
            "SELECT balance_after FROM ledger_entries \
             WHERE transaction_id = $1 AND wallet_id = $2",
        )
        .bind(committed.id)
        .bind(caller_wallet_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(Some(TransferOutcome {
            tx_id: committed.id,
            balance,
            replayed: true,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(amount: Decimal) -> TransferRequest {
        TransferRequest {
            idempotency_key: "k1".to_string(),
            user_id: Uuid::new_v4(),
            tx_type: TransactionType::TopUp,
            asset_symbol: "GOLD".to_string(),
            amount,
        }
    }

    #[test]
    fn test_validate_rejects_empty_key() {
        let mut req = request(dec!(100));
        req.idempotency_key = "  ".to_string();
        assert!(matches!(
            TransferEngine::validate(&req, dec!(1000000000)),
            Err(TransferError::MissingIdempotencyKey)
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        assert!(matches!(
            TransferEngine::validate(&request(dec!(0)), dec!(1000000000)),
            Err(TransferError::InvalidAmount)
        ));
        assert!(matches!(
            TransferEngine::validate(&request(dec!(-5)), dec!(1000000000)),
            Err(TransferError::InvalidAmount)
        ));
    }

    #[test]
    fn test_validate_rejects_excess_precision() {
        assert!(matches!(
            TransferEngine::validate(&request(dec!(1.00005)), dec!(1000000000)),
            Err(TransferError::PrecisionOverflow)
        ));
        // Trailing zeros beyond scale 4 are not excess precision.
        assert!(TransferEngine::validate(&request(dec!(1.50000)), dec!(1000000000)).is_ok());
    }

    #[test]
    fn test_validate_rejects_amount_over_maximum() {
        assert!(matches!(
            TransferEngine::validate(&request(dec!(1000000000.0001)), dec!(1000000000)),
            Err(TransferError::AmountTooLarge)
        ));
        assert!(TransferEngine::validate(&request(dec!(1000000000)), dec!(1000000000)).is_ok());
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        assert_eq!(TransferEngine::backoff_delay(1), Duration::from_millis(200));
        assert_eq!(TransferEngine::backoff_delay(2), Duration::from_millis(400));
    }
}
