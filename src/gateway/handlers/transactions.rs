//! Transfer handlers (create transaction, get transaction by id).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::idempotency::{CachedOutcome, OutcomeStatus, ReserveOutcome};
use crate::models::{LedgerEntry, Transaction, TransactionType};
use crate::queries::WalletQueries;
use crate::transfer::{TransferEngine, TransferError, TransferRequest};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, TransferResponseBody};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Typed transfer request body.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionBody {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: Decimal,
    pub asset_symbol: String,
}

/// Create a wallet transaction
///
/// POST /api/v1/wallets/transactions
///
/// Requires an `Idempotency-Key` header; retries with the same key replay
/// the original outcome and carry `_cached:true`.
#[utoipa::path(
    post,
    path = "/api/v1/wallets/transactions",
    request_body = CreateTransactionBody,
    params(
        ("Idempotency-Key" = String, Header, description = "Client-chosen key identifying this logical attempt")
    ),
    responses(
        (status = 200, description = "Transfer committed (or replayed)", body = TransferResponseBody),
        (status = 400, description = "Validation or business failure"),
        (status = 409, description = "Duplicate request currently processing"),
        (status = 500, description = "Contention budget exhausted or storage failure")
    ),
    tag = "Wallets"
)]
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateTransactionBody>,
) -> ApiResult<TransferResponseBody> {
    let key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::from(TransferError::MissingIdempotencyKey))?
        .to_string();

    match state.ctx.idempotency.reserve_or_fetch(&key).await {
        ReserveOutcome::Terminal(outcome) => replay_cached(outcome),
        ReserveOutcome::InFlight => Err(TransferError::InFlight.into()),
        ReserveOutcome::Reserved => {
            let req = TransferRequest {
                idempotency_key: key,
                user_id: body.user_id,
                tx_type: body.tx_type,
                asset_symbol: body.asset_symbol,
                amount: body.amount,
            };

            // Detached from the request future: a client disconnect must
            // not abort the transaction or the finalize write. A retry
            // with the same key then sees the recorded outcome.
            let task_state = state.clone();
            let result = tokio::spawn(async move {
                let ctx = &task_state.ctx;
                let key = req.idempotency_key.clone();

                let result = TransferEngine::execute(ctx, &req).await;
                match &result {
                    Ok(outcome) => {
                        ctx.idempotency
                            .finalize(&key, &CachedOutcome::success(outcome.tx_id, outcome.balance))
                            .await;
                    }
                    // Only terminal client failures are cached; transient
                    // conditions leave the reservation to expire so a
                    // retry can reprocess.
                    Err(err) if err.is_terminal() => {
                        ctx.idempotency
                            .finalize(&key, &CachedOutcome::failed(err.to_string(), None))
                            .await;
                    }
                    Err(_) => {}
                }
                result
            })
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "Transfer task panicked");
                ApiError::internal("Transfer failed unexpectedly")
            })?;

            match result {
                Ok(outcome) => Ok(Json(TransferResponseBody::new(
                    outcome.tx_id,
                    outcome.balance,
                    outcome.replayed,
                ))),
                Err(err) => Err(err.into()),
            }
        }
    }
}

/// Map a cached terminal outcome back onto the wire contract.
fn replay_cached(outcome: CachedOutcome) -> ApiResult<TransferResponseBody> {
    match outcome.status {
        OutcomeStatus::Success => match (outcome.tx_id, outcome.balance) {
            (Some(tx_id), Some(balance)) => {
                Ok(Json(TransferResponseBody::new(tx_id, balance, true)))
            }
            _ => Err(ApiError::internal("Cached outcome is incomplete")),
        },
        OutcomeStatus::Failed => Err(ApiError {
            status: axum::http::StatusCode::BAD_REQUEST,
            error: outcome
                .error
                .unwrap_or_else(|| "Request failed".to_string()),
            message: outcome.message,
        }),
        // reserve_or_fetch never returns Terminal(PROCESSING), but keep the
        // mapping total.
        OutcomeStatus::Processing => Err(TransferError::InFlight.into()),
    }
}

/// Transaction detail: the row plus both ledger entries.
#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionDetailResponse {
    pub transaction: Transaction,
    pub ledger: Vec<LedgerEntry>,
}

/// Get a transaction by id
///
/// GET /api/v1/wallets/transactions/{transaction_id}
#[utoipa::path(
    get,
    path = "/api/v1/wallets/transactions/{transaction_id}",
    params(
        ("transaction_id" = Uuid, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction and its ledger entries", body = TransactionDetailResponse),
        (status = 404, description = "Transaction not found")
    ),
    tag = "Wallets"
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<Uuid>,
) -> ApiResult<TransactionDetailResponse> {
    let (transaction, ledger) =
        WalletQueries::get_transaction_by_id(state.ctx.db.pool(), transaction_id).await?;

    Ok(Json(TransactionDetailResponse { transaction, ledger }))
}
