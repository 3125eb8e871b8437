//! Wallet read handlers (balance, ledger, transaction history).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::TransactionType;
use crate::queries::{
    HistoryFilter, LedgerEntryView, LedgerFilter, PageRequest, Pagination, TransactionView,
    WalletQueries,
};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult};

#[derive(Debug, Deserialize)]
pub struct BalanceParams {
    pub asset: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub asset: String,
    #[schema(example = "550.0000")]
    pub balance: Decimal,
}

/// Get wallet balance
///
/// GET /api/v1/wallets/{user_id}/balance?asset=SYMBOL
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{user_id}/balance",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("asset" = String, Query, description = "Asset symbol, e.g. GOLD")
    ),
    responses(
        (status = 200, description = "Current balance", body = BalanceResponse),
        (status = 400, description = "Missing asset or unknown user/asset/wallet")
    ),
    tag = "Wallets"
)]
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<BalanceParams>,
) -> ApiResult<BalanceResponse> {
    let asset = params
        .asset
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing asset query parameter"))?;

    let balance = WalletQueries::get_balance(state.ctx.db.pool(), user_id, &asset).await?;

    Ok(Json(BalanceResponse {
        user_id,
        asset: asset.to_uppercase(),
        balance,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LedgerParams {
    pub asset: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerResponse {
    pub entries: Vec<LedgerEntryView>,
    pub pagination: Pagination,
}

/// Get ledger entries for a user's wallets
///
/// GET /api/v1/wallets/{user_id}/ledger?asset&limit&offset
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{user_id}/ledger",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("asset" = Option<String>, Query, description = "Optional asset symbol filter"),
        ("limit" = Option<i64>, Query, description = "Page size, clamped to [1, 500]"),
        ("offset" = Option<i64>, Query, description = "Page offset")
    ),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = LedgerResponse)
    ),
    tag = "Wallets"
)]
pub async fn get_ledger(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<LedgerParams>,
) -> ApiResult<LedgerResponse> {
    let filter = LedgerFilter {
        asset_symbol: params.asset.filter(|s| !s.is_empty()),
        page: PageRequest {
            limit: params.limit,
            offset: params.offset,
        },
    };

    let (entries, pagination) =
        WalletQueries::get_ledger(state.ctx.db.pool(), user_id, &filter).await?;

    Ok(Json(LedgerResponse { entries, pagination }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    pub asset: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub transactions: Vec<TransactionView>,
    pub pagination: Pagination,
}

fn parse_date(value: &str, field: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::bad_request(format!("Invalid {}: expected RFC 3339 timestamp", field)))
}

/// Get transaction history for a user
///
/// GET /api/v1/wallets/{user_id}/transactions?type&asset&startDate&endDate&limit&offset
#[utoipa::path(
    get,
    path = "/api/v1/wallets/{user_id}/transactions",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("type" = Option<String>, Query, description = "Optional type filter: TOP_UP, BONUS, SPEND"),
        ("asset" = Option<String>, Query, description = "Optional asset symbol filter"),
        ("startDate" = Option<String>, Query, description = "Inclusive RFC 3339 lower bound"),
        ("endDate" = Option<String>, Query, description = "Inclusive RFC 3339 upper bound"),
        ("limit" = Option<i64>, Query, description = "Page size, clamped to [1, 500]"),
        ("offset" = Option<i64>, Query, description = "Page offset")
    ),
    responses(
        (status = 200, description = "Transactions involving the user, newest first", body = HistoryResponse),
        (status = 400, description = "Invalid filter value")
    ),
    tag = "Wallets"
)]
pub async fn get_transaction_history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<HistoryResponse> {
    let tx_type = match params.tx_type.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<TransactionType>()
                .map_err(|_| ApiError::bad_request(format!("Invalid type: {}", raw)))?,
        ),
        None => None,
    };

    let start_date = params
        .start_date
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| parse_date(s, "startDate"))
        .transpose()?;
    let end_date = params
        .end_date
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| parse_date(s, "endDate"))
        .transpose()?;

    let filter = HistoryFilter {
        tx_type,
        asset_symbol: params.asset.filter(|s| !s.is_empty()),
        start_date,
        end_date,
        page: PageRequest {
            limit: params.limit,
            offset: params.offset,
        },
    };

    let (transactions, pagination) =
        WalletQueries::get_transaction_history(state.ctx.db.pool(), user_id, &filter).await?;

    Ok(Json(HistoryResponse {
        transactions,
        pagination,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_accepts_rfc3339() {
        assert!(parse_date("2026-08-01T00:00:00Z", "startDate").is_ok());
        assert!(parse_date("2026-08-01T12:30:00+02:00", "startDate").is_ok());
    }

    #[test]
    fn test_parse_date_rejects_bare_dates() {
        assert!(parse_date("2026-08-01", "startDate").is_err());
        assert!(parse_date("yesterday", "endDate").is_err());
    }
}
