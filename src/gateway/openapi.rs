//! OpenAPI documentation for the wallet API.
//!
//! OpenAPI JSON: `GET /api-docs/openapi.json`

use utoipa::OpenApi;

use crate::gateway::handlers::{
    BalanceResponse, CreateTransactionBody, HealthResponse, HistoryResponse, LedgerResponse,
    TransactionDetailResponse,
};
use crate::gateway::types::{ErrorBody, TransferResponseBody};
use crate::queries::{LedgerEntryView, Pagination, TransactionView};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Walletd API",
        version = "0.1.0",
        description = "Closed-loop virtual wallet service: idempotent transfers against a double-entry ledger.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::transactions::create_transaction,
        crate::gateway::handlers::transactions::get_transaction,
        crate::gateway::handlers::wallets::get_balance,
        crate::gateway::handlers::wallets::get_ledger,
        crate::gateway::handlers::wallets::get_transaction_history,
    ),
    components(
        schemas(
            HealthResponse,
            CreateTransactionBody,
            TransferResponseBody,
            ErrorBody,
            TransactionDetailResponse,
            BalanceResponse,
            LedgerResponse,
            HistoryResponse,
            LedgerEntryView,
            TransactionView,
            Pagination,
        )
    ),
    tags(
        (name = "Wallets", description = "Transfers, balances, and ledger queries"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "Walletd API");
    }

    #[test]
    fn test_wallet_endpoints_registered() {
        let spec = ApiDoc::openapi();
        let paths = spec.paths;
        assert!(paths.paths.contains_key("/api/v1/health"));
        assert!(paths.paths.contains_key("/api/v1/wallets/transactions"));
        assert!(
            paths
                .paths
                .contains_key("/api/v1/wallets/{user_id}/balance")
        );
    }
}
