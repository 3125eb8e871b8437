//! HTTP handlers for the wallet API.

pub mod health;
pub mod transactions;
pub mod wallets;

pub use health::{HealthResponse, health_check};
pub use transactions::{
    CreateTransactionBody, TransactionDetailResponse, create_transaction, get_transaction,
};
pub use wallets::{
    BalanceResponse, HistoryResponse, LedgerResponse, get_balance, get_ledger,
    get_transaction_history,
};
