//! walletd - Closed-Loop Virtual Wallet Service
//!
//! An authoritative ledger for fungible virtual assets. Users hold
//! per-asset wallets; a distinguished treasury wallet is the sole source
//! of credits and the destination of spends. Every balance change is an
//! atomic transfer between exactly two wallets, recorded as a paired
//! DEBIT/CREDIT in the ledger.
//!
//! # Modules
//!
//! - [`config`] - Environment-driven settings
//! - [`logging`] - tracing initialization
//! - [`db`] - PostgreSQL pool and store capability predicates
//! - [`models`] - Data model (users, assets, wallets, transactions, ledger)
//! - [`idempotency`] - Redis-backed idempotency cache and coordinator
//! - [`transfer`] - Transfer engine, request routing, failure taxonomy
//! - [`queries`] - Read projections (balance, ledger, history)
//! - [`context`] - Service context assembled at boot
//! - [`gateway`] - HTTP adapter

pub mod config;
pub mod context;
pub mod db;
pub mod gateway;
pub mod idempotency;
pub mod logging;
pub mod models;
pub mod queries;
pub mod transfer;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use context::ServiceContext;
pub use db::Database;
pub use models::{EntryType, TransactionType};
pub use transfer::{TransferEngine, TransferError, TransferOutcome, TransferRequest};
