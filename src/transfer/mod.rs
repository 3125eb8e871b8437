//! Transactional transfer engine and its routing / failure taxonomy.

pub mod engine;
pub mod error;
pub mod router;

pub use engine::{TransferEngine, TransferOutcome, TransferRequest, AMOUNT_SCALE};
pub use error::TransferError;
pub use router::Route;
