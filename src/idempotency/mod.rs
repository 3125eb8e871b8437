//! Idempotency Coordinator
//!
//! Reserves idempotency keys in the cache, replays cached terminal
//! outcomes, and rejects concurrent duplicates. The cache is an
//! optimistic layer: the store's UNIQUE(idempotency_key) constraint is
//! authoritative, so cache outages degrade to store-level deduplication
//! instead of failing requests.

pub mod cache;

pub use cache::IdempotencyCache;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal or in-flight state recorded under an idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Processing,
    Success,
    Failed,
}

/// Cached request outcome, serialized verbatim into the cache as
/// `{status, txId?, balance?, error?, message?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedOutcome {
    pub status: OutcomeStatus,
    #[serde(rename = "txId", skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CachedOutcome {
    pub fn processing() -> Self {
        Self {
            status: OutcomeStatus::Processing,
            tx_id: None,
            balance: None,
            error: None,
            message: None,
        }
    }

    pub fn success(tx_id: Uuid, balance: Decimal) -> Self {
        Self {
            status: OutcomeStatus::Success,
            tx_id: Some(tx_id),
            balance: Some(balance),
            error: None,
            message: None,
        }
    }

    pub fn failed(error: impl Into<String>, message: Option<String>) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            tx_id: None,
            balance: None,
            error: Some(error.into()),
            message,
        }
    }
}

/// Result of attempting to reserve an idempotency key.
#[derive(Debug)]
pub enum ReserveOutcome {
    /// The key is ours; the caller must process the request and finalize.
    Reserved,
    /// Another request holding the same key is still processing.
    InFlight,
    /// A terminal outcome exists; replay it verbatim.
    Terminal(CachedOutcome),
}

pub struct IdempotencyCoordinator {
    cache: IdempotencyCache,
    processing_ttl_secs: u64,
    terminal_ttl_secs: u64,
}

impl IdempotencyCoordinator {
    pub fn new(cache: IdempotencyCache, processing_ttl_secs: u64, terminal_ttl_secs: u64) -> Self {
        Self {
            cache,
            processing_ttl_secs,
            terminal_ttl_secs,
        }
    }

    /// Atomically reserve `key`, or fetch what is already stored under it.
    ///
    /// A reservation that expired between our failed SET and the follow-up
    /// GET is retried once. Any cache failure degrades to `Reserved`; the
    /// store's unique constraint still deduplicates.
    pub async fn reserve_or_fetch(&self, key: &str) -> ReserveOutcome {
        let marker = match serde_json::to_string(&CachedOutcome::processing()) {
            Ok(marker) => marker,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize processing marker");
                return ReserveOutcome::Reserved;
            }
        };

        for _ in 0..2 {
            match self.cache.reserve(key, &marker, self.processing_ttl_secs).await {
                Ok(true) => return ReserveOutcome::Reserved,
                Ok(false) => match self.cache.get(key).await {
                    Ok(Some(raw)) => match serde_json::from_str::<CachedOutcome>(&raw) {
                        Ok(outcome) if outcome.status == OutcomeStatus::Processing => {
                            return ReserveOutcome::InFlight;
                        }
                        Ok(outcome) => return ReserveOutcome::Terminal(outcome),
                        Err(err) => {
                            tracing::warn!(
                                idempotency_key = %key,
                                error = %err,
                                "Unparseable idempotency cache value, proceeding without cache"
                            );
                            return ReserveOutcome::Reserved;
                        }
                    },
                    // Expired between SET and GET; take another shot at the reservation.
                    Ok(None) => continue,
                    Err(err) => {
                        tracing::warn!(
                            idempotency_key = %key,
                            error = %err,
                            "Idempotency cache read failed, degrading to store-level dedup"
                        );
                        return ReserveOutcome::Reserved;
                    }
                },
                Err(err) => {
                    tracing::warn!(
                        idempotency_key = %key,
                        error = %err,
                        "Idempotency cache reserve failed, degrading to store-level dedup"
                    );
                    return ReserveOutcome::Reserved;
                }
            }
        }

        ReserveOutcome::Reserved
    }

    /// Record a terminal outcome under `key` with the long TTL. Failures
    /// are logged and swallowed: the store already holds the truth.
    pub async fn finalize(&self, key: &str, outcome: &CachedOutcome) {
        let raw = match serde_json::to_string(outcome) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(idempotency_key = %key, error = %err, "Failed to serialize outcome");
                return;
            }
        };

        if let Err(err) = self.cache.put(key, &raw, self.terminal_ttl_secs).await {
            tracing::warn!(
                idempotency_key = %key,
                error = %err,
                "Failed to finalize idempotency cache entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_processing_marker_shape() {
        let json = serde_json::to_string(&CachedOutcome::processing()).unwrap();
        assert_eq!(json, r#"{"status":"PROCESSING"}"#);
    }

    #[test]
    fn test_success_outcome_shape() {
        let tx_id = Uuid::new_v4();
        let json = serde_json::to_string(&CachedOutcome::success(tx_id, dec!(600.0000))).unwrap();
        assert!(json.contains(r#""status":"SUCCESS""#));
        assert!(json.contains(&format!(r#""txId":"{}""#, tx_id)));
        assert!(json.contains(r#""balance":"600.0000""#));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_failed_outcome_round_trip() {
        let outcome = CachedOutcome::failed("Insufficient funds.", None);
        let json = serde_json::to_string(&outcome).unwrap();
        let back: CachedOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, OutcomeStatus::Failed);
        assert_eq!(back.error.as_deref(), Some("Insufficient funds."));
        assert!(back.tx_id.is_none());
    }
}
