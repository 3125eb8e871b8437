//! Service context assembled once at boot and passed explicitly to every
//! component. Tests construct alternate contexts; nothing in the service
//! reads process globals.

use anyhow::{Context as _, Result};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::Database;
use crate::idempotency::{IdempotencyCache, IdempotencyCoordinator};

pub struct ServiceContext {
    pub db: Database,
    pub idempotency: IdempotencyCoordinator,
    /// Treasury user id, resolved by well-known email once at boot and
    /// held for the process lifetime. Changing the treasury user requires
    /// a restart.
    pub treasury_user_id: Uuid,
    pub config: AppConfig,
}

impl ServiceContext {
    /// Connect to the stores, run migrations, and resolve the treasury.
    /// Refuses to start when the treasury user is absent.
    pub async fn initialize(config: AppConfig) -> Result<Self> {
        let db = Database::connect(&config.database_url, config.pg_pool_size)
            .await
            .context("Failed to connect to PostgreSQL")?;

        // Migrations go over the direct (non-pooled) connection when one
        // is configured, e.g. when DATABASE_URL points at a pgbouncer.
        match &config.direct_url {
            Some(direct_url) => {
                let direct = Database::connect(direct_url, 1)
                    .await
                    .context("Failed to connect to PostgreSQL (direct)")?;
                sqlx::migrate!("./migrations")
                    .run(direct.pool())
                    .await
                    .context("Failed to run migrations")?;
            }
            None => {
                sqlx::migrate!("./migrations")
                    .run(db.pool())
                    .await
                    .context("Failed to run migrations")?;
            }
        }

        let cache = IdempotencyCache::connect(&config.redis_url)
            .await
            .context("Failed to connect to Redis")?;
        let idempotency = IdempotencyCoordinator::new(
            cache,
            config.processing_ttl_secs,
            config.terminal_ttl_secs,
        );

        let treasury_user_id = resolve_treasury(&db, &config.treasury_email).await?;
        tracing::info!(treasury_user_id = %treasury_user_id, "Treasury user resolved");

        Ok(Self {
            db,
            idempotency,
            treasury_user_id,
            config,
        })
    }

    /// Assemble a context from already-connected parts (tests).
    pub fn new(
        db: Database,
        idempotency: IdempotencyCoordinator,
        treasury_user_id: Uuid,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            idempotency,
            treasury_user_id,
            config,
        }
    }
}

async fn resolve_treasury(db: &Database, treasury_email: &str) -> Result<Uuid> {
    let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(treasury_email)
        .fetch_optional(db.pool())
        .await
        .context("Failed to look up treasury user")?;

    id.with_context(|| {
        format!(
            "Treasury user '{}' not found; seed the treasury before starting",
            treasury_email
        )
    })
}
