//! HTTP gateway: thin axum adapter over the transfer engine and the read
//! projections. The core never sees HTTP types.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

use crate::context::ServiceContext;
use state::AppState;
use types::ErrorBody;

/// Start the HTTP gateway.
pub async fn run_server(port: u16, ctx: ServiceContext) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(ctx));

    let wallet_routes = Router::new()
        .route("/transactions", post(handlers::create_transaction))
        .route("/transactions/{transaction_id}", get(handlers::get_transaction))
        .route("/{user_id}/balance", get(handlers::get_balance))
        .route("/{user_id}/ledger", get(handlers::get_ledger))
        .route("/{user_id}/transactions", get(handlers::get_transaction_history));

    let app = Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .nest("/api/v1/wallets", wallet_routes)
        .route("/api-docs/openapi.json", get(openapi_json))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Gateway listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}

/// JSON 404 for unknown routes.
async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            status: "FAILED",
            error: "Route not found".to_string(),
            message: None,
        }),
    )
}
