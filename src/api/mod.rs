//! HTTP adapter — Axum JSON API over the core services.
//!
//! A thin layer: handlers parse input, call one service operation, and map
//! `MarketError` to a status code. No market logic lives here.
//! CORS enabled for local development.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

/// Start the API server. This spawns a background task — it doesn't block.
pub fn spawn_server(state: AppState, host: String, port: u16) -> Result<()> {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = format!("{host}:{port}");
        info!(%addr, "API server starting");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind API port");

        axum::serve(listener, app).await.expect("API server error");
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/markets", get(routes::list_markets).post(routes::create_market))
        .route(
            "/api/markets/:id",
            get(routes::get_market).delete(routes::delete_market),
        )
        .route("/api/markets/:id/bets", post(routes::place_bet))
        .route("/api/markets/:id/settle", post(routes::settle_market))
        .route("/api/markets/:id/cancel", post(routes::cancel_market))
        .route("/api/bets/:id", get(routes::get_bet))
        .route("/api/users/:fid", get(routes::get_user))
        .route("/api/users/:fid/bets", get(routes::list_user_bets))
        .route("/api/users/:fid/withdrawals", get(routes::list_user_withdrawals))
        .route("/api/withdrawals", post(routes::request_withdrawal))
        .route("/api/withdrawals/:id/process", post(routes::process_withdrawal))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}
