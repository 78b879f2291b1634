//! API route handlers and state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::accounting::Accountant;
use crate::market::MarketService;
use crate::profiles::ProfileService;
use crate::settlement::SettlementEngine;
use crate::types::{Direction, Fid, MarketError, MetricKind};
use crate::withdrawal::WithdrawalProcessor;

/// Everything the handlers need, behind one Arc.
pub struct Services {
    pub markets: MarketService,
    pub settlement: SettlementEngine,
    pub accountant: Accountant,
    pub withdrawals: WithdrawalProcessor,
    pub profiles: ProfileService,
}

pub type AppState = Arc<Services>;

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Wrapper so `MarketError` gets a status code and the `success: false`
/// envelope on the way out.
pub struct ApiError(MarketError);

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MarketError::MarketNotFound(_)
            | MarketError::BetNotFound(_)
            | MarketError::WithdrawalNotFound(_)
            | MarketError::UserNotFound(_) => StatusCode::NOT_FOUND,
            MarketError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MarketError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        let body = Json(json!({ "success": false, "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

type ApiResult = Result<Json<serde_json::Value>, ApiError>;

fn ok(data: serde_json::Value) -> ApiResult {
    Ok(Json(json!({ "success": true, "data": data })))
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateMarketBody {
    pub subject_fid: Fid,
    pub metric: String,
    pub threshold: Decimal,
    pub direction: String,
    pub duration_hours: i64,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBetBody {
    pub fid: Fid,
    pub wallet: String,
    pub prediction: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalBody {
    pub fid: Fid,
    pub wallet: String,
    pub amount: Decimal,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_markets(State(state): State<AppState>) -> ApiResult {
    let markets = state.markets.list_active().await?;
    ok(json!(markets))
}

pub async fn create_market(
    State(state): State<AppState>,
    Json(body): Json<CreateMarketBody>,
) -> ApiResult {
    let metric: MetricKind = body.metric.parse()?;
    let direction: Direction = body.direction.parse()?;
    let market = state
        .markets
        .create_market(
            body.subject_fid,
            metric,
            body.threshold,
            direction,
            body.duration_hours,
        )
        .await?;
    ok(json!(market))
}

pub async fn get_market(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    let market = state.markets.market(id).await?;
    let bets = state.markets.bets_for_market(id).await?;
    ok(json!({ "market": market, "bets": bets }))
}

pub async fn delete_market(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    state.markets.delete_market(id).await?;
    ok(json!({ "deleted": id }))
}

pub async fn place_bet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PlaceBetBody>,
) -> ApiResult {
    let prediction: Direction = body.prediction.parse()?;
    let bet = state
        .markets
        .place_bet(id, body.fid, &body.wallet, prediction, body.amount)
        .await?;
    ok(json!(bet))
}

pub async fn settle_market(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    let (market, bets) = state.settlement.settle(id).await?;
    ok(json!({ "market": market, "bets": bets }))
}

pub async fn cancel_market(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    let cancelled = state.markets.cancel_market(id).await?;
    ok(json!({ "market_id": id, "cancelled_bets": cancelled.len() }))
}

pub async fn get_bet(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    let bet = state.markets.bet(id).await?;
    ok(json!(bet))
}

pub async fn list_user_bets(State(state): State<AppState>, Path(fid): Path<Fid>) -> ApiResult {
    let bets = state.markets.bets_for_user(fid).await?;
    ok(json!(bets))
}

pub async fn get_user(State(state): State<AppState>, Path(fid): Path<Fid>) -> ApiResult {
    let profile = state.profiles.get_or_fetch(fid).await?;
    let stats = state.accountant.stats(fid).await?;
    ok(json!({ "profile": profile, "stats": stats }))
}

pub async fn request_withdrawal(
    State(state): State<AppState>,
    Json(body): Json<WithdrawalBody>,
) -> ApiResult {
    let withdrawal = state
        .withdrawals
        .request_withdrawal(body.fid, &body.wallet, body.amount)
        .await?;
    ok(json!(withdrawal))
}

pub async fn process_withdrawal(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult {
    let withdrawal = state.withdrawals.process_withdrawal(id).await?;
    ok(json!(withdrawal))
}

pub async fn list_user_withdrawals(
    State(state): State<AppState>,
    Path(fid): Path<Fid>,
) -> ApiResult {
    let withdrawals = state.withdrawals.withdrawals_for_user(fid).await?;
    ok(json!(withdrawals))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
