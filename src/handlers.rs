// HTTP request handlers for the settlement API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

use crate::app_state::{AppError, SharedState};
use crate::models::*;
use crate::oracle::{PriceRouter, PriceSource};
use crate::settlement::SettlementError;

type HandlerResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Settlement(SettlementError::Unauthorized) => StatusCode::FORBIDDEN,
        AppError::Settlement(SettlementError::InvalidId(_)) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn reject(err: AppError) -> (StatusCode, Json<Value>) {
    (
        status_for(&err),
        Json(json!({ "success": false, "error": err.to_string() })),
    )
}

// ===== HEALTH =====

pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({
        "service": "predefi-ledger",
        "batches": app_state.engine.batch_count(),
        "resolutions": app_state.engine.resolutions().len(),
        "state_digest": app_state.state_digest(),
    }))
}

// ===== READ SURFACE =====

pub async fn get_fee(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({ "fee_rate_parts": app_state.engine.fee() }))
}

pub async fn get_available(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({ "available": app_state.engine.available() }))
}

pub async fn get_router_address(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({
        "router_address": app_state.router.router_address(),
        "mock": app_state.router.is_mock(),
    }))
}

pub async fn list_batches(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    let batches: Vec<Value> = app_state
        .engine
        .iter_batches()
        .map(|b| {
            json!({
                "id": b.id,
                "pair": b.pair,
                "ticket_cost": b.ticket_cost,
                "entry_count": b.entry_count,
                "gross_pool": b.gross_pool,
                "opens_at": b.opens_at,
                "closes_at": b.closes_at,
                "resolved": b.resolved,
            })
        })
        .collect();

    Json(json!({ "batches": batches }))
}

pub async fn get_batch(State(state): State<SharedState>, Path(id): Path<u64>) -> HandlerResult {
    let app_state = state.lock().unwrap();
    let batch = app_state
        .engine
        .batch(id)
        .map_err(|e| reject(e.into()))?;
    Ok(Json(json!({ "batch": batch })))
}

pub async fn is_valid_pair(
    State(state): State<SharedState>,
    Path(pair): Path<String>,
) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({ "pair": pair, "valid": app_state.engine.is_valid_pair(&pair) }))
}

pub async fn get_price(State(state): State<SharedState>, Path(pair): Path<String>) -> HandlerResult {
    let app_state = state.lock().unwrap();
    let observation = app_state
        .router
        .observe(&pair)
        .map_err(|e| reject(e.into()))?;
    Ok(Json(json!({ "pair": pair, "price": observation })))
}

pub async fn get_result(
    State(state): State<SharedState>,
    Path((account, id)): Path<(String, u64)>,
) -> Json<Value> {
    let app_state = state.lock().unwrap();
    let record = app_state.engine.result(&account, id);
    Json(json!({ "account": account, "batch_id": id, "result": record }))
}

pub async fn get_claimed(
    State(state): State<SharedState>,
    Path((account, id)): Path<(String, u64)>,
) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({
        "account": account,
        "batch_id": id,
        "claimed": app_state.engine.claimed(&account, id),
    }))
}

pub async fn get_balance(
    State(state): State<SharedState>,
    Path(account): Path<String>,
) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({ "account": account, "balance": app_state.bank.balance(&account) }))
}

pub async fn get_activity(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({
        "activity": app_state.activity,
        "stats": app_state.bank.stats(),
    }))
}

pub async fn get_transactions(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({ "transactions": app_state.bank.recent(100) }))
}

pub async fn get_account_transactions(
    State(state): State<SharedState>,
    Path(account): Path<String>,
) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({
        "account": account,
        "transactions": app_state.bank.transactions_for(&account),
    }))
}

pub async fn get_resolutions(State(state): State<SharedState>) -> Json<Value> {
    let app_state = state.lock().unwrap();
    Json(json!({ "resolutions": app_state.engine.resolutions() }))
}

// ===== WRITE SURFACE =====

pub async fn whitelist_pairs(
    State(state): State<SharedState>,
    Json(payload): Json<WhitelistRequest>,
) -> HandlerResult {
    let mut app_state = state.lock().unwrap();
    let tx = app_state
        .execute_whitelist(&payload.caller, &payload.pairs)
        .map_err(reject)?;
    Ok(Json(json!({ "success": true, "tx": tx.id })))
}

pub async fn new_prediction(
    State(state): State<SharedState>,
    Json(payload): Json<NewPredictionRequest>,
) -> HandlerResult {
    let mut app_state = state.lock().unwrap();
    let (batch_id, tx) = app_state
        .execute_new_prediction(
            &payload.caller,
            payload.ticket_cost,
            payload.starts_in,
            payload.lasts_for,
            &payload.pair,
        )
        .map_err(reject)?;
    Ok(Json(json!({ "success": true, "batch_id": batch_id, "tx": tx.id })))
}

pub async fn predict(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<PredictRequest>,
) -> HandlerResult {
    let mut app_state = state.lock().unwrap();
    let tx = app_state
        .execute_predict(&payload.caller, id, &payload.guesses, payload.payment)
        .map_err(reject)?;
    Ok(Json(json!({
        "success": true,
        "tx": tx.id,
        "batch_id": id,
        "guesses": payload.guesses.len(),
        "payment": payload.payment,
    })))
}

pub async fn resolve_batch(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<ResolveRequest>,
) -> HandlerResult {
    let mut app_state = state.lock().unwrap();
    let outcome = app_state
        .execute_resolve(&payload.caller, id)
        .map_err(reject)?;
    Ok(Json(json!({ "success": true, "outcome": outcome })))
}

pub async fn withdraw_win(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(payload): Json<WithdrawWinRequest>,
) -> HandlerResult {
    let mut app_state = state.lock().unwrap();
    let (amount, tx) = app_state
        .execute_withdraw_win(&payload.caller, id)
        .map_err(reject)?;
    Ok(Json(json!({
        "success": true,
        "tx": tx.id,
        "amount": amount,
        "new_balance": app_state.bank.balance(&payload.caller),
    })))
}

pub async fn collect_fee(
    State(state): State<SharedState>,
    Json(payload): Json<CollectFeeRequest>,
) -> HandlerResult {
    let mut app_state = state.lock().unwrap();
    let (amount, tx) = app_state
        .execute_collect_fee(&payload.caller, &payload.destination)
        .map_err(reject)?;
    Ok(Json(json!({ "success": true, "tx": tx.id, "amount": amount })))
}

pub async fn deposit(
    State(state): State<SharedState>,
    Json(payload): Json<DepositRequest>,
) -> Json<Value> {
    let mut app_state = state.lock().unwrap();
    let new_balance = app_state.deposit(&payload.account, payload.amount);
    Json(json!({ "success": true, "account": payload.account, "balance": new_balance }))
}

// ===== PRICE ROUTER =====

/// Pull a fresh quote from the remote router into the local table. The
/// fetch runs outside the state lock; only the final table write holds it.
pub async fn refresh_price(
    State(state): State<SharedState>,
    Path(pair): Path<String>,
) -> HandlerResult {
    let (address, mock) = {
        let app_state = state.lock().unwrap();
        (
            app_state.router.router_address().to_string(),
            app_state.router.is_mock(),
        )
    };

    if mock {
        let app_state = state.lock().unwrap();
        let observation = app_state
            .router
            .observe(&pair)
            .map_err(|e| reject(e.into()))?;
        return Ok(Json(json!({ "pair": pair, "price": observation, "mock": true })));
    }

    match PriceRouter::fetch_quote(&address, &pair).await {
        Ok(observation) => {
            let mut app_state = state.lock().unwrap();
            app_state
                .router
                .set_price(&pair, observation.price_now, observation.price_ref);
            Ok(Json(json!({ "pair": pair, "price": observation, "mock": false })))
        }
        Err(e) => Err((
            StatusCode::BAD_GATEWAY,
            Json(json!({ "success": false, "error": e })),
        )),
    }
}

// ===== DEV FACILITIES =====

pub async fn advance_time(
    State(state): State<SharedState>,
    Json(payload): Json<AdvanceTimeRequest>,
) -> Json<Value> {
    let mut app_state = state.lock().unwrap();
    let now = app_state.advance_time(payload.seconds);
    Json(json!({ "success": true, "now": now }))
}
