// PreDeFi Settlement Ledger - Main Entry Point
// Prediction batches, staked guesses, oracle-anchored settlement

use axum::{
    routing::{get, post},
    Router,
};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tower_http::cors::{Any, CorsLayer};

use predefi_ledger::app_state::{AppState, SharedState};
use predefi_ledger::handlers::*;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    println!("\n═══════════════════════════════════════════════");
    println!("     🔮 PreDeFi Settlement Ledger");
    println!("═══════════════════════════════════════════════\n");

    let state: SharedState = Arc::new(Mutex::new(AppState::new()));

    // Clone state for the shutdown handler before moving into the router
    let shutdown_state = state.clone();

    let app = Router::new()
        // ===== READ SURFACE =====
        .route("/", get(health))
        .route("/health", get(health))
        .route("/fee", get(get_fee))
        .route("/available", get(get_available))
        .route("/router", get(get_router_address))
        .route("/batches", get(list_batches).post(new_prediction))
        .route("/batches/:id", get(get_batch))
        .route("/pairs/:pair", get(is_valid_pair))
        .route("/price/:pair", get(get_price).post(refresh_price))
        .route("/result/:account/:id", get(get_result))
        .route("/claimed/:account/:id", get(get_claimed))
        .route("/balance/:account", get(get_balance))
        .route("/ledger", get(get_activity))
        .route("/transactions", get(get_transactions))
        .route("/transactions/:account", get(get_account_transactions))
        .route("/resolutions", get(get_resolutions))
        // ===== WRITE SURFACE =====
        .route("/whitelist", post(whitelist_pairs))
        .route("/batches/:id/predict", post(predict))
        .route("/batches/:id/resolve", post(resolve_batch))
        .route("/batches/:id/withdraw", post(withdraw_win))
        .route("/fee/collect", post(collect_fee))
        .route("/deposit", post(deposit))
        // ===== DEV FACILITIES =====
        .route("/dev/advance-time", post(advance_time))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let port: u16 = std::env::var("PREDEFI_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8088);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("📋 Endpoints:");
    println!("   GET  /batches                 - List prediction batches");
    println!("   POST /batches                 - Open a new batch (admin)");
    println!("   POST /batches/:id/predict     - Submit paid guesses");
    println!("   POST /batches/:id/resolve     - Settle a batch (admin)");
    println!("   POST /batches/:id/withdraw    - Claim winnings");
    println!("   POST /whitelist               - Whitelist pairs (admin)");
    println!("   POST /fee/collect             - Sweep the fee balance (admin)");
    println!("   GET  /result/:account/:id     - Winner flag and rank");
    println!("   GET  /claimed/:account/:id    - Claim status");
    println!("   GET  /fee /available /router  - Engine configuration");
    println!("   GET  /price/:pair             - Latest oracle observation");
    println!("   GET  /ledger /transactions    - Activity feed and tx log\n");

    // Shutdown handler: persist state, then exit
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C handler");

        println!("\n🛑 Shutdown signal received, saving state...");
        if let Ok(app_state) = shutdown_state.lock() {
            match app_state.save_to_disk() {
                Ok(()) => println!("💾 State saved"),
                Err(e) => eprintln!("❌ Failed to save state: {}", e),
            }
        }
        std::process::exit(0);
    });

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
