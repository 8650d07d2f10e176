mod config;
mod errors;
mod feeds;
mod pricing;
mod server;
mod state;
mod store;
mod workspace;

use crate::state::AppState;
use crate::store::backend::{KvBackend, MemoryKv, SqliteKv};
use crate::store::presets::PresetStore;
use crate::workspace::Workspace;
use portable_atomic::Ordering::Relaxed;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    tracing::info!("option_desk starting");

    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    // A broken database must not take the calculator down; degrade to a
    // volatile store and keep serving.
    let backend: Box<dyn KvBackend> = match SqliteKv::open(&cfg.data_dir) {
        Ok(kv) => Box::new(kv),
        Err(e) => {
            tracing::warn!("store open failed ({e}), continuing without persistence");
            Box::new(MemoryKv::new())
        }
    };

    let store = PresetStore::open(backend);
    let mut ws = Workspace::new(chrono::Utc::now());
    if let Some(patch) = store.restore_session() {
        tracing::info!("restoring last session");
        ws.apply(&patch);
    }

    let app_state = AppState::new(cfg.clone(), ws, store);

    let app = axum::Router::new()
        .route("/api/state", axum::routing::get(server::routes::get_state))
        .route("/api/inputs", axum::routing::put(server::routes::update_inputs))
        .route("/api/adjust", axum::routing::post(server::routes::adjust))
        .route("/api/payoff", axum::routing::get(server::routes::get_payoff))
        .route("/api/strikes", axum::routing::get(server::routes::get_strikes))
        .route("/api/fetch-chain", axum::routing::post(server::routes::fetch_chain))
        .route("/api/chain", axum::routing::get(server::routes::get_chain))
        .route(
            "/api/presets",
            axum::routing::get(server::routes::list_presets)
                .post(server::routes::save_preset)
                .delete(server::routes::clear_presets),
        )
        .route(
            "/api/presets/{id}",
            axum::routing::put(server::routes::update_preset).delete(server::routes::delete_preset),
        )
        .route("/api/presets/{id}/load", axum::routing::post(server::routes::load_preset))
        .route(
            "/api/presets/system/{name}",
            axum::routing::post(server::routes::apply_system_preset),
        )
        .route("/api/export/presets", axum::routing::get(server::routes::export_presets))
        .route("/api/export/session", axum::routing::get(server::routes::export_session))
        .route("/api/import/presets", axum::routing::post(server::routes::import_presets))
        .route(
            "/api/import/session",
            axum::routing::post(server::routes::stage_session).delete(server::routes::discard_session),
        )
        .route(
            "/api/import/session/confirm",
            axum::routing::post(server::routes::confirm_session),
        )
        .route("/api/settings", axum::routing::get(server::routes::get_settings))
        .route("/api/settings/autosave", axum::routing::put(server::routes::set_auto_save))
        .route("/api/counters", axum::routing::get(server::routes::get_counters))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(app_state.clone());

    let addr = format!("0.0.0.0:{}", cfg.server_port);
    tracing::info!("server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        }
    };

    let serve_result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await;

    if let Err(e) = serve_result {
        tracing::error!("server error: {e}");
    }

    // Teardown: stop applying late fetch results, then flush the session.
    app_state.alive.store(false, Relaxed);
    if let (Ok(ws), Ok(mut store)) = (app_state.workspace.lock(), app_state.store.lock()) {
        if store.auto_save_enabled() {
            let id = store.next_id();
            store.auto_save(ws.session_snapshot(id));
            tracing::info!("session auto-saved");
        }
    }

    tracing::info!("option_desk stopped");
}
