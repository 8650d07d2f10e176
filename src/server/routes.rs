//! REST surface consumed by the view layer. Handlers stay thin: lock, call
//! into the core, serialize. Errors come back as `{"error": ...}` payloads;
//! nothing here panics on a poisoned lock or a bad document.

use crate::feeds::chain::FetchMethod;
use crate::state::AppState;
use crate::store::presets::{self, stage_session_import, Preset};
use crate::workspace::AdjustField;
use axum::extract::{Path, State};
use axum::response::Json;
use chrono::Utc;
use portable_atomic::Ordering::Relaxed;
use serde_json::json;
use std::sync::Arc;

#[derive(serde::Deserialize)]
pub struct AdjustRequest {
    pub field: AdjustField,
    pub direction: f64,
    pub step: Option<f64>,
}

#[derive(serde::Deserialize)]
pub struct FetchRequest {
    pub url: Option<String>,
    pub symbol: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct SavePresetRequest {
    pub name: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct AutoSaveRequest {
    pub enabled: bool,
}

fn lock_err() -> Json<serde_json::Value> {
    Json(json!({ "error": "state lock poisoned" }))
}

/// GET /api/state -- inputs, derived outputs, and the last fetch summary.
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let Ok(ws) = state.workspace.lock() else { return lock_err() };
    state.counters.derivations_computed.fetch_add(1, Relaxed);
    let derived = ws.derived(Utc::now());

    let last_fetch = match state.last_fetch.lock() {
        Ok(guard) => guard
            .as_ref()
            .map(|o| json!({ "method": o.method, "url": o.url, "error": o.error })),
        Err(_) => None,
    };

    Json(json!({
        "workspace": *ws,
        "derived": derived,
        "lastFetch": last_fetch,
    }))
}

/// PUT /api/inputs -- partial update; absent fields keep their values.
pub async fn update_inputs(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<presets::PresetPatch>,
) -> Json<serde_json::Value> {
    let Ok(mut ws) = state.workspace.lock() else { return lock_err() };
    ws.apply(&patch);
    state.counters.ladder_syncs.fetch_add(1, Relaxed);
    Json(json!({ "workspace": *ws, "derived": ws.derived(Utc::now()) }))
}

/// POST /api/adjust -- stepper nudges for tp/sl/premium.
pub async fn adjust(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdjustRequest>,
) -> Json<serde_json::Value> {
    let Ok(mut ws) = state.workspace.lock() else { return lock_err() };
    ws.adjust(req.field, req.direction, req.step);
    Json(json!({ "workspace": *ws }))
}

/// GET /api/payoff -- the chart series alone.
pub async fn get_payoff(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let Ok(ws) = state.workspace.lock() else { return lock_err() };
    let series = crate::pricing::payoff::sample(ws.spot, ws.strike, ws.option_type, ws.market_premium);
    Json(json!({ "payoff": series }))
}

/// GET /api/strikes -- current ladder and selection.
pub async fn get_strikes(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let Ok(ws) = state.workspace.lock() else { return lock_err() };
    Json(json!({
        "strikes": ws.strikes,
        "selected": ws.strike,
        "showAllStrikes": ws.show_all_strikes,
    }))
}

/// POST /api/fetch-chain -- single-flight chain acquisition. The fetcher
/// itself never fails; this handler only refuses re-entry while a fetch is
/// in flight and discards results that land after teardown began.
pub async fn fetch_chain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FetchRequest>,
) -> Json<serde_json::Value> {
    if state
        .is_fetching
        .compare_exchange(false, true, Relaxed, Relaxed)
        .is_err()
    {
        return Json(json!({ "error": "fetch already in flight" }));
    }

    let resolved = {
        let Ok(ws) = state.workspace.lock() else {
            state.is_fetching.store(false, Relaxed);
            return lock_err();
        };
        let url = match req.url.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => state.config.quote_base_url.clone(),
        };
        (url, req.symbol.unwrap_or_else(|| ws.symbol.clone()))
    };

    state.counters.fetches_started.fetch_add(1, Relaxed);
    let outcome = state
        .fetcher
        .fetch_chain(&resolved.0, &resolved.1, state.config.proxy_fallback)
        .await;
    state.is_fetching.store(false, Relaxed);

    if outcome.method == FetchMethod::FallbackSample {
        state.counters.fetch_fallbacks.fetch_add(1, Relaxed);
    }

    if state.alive.load(Relaxed) {
        if let Ok(mut slot) = state.last_fetch.lock() {
            *slot = Some(outcome.clone());
        }
    } else {
        tracing::info!("fetch completed after teardown, result discarded");
    }

    Json(json!(outcome))
}

/// GET /api/chain -- payload of the most recent fetch, if any.
pub async fn get_chain(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let Ok(slot) = state.last_fetch.lock() else { return lock_err() };
    Json(json!({ "chain": slot.as_ref().and_then(|o| o.payload.clone()) }))
}

// ── Presets ──

/// GET /api/presets
pub async fn list_presets(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let Ok(store) = state.store.lock() else { return lock_err() };
    Json(json!({ "presets": store.presets(), "system": presets::SYSTEM_PRESETS }))
}

/// POST /api/presets -- snapshot the workspace under the given name.
pub async fn save_preset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SavePresetRequest>,
) -> Json<serde_json::Value> {
    let Ok(ws) = state.workspace.lock() else { return lock_err() };
    let Ok(mut store) = state.store.lock() else { return lock_err() };
    let id = store.next_id();
    let preset = ws.preset_snapshot(id, req.name.as_deref().unwrap_or(""), Utc::now());
    store.save(preset.clone());
    state.counters.presets_saved.fetch_add(1, Relaxed);
    Json(json!({ "preset": preset }))
}

/// POST /api/presets/{id}/load
pub async fn load_preset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Json<serde_json::Value> {
    let patch = {
        let Ok(store) = state.store.lock() else { return lock_err() };
        match store.get(id) {
            Some(preset) => presets::PresetPatch::from(preset),
            None => return Json(json!({ "error": format!("no preset with id {id}") })),
        }
    };

    let Ok(mut ws) = state.workspace.lock() else { return lock_err() };
    ws.apply(&patch);
    Json(json!({ "workspace": *ws, "derived": ws.derived(Utc::now()) }))
}

/// PUT /api/presets/{id} -- in-place edit.
pub async fn update_preset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(edited): Json<Preset>,
) -> Json<serde_json::Value> {
    let Ok(mut store) = state.store.lock() else { return lock_err() };
    if store.update(id, edited) {
        Json(json!({ "updated": id }))
    } else {
        Json(json!({ "error": format!("no preset with id {id}") }))
    }
}

/// DELETE /api/presets/{id} -- absent ids are a silent no-op.
pub async fn delete_preset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Json<serde_json::Value> {
    let Ok(mut store) = state.store.lock() else { return lock_err() };
    store.delete(id);
    Json(json!({ "deleted": id }))
}

/// DELETE /api/presets -- clear the collection.
pub async fn clear_presets(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let Ok(mut store) = state.store.lock() else { return lock_err() };
    store.clear();
    Json(json!({ "cleared": true }))
}

/// POST /api/presets/system/{name} -- editable copy of a built-in market.
pub async fn apply_system_preset(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Json<serde_json::Value> {
    let Some(sys) = presets::system_preset(&name) else {
        return Json(json!({ "error": format!("unknown system preset: {name}") }));
    };
    let Ok(mut ws) = state.workspace.lock() else { return lock_err() };
    let Ok(mut store) = state.store.lock() else { return lock_err() };
    let copy = ws.system_copy(sys, store.next_id());
    store.save(copy.clone());
    ws.apply(&presets::PresetPatch::from(&copy));
    Json(json!({ "preset": copy, "workspace": *ws }))
}

// ── Import / export ──

/// GET /api/export/presets -- the full collection as a JSON array.
pub async fn export_presets(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let Ok(store) = state.store.lock() else { return lock_err() };
    Json(store.export_presets())
}

/// GET /api/export/session -- the current workspace as a session object.
pub async fn export_session(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let Ok(ws) = state.workspace.lock() else { return lock_err() };
    let Ok(mut store) = state.store.lock() else { return lock_err() };
    let id = store.next_id();
    Json(json!(ws.session_snapshot(id)))
}

/// POST /api/import/presets -- array document, merged with imported-wins
/// name deduplication. The only user-visible error in the core.
pub async fn import_presets(
    State(state): State<Arc<AppState>>,
    Json(doc): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let Ok(mut store) = state.store.lock() else { return lock_err() };
    match store.import_merge(doc) {
        Ok(count) => Json(json!({ "imported": count })),
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

/// POST /api/import/session -- stage a session document for preview. The
/// store is untouched until the explicit confirm.
pub async fn stage_session(
    State(state): State<Arc<AppState>>,
    Json(doc): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    match stage_session_import(doc) {
        Ok(preview) => {
            let Ok(mut staged) = state.staged_import.lock() else { return lock_err() };
            let response = json!({ "preview": preview });
            *staged = Some(preview);
            Json(response)
        }
        Err(e) => Json(json!({ "error": e.to_string() })),
    }
}

/// POST /api/import/session/confirm -- apply and persist the staged session.
pub async fn confirm_session(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let preview = {
        let Ok(mut staged) = state.staged_import.lock() else { return lock_err() };
        staged.take()
    };
    let Some(preview) = preview else {
        return Json(json!({ "error": "no staged session import" }));
    };

    {
        let Ok(mut store) = state.store.lock() else { return lock_err() };
        store.confirm_session_import(&preview);
    }

    let Ok(mut ws) = state.workspace.lock() else { return lock_err() };
    ws.apply(&preview.staged);
    Json(json!({ "workspace": *ws, "derived": ws.derived(Utc::now()) }))
}

/// DELETE /api/import/session -- discard the staged session.
pub async fn discard_session(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let Ok(mut staged) = state.staged_import.lock() else { return lock_err() };
    *staged = None;
    Json(json!({ "discarded": true }))
}

// ── Settings / diagnostics ──

/// PUT /api/settings/autosave
pub async fn set_auto_save(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AutoSaveRequest>,
) -> Json<serde_json::Value> {
    let Ok(mut store) = state.store.lock() else { return lock_err() };
    store.set_auto_save(req.enabled);
    Json(json!({ "autoSaveEnabled": req.enabled }))
}

/// GET /api/settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let Ok(store) = state.store.lock() else { return lock_err() };
    Json(json!({
        "autoSaveEnabled": store.auto_save_enabled(),
        "quoteBaseUrl": state.config.quote_base_url,
        "proxyFallback": state.config.proxy_fallback,
    }))
}

/// GET /api/counters -- performance counters (lock-free reads).
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let write_failures = state
        .store
        .lock()
        .map(|s| s.write_failures())
        .unwrap_or(0);
    Json(json!({
        "derivations_computed": state.counters.derivations_computed.load(Relaxed),
        "ladder_syncs": state.counters.ladder_syncs.load(Relaxed),
        "fetches_started": state.counters.fetches_started.load(Relaxed),
        "fetch_fallbacks": state.counters.fetch_fallbacks.load(Relaxed),
        "presets_saved": state.counters.presets_saved.load(Relaxed),
        "persistence_write_failures": write_failures,
    }))
}
