use crate::config::AppConfig;
use crate::feeds::chain::{ChainFetcher, FetchOutcome};
use crate::store::presets::{ImportPreview, PresetStore};
use crate::workspace::Workspace;
use portable_atomic::{AtomicBool, AtomicU64};
use std::sync::{Arc, Mutex};

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub derivations_computed: AtomicU64,
    pub ladder_syncs: AtomicU64,
    pub fetches_started: AtomicU64,
    pub fetch_fallbacks: AtomicU64,
    pub presets_saved: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            derivations_computed: AtomicU64::new(0),
            ladder_syncs: AtomicU64::new(0),
            fetches_started: AtomicU64::new(0),
            fetch_fallbacks: AtomicU64::new(0),
            presets_saved: AtomicU64::new(0),
        }
    }
}

// ── Application shared state ──

pub struct AppState {
    pub config: AppConfig,
    pub workspace: Mutex<Workspace>,
    pub store: Mutex<PresetStore>,
    /// Staged session import awaiting confirm/discard.
    pub staged_import: Mutex<Option<ImportPreview>>,
    /// Outcome of the most recent chain fetch, for the view to merge.
    pub last_fetch: Mutex<Option<FetchOutcome>>,
    pub fetcher: ChainFetcher,
    pub counters: PerfCounters,
    /// Caller-side serialization of the fetcher: a new fetch is refused
    /// while one is in flight.
    pub is_fetching: AtomicBool,
    /// Liveness flag. Cleared at teardown; a fetch landing afterwards must
    /// discard its pending state update instead of applying it.
    pub alive: AtomicBool,
}

impl AppState {
    pub fn new(config: AppConfig, workspace: Workspace, store: PresetStore) -> Arc<Self> {
        Arc::new(Self {
            config,
            workspace: Mutex::new(workspace),
            store: Mutex::new(store),
            staged_import: Mutex::new(None),
            last_fetch: Mutex::new(None),
            fetcher: ChainFetcher::new(),
            counters: PerfCounters::new(),
            is_fetching: AtomicBool::new(false),
            alive: AtomicBool::new(true),
        })
    }
}
