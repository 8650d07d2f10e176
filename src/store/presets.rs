//! Preset and session persistence.
//!
//! The store owns the in-memory ordered collection and mirrors it into the
//! key-value backend on every mutation, with a final flush at teardown.
//! Persistence writes are best-effort and independently wrapped: a failure
//! writing one key never blocks another key or corrupts in-memory state.
//! JSON field names follow the original export format (`S`, `K`,
//! `selectedType`, ...) so preset files keep round-tripping.

use crate::errors::{AppError, AppResult};
use crate::pricing::OptionType;
use crate::store::backend::KvBackend;
use std::collections::HashSet;

pub const PRESETS_KEY: &str = "option_pricer_presets_v1";
pub const LAST_SESSION_KEY: &str = "last_session_data";
pub const AUTO_SAVE_KEY: &str = "auto_save_enabled";

/// Reserved name of the session singleton. At most one preset may carry it.
pub const LAST_SESSION_NAME: &str = "Last Session";

/// Collection cap; oldest entries are trimmed on insert.
pub const MAX_PRESETS: usize = 200;

/// A named snapshot of every pricing/risk input.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preset {
    /// Timestamp-based id. Imported documents may carry fractional ids
    /// (older exports did); those truncate on the way in.
    #[serde(deserialize_with = "lenient_id")]
    pub id: i64,
    pub name: String,
    pub symbol: String,
    #[serde(rename = "S")]
    pub spot: f64,
    #[serde(rename = "K")]
    pub strike: f64,
    /// ISO-8601 expiry timestamp.
    pub expiry: String,
    #[serde(rename = "r")]
    pub rate: f64,
    #[serde(rename = "q")]
    pub dividend_yield: f64,
    pub sigma: f64,
    #[serde(rename = "selectedType")]
    pub option_type: OptionType,
    pub market_premium: f64,
    pub lot_size: f64,
    pub tp_rupees: f64,
    pub sl_rupees: f64,
    pub tp_step: f64,
    pub sl_step: f64,
    pub premium_step: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_all_strikes: Option<bool>,
}

fn lenient_id<'de, D: serde::Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    use serde::Deserialize;
    Ok(f64::deserialize(d)? as i64)
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            symbol: "BANKNIFTY".into(),
            spot: 58_123.45,
            strike: 58_200.0,
            expiry: String::new(),
            rate: 0.06,
            dividend_yield: 0.0,
            sigma: 0.25,
            option_type: OptionType::Call,
            market_premium: 120.0,
            lot_size: 25.0,
            tp_rupees: 1_000.0,
            sl_rupees: 500.0,
            tp_step: 100.0,
            sl_step: 100.0,
            premium_step: 5.0,
            show_all_strikes: None,
        }
    }
}

/// Preset-shaped partial object: every field optional. Applying one merges
/// field-wise, keeping current values where the patch is silent.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresetPatch {
    pub name: Option<String>,
    pub symbol: Option<String>,
    #[serde(rename = "S")]
    pub spot: Option<f64>,
    #[serde(rename = "K")]
    pub strike: Option<f64>,
    pub expiry: Option<String>,
    #[serde(rename = "r")]
    pub rate: Option<f64>,
    #[serde(rename = "q")]
    pub dividend_yield: Option<f64>,
    pub sigma: Option<f64>,
    #[serde(rename = "selectedType")]
    pub option_type: Option<OptionType>,
    pub market_premium: Option<f64>,
    pub lot_size: Option<f64>,
    pub tp_rupees: Option<f64>,
    pub sl_rupees: Option<f64>,
    pub tp_step: Option<f64>,
    pub sl_step: Option<f64>,
    pub premium_step: Option<f64>,
    pub show_all_strikes: Option<bool>,
}

impl From<&Preset> for PresetPatch {
    fn from(p: &Preset) -> Self {
        Self {
            name: Some(p.name.clone()),
            symbol: Some(p.symbol.clone()),
            spot: Some(p.spot),
            strike: Some(p.strike),
            expiry: Some(p.expiry.clone()),
            rate: Some(p.rate),
            dividend_yield: Some(p.dividend_yield),
            sigma: Some(p.sigma),
            option_type: Some(p.option_type),
            market_premium: Some(p.market_premium),
            lot_size: Some(p.lot_size),
            tp_rupees: Some(p.tp_rupees),
            sl_rupees: Some(p.sl_rupees),
            tp_step: Some(p.tp_step),
            sl_step: Some(p.sl_step),
            premium_step: Some(p.premium_step),
            show_all_strikes: p.show_all_strikes,
        }
    }
}

/// A staged session import awaiting explicit confirmation. Created by
/// [`stage_session_import`]; either discarded or committed, never both.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ImportPreview {
    pub staged: PresetPatch,
}

/// Pure parse/validate step of the two-phase session import. Touches nothing.
pub fn stage_session_import(doc: serde_json::Value) -> AppResult<ImportPreview> {
    if !doc.is_object() {
        return Err(AppError::Validation("expected a session object".into()));
    }
    let staged: PresetPatch = serde_json::from_value(doc)
        .map_err(|e| AppError::Validation(format!("invalid session document: {e}")))?;
    Ok(ImportPreview { staged })
}

/// Built-in market presets.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct SystemPreset {
    pub name: &'static str,
    pub symbol: &'static str,
    pub lot_size: f64,
    pub step: f64,
}

pub const SYSTEM_PRESETS: [SystemPreset; 3] = [
    SystemPreset { name: "Nifty50", symbol: "NIFTY", lot_size: 75.0, step: 50.0 },
    SystemPreset { name: "BankNifty", symbol: "BANKNIFTY", lot_size: 35.0, step: 100.0 },
    SystemPreset { name: "Sensex", symbol: "SENSEX", lot_size: 20.0, step: 100.0 },
];

pub fn system_preset(name: &str) -> Option<&'static SystemPreset> {
    SYSTEM_PRESETS.iter().find(|s| s.name == name)
}

pub struct PresetStore {
    backend: Box<dyn KvBackend>,
    presets: Vec<Preset>,
    auto_save_enabled: bool,
    last_id: i64,
    write_failures: u64,
}

impl PresetStore {
    /// Init lifecycle: read both persisted keys, tolerating absent or
    /// corrupt values (they fall back to defaults).
    pub fn open(backend: Box<dyn KvBackend>) -> Self {
        let mut store = Self {
            backend,
            presets: Vec::new(),
            auto_save_enabled: true,
            last_id: 0,
            write_failures: 0,
        };

        match store.backend.get(PRESETS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Preset>>(&raw) {
                Ok(presets) => store.presets = presets,
                Err(e) => tracing::warn!(error = %e, "stored presets unreadable, starting empty"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "preset read failed, starting empty"),
        }

        match store.backend.get(AUTO_SAVE_KEY) {
            Ok(Some(raw)) => {
                store.auto_save_enabled = serde_json::from_str::<bool>(&raw).unwrap_or(true);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "auto-save flag read failed, defaulting on"),
        }

        store.last_id = store.presets.iter().map(|p| p.id).max().unwrap_or(0);
        store
    }

    /// Timestamp-based id, bumped past the last issued one so rapid calls
    /// within the same millisecond stay unique.
    pub fn next_id(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn get(&self, id: i64) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == id)
    }

    pub fn auto_save_enabled(&self) -> bool {
        self.auto_save_enabled
    }

    pub fn set_auto_save(&mut self, enabled: bool) {
        self.auto_save_enabled = enabled;
        self.write(AUTO_SAVE_KEY, &enabled.to_string());
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    /// Prepend and trim to the collection cap.
    pub fn save(&mut self, preset: Preset) {
        self.presets.insert(0, preset);
        self.presets.truncate(MAX_PRESETS);
        self.persist_presets();
    }

    /// Remove by id. Absent ids are a no-op.
    pub fn delete(&mut self, id: i64) {
        self.presets.retain(|p| p.id != id);
        self.persist_presets();
    }

    /// In-place edit of an existing preset. Returns false when absent.
    pub fn update(&mut self, id: i64, edited: Preset) -> bool {
        match self.presets.iter_mut().find(|p| p.id == id) {
            Some(slot) => {
                *slot = Preset { id, ..edited };
                self.persist_presets();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.presets.clear();
        if let Err(e) = self.backend.remove(PRESETS_KEY) {
            self.write_failures += 1;
            tracing::warn!(error = %e, "preset clear did not reach storage");
        }
    }

    /// Serialize the full collection. Pure, no mutation.
    pub fn export_presets(&self) -> serde_json::Value {
        serde_json::json!(self.presets)
    }

    /// Merge an imported document into the collection. The document must be
    /// a JSON array; each item gets a synthetic id when it has none, name
    /// collisions drop the existing entry (imported wins), imported items go
    /// in front, and the result is trimmed to the cap.
    pub fn import_merge(&mut self, doc: serde_json::Value) -> AppResult<usize> {
        let items = doc
            .as_array()
            .ok_or_else(|| AppError::Validation("expected array of presets".into()))?;

        let mut imported: Vec<Preset> = Vec::with_capacity(items.len());
        for item in items {
            let mut p: Preset = serde_json::from_value(item.clone())
                .map_err(|e| AppError::Validation(format!("invalid preset entry: {e}")))?;
            if p.id == 0 {
                p.id = self.next_id();
            }
            imported.push(p);
        }

        let names: HashSet<&str> = imported.iter().map(|p| p.name.as_str()).collect();
        self.presets.retain(|p| !names.contains(p.name.as_str()));

        let count = imported.len();
        imported.append(&mut self.presets);
        self.presets = imported;
        self.presets.truncate(MAX_PRESETS);
        self.persist_presets();
        Ok(count)
    }

    /// Commit half of the two-phase session import: persist the staged
    /// session into the single-session slot. The caller applies it to the
    /// live workspace.
    pub fn confirm_session_import(&mut self, preview: &ImportPreview) {
        match serde_json::to_string(&preview.staged) {
            Ok(raw) => self.write(LAST_SESSION_KEY, &raw),
            Err(e) => tracing::warn!(error = %e, "staged session not serializable"),
        }
    }

    /// Replace any existing "Last Session" entry with the given snapshot,
    /// then mirror both the collection and the single-session slot. Each
    /// write stands alone.
    pub fn auto_save(&mut self, mut session: Preset) {
        session.name = LAST_SESSION_NAME.into();
        self.presets.retain(|p| p.name != LAST_SESSION_NAME);
        self.presets.insert(0, session.clone());
        self.presets.truncate(MAX_PRESETS);
        self.persist_presets();

        match serde_json::to_string(&session) {
            Ok(raw) => self.write(LAST_SESSION_KEY, &raw),
            Err(e) => tracing::warn!(error = %e, "session snapshot not serializable"),
        }
    }

    /// Restore-on-start source selection: the persisted "Last Session"
    /// preset wins; the legacy single-session slot is consulted only when
    /// the collection holds none. Disabled auto-save restores nothing.
    pub fn restore_session(&self) -> Option<PresetPatch> {
        if !self.auto_save_enabled {
            return None;
        }
        if let Some(last) = self.presets.iter().find(|p| p.name == LAST_SESSION_NAME) {
            return Some(PresetPatch::from(last));
        }
        match self.backend.get(LAST_SESSION_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<PresetPatch>(&raw)
                .map_err(|e| tracing::warn!(error = %e, "legacy session unreadable"))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "legacy session read failed");
                None
            }
        }
    }

    fn persist_presets(&mut self) {
        match serde_json::to_string(&self.presets) {
            Ok(raw) => self.write(PRESETS_KEY, &raw),
            Err(e) => tracing::warn!(error = %e, "preset collection not serializable"),
        }
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(e) = self.backend.set(key, value) {
            self.write_failures += 1;
            tracing::warn!(key, error = %e, "persistence write failed");
        }
    }

    #[cfg(test)]
    fn into_backend(self) -> Box<dyn KvBackend> {
        self.backend
    }
}
