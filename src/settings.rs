//! Hot-reloadable, persisted settings store.
//!
//! Unlike `config::RuntimeConfig` (a static TOML file read once at process
//! start and overridable from the CLI), `SettingsStore` holds the subset of
//! configuration that a running daemon and its companion tray/overlay UI
//! need to change live: the hotkey, the selected device and models, the
//! registered custom voice commands, and the AI query service toggle.
//!
//! Values are persisted as JSON (`settings.json`), saved atomically
//! (write to a temp file in the same directory, then rename), and changes
//! are broadcast to subscribers registered via [`SettingsStore::on_change`].
//! A background watcher (via the `notify` crate, also used to watch the
//! Waybar state file) picks up edits made to the file by another process
//! and reloads + re-notifies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::SettingsError;

pub type ChangeHandler = Box<dyn Fn(&Value, &Value) + Send + Sync>;

/// Typed defaults for every key the store manages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDefaults {
    pub model: String,
    pub device: String,
    pub input_device: Option<String>,
    pub input_device_id: Option<i64>,
    pub keyboard_device: String,
    pub hotkey: String,
    pub silence_duration: f64,
    pub auto_start: bool,
    pub language: String,
    #[serde(default)]
    pub disabled_commands: Vec<String>,
    #[serde(default)]
    pub builtin_overrides: HashMap<String, String>,
    #[serde(default)]
    pub custom_commands: Vec<Value>,
    pub ollama_enabled: bool,
    pub ollama_model: String,
    #[serde(default)]
    pub ollama_custom_models: Vec<String>,
    pub ollama_custom_prompt_enabled: bool,
    pub ollama_system_prompt: String,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            model: "turbo".to_string(),
            device: "auto".to_string(),
            input_device: None,
            input_device_id: None,
            keyboard_device: String::new(),
            hotkey: "<ctrl>+<alt>+f".to_string(),
            silence_duration: 1.5,
            auto_start: false,
            language: "en".to_string(),
            disabled_commands: Vec::new(),
            builtin_overrides: HashMap::new(),
            custom_commands: Vec::new(),
            ollama_enabled: false,
            ollama_model: "llama3.2:3b".to_string(),
            ollama_custom_models: Vec::new(),
            ollama_custom_prompt_enabled: false,
            ollama_system_prompt: crate::ai::DEFAULT_OLLAMA_PROMPT.to_string(),
        }
    }
}

fn defaults_map() -> HashMap<String, Value> {
    let defaults = SettingsDefaults::default();
    let value = serde_json::to_value(&defaults).expect("defaults always serialize");
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => unreachable!(),
    }
}

struct Inner {
    values: HashMap<String, Value>,
    path: PathBuf,
    callbacks: Vec<ChangeHandler>,
    handlers: HashMap<String, Vec<ChangeHandler>>,
}

/// Thread-safe, persisted key/value settings store with change subscriptions.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<Mutex<Inner>>,
}

impl SettingsStore {
    /// Load settings from `path`, merging only keys present in the defaults
    /// (unknown keys in an on-disk file are ignored, so stale/foreign keys
    /// left over from an older version don't break loading).
    pub fn load(path: PathBuf) -> Result<Self, SettingsError> {
        let defaults = defaults_map();
        let mut values = defaults.clone();

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| SettingsError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
            if !content.trim().is_empty() {
                let on_disk: Value = serde_json::from_str(&content)?;
                if let Value::Object(map) = on_disk {
                    for (key, value) in map {
                        if defaults.contains_key(&key) {
                            values.insert(key, value);
                        }
                    }
                }
            }
        }

        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                values,
                path,
                callbacks: Vec::new(),
                handlers: HashMap::new(),
            })),
        })
    }

    /// Default settings path: `~/.config/voxtype/settings.json`.
    pub fn default_path() -> PathBuf {
        directories::BaseDirs::new()
            .map(|d| d.config_dir().join("voxtype").join("settings.json"))
            .unwrap_or_else(|| PathBuf::from("settings.json"))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().unwrap().values.get(key).cloned()
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_f64())
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(|v| v.as_array().cloned())
            .map(|arr| {
                arr.into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_string_map(&self, key: &str) -> HashMap<String, String> {
        self.get(key)
            .and_then(|v| v.as_object().cloned())
            .map(|obj| {
                obj.into_iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fetch an array-of-objects setting (e.g. `custom_commands`).
    pub fn get_string_list_of_objects(&self, key: &str) -> Vec<serde_json::Map<String, Value>> {
        self.get(key)
            .and_then(|v| v.as_array().cloned())
            .map(|arr| {
                arr.into_iter()
                    .filter_map(|v| v.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_all(&self) -> HashMap<String, Value> {
        self.inner.lock().unwrap().values.clone()
    }

    /// Set `key` to `value`. Persists and fires subscribers only if the
    /// new value differs from the old one, so redundant writes are quiet.
    pub fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let (old, fire) = {
            let mut inner = self.inner.lock().unwrap();
            let old = inner
                .values
                .get(key)
                .cloned()
                .unwrap_or(Value::Null);
            let changed = old != value;
            if changed {
                inner.values.insert(key.to_string(), value.clone());
            }
            (old, changed)
        };

        if !fire {
            return Ok(());
        }

        self.save()?;
        self.notify(key, &old, &value);
        Ok(())
    }

    /// Atomically persist the current values: write to a temp file in the
    /// same directory, then rename over the target (crash-safe: readers
    /// never observe a half-written file).
    pub fn save(&self) -> Result<(), SettingsError> {
        let inner = self.inner.lock().unwrap();
        let json = serde_json::to_string_pretty(&inner.values)
            .map_err(SettingsError::Parse)?;

        if let Some(parent) = inner.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SettingsError::Write(e.to_string()))?;
        }

        let tmp_path = inner.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| SettingsError::Write(e.to_string()))?;
        fs::rename(&tmp_path, &inner.path).map_err(|e| SettingsError::Write(e.to_string()))?;

        if inner.values.get("auto_start").and_then(|v| v.as_bool()) == Some(true) {
            tracing::debug!("auto_start enabled, mirroring to autostart descriptor");
            let _ = mirror_autostart(true);
        } else {
            let _ = mirror_autostart(false);
        }

        Ok(())
    }

    /// Register a callback invoked on every key change, with `(new, old)`.
    pub fn add_callback(&self, handler: ChangeHandler) {
        self.inner.lock().unwrap().callbacks.push(handler);
    }

    /// Register a callback invoked only when `key` changes.
    pub fn on_change(&self, key: &str, handler: ChangeHandler) {
        self.inner
            .lock()
            .unwrap()
            .handlers
            .entry(key.to_string())
            .or_default()
            .push(handler);
    }

    fn notify(&self, key: &str, old: &Value, new: &Value) {
        let inner = self.inner.lock().unwrap();
        for cb in &inner.callbacks {
            cb(new, old);
        }
        if let Some(handlers) = inner.handlers.get(key) {
            for cb in handlers {
                cb(new, old);
            }
        }
    }

    /// Reload from disk (used by the file watcher when another process
    /// writes settings.json) and fire subscribers for every key that
    /// actually changed value.
    pub fn reload(&self) -> Result<(), SettingsError> {
        let path = self.inner.lock().unwrap().path.clone();
        if !path.exists() {
            return Ok(());
        }
        let content = fs::read_to_string(&path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(());
        }
        let on_disk: Value = serde_json::from_str(&content)?;
        let Value::Object(map) = on_disk else {
            return Ok(());
        };

        let defaults = defaults_map();
        let mut changed_keys = Vec::new();
        {
            let mut inner = self.inner.lock().unwrap();
            for (key, value) in map {
                if !defaults.contains_key(&key) {
                    continue;
                }
                let old = inner.values.get(&key).cloned().unwrap_or(Value::Null);
                if old != value {
                    inner.values.insert(key.clone(), value.clone());
                    changed_keys.push((key, old, value));
                }
            }
        }

        for (key, old, new) in changed_keys {
            self.notify(&key, &old, &new);
        }
        Ok(())
    }

    pub fn path(&self) -> PathBuf {
        self.inner.lock().unwrap().path.clone()
    }

    /// Spawn a background file watcher that calls [`SettingsStore::reload`]
    /// whenever `settings.json` is modified by another process (e.g. a
    /// companion tray app). Returns the watcher so the caller can keep it
    /// alive for the lifetime of the daemon.
    pub fn watch(&self) -> notify::Result<notify::RecommendedWatcher> {
        use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};

        let store = self.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                if res.is_ok() {
                    if let Err(e) = store.reload() {
                        tracing::warn!("Failed to reload settings: {}", e);
                    }
                }
            },
            NotifyConfig::default().with_poll_interval(std::time::Duration::from_millis(500)),
        )?;

        let path = self.path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok();
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }
        Ok(watcher)
    }
}

/// Mirror `auto_start` to a systemd user-service autostart descriptor.
fn mirror_autostart(enabled: bool) -> std::io::Result<()> {
    let unit_dir = directories::BaseDirs::new()
        .map(|d| d.config_dir().join("systemd/user"))
        .unwrap_or_else(|| PathBuf::from("~/.config/systemd/user"));
    let marker = unit_dir.join("voxtype-autostart.enabled");

    if enabled {
        fs::create_dir_all(&unit_dir)?;
        fs::write(&marker, b"")
    } else if marker.exists() {
        fs::remove_file(&marker)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_applies_defaults_when_missing() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.get_string("hotkey").unwrap(), "<ctrl>+<alt>+f");
        assert_eq!(store.get_string("model").unwrap(), "turbo");
    }

    #[test]
    fn set_persists_and_skips_unknown_keys_on_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"hotkey": "F13", "bogus_key": "x"}"#).unwrap();

        let store = SettingsStore::load(path).unwrap();
        assert_eq!(store.get_string("hotkey").unwrap(), "F13");
        assert!(store.get("bogus_key").is_none());
    }

    #[test]
    fn set_fires_on_change_only_when_value_differs() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json")).unwrap();

        let calls = Arc::new(Mutex::new(0u32));
        let calls_clone = calls.clone();
        store.on_change(
            "hotkey",
            Box::new(move |_new, _old| {
                *calls_clone.lock().unwrap() += 1;
            }),
        );

        store.set("hotkey", Value::String("F13".into())).unwrap();
        store.set("hotkey", Value::String("F13".into())).unwrap();
        store.set("hotkey", Value::String("PAUSE".into())).unwrap();

        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn save_writes_atomically_via_temp_and_rename() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::load(path.clone()).unwrap();
        store.set("model", Value::String("small.en".into())).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("small.en"));
    }
}
