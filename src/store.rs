//! Settings persistence.
//!
//! Loading never fails: a missing, unreadable, or corrupt `settings.json`
//! resolves to the defaults, and whatever could be salvaged is repaired
//! through [`Settings::fix`]. Saving writes only the delta from the default
//! settings, so user files stay minimal.

use crate::fix;
use crate::settings::{Settings, SettingsError};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Directory paths the settings subsystem needs.
///
/// Only the top-level `main` function should use `dirs::*` to construct
/// this; everything else receives it by parameter passing, so tests can use
/// isolated temp directories.
#[derive(Debug, Clone)]
pub struct Dirs {
    /// Config directory holding `settings.json`
    /// e.g., ~/.config/settle on Linux, ~/Library/Application Support/settle on macOS
    pub config_dir: PathBuf,
}

impl Dirs {
    /// Create a Dirs from the system config directory.
    /// This should ONLY be called from main()
    pub fn from_system() -> std::io::Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not determine config directory",
                )
            })?
            .join("settle");

        Ok(Self { config_dir })
    }

    /// Create a Dirs for testing, pointing inside a temp directory.
    pub fn for_testing(temp_dir: &Path) -> Self {
        Self {
            config_dir: temp_dir.join("config"),
        }
    }

    /// Get the settings file path.
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(Settings::FILENAME)
    }
}

/// Result of loading the settings file.
#[derive(Debug)]
pub struct LoadOutcome {
    pub settings: Settings,
    /// True when the file held broken data (replaced or dropped values, or
    /// unparsable content) and should be rewritten. Merely sparse files do
    /// not count: omitting fields is how overrides are stored.
    pub needs_rewrite: bool,
}

/// Loads, repairs, and saves the settings file.
pub struct SettingsStore {
    dirs: Dirs,
}

impl SettingsStore {
    pub fn new(dirs: Dirs) -> Self {
        Self { dirs }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dirs.settings_path()
    }

    /// Load the settings file, repairing whatever is wrong with it.
    ///
    /// Corrupt settings must never block startup, so every failure mode
    /// resolves to a usable `Settings`.
    pub fn load(&self) -> LoadOutcome {
        let path = self.settings_path();
        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return LoadOutcome {
                settings: Settings::default(),
                needs_rewrite: false,
            };
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}, using defaults", path.display(), e);
                return LoadOutcome {
                    settings: Settings::default(),
                    needs_rewrite: false,
                };
            }
        };

        let raw: Value = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                return LoadOutcome {
                    settings: Settings::default(),
                    needs_rewrite: true,
                };
            }
        };

        let fixed = Settings::fix(&raw);
        let broken = fix::repaired_keys(fixed.original(), fixed.repaired());
        if !broken.is_empty() {
            tracing::info!(
                "Repaired {} settings field(s) in {}: {}",
                broken.len(),
                path.display(),
                broken.join(", ")
            );
        }
        LoadOutcome {
            settings: fixed.into_value(),
            needs_rewrite: !broken.is_empty(),
        }
    }

    /// Load the settings and, when a repair occurred, write the repaired
    /// form back. The rewrite is best-effort: an IO failure is logged, not
    /// surfaced, since the in-memory settings are already usable.
    pub fn load_and_repair(&self) -> Settings {
        let outcome = self.load();
        if outcome.needs_rewrite {
            if let Err(e) = self.save(&outcome.settings) {
                tracing::warn!(
                    "Failed to rewrite repaired settings to {}: {}",
                    self.settings_path().display(),
                    e
                );
            }
        }
        outcome.settings
    }

    /// Save settings, writing only fields that differ from the defaults.
    ///
    /// This keeps user settings files minimal and clean - only user
    /// customizations are saved.
    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let current = serde_json::to_value(settings)
            .map_err(|e| SettingsError::Serialize(e.to_string()))?;
        let defaults = serde_json::to_value(Settings::default())
            .map_err(|e| SettingsError::Serialize(e.to_string()))?;

        // Compute diff - only values that differ from defaults
        let diff = json_diff(&defaults, &current);

        let contents = serde_json::to_string_pretty(&fix::canonicalize(&diff))
            .map_err(|e| SettingsError::Serialize(e.to_string()))?;

        let path = self.settings_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::Io(format!("{}: {}", parent.display(), e)))?;
        }
        std::fs::write(&path, contents)
            .map_err(|e| SettingsError::Io(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }
}

/// Compute the difference between two JSON values.
/// Returns only the parts of `current` that differ from `defaults`.
fn json_diff(defaults: &Value, current: &Value) -> Value {
    match (defaults, current) {
        // Both are objects - recursively diff
        (Value::Object(def_map), Value::Object(cur_map)) => {
            let mut result = serde_json::Map::new();

            for (key, cur_val) in cur_map {
                if let Some(def_val) = def_map.get(key) {
                    // Key exists in both - recurse
                    let diff = json_diff(def_val, cur_val);
                    // Only include if there's an actual difference
                    if !is_empty_diff(&diff) {
                        result.insert(key.clone(), diff);
                    }
                } else {
                    // Key only in current - include it entirely
                    result.insert(key.clone(), cur_val.clone());
                }
            }

            Value::Object(result)
        }
        // For arrays and primitives, include if different
        _ => {
            if defaults == current {
                Value::Object(serde_json::Map::new()) // Empty object signals "no diff"
            } else {
                current.clone()
            }
        }
    }
}

/// Check if a diff result represents "no changes"
fn is_empty_diff(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Renderer;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SettingsStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SettingsStore::new(Dirs::for_testing(temp_dir.path()));
        (temp_dir, store)
    }

    fn write_settings(store: &SettingsStore, content: &str) {
        let path = store.settings_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
    }

    #[test]
    fn load_returns_defaults_when_no_file() {
        let (_temp, store) = create_test_store();
        let outcome = store.load();
        assert_eq!(outcome.settings, Settings::default());
        assert!(!outcome.needs_rewrite);
    }

    #[test]
    fn load_accepts_sparse_override_file() {
        let (_temp, store) = create_test_store();
        write_settings(&store, r#"{"renderer": "canvas"}"#);

        let outcome = store.load();
        assert_eq!(outcome.settings.renderer, Renderer::Canvas);
        // Sparse is the normal shape of a saved file, not damage.
        assert!(!outcome.needs_rewrite);
    }

    #[test]
    fn load_flags_broken_values_for_rewrite() {
        let (_temp, store) = create_test_store();
        write_settings(
            &store,
            r#"{"renderer": "metal", "notice_timeout": "soon", "junk": 1}"#,
        );

        let outcome = store.load();
        assert_eq!(outcome.settings, Settings::default());
        assert!(outcome.needs_rewrite);
    }

    #[test]
    fn load_survives_unparsable_file() {
        let (_temp, store) = create_test_store();
        write_settings(&store, "{ not json !");

        let outcome = store.load();
        assert_eq!(outcome.settings, Settings::default());
        assert!(outcome.needs_rewrite);
    }

    #[test]
    fn load_and_repair_rewrites_broken_file() {
        let (_temp, store) = create_test_store();
        write_settings(
            &store,
            r#"{"renderer": "canvas", "hide_status_bar": "sometimes"}"#,
        );

        let settings = store.load_and_repair();
        assert_eq!(settings.renderer, Renderer::Canvas);

        // The rewritten file keeps the good override, drops the bad value,
        // and loads cleanly.
        let reloaded = store.load();
        assert_eq!(reloaded.settings, settings);
        assert!(!reloaded.needs_rewrite);
        let text = std::fs::read_to_string(store.settings_path()).unwrap();
        assert!(text.contains("canvas"));
        assert!(!text.contains("sometimes"));
    }

    #[test]
    fn save_writes_only_the_delta_from_defaults() {
        let (_temp, store) = create_test_store();
        let mut settings = Settings::default();
        settings.notice_timeout = 10.0;
        store.save(&settings).unwrap();

        let text = std::fs::read_to_string(store.settings_path()).unwrap();
        let raw: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw, json!({ "notice_timeout": 10 }));
    }

    #[test]
    fn save_of_defaults_writes_empty_object() {
        let (_temp, store) = create_test_store();
        store.save(&Settings::default()).unwrap();

        let text = std::fs::read_to_string(store.settings_path()).unwrap();
        let raw: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw, json!({}));
    }

    #[test]
    fn save_then_load_roundtrips() {
        let (_temp, store) = create_test_store();
        let mut settings = Settings::default();
        settings.language = "de".to_string();
        settings.pinned_profiles = vec!["default".to_string()];
        settings
            .profiles
            .get_mut("default")
            .unwrap()
            .args
            .push("-l".to_string());

        store.save(&settings).unwrap();
        let outcome = store.load();
        assert_eq!(outcome.settings, settings);
        assert!(!outcome.needs_rewrite);
    }
}
