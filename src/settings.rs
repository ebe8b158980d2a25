//! Typed settings schema and its repair entry points.
//!
//! The structs here are the trusted form of `settings.json`. Untrusted data
//! goes through [`Settings::fix`], which rebuilds the object field by field
//! with the fixers from [`crate::fix`], so a well-typed value comes out no
//! matter what was on disk.

use crate::fix::{self, Fixed};
use crate::kind::Kind;
use once_cell::sync::OnceCell;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Locales bundled with the application. The empty string means "follow the
/// system locale".
pub const LANGUAGES: &[&str] = &["", "de", "en", "fr", "pt", "zh"];

/// Terminal renderer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Renderer {
    Dom,
    Canvas,
    WebGl,
}

impl Renderer {
    pub const ALL: [Renderer; 3] = [Renderer::Dom, Renderer::Canvas, Renderer::WebGl];

    pub fn as_str(self) -> &'static str {
        match self {
            Renderer::Dom => "dom",
            Renderer::Canvas => "canvas",
            Renderer::WebGl => "webgl",
        }
    }
}

/// When the status bar is hidden while a terminal panel is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HideStatusBar {
    Never,
    Always,
    Focused,
    Running,
}

impl HideStatusBar {
    pub const ALL: [HideStatusBar; 4] = [
        HideStatusBar::Never,
        HideStatusBar::Always,
        HideStatusBar::Focused,
        HideStatusBar::Running,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HideStatusBar::Never => "never",
            HideStatusBar::Always => "always",
            HideStatusBar::Focused => "focused",
            HideStatusBar::Running => "running",
        }
    }
}

/// How a terminal profile is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Runs inside the application's own panel.
    Integrated,
    /// Spawns the platform terminal application.
    External,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 2] = [ProfileKind::Integrated, ProfileKind::External];

    pub fn as_str(self) -> &'static str {
        match self {
            ProfileKind::Integrated => "integrated",
            ProfileKind::External => "external",
        }
    }
}

fn str_values(names: &[&str]) -> Vec<Value> {
    names.iter().map(|name| Value::from(*name)).collect()
}

/// A terminal profile definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    #[serde(rename = "type", default = "default_profile_kind")]
    pub kind: ProfileKind,

    /// Shell or terminal executable to launch.
    #[serde(default = "default_shell")]
    pub executable: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Whether to replay the scrollback from the previous session.
    #[serde(default = "default_true")]
    pub restore_history: bool,

    /// Exit codes treated as a clean shutdown.
    #[serde(default = "default_success_exit_codes")]
    pub success_exit_codes: Vec<i64>,
}

fn default_profile_kind() -> ProfileKind {
    ProfileKind::Integrated
}

fn default_shell() -> String {
    if cfg!(windows) {
        "C:\\Windows\\System32\\cmd.exe".to_string()
    } else {
        "/bin/sh".to_string()
    }
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_success_exit_codes() -> Vec<i64> {
    vec![0]
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            kind: default_profile_kind(),
            executable: default_shell(),
            args: Vec::new(),
            restore_history: true,
            success_exit_codes: default_success_exit_codes(),
        }
    }
}

impl Profile {
    /// Repair an untrusted profile entry.
    pub fn fix(raw: &Value) -> Fixed<Profile> {
        let empty = Map::new();
        let candidate = raw.as_object().unwrap_or(&empty);
        let defaults = Self::default_object();

        let mut repaired = Map::new();
        repaired.insert(
            "type".to_string(),
            fix::fix_in_set(
                defaults,
                candidate,
                "type",
                &str_values(&ProfileKind::ALL.map(ProfileKind::as_str)),
            ),
        );
        repaired.insert(
            "executable".to_string(),
            fix::fix_field(defaults, candidate, "executable", &[Kind::String]),
        );
        repaired.insert(
            "args".to_string(),
            fix::fix_array(defaults, candidate, "args", &[Kind::String]),
        );
        repaired.insert(
            "restore_history".to_string(),
            fix::fix_field(defaults, candidate, "restore_history", &[Kind::Bool]),
        );
        repaired.insert(
            "success_exit_codes".to_string(),
            fix::fix_array(defaults, candidate, "success_exit_codes", &[Kind::Number]),
        );

        let (repaired, value) = resolve_repaired(repaired, defaults);
        Fixed::new(raw.clone(), repaired, value)
    }

    fn default_object() -> &'static Map<String, Value> {
        static CELL: OnceCell<Map<String, Value>> = OnceCell::new();
        CELL.get_or_init(|| match serde_json::to_value(Profile::default()) {
            Ok(Value::Object(map)) => map,
            _ => unreachable!("default profile serializes to a JSON object"),
        })
    }
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    /// UI locale, one of [`LANGUAGES`].
    #[serde(default)]
    pub language: String,

    #[serde(default = "default_renderer")]
    pub renderer: Renderer,

    #[serde(default = "default_hide_status_bar")]
    pub hide_status_bar: HideStatusBar,

    /// Seconds a notice stays on screen; negative means sticky.
    #[serde(default = "default_notice_timeout")]
    pub notice_timeout: f64,

    #[serde(default = "default_error_notice_timeout")]
    pub error_notice_timeout: f64,

    #[serde(default = "default_true")]
    pub add_to_command_palette: bool,

    #[serde(default = "default_true")]
    pub add_to_context_menu: bool,

    #[serde(default = "default_true")]
    pub open_changelog_on_update: bool,

    /// Mirror the application log into the active terminal.
    #[serde(default = "default_false")]
    pub intercept_logging: bool,

    /// Profile names shown in the panel tab bar.
    #[serde(default)]
    pub pinned_profiles: Vec<String>,

    #[serde(default = "default_profiles")]
    pub profiles: BTreeMap<String, Profile>,
}

fn default_renderer() -> Renderer {
    Renderer::WebGl
}

fn default_hide_status_bar() -> HideStatusBar {
    HideStatusBar::Focused
}

fn default_notice_timeout() -> f64 {
    5.0
}

fn default_error_notice_timeout() -> f64 {
    // Errors stay until dismissed.
    -1.0
}

fn default_profiles() -> BTreeMap<String, Profile> {
    let mut profiles = BTreeMap::new();
    profiles.insert("default".to_string(), Profile::default());
    profiles
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: String::new(),
            renderer: default_renderer(),
            hide_status_bar: default_hide_status_bar(),
            notice_timeout: default_notice_timeout(),
            error_notice_timeout: default_error_notice_timeout(),
            add_to_command_palette: true,
            add_to_context_menu: true,
            open_changelog_on_update: true,
            intercept_logging: false,
            pinned_profiles: Vec::new(),
            profiles: default_profiles(),
        }
    }
}

impl Settings {
    pub const FILENAME: &'static str = "settings.json";

    /// Repair an untrusted settings value, field by field.
    ///
    /// Any non-object input repairs to the defaults. The returned wrapper
    /// exposes whether the input was already fully valid.
    pub fn fix(raw: &Value) -> Fixed<Settings> {
        let empty = Map::new();
        let candidate = raw.as_object().unwrap_or(&empty);
        let defaults = Self::default_object();

        let mut repaired = Map::new();
        repaired.insert(
            "language".to_string(),
            fix::fix_in_set(defaults, candidate, "language", &str_values(LANGUAGES)),
        );
        repaired.insert(
            "renderer".to_string(),
            fix::fix_in_set(
                defaults,
                candidate,
                "renderer",
                &str_values(&Renderer::ALL.map(Renderer::as_str)),
            ),
        );
        repaired.insert(
            "hide_status_bar".to_string(),
            fix::fix_in_set(
                defaults,
                candidate,
                "hide_status_bar",
                &str_values(&HideStatusBar::ALL.map(HideStatusBar::as_str)),
            ),
        );
        for key in ["notice_timeout", "error_notice_timeout"] {
            repaired.insert(
                key.to_string(),
                fix::fix_field(defaults, candidate, key, &[Kind::Number]),
            );
        }
        for key in [
            "add_to_command_palette",
            "add_to_context_menu",
            "open_changelog_on_update",
            "intercept_logging",
        ] {
            repaired.insert(
                key.to_string(),
                fix::fix_field(defaults, candidate, key, &[Kind::Bool]),
            );
        }
        repaired.insert(
            "pinned_profiles".to_string(),
            fix::fix_array(defaults, candidate, "pinned_profiles", &[Kind::String]),
        );
        repaired.insert(
            "profiles".to_string(),
            Self::fix_profiles(defaults, candidate),
        );

        let (repaired, value) = resolve_repaired(repaired, defaults);
        Fixed::new(raw.clone(), repaired, value)
    }

    /// Repair the profiles map entry by entry. A non-object value falls back
    /// to the default profile map.
    fn fix_profiles(defaults: &Map<String, Value>, candidate: &Map<String, Value>) -> Value {
        match candidate.get("profiles") {
            Some(Value::Object(entries)) => {
                let mut out = Map::new();
                for (name, entry) in entries {
                    out.insert(name.clone(), Profile::fix(entry).repaired().clone());
                }
                Value::Object(out)
            }
            _ => match defaults.get("profiles") {
                Some(value) => fix::canonicalize(value),
                None => unreachable!("default settings contain a profiles entry"),
            },
        }
    }

    fn default_object() -> &'static Map<String, Value> {
        static CELL: OnceCell<Map<String, Value>> = OnceCell::new();
        CELL.get_or_init(|| match serde_json::to_value(Settings::default()) {
            Ok(Value::Object(map)) => map,
            _ => unreachable!("default settings serialize to a JSON object"),
        })
    }

    /// Semantic checks on top of shape repair.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !LANGUAGES.contains(&self.language.as_str()) {
            return Err(SettingsError::Validation(format!(
                "unsupported language `{}`",
                self.language
            )));
        }

        for (name, profile) in &self.profiles {
            if profile.executable.is_empty() {
                return Err(SettingsError::Validation(format!(
                    "profile `{name}` has an empty executable"
                )));
            }
        }

        for pinned in &self.pinned_profiles {
            if !self.profiles.contains_key(pinned) {
                return Err(SettingsError::Validation(format!(
                    "pinned profile `{pinned}` is not defined"
                )));
            }
        }

        Ok(())
    }
}

/// Deserialize a repaired object into its typed form.
///
/// The repair already guarantees per-field kinds, so this cannot fail for
/// shape reasons; the one remaining hole is numeric domains (a fractional
/// number where an integer field is expected). In that case the whole value
/// falls back to its canonical default, keeping the raw and typed forms in
/// agreement.
fn resolve_repaired<T>(repaired: Map<String, Value>, defaults: &Map<String, Value>) -> (Value, T)
where
    T: Default + serde::de::DeserializeOwned,
{
    let repaired = Value::Object(repaired);
    match serde_json::from_value(repaired.clone()) {
        Ok(value) => (repaired, value),
        Err(_) => (
            fix::canonicalize(&Value::Object(defaults.clone())),
            T::default(),
        ),
    }
}

/// Settings error types.
#[derive(Debug)]
pub enum SettingsError {
    Io(String),
    Parse(String),
    Serialize(String),
    Validation(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(msg) => write!(f, "IO error: {msg}"),
            SettingsError::Parse(msg) => write!(f, "Parse error: {msg}"),
            SettingsError::Serialize(msg) => write!(f, "Serialize error: {msg}"),
            SettingsError::Validation(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}
