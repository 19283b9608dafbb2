//! Configuration Vault – reads/writes `~/.wayguard/config.toml`.
//!
//! The vault holds the user [`Settings`], the [`EngineConfig`] tunables and
//! the simulator parameters.  [`VaultStore`] exposes the settings section as
//! a [`SettingsStore`] so the engine can persist a labeler fallback.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use wayguard_runtime::config::{EngineConfig, Settings, SettingsStore};
use wayguard_types::{ClassifierBackend, WayError};

/// Synthetic sensor parameters for `wayguard simulate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Pause between frames.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Label reported by the simulated object labeler.
    #[serde(default = "default_sim_label")]
    pub label: String,
}

fn default_width() -> u32 {
    160
}
fn default_height() -> u32 {
    120
}
fn default_frame_interval_ms() -> u64 {
    100
}
fn default_sim_label() -> String {
    "chair".to_string()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            frame_interval_ms: default_frame_interval_ms(),
            label: default_sim_label(),
        }
    }
}

/// Persisted configuration stored in `~/.wayguard/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub scenario: SimulationConfig,
}

/// Return the path to `~/.wayguard/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".wayguard").join("config.toml")
}

/// Load the config with environment overrides.  `None` if the file does not
/// exist.
pub fn load() -> Result<Option<Config>, WayError> {
    load_from(&config_path())
}

/// Load the config from a specific path, applying environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, WayError> {
    let Some(mut cfg) = read_raw(path)? else {
        return Ok(None);
    };
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Effective configuration: the vault if present, defaults otherwise, with
/// environment overrides in both cases.
pub fn load_or_default() -> Result<Config, WayError> {
    Ok(load()?.unwrap_or_else(|| {
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        cfg
    }))
}

fn read_raw(path: &Path) -> Result<Option<Config>, WayError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        WayError::Persistence(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| WayError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Apply `WAYGUARD_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `WAYGUARD_BACKEND` | `settings.classifier_backend` |
/// | `WAYGUARD_SCAN_STEP` | `engine.scan_step` |
/// | `WAYGUARD_HAPTIC` | `settings.haptic_enabled` |
/// | `WAYGUARD_SPEECH` | `settings.speech_enabled` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("WAYGUARD_BACKEND")
        && let Ok(backend) = v.parse::<ClassifierBackend>()
    {
        cfg.settings.classifier_backend = backend;
    }
    if let Ok(v) = std::env::var("WAYGUARD_SCAN_STEP")
        && let Ok(step) = v.trim().parse::<u32>()
    {
        cfg.engine.scan_step = step;
    }
    if let Ok(v) = std::env::var("WAYGUARD_HAPTIC")
        && let Some(on) = parse_flag(&v)
    {
        cfg.settings.haptic_enabled = on;
    }
    if let Ok(v) = std::env::var("WAYGUARD_SPEECH")
        && let Some(on) = parse_flag(&v)
    {
        cfg.settings.speech_enabled = on;
    }
}

/// Save the config to `path`, creating its directory if necessary.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), WayError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            WayError::Persistence(format!("failed to create config directory: {e}"))
        })?;
        // Owner-only directory (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(|e| {
                WayError::Persistence(format!("failed to set config directory permissions: {e}"))
            })?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| WayError::Config(format!("failed to serialize config: {e}")))?;
    let write_err =
        |e: std::io::Error| WayError::Persistence(format!("failed to write config at {}: {e}", path.display()));
    // Owner-only file (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// SettingsStore
// ─────────────────────────────────────────────────────────────────────────────

/// The vault's `[settings]` table as a [`SettingsStore`].  Saving rewrites
/// only that table and keeps the rest of the file as it was.
#[derive(Debug, Clone)]
pub struct VaultStore {
    path: PathBuf,
}

impl VaultStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for VaultStore {
    fn load(&self) -> Result<Settings, WayError> {
        Ok(read_raw(&self.path)?.unwrap_or_default().settings)
    }

    fn save(&self, settings: &Settings) -> Result<(), WayError> {
        let mut cfg = read_raw(&self.path)?.unwrap_or_default();
        cfg.settings = *settings;
        save_to(&cfg, &self.path)
    }
}
