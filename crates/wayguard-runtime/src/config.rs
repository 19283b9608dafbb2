//! Engine configuration and user settings.
//!
//! [`EngineConfig`] gathers every tunable the engine uses: the scan region,
//! the scan stride, hazard thresholds, alert cooldowns and labeler tuning.
//! All fields have defaults, so a partial TOML or JSON document is enough.
//!
//! [`Settings`] are the user-facing toggles that may change while the engine
//! runs; they are applied through
//! [`FrameLoop::apply_settings`][crate::frame_loop::FrameLoop::apply_settings]
//! and persisted through a [`SettingsStore`].

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wayguard_labeler::DetectorTuning;
use wayguard_perception::{HazardThresholds, RegionOfInterest};
use wayguard_types::{ClassifierBackend, WayError};

// ─────────────────────────────────────────────────────────────────────────────
// Default value helpers
// ─────────────────────────────────────────────────────────────────────────────

fn default_scan_step() -> u32 {
    8
}

fn default_haptic_cooldown_ms() -> u64 {
    500
}

fn default_speech_cooldown_ms() -> u64 {
    2500
}

fn default_request_cooldown_ms() -> u64 {
    1000
}

fn default_labeler_timeout_ms() -> u64 {
    1500
}

fn default_confidence_floor() -> f32 {
    0.75
}

fn default_label_ttl_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// EngineConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Per-channel alert cooldowns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTimings {
    #[serde(default = "default_haptic_cooldown_ms")]
    pub haptic_cooldown_ms: u64,
    #[serde(default = "default_speech_cooldown_ms")]
    pub speech_cooldown_ms: u64,
}

impl Default for AlertTimings {
    fn default() -> Self {
        Self {
            haptic_cooldown_ms: default_haptic_cooldown_ms(),
            speech_cooldown_ms: default_speech_cooldown_ms(),
        }
    }
}

impl AlertTimings {
    pub fn haptic_cooldown(&self) -> Duration {
        Duration::from_millis(self.haptic_cooldown_ms)
    }

    pub fn speech_cooldown(&self) -> Duration {
        Duration::from_millis(self.speech_cooldown_ms)
    }
}

/// Object-labeler scheduling and acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelerTuning {
    /// Minimum spacing between labeling requests.
    #[serde(default = "default_request_cooldown_ms")]
    pub request_cooldown_ms: u64,
    /// A request still running after this long counts as failed.
    #[serde(default = "default_labeler_timeout_ms")]
    pub timeout_ms: u64,
    /// Labels scoring at or below this are discarded.
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f32,
    /// A label older than this is dropped once no obstacle is in view.
    #[serde(default = "default_label_ttl_ms")]
    pub label_ttl_ms: u64,
    #[serde(default)]
    pub detector: DetectorTuning,
}

impl Default for LabelerTuning {
    fn default() -> Self {
        Self {
            request_cooldown_ms: default_request_cooldown_ms(),
            timeout_ms: default_labeler_timeout_ms(),
            confidence_floor: default_confidence_floor(),
            label_ttl_ms: default_label_ttl_ms(),
            detector: DetectorTuning::default(),
        }
    }
}

impl LabelerTuning {
    pub fn request_cooldown(&self) -> Duration {
        Duration::from_millis(self.request_cooldown_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn label_ttl(&self) -> Duration {
        Duration::from_millis(self.label_ttl_ms)
    }
}

/// Every tunable of the frame pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sampling stride in both axes; `0` is treated as `1`.
    #[serde(default = "default_scan_step")]
    pub scan_step: u32,
    #[serde(default)]
    pub roi: RegionOfInterest,
    #[serde(default)]
    pub thresholds: HazardThresholds,
    #[serde(default)]
    pub alerts: AlertTimings,
    #[serde(default)]
    pub labeler: LabelerTuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_step: default_scan_step(),
            roi: RegionOfInterest::default(),
            thresholds: HazardThresholds::default(),
            alerts: AlertTimings::default(),
            labeler: LabelerTuning::default(),
        }
    }
}

impl EngineConfig {
    /// # Errors
    ///
    /// Returns [`WayError::InvalidGeometry`] for a bad region and
    /// [`WayError::Config`] for any other out-of-range value.
    pub fn validate(&self) -> Result<(), WayError> {
        self.roi.validate()?;
        self.thresholds.validate()?;
        let floor = self.labeler.confidence_floor;
        if !(0.0..=1.0).contains(&floor) {
            return Err(WayError::Config(format!(
                "labeler.confidence_floor = {floor} must be in [0, 1]"
            )));
        }
        let iou = self.labeler.detector.iou_threshold;
        if !(0.0..=1.0).contains(&iou) {
            return Err(WayError::Config(format!(
                "labeler.detector.iou_threshold = {iou} must be in [0, 1]"
            )));
        }
        if self.labeler.timeout_ms == 0 {
            return Err(WayError::Config("labeler.timeout_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// User toggles.  Everything is on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_true")]
    pub detection_enabled: bool,
    #[serde(default = "default_true")]
    pub haptic_enabled: bool,
    #[serde(default = "default_true")]
    pub speech_enabled: bool,
    #[serde(default)]
    pub classifier_backend: ClassifierBackend,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detection_enabled: true,
            haptic_enabled: true,
            speech_enabled: true,
            classifier_backend: ClassifierBackend::default(),
        }
    }
}

/// Durable home of [`Settings`].
pub trait SettingsStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`WayError::Persistence`] when the backing store is unreadable.
    fn load(&self) -> Result<Settings, WayError>;

    /// # Errors
    ///
    /// Returns [`WayError::Persistence`] when the write fails.
    fn save(&self, settings: &Settings) -> Result<(), WayError>;
}

/// Process-local [`SettingsStore`].
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings, WayError> {
        self.settings
            .lock()
            .map(|s| *s)
            .map_err(|e| WayError::Persistence(format!("settings lock poisoned: {e}")))
    }

    fn save(&self, settings: &Settings) -> Result<(), WayError> {
        let mut guard = self
            .settings
            .lock()
            .map_err(|e| WayError::Persistence(format!("settings lock poisoned: {e}")))?;
        *guard = *settings;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_walking_tuning() {
        let c = EngineConfig::default();
        assert_eq!(c.scan_step, 8);
        assert_eq!(c.alerts.haptic_cooldown(), Duration::from_millis(500));
        assert_eq!(c.alerts.speech_cooldown(), Duration::from_millis(2500));
        assert_eq!(c.labeler.request_cooldown(), Duration::from_millis(1000));
        assert!((c.labeler.confidence_floor - 0.75).abs() < f32::EPSILON);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: EngineConfig =
            serde_json::from_str(r#"{ "scan_step": 4, "alerts": { "speech_cooldown_ms": 1000 } }"#)
                .unwrap();
        assert_eq!(c.scan_step, 4);
        assert_eq!(c.alerts.speech_cooldown_ms, 1000);
        assert_eq!(c.alerts.haptic_cooldown_ms, 500);
        assert_eq!(c.roi, RegionOfInterest::default());
    }

    #[test]
    fn validate_rejects_bad_roi() {
        let mut c = EngineConfig::default();
        c.roi.left = 0.9;
        assert!(matches!(c.validate(), Err(WayError::InvalidGeometry(_))));
    }

    #[test]
    fn validate_rejects_bad_confidence_floor() {
        let mut c = EngineConfig::default();
        c.labeler.confidence_floor = 1.5;
        assert!(matches!(c.validate(), Err(WayError::Config(_))));
    }

    #[test]
    fn settings_default_all_enabled() {
        let s: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, Settings::default());
        assert!(s.detection_enabled && s.haptic_enabled && s.speech_enabled);
        assert_eq!(s.classifier_backend, ClassifierBackend::Classifier);
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemorySettingsStore::default();
        let mut s = store.load().unwrap();
        s.classifier_backend = ClassifierBackend::Detector;
        store.save(&s).unwrap();
        assert_eq!(store.load().unwrap().classifier_backend, ClassifierBackend::Detector);
    }
}
