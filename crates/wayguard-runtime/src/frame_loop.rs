//! [`FrameLoop`] – the per-frame perception and alert driver.
//!
//! Each call to [`FrameLoop::process_frame`]:
//!
//! 1. **Orient** – reads the forward tilt from the camera pose.
//! 2. **Scan** – consumes the depth plane with the
//!    [`RegionScanner`], producing [`ScanStatistics`].  The frame is released
//!    before the call returns.
//! 3. **Classify** – runs the [`HazardClassifier`] cascade.
//! 4. **Label** – on an obstacle, hands the camera image to the object
//!    labeler on the background runtime (at most once per request cooldown).
//!    Otherwise a stale label is expired.
//! 5. **Alert** – the [`AlertDispatcher`] decides the effects, which are
//!    forwarded to the [`AlertSink`].
//!
//! Processing is synchronous on the caller's thread.  Labeling is the only
//! asynchronous step and never delays a frame; its result is picked up by a
//! later frame.
//!
//! # Example
//!
//! ```rust
//! use wayguard_hal::sim::{RecordingSink, SimScene};
//! use wayguard_runtime::config::{EngineConfig, Settings};
//! use wayguard_runtime::frame_loop::{FrameLoop, FrameOutcome};
//! use wayguard_types::HazardState;
//!
//! let mut engine = FrameLoop::new(EngineConfig::default(), Settings::default(), RecordingSink::new())
//!     .expect("default config is valid");
//! engine.start();
//! match engine.process_frame(SimScene::DropOff.frame(160, 120)) {
//!     FrameOutcome::Processed(report) => assert_eq!(report.hazard, HazardState::DeepDropOff),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wayguard_hal::{AlertSink, FrameSource, SensorFrame, VisualUpdate};
use wayguard_labeler::{LabelerFactory, ObjectLabeler};
use wayguard_perception::{HazardClassifier, PoseAngleEstimator, RegionScanner, ScanStatistics, TiltAngle};
use wayguard_types::{ClassifierBackend, ColorImage, DepthImage, HazardState, WayError};

use crate::alert::{AlertDispatcher, AlertEffects};
use crate::clock::{Clock, MonotonicClock};
use crate::config::{EngineConfig, Settings, SettingsStore};
use crate::label_cache::{LabelCache, Ticket};
use crate::labeler_slot::LabelerSlot;

// ─────────────────────────────────────────────────────────────────────────────
// Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// What happened to one processed frame.
#[derive(Debug)]
pub struct FrameReport {
    /// The hazard, with the cached label attached to obstacles.
    pub hazard: HazardState,
    pub stats: ScanStatistics,
    pub tilt: TiltAngle,
    pub effects: AlertEffects,
    /// The labeling request started by this frame, if any.
    pub labeling: Option<JoinHandle<()>>,
}

/// Result of [`FrameLoop::process_frame`] and [`FrameLoop::run_once`].
#[derive(Debug)]
pub enum FrameOutcome {
    /// The loop is stopped; the frame was dropped unprocessed.
    Stopped,
    /// The source had no frame this cycle.  The banner is left as it was.
    Unavailable(WayError),
    Processed(FrameReport),
}

impl FrameOutcome {
    pub fn report(&self) -> Option<&FrameReport> {
        match self {
            FrameOutcome::Processed(r) => Some(r),
            _ => None,
        }
    }

    pub fn hazard(&self) -> Option<&HazardState> {
        self.report().map(|r| &r.hazard)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FrameLoop
// ─────────────────────────────────────────────────────────────────────────────

struct Labeling {
    slot: LabelerSlot,
    runtime: Handle,
    last_request: Option<Duration>,
}

/// Owns the pipeline state for one sensing session.
pub struct FrameLoop<S: AlertSink> {
    config: EngineConfig,
    settings: Settings,
    scanner: RegionScanner,
    classifier: HazardClassifier,
    dispatcher: AlertDispatcher,
    sink: S,
    clock: Arc<dyn Clock>,
    cache: LabelCache,
    labeling: Option<Labeling>,
    store: Option<Arc<dyn SettingsStore>>,
    running: bool,
    frames_processed: u64,
}

impl<S: AlertSink> FrameLoop<S> {
    /// Build a stopped loop.  Object labeling stays off until
    /// [`with_labeler`][Self::with_labeler] is called.
    ///
    /// # Errors
    ///
    /// Returns the first violation reported by [`EngineConfig::validate`].
    pub fn new(config: EngineConfig, settings: Settings, sink: S) -> Result<Self, WayError> {
        config.validate()?;
        Ok(Self {
            scanner: config.thresholds.scanner(),
            classifier: HazardClassifier::new(config.thresholds.clone()),
            dispatcher: AlertDispatcher::new(config.alerts.clone()),
            config,
            settings,
            sink,
            clock: Arc::new(MonotonicClock::new()),
            cache: LabelCache::new(),
            labeling: None,
            store: None,
            running: false,
            frames_processed: 0,
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Persist backend fallbacks to `store`.  Call before
    /// [`with_labeler`][Self::with_labeler].
    pub fn with_settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Enable object labeling.  Labelers are built by `factory` on first use
    /// and run on `runtime`.
    pub fn with_labeler(mut self, factory: Arc<dyn LabelerFactory>, runtime: Handle) -> Self {
        self.labeling = Some(Labeling {
            slot: LabelerSlot::new(factory, self.store.clone()),
            runtime,
            last_request: None,
        });
        self
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Begin accepting frames.  Alert cooldowns start fresh.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.dispatcher.reset();
        self.running = true;
        info!(backend = %self.settings.classifier_backend, "frame loop started");
    }

    /// Stop accepting frames, hide the banner and discard in-flight labels.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.cache.invalidate();
        if let Err(e) = self.sink.on_visual_update(&VisualUpdate::Clear) {
            warn!(error = %e, "failed to clear banner on stop");
        }
        info!(frames = self.frames_processed, "frame loop stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    /// Apply new user settings.  A backend change re-initialises the labeler
    /// on next use; any change re-enables labeling after a double init
    /// failure.
    pub fn apply_settings(&mut self, settings: Settings) {
        if settings == self.settings {
            return;
        }
        if let Some(labeling) = &mut self.labeling {
            if settings.classifier_backend != self.settings.classifier_backend {
                info!(
                    from = %self.settings.classifier_backend,
                    to = %settings.classifier_backend,
                    "classifier backend changed"
                );
                labeling.slot.reset();
            } else if labeling.slot.is_disabled() {
                labeling.slot.reset();
            }
        }
        if !settings.detection_enabled {
            self.cache.invalidate();
        }
        self.settings = settings;
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn label_cache(&self) -> &LabelCache {
        &self.cache
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Backend of the labeler currently up, if any.
    pub fn active_backend(&self) -> Option<ClassifierBackend> {
        self.labeling.as_ref().and_then(|l| l.slot.active_backend())
    }

    // -------------------------------------------------------------------------
    // Frame processing
    // -------------------------------------------------------------------------

    /// Pull one frame from `source` and process it.
    pub fn run_once<F: FrameSource>(&mut self, source: &mut F) -> FrameOutcome {
        if !self.running {
            return FrameOutcome::Stopped;
        }
        match source.next_frame() {
            Ok(frame) => self.process_frame(frame),
            Err(e) => {
                debug!(error = %e, "skipping cycle");
                FrameOutcome::Unavailable(e)
            }
        }
    }

    /// Process one frame end to end.  The depth plane is consumed and
    /// released before this returns.
    pub fn process_frame<D: DepthImage>(&mut self, frame: SensorFrame<D>) -> FrameOutcome {
        if !self.running {
            debug!("frame dropped: loop stopped");
            return FrameOutcome::Stopped;
        }
        let now = self.clock.now();
        let SensorFrame { depth, pose, color } = frame;

        let tilt = PoseAngleEstimator::tilt(&pose);
        let stats = self.scanner.scan(depth, &self.config.roi, self.config.scan_step);
        let mut hazard = self.classifier.classify(&stats, tilt);

        let labeling = if matches!(hazard, HazardState::ObstacleClose(_)) {
            self.request_label(color, now)
        } else {
            if self.cache.expire(now, self.config.labeler.label_ttl()) {
                debug!("cached label expired");
            }
            None
        };

        let label = if self.settings.detection_enabled {
            self.cache.snapshot()
        } else {
            None
        };
        if let (HazardState::ObstacleClose(slot), Some(l)) = (&mut hazard, &label) {
            *slot = Some(l.text.clone());
        }

        let effects = self.dispatcher.dispatch(&hazard, &self.settings, now);
        self.deliver(&effects);
        self.frames_processed += 1;

        debug!(
            ?hazard,
            tilt = tilt.value(),
            close = stats.close_pixel_count,
            deep = stats.deep_pixel_count,
            total = stats.total_scanned_pixels,
            "frame classified"
        );

        FrameOutcome::Processed(FrameReport {
            hazard,
            stats,
            tilt,
            effects,
            labeling,
        })
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    fn request_label(&mut self, color: Option<ColorImage>, now: Duration) -> Option<JoinHandle<()>> {
        if !self.settings.detection_enabled {
            return None;
        }
        let labeling = self.labeling.as_mut()?;
        let image = color?;
        let cooldown = self.config.labeler.request_cooldown();
        if labeling
            .last_request
            .is_some_and(|last| now.saturating_sub(last) < cooldown)
        {
            return None;
        }
        let labeler = labeling.slot.acquire(&mut self.settings)?;
        labeling.last_request = Some(now);

        let ticket = self.cache.issue();
        debug!(backend = %labeler.backend(), ?ticket, "labeling requested");
        Some(labeling.runtime.spawn(run_labeler(
            labeler,
            image,
            ticket,
            self.cache.clone(),
            Arc::clone(&self.clock),
            self.config.labeler.timeout(),
            self.config.labeler.confidence_floor,
        )))
    }

    fn deliver(&mut self, effects: &AlertEffects) {
        if let Err(e) = self.sink.on_visual_update(&effects.visual) {
            warn!(error = %e, "visual alert failed");
        }
        if effects.haptic {
            if let Err(e) = self.sink.on_haptic() {
                warn!(error = %e, "haptic alert failed");
            }
        }
        if let Some(speech) = &effects.speech {
            if let Err(e) = self.sink.on_speech(speech) {
                warn!(error = %e, "speech alert failed");
            }
        }
    }
}

/// Body of one labeling task.
async fn run_labeler(
    labeler: Arc<dyn ObjectLabeler>,
    image: ColorImage,
    ticket: Ticket,
    cache: LabelCache,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    confidence_floor: f32,
) {
    match tokio::time::timeout(timeout, labeler.identify(image)).await {
        Ok(Ok(Some(label))) if label.confidence > confidence_floor => {
            let text = label.text.clone();
            if cache.accept(ticket, label, clock.now()) {
                debug!(label = %text, "label accepted");
            } else {
                debug!(label = %text, "label superseded by a newer request");
            }
        }
        Ok(Ok(Some(label))) => {
            debug!(label = %label.text, confidence = label.confidence, "label below confidence floor");
        }
        Ok(Ok(None)) => debug!("labeler found nothing"),
        Ok(Err(e)) => warn!(error = %e, "labeling failed"),
        Err(_) => warn!(timeout_ms = timeout.as_millis() as u64, "labeling timed out"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
