//! Scripted models for testing without model files.
//!
//! [`SimLabelerFactory`] builds real [`MultiLabelClassifier`] and
//! [`SingleShotDetector`] adapters over scripted models, so tests exercise
//! the same decoding path a device would.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use wayguard_types::{ClassifierBackend, ColorImage, Label, WayError};

use crate::classifier::{LabelModel, MultiLabelClassifier};
use crate::detector::{DetectorModel, DetectorOutput, DetectorTuning, SingleShotDetector};
use crate::{LabelerFactory, ObjectLabeler};

/// A [`LabelModel`] that returns a fixed label list after an optional delay.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLabelModel {
    pub labels: Vec<Label>,
    pub latency: Duration,
    pub fail: bool,
}

impl LabelModel for ScriptedLabelModel {
    fn classify(&self, _image: &ColorImage) -> Result<Vec<Label>, WayError> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if self.fail {
            return Err(WayError::Labeler("scripted classifier failure".to_string()));
        }
        Ok(self.labels.clone())
    }
}

/// A [`DetectorModel`] that returns a fixed tensor after an optional delay.
#[derive(Debug, Clone)]
pub struct ScriptedDetectorModel {
    pub output: DetectorOutput,
    pub latency: Duration,
    pub fail: bool,
}

impl ScriptedDetectorModel {
    /// One anchor detecting `class_index` with `score` among `classes`.
    pub fn single(classes: usize, class_index: usize, score: f32) -> Self {
        let rows = 4 + classes;
        let mut data = vec![0.0; rows];
        data[..4].copy_from_slice(&[160.0, 160.0, 64.0, 64.0]);
        if let Some(slot) = data.get_mut(4 + class_index) {
            *slot = score;
        }
        Self {
            output: DetectorOutput { rows, anchors: 1, data },
            latency: Duration::ZERO,
            fail: false,
        }
    }

    /// A tensor in which no anchor scores anything.
    pub fn empty(classes: usize) -> Self {
        Self {
            output: DetectorOutput {
                rows: 4 + classes,
                anchors: 0,
                data: Vec::new(),
            },
            latency: Duration::ZERO,
            fail: false,
        }
    }
}

impl DetectorModel for ScriptedDetectorModel {
    fn infer(&self, _image: &ColorImage) -> Result<DetectorOutput, WayError> {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if self.fail {
            return Err(WayError::Labeler("scripted detector failure".to_string()));
        }
        Ok(self.output.clone())
    }
}

/// [`LabelerFactory`] that scripts both backends to report the same label.
///
/// Backends registered with [`with_failing_backend`][Self::with_failing_backend]
/// fail to initialise.  Every `create` call is recorded.
#[derive(Debug, Clone, Default)]
pub struct SimLabelerFactory {
    label: Option<Label>,
    latency: Duration,
    fail_inference: bool,
    failing: Vec<ClassifierBackend>,
    detector: DetectorTuning,
    created: Arc<Mutex<Vec<ClassifierBackend>>>,
}

impl SimLabelerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label reported by every labeler this factory builds.
    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    /// Simulated inference time.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every inference fail.
    pub fn with_inference_error(mut self) -> Self {
        self.fail_inference = true;
        self
    }

    /// Score gate and suppression overlap for the detector backend.
    pub fn with_detector_tuning(mut self, tuning: DetectorTuning) -> Self {
        self.detector = tuning;
        self
    }

    /// Make `backend` fail at initialisation.
    pub fn with_failing_backend(mut self, backend: ClassifierBackend) -> Self {
        self.failing.push(backend);
        self
    }

    /// Backends requested so far, in order (including failed attempts).
    pub fn creations(&self) -> Vec<ClassifierBackend> {
        self.created.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl LabelerFactory for SimLabelerFactory {
    fn create(&self, backend: ClassifierBackend) -> Result<Arc<dyn ObjectLabeler>, WayError> {
        if let Ok(mut created) = self.created.lock() {
            created.push(backend);
        }
        if self.failing.contains(&backend) {
            return Err(WayError::LabelerInit {
                backend,
                details: "scripted initialisation failure".to_string(),
            });
        }
        match backend {
            ClassifierBackend::Classifier => Ok(Arc::new(MultiLabelClassifier::new(ScriptedLabelModel {
                labels: self.label.iter().cloned().collect(),
                latency: self.latency,
                fail: self.fail_inference,
            }))),
            ClassifierBackend::Detector => {
                let (mut model, names) = match &self.label {
                    Some(label) => (
                        ScriptedDetectorModel::single(1, 0, label.confidence),
                        vec![label.text.clone()],
                    ),
                    None => (ScriptedDetectorModel::empty(1), vec!["object".to_string()]),
                };
                model.latency = self.latency;
                model.fail = self.fail_inference;
                Ok(Arc::new(SingleShotDetector::new(model, names, self.detector)))
            }
        }
    }
}
