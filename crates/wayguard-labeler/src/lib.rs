//! `wayguard-labeler` – best-effort object labels for obstacle alerts.
//!
//! The engine never waits on a label.  It hands a camera image to an
//! [`ObjectLabeler`] on a background runtime and reads whatever label has
//! been accepted by the time the next alert is dispatched.
//!
//! # Modules
//!
//! - [`classifier`] – [`MultiLabelClassifier`][classifier::MultiLabelClassifier]:
//!   adapter over an image-labeling model that scores whole-image labels.
//! - [`detector`] – [`SingleShotDetector`][detector::SingleShotDetector]:
//!   adapter over a single-shot detector emitting a raw `[4 + C, anchors]`
//!   tensor, with score filtering and class-wise non-max suppression.
//! - [`sim`] – scripted models and a [`LabelerFactory`] for headless tests.
//!
//! # Example
//!
//! ```rust
//! use wayguard_labeler::{LabelerFactory, ObjectLabeler, sim::SimLabelerFactory};
//! use wayguard_types::{ClassifierBackend, ColorImage, Label};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let factory = SimLabelerFactory::new().with_label(Label::new("chair", 0.9));
//! let labeler = factory.create(ClassifierBackend::Classifier).unwrap();
//! let image = ColorImage { width: 2, height: 2, rotation_degrees: 90, pixels: vec![0; 12] };
//! let label = labeler.identify(image).await.unwrap();
//! assert_eq!(label.unwrap().text, "chair");
//! # });
//! ```

pub mod classifier;
pub mod detector;
pub mod sim;

use std::sync::Arc;

use async_trait::async_trait;
use wayguard_types::{ClassifierBackend, ColorImage, Label, WayError};

pub use classifier::{LabelModel, MultiLabelClassifier};
pub use detector::{BoundingBox, Detection, DetectorModel, DetectorOutput, DetectorTuning, SingleShotDetector};

/// Asynchronous object-labeling capability.
///
/// # Contract
///
/// * `identify` – labels one camera image.  `Ok(None)` means the model saw
///   nothing it could name.  Inference must not block the calling task; heavy
///   work belongs on the blocking pool.
#[async_trait]
pub trait ObjectLabeler: Send + Sync {
    /// The backend this labeler implements.
    fn backend(&self) -> ClassifierBackend;

    /// Produce the best label for `image`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WayError::Labeler`] when inference fails or the model output
    /// is malformed.
    async fn identify(&self, image: ColorImage) -> Result<Option<Label>, WayError>;
}

/// Builds labelers on demand.  Model loading happens here, so creation may
/// fail (missing model file, unsupported hardware delegate).
pub trait LabelerFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns [`WayError::LabelerInit`] when the backend cannot be brought up.
    fn create(&self, backend: ClassifierBackend) -> Result<Arc<dyn ObjectLabeler>, WayError>;
}
