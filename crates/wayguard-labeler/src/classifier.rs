//! Multi-label image classifier backend.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use wayguard_types::{ClassifierBackend, ColorImage, Label, WayError};

use crate::ObjectLabeler;

/// A whole-image labeling model.  Implementations are synchronous and may be
/// slow; [`MultiLabelClassifier`] runs them on the blocking pool.
pub trait LabelModel: Send + Sync + 'static {
    /// Score every label the model recognises in `image`.
    ///
    /// # Errors
    ///
    /// Returns [`WayError::Labeler`] when inference fails.
    fn classify(&self, image: &ColorImage) -> Result<Vec<Label>, WayError>;
}

/// [`ObjectLabeler`] reporting the highest-confidence label of a
/// [`LabelModel`].
pub struct MultiLabelClassifier<M> {
    model: Arc<M>,
}

impl<M: LabelModel> MultiLabelClassifier<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Arc::new(model),
        }
    }
}

/// Highest-confidence entry; NaN scores never win.
pub fn best_label(labels: Vec<Label>) -> Option<Label> {
    labels
        .into_iter()
        .filter(|l| !l.confidence.is_nan())
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

#[async_trait]
impl<M: LabelModel> ObjectLabeler for MultiLabelClassifier<M> {
    fn backend(&self) -> ClassifierBackend {
        ClassifierBackend::Classifier
    }

    async fn identify(&self, image: ColorImage) -> Result<Option<Label>, WayError> {
        let model = Arc::clone(&self.model);
        let labels = tokio::task::spawn_blocking(move || model.classify(&image))
            .await
            .map_err(|e| WayError::Labeler(format!("classifier task failed: {e}")))??;
        debug!(candidates = labels.len(), "classifier finished");
        Ok(best_label(labels))
    }
}
