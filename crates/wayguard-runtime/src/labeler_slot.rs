//! Lazily initialised labeler with backend fallback.
//!
//! The configured backend is brought up on first use.  If it fails, the other
//! backend is tried and, on success, the switch is written back to the
//! settings store so the next session starts on a working backend.  If both
//! fail, labeling stays off until the settings change.

use std::sync::Arc;

use tracing::{info, warn};
use wayguard_labeler::{LabelerFactory, ObjectLabeler};
use wayguard_types::ClassifierBackend;

use crate::config::{Settings, SettingsStore};

enum SlotState {
    Uninitialised,
    Ready(Arc<dyn ObjectLabeler>),
    Disabled,
}

pub struct LabelerSlot {
    factory: Arc<dyn LabelerFactory>,
    store: Option<Arc<dyn SettingsStore>>,
    state: SlotState,
}

impl LabelerSlot {
    pub fn new(factory: Arc<dyn LabelerFactory>, store: Option<Arc<dyn SettingsStore>>) -> Self {
        Self {
            factory,
            store,
            state: SlotState::Uninitialised,
        }
    }

    /// Drop the current labeler; the next [`acquire`][Self::acquire] starts
    /// over.
    pub fn reset(&mut self) {
        self.state = SlotState::Uninitialised;
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self.state, SlotState::Disabled)
    }

    /// Backend of the live labeler, if one is up.
    pub fn active_backend(&self) -> Option<ClassifierBackend> {
        match &self.state {
            SlotState::Ready(l) => Some(l.backend()),
            _ => None,
        }
    }

    /// Labeler for `settings.classifier_backend`, initialising it if needed.
    ///
    /// On fallback `settings.classifier_backend` is rewritten to the backend
    /// that actually came up.
    pub fn acquire(&mut self, settings: &mut Settings) -> Option<Arc<dyn ObjectLabeler>> {
        if let SlotState::Ready(labeler) = &self.state {
            if labeler.backend() == settings.classifier_backend {
                return Some(Arc::clone(labeler));
            }
        }
        if self.is_disabled() {
            return None;
        }

        let requested = settings.classifier_backend;
        let labeler = match self.factory.create(requested) {
            Ok(labeler) => {
                info!(backend = %requested, "object labeler initialised");
                labeler
            }
            Err(e) => {
                let fallback = requested.other();
                warn!(backend = %requested, error = %e, %fallback, "labeler init failed; trying fallback");
                match self.factory.create(fallback) {
                    Ok(labeler) => {
                        settings.classifier_backend = fallback;
                        self.persist(settings);
                        labeler
                    }
                    Err(e) => {
                        warn!(error = %e, "both labeler backends failed; labeling disabled");
                        self.state = SlotState::Disabled;
                        return None;
                    }
                }
            }
        };
        self.state = SlotState::Ready(Arc::clone(&labeler));
        Some(labeler)
    }

    fn persist(&self, settings: &Settings) {
        let Some(store) = &self.store else { return };
        match store.save(settings) {
            Ok(()) => info!(backend = %settings.classifier_backend, "persisted labeler fallback"),
            Err(e) => warn!(error = %e, "could not persist labeler fallback"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemorySettingsStore;
    use wayguard_labeler::sim::SimLabelerFactory;

    fn slot(factory: &SimLabelerFactory, store: &Arc<MemorySettingsStore>) -> LabelerSlot {
        let store: Arc<dyn SettingsStore> = store.clone();
        LabelerSlot::new(Arc::new(factory.clone()), Some(store))
    }

    #[test]
    fn initialises_once_and_reuses() {
        let factory = SimLabelerFactory::new();
        let store = Arc::new(MemorySettingsStore::default());
        let mut s = slot(&factory, &store);
        let mut settings = Settings::default();
        assert!(s.acquire(&mut settings).is_some());
        assert!(s.acquire(&mut settings).is_some());
        assert_eq!(factory.creations(), vec![ClassifierBackend::Classifier]);
        assert_eq!(s.active_backend(), Some(ClassifierBackend::Classifier));
    }

    #[test]
    fn falls_back_and_persists() {
        let factory = SimLabelerFactory::new().with_failing_backend(ClassifierBackend::Detector);
        let store = Arc::new(MemorySettingsStore::default());
        let mut s = slot(&factory, &store);
        let mut settings = Settings {
            classifier_backend: ClassifierBackend::Detector,
            ..Settings::default()
        };
        let labeler = s.acquire(&mut settings).unwrap();
        assert_eq!(labeler.backend(), ClassifierBackend::Classifier);
        assert_eq!(settings.classifier_backend, ClassifierBackend::Classifier);
        assert_eq!(store.load().unwrap().classifier_backend, ClassifierBackend::Classifier);
    }

    #[test]
    fn both_failing_disables_until_reset() {
        let factory = SimLabelerFactory::new()
            .with_failing_backend(ClassifierBackend::Classifier)
            .with_failing_backend(ClassifierBackend::Detector);
        let store = Arc::new(MemorySettingsStore::default());
        let mut s = slot(&factory, &store);
        let mut settings = Settings::default();
        assert!(s.acquire(&mut settings).is_none());
        assert!(s.is_disabled());
        assert!(s.acquire(&mut settings).is_none());
        assert_eq!(factory.creations().len(), 2);

        s.reset();
        assert!(s.acquire(&mut settings).is_none());
        assert_eq!(factory.creations().len(), 4);
    }

    #[test]
    fn backend_change_reinitialises() {
        let factory = SimLabelerFactory::new();
        let store = Arc::new(MemorySettingsStore::default());
        let mut s = slot(&factory, &store);
        let mut settings = Settings::default();
        s.acquire(&mut settings);
        settings.classifier_backend = ClassifierBackend::Detector;
        let labeler = s.acquire(&mut settings).unwrap();
        assert_eq!(labeler.backend(), ClassifierBackend::Detector);
    }
}
