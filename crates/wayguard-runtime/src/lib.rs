//! `wayguard-runtime` – the perception and alert engine.
//!
//! Wires the perception stages, the object labeler and the alert channels
//! into one per-frame loop.
//!
//! # Modules
//!
//! - [`frame_loop`] – [`FrameLoop`][frame_loop::FrameLoop]: the per-frame
//!   driver with explicit start/stop, runtime settings and labeler wiring.
//! - [`alert`] – [`AlertDispatcher`][alert::AlertDispatcher]: visual banner,
//!   haptic and speech decisions with per-channel cooldowns.
//! - [`label_cache`] – [`LabelCache`][label_cache::LabelCache]: the last
//!   accepted object label, guarded against out-of-order completions.
//! - [`labeler_slot`] – [`LabelerSlot`][labeler_slot::LabelerSlot]: lazy
//!   labeler initialisation with backend fallback.
//! - [`config`] – [`EngineConfig`][config::EngineConfig],
//!   [`Settings`][config::Settings] and the
//!   [`SettingsStore`][config::SettingsStore] persistence seam.
//! - [`clock`] – monotonic and manually stepped time sources.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: `tracing`
//!   subscriber with optional OTLP span export.

pub mod alert;
pub mod clock;
pub mod config;
pub mod frame_loop;
pub mod label_cache;
pub mod labeler_slot;
pub mod telemetry;

pub use alert::{AlertDispatcher, AlertEffects, sanitize_speech};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{AlertTimings, EngineConfig, LabelerTuning, MemorySettingsStore, Settings, SettingsStore};
pub use frame_loop::{FrameLoop, FrameOutcome, FrameReport};
pub use label_cache::LabelCache;
pub use telemetry::{TracerProviderGuard, init_tracing};
