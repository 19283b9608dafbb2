//! `wayguard-hal` – platform boundary.
//!
//! The engine talks to the phone only through the traits defined here, so
//! sensor sessions and alert hardware can be swapped without touching the
//! perception or decision logic.
//!
//! # Modules
//!
//! - [`source`] – [`FrameSource`][source::FrameSource] and
//!   [`SensorFrame`][source::SensorFrame]: depth plane, pose and camera image
//!   for one cycle.
//! - [`sink`] – [`AlertSink`][sink::AlertSink]: visual, haptic and speech
//!   callbacks.
//! - [`sim`] – scripted scenes and a recording sink for headless testing.

pub mod sim;
pub mod sink;
pub mod source;

pub use sink::{AlertColor, AlertSink, SpeechRequest, VisualUpdate};
pub use source::{FrameSource, SensorFrame};
