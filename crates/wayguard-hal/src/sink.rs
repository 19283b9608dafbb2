//! Generic `AlertSink` trait: the three user-facing alert channels.
//!
//! The engine never draws, vibrates or speaks itself.  It describes the effect
//! and a platform driver implementing [`AlertSink`] performs it on whatever
//! thread the platform requires.

use wayguard_types::WayError;

/// Banner colour for a visual alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertColor {
    Orange,
    Yellow,
    Cyan,
    Red,
}

impl AlertColor {
    /// `#RRGGBB` form for UI toolkits.
    pub fn hex(self) -> &'static str {
        match self {
            AlertColor::Orange => "#FFA500",
            AlertColor::Yellow => "#FFFF00",
            AlertColor::Cyan => "#00FFFF",
            AlertColor::Red => "#FF0000",
        }
    }
}

/// What the warning banner should show after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualUpdate {
    Show { text: String, color: AlertColor },
    /// Hide the banner.
    Clear,
}

/// A phrase for the speech synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Text with symbols and punctuation already stripped.
    pub text: String,
    /// When `true` the utterance cancels anything still being spoken instead
    /// of queueing behind it.
    pub flush_queue: bool,
}

/// Receives alert effects from the frame loop.
///
/// Each callback is optional for a given frame; errors are logged by the
/// caller and never stop frame processing.
pub trait AlertSink: Send {
    /// Update (or hide) the warning banner.
    ///
    /// # Errors
    ///
    /// Returns [`WayError::Sink`] if the banner cannot be updated.
    fn on_visual_update(&mut self, update: &VisualUpdate) -> Result<(), WayError>;

    /// Fire one haptic pulse.
    ///
    /// # Errors
    ///
    /// Returns [`WayError::Sink`] if the vibration motor is unavailable.
    fn on_haptic(&mut self) -> Result<(), WayError>;

    /// Speak a sanitised phrase.
    ///
    /// # Errors
    ///
    /// Returns [`WayError::Sink`] if the synthesizer rejects the request.
    fn on_speech(&mut self, request: &SpeechRequest) -> Result<(), WayError>;
}
