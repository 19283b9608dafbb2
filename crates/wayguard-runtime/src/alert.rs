//! [`AlertDispatcher`] – rate-limited fan-out of a hazard into alert effects.
//!
//! Every frame produces a visual update.  Haptic pulses and spoken phrases
//! are each gated by their own cooldown so a persistent hazard does not flood
//! the user:
//!
//! | Channel | Condition |
//! |---|---|
//! | visual | always (banner hidden on `Clear`) |
//! | haptic | hazard present, haptics enabled, `≥ haptic_cooldown` since last pulse |
//! | speech | hazard present, speech enabled, `≥ speech_cooldown` since last phrase |
//!
//! A channel's clock only moves when that channel actually emits.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use wayguard_runtime::alert::AlertDispatcher;
//! use wayguard_runtime::config::{AlertTimings, Settings};
//! use wayguard_types::HazardState;
//!
//! let mut dispatcher = AlertDispatcher::new(AlertTimings::default());
//! let fx = dispatcher.dispatch(&HazardState::Staircase, &Settings::default(), Duration::ZERO);
//! assert!(fx.haptic);
//! assert_eq!(fx.speech.unwrap().text, "Descending Stairs Ahead");
//! ```

use std::time::Duration;

use tracing::debug;
use wayguard_hal::{AlertColor, SpeechRequest, VisualUpdate};
use wayguard_types::HazardState;

use crate::config::{AlertTimings, Settings};

/// Effects decided for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEffects {
    pub visual: VisualUpdate,
    pub haptic: bool,
    pub speech: Option<SpeechRequest>,
}

impl AlertEffects {
    /// Effects for a frame with nothing to report.
    pub fn clear() -> Self {
        Self {
            visual: VisualUpdate::Clear,
            haptic: false,
            speech: None,
        }
    }
}

/// Banner text and colour for `hazard`; `None` for [`HazardState::Clear`].
///
/// An obstacle's label is only shown while detection is enabled.
pub fn alert_message(hazard: &HazardState, detection_enabled: bool) -> Option<(String, AlertColor)> {
    let message = match hazard {
        HazardState::Clear => return None,
        HazardState::ObstacleClose(label) => match label {
            Some(text) if detection_enabled => (format!("STOP! ({text})"), AlertColor::Orange),
            _ => ("STOP!".to_string(), AlertColor::Orange),
        },
        HazardState::TiltTooHigh => ("Tilt Phone Down ↘".to_string(), AlertColor::Yellow),
        HazardState::Staircase => ("Descending Stairs Ahead ⬇".to_string(), AlertColor::Cyan),
        HazardState::DeepDropOff => ("Very Deep Surface Detected".to_string(), AlertColor::Red),
        HazardState::TiltTooLow => ("Tilt Phone Up ↗".to_string(), AlertColor::Yellow),
    };
    Some(message)
}

/// Keep ASCII letters, digits and spaces; trim the ends.
pub fn sanitize_speech(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Per-channel cooldown gate.
#[derive(Debug, Clone)]
struct Cooldown {
    period: Duration,
    last: Option<Duration>,
}

impl Cooldown {
    fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    fn ready(&self, now: Duration) -> bool {
        match self.last {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.period,
        }
    }

    fn mark(&mut self, now: Duration) {
        self.last = Some(now);
    }
}

/// Decides alert effects and owns the haptic and speech channel clocks.
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    haptic: Cooldown,
    speech: Cooldown,
}

impl AlertDispatcher {
    pub fn new(timings: AlertTimings) -> Self {
        Self {
            haptic: Cooldown::new(timings.haptic_cooldown()),
            speech: Cooldown::new(timings.speech_cooldown()),
        }
    }

    /// Forget previous emissions so the next alert on each channel passes.
    pub fn reset(&mut self) {
        self.haptic.last = None;
        self.speech.last = None;
    }

    /// Decide the effects of `hazard` at time `now`.
    pub fn dispatch(
        &mut self,
        hazard: &HazardState,
        settings: &Settings,
        now: Duration,
    ) -> AlertEffects {
        let Some((text, color)) = alert_message(hazard, settings.detection_enabled) else {
            return AlertEffects::clear();
        };

        let haptic = settings.haptic_enabled && self.haptic.ready(now);
        if haptic {
            self.haptic.mark(now);
        }

        let speech = if settings.speech_enabled && self.speech.ready(now) {
            self.speech.mark(now);
            Some(SpeechRequest {
                text: sanitize_speech(&text),
                flush_queue: true,
            })
        } else {
            None
        };

        debug!(?hazard, haptic, speech = speech.is_some(), "alert dispatched");
        AlertEffects {
            visual: VisualUpdate::Show { text, color },
            haptic,
            speech,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn obstacle() -> HazardState {
        HazardState::ObstacleClose(None)
    }

    #[test]
    fn haptic_and_speech_cooldown_sequence() {
        let mut d = AlertDispatcher::new(AlertTimings::default());
        let s = Settings::default();

        let t0 = d.dispatch(&obstacle(), &s, ms(0));
        assert!(t0.haptic);
        assert!(t0.speech.is_some());

        let t100 = d.dispatch(&obstacle(), &s, ms(100));
        assert!(!t100.haptic);
        assert!(t100.speech.is_none());

        let t600 = d.dispatch(&obstacle(), &s, ms(600));
        assert!(t600.haptic);
        assert!(t600.speech.is_none());

        let t2600 = d.dispatch(&obstacle(), &s, ms(2600));
        assert!(t2600.haptic);
        assert!(t2600.speech.is_some());
    }

    #[test]
    fn cooldown_boundary_is_inclusive() {
        let mut d = AlertDispatcher::new(AlertTimings::default());
        let s = Settings::default();
        d.dispatch(&obstacle(), &s, ms(1000));
        assert!(d.dispatch(&obstacle(), &s, ms(1500)).haptic);
    }

    #[test]
    fn clear_emits_only_banner_clear() {
        let mut d = AlertDispatcher::new(AlertTimings::default());
        let fx = d.dispatch(&HazardState::Clear, &Settings::default(), ms(0));
        assert_eq!(fx, AlertEffects::clear());
        // Clear did not consume the first emission.
        assert!(d.dispatch(&obstacle(), &Settings::default(), ms(1)).haptic);
    }

    #[test]
    fn disabled_channel_does_not_touch_clock() {
        let mut d = AlertDispatcher::new(AlertTimings::default());
        let mut s = Settings::default();
        s.haptic_enabled = false;
        let fx = d.dispatch(&obstacle(), &s, ms(0));
        assert!(!fx.haptic);
        assert!(fx.speech.is_some());

        s.haptic_enabled = true;
        assert!(d.dispatch(&obstacle(), &s, ms(100)).haptic);
    }

    #[test]
    fn channels_are_independent() {
        let mut d = AlertDispatcher::new(AlertTimings::default());
        let mut s = Settings::default();
        s.speech_enabled = false;
        d.dispatch(&obstacle(), &s, ms(0));
        s.speech_enabled = true;
        let fx = d.dispatch(&obstacle(), &s, ms(100));
        assert!(!fx.haptic);
        assert!(fx.speech.is_some());
    }

    #[test]
    fn label_shown_only_with_detection_enabled() {
        let chair = HazardState::ObstacleClose(Some("chair".to_string()));
        let mut d = AlertDispatcher::new(AlertTimings::default());
        let mut s = Settings::default();

        let fx = d.dispatch(&chair, &s, ms(0));
        assert_eq!(
            fx.visual,
            VisualUpdate::Show {
                text: "STOP! (chair)".to_string(),
                color: AlertColor::Orange
            }
        );
        assert_eq!(fx.speech.unwrap().text, "STOP chair");

        s.detection_enabled = false;
        let fx = d.dispatch(&chair, &s, ms(5000));
        assert!(matches!(fx.visual, VisualUpdate::Show { ref text, .. } if text == "STOP!"));
    }

    #[test]
    fn unlabelled_obstacle_shows_plain_stop() {
        let mut d = AlertDispatcher::new(AlertTimings::default());
        let fx = d.dispatch(&obstacle(), &Settings::default(), ms(0));
        assert!(matches!(fx.visual, VisualUpdate::Show { ref text, .. } if text == "STOP!"));
    }

    #[test]
    fn oscillating_hazard_pulses_once_per_window() {
        let mut d = AlertDispatcher::new(AlertTimings::default());
        let s = Settings::default();
        let mut pulses = 0;
        for (i, t) in (0..=450).step_by(50).enumerate() {
            let hazard = if i % 2 == 0 { HazardState::Clear } else { obstacle() };
            if d.dispatch(&hazard, &s, ms(t)).haptic {
                pulses += 1;
            }
        }
        assert_eq!(pulses, 1);

        // The next window opens 500 ms after the first pulse at 50 ms.
        assert!(d.dispatch(&obstacle(), &s, ms(550)).haptic);
    }

    #[test]
    fn messages_per_hazard() {
        let cases = [
            (HazardState::TiltTooHigh, "Tilt Phone Down ↘", AlertColor::Yellow),
            (HazardState::Staircase, "Descending Stairs Ahead ⬇", AlertColor::Cyan),
            (HazardState::DeepDropOff, "Very Deep Surface Detected", AlertColor::Red),
            (HazardState::TiltTooLow, "Tilt Phone Up ↗", AlertColor::Yellow),
        ];
        for (hazard, text, color) in cases {
            let (t, c) = alert_message(&hazard, true).unwrap();
            assert_eq!(t, text);
            assert_eq!(c, color);
        }
        assert!(alert_message(&HazardState::Clear, true).is_none());
    }

    #[test]
    fn sanitize_strips_symbols() {
        assert_eq!(sanitize_speech("STOP! (chair)"), "STOP chair");
        assert_eq!(sanitize_speech("Tilt Phone Up ↗"), "Tilt Phone Up");
        assert_eq!(sanitize_speech("STOP! (dining table)"), "STOP dining table");
    }

    #[test]
    fn speech_flushes_queue() {
        let mut d = AlertDispatcher::new(AlertTimings::default());
        let fx = d.dispatch(&HazardState::DeepDropOff, &Settings::default(), ms(0));
        assert!(fx.speech.unwrap().flush_queue);
    }

    #[test]
    fn reset_allows_immediate_alerts() {
        let mut d = AlertDispatcher::new(AlertTimings::default());
        let s = Settings::default();
        d.dispatch(&obstacle(), &s, ms(0));
        d.reset();
        let fx = d.dispatch(&obstacle(), &s, ms(10));
        assert!(fx.haptic && fx.speech.is_some());
    }
}
