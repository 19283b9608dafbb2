//! In-process simulation for CI/CD testing without a depth sensor.
//!
//! [`SimSession`] builds a [`SceneSource`] that replays synthetic walking
//! scenes (open floor, an obstacle, a staircase, a ledge, bad phone tilt) as
//! real [`SensorFrame`]s.  [`RecordingSink`] captures every alert effect so
//! tests and the CLI can inspect what the engine emitted.
//!
//! # Example
//!
//! ```rust
//! use wayguard_hal::sim::{SimScene, SimSession};
//! use wayguard_hal::source::FrameSource;
//!
//! let mut source = SimSession::new(160, 120)
//!     .with_scene(SimScene::Obstacle { distance_mm: 800 }, 2)
//!     .build();
//!
//! assert!(source.next_frame().is_ok());
//! assert!(source.next_frame().is_ok());
//! assert!(source.next_frame().is_err()); // script exhausted
//! ```

use std::collections::VecDeque;

use tracing::debug;
use wayguard_perception::{Pose, Quaternion};
use wayguard_types::{ColorImage, DepthFrame, WayError};

use crate::sink::{AlertSink, SpeechRequest, VisualUpdate};
use crate::source::{FrameSource, SensorFrame};

/// Tilt of a phone held at a comfortable walking angle.
pub const WALKING_TILT: f32 = -0.6;

/// Camera height above the floor while walking, in metres.
const CHEST_HEIGHT_M: f32 = 1.3;

// ────────────────────────────────────────────────────────────────────────────
// Scenes
// ────────────────────────────────────────────────────────────────────────────

/// A synthetic scene in front of the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimScene {
    /// Open floor receding from ~1.5 m at the bottom of the frame to ~2.6 m
    /// at the top.
    Floor,
    /// A box-shaped obstacle filling the centre of the view.
    Obstacle { distance_mm: u16 },
    /// Descending stairs: far half of the view deeper than the near half.
    Stairs,
    /// A uniform deep surface (ledge, platform edge).
    DropOff,
    /// Open floor with the phone held too level.
    TiltHigh,
    /// Open floor with the phone pointed at the user's feet.
    TiltLow,
}

impl SimScene {
    /// Every scene, in a walk-through order.
    pub const ALL: [SimScene; 6] = [
        SimScene::Floor,
        SimScene::Obstacle { distance_mm: 800 },
        SimScene::Stairs,
        SimScene::DropOff,
        SimScene::TiltHigh,
        SimScene::TiltLow,
    ];

    /// Forward tilt of the simulated phone.
    pub fn tilt(&self) -> f32 {
        match self {
            SimScene::TiltHigh => -0.1,
            SimScene::TiltLow => -0.9,
            _ => WALKING_TILT,
        }
    }

    /// Render the scene as a tightly strided depth frame.
    pub fn render(&self, width: u32, height: u32) -> DepthFrame {
        let mut readings = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                readings.push(self.distance_at(x, y, width, height));
            }
        }
        DepthFrame::from_millimetres(width, height, &readings)
    }

    fn distance_at(&self, x: u32, y: u32, width: u32, height: u32) -> u16 {
        let fx = x as f32 / width.max(1) as f32;
        let fy = y as f32 / height.max(1) as f32;
        let floor = (1500.0 + (1.0 - fy) * 1100.0) as u16;
        match self {
            SimScene::Floor | SimScene::TiltHigh | SimScene::TiltLow => floor,
            SimScene::Obstacle { distance_mm } => {
                if (0.25..0.75).contains(&fx) && (0.1..0.9).contains(&fy) {
                    *distance_mm
                } else {
                    floor
                }
            }
            SimScene::Stairs => {
                if fy < 0.5 {
                    5200
                } else {
                    4200
                }
            }
            SimScene::DropOff => 4500,
        }
    }

    /// A full sensor frame for this scene.
    pub fn frame(&self, width: u32, height: u32) -> SensorFrame<DepthFrame> {
        SensorFrame {
            depth: self.render(width, height),
            pose: pose_with_tilt(self.tilt()),
            color: Some(ColorImage {
                width: 4,
                height: 4,
                rotation_degrees: 90,
                pixels: vec![0u8; 4 * 4 * 3],
            }),
        }
    }
}

/// Column-major pose of a camera pitched so that its forward vector has the
/// vertical component `tilt` (clamped to `[-1, 1]`), held at chest height.
pub fn pose_with_tilt(tilt: f32) -> [f32; 16] {
    let pitch = tilt.clamp(-1.0, 1.0).asin();
    Pose::new([0.0, CHEST_HEIGHT_M, 0.0], Quaternion::from_pitch(pitch)).to_matrix()
}

// ────────────────────────────────────────────────────────────────────────────
// Scene source
// ────────────────────────────────────────────────────────────────────────────

/// A scripted [`FrameSource`].  Each entry is either a scene or a cycle in
/// which the sensor had no frame ready.
pub struct SceneSource {
    width: u32,
    height: u32,
    script: VecDeque<Option<SimScene>>,
}

impl FrameSource for SceneSource {
    type Depth = DepthFrame;

    fn next_frame(&mut self) -> Result<SensorFrame<DepthFrame>, WayError> {
        match self.script.pop_front() {
            Some(Some(scene)) => Ok(scene.frame(self.width, self.height)),
            Some(None) => {
                debug!("simulated sensor dropout");
                Err(WayError::ResourceUnavailable(
                    "depth frame not yet available".to_string(),
                ))
            }
            None => Err(WayError::ResourceUnavailable("scene script exhausted".to_string())),
        }
    }
}

impl SceneSource {
    /// Frames left in the script, including dropped cycles.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

/// Builder for a [`SceneSource`].
pub struct SimSession {
    width: u32,
    height: u32,
    script: VecDeque<Option<SimScene>>,
}

impl SimSession {
    /// Start a script for a `width × height` depth sensor (phones commonly
    /// deliver 160×120).
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            script: VecDeque::new(),
        }
    }

    /// Append `frames` consecutive frames of `scene`.
    pub fn with_scene(mut self, scene: SimScene, frames: usize) -> Self {
        self.script.extend(std::iter::repeat_n(Some(scene), frames));
        self
    }

    /// Append `cycles` in which no depth frame is ready.
    pub fn with_dropout(mut self, cycles: usize) -> Self {
        self.script.extend(std::iter::repeat_n(None, cycles));
        self
    }

    /// Consume the builder and return the scripted source.
    pub fn build(self) -> SceneSource {
        SceneSource {
            width: self.width,
            height: self.height,
            script: self.script,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recording sink
// ────────────────────────────────────────────────────────────────────────────

/// One callback observed by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Visual(VisualUpdate),
    Haptic,
    Speech(SpeechRequest),
}

/// An [`AlertSink`] that records every callback.  Always succeeds unless
/// configured to fail the haptic channel.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
    fail_haptic: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every haptic pulse fail, as on a device without a vibrator.
    pub fn with_failing_haptic(mut self) -> Self {
        self.fail_haptic = true;
        self
    }

    pub fn haptic_count(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, SinkEvent::Haptic)).count()
    }

    /// Spoken phrases in emission order.
    pub fn spoken(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Speech(req) => Some(req.text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The most recent banner update.
    pub fn last_visual(&self) -> Option<&VisualUpdate> {
        self.events.iter().rev().find_map(|e| match e {
            SinkEvent::Visual(v) => Some(v),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl AlertSink for RecordingSink {
    fn on_visual_update(&mut self, update: &VisualUpdate) -> Result<(), WayError> {
        self.events.push(SinkEvent::Visual(update.clone()));
        Ok(())
    }

    fn on_haptic(&mut self) -> Result<(), WayError> {
        if self.fail_haptic {
            return Err(WayError::Sink {
                channel: "haptic".to_string(),
                details: "no vibrator present".to_string(),
            });
        }
        self.events.push(SinkEvent::Haptic);
        Ok(())
    }

    fn on_speech(&mut self, request: &SpeechRequest) -> Result<(), WayError> {
        self.events.push(SinkEvent::Speech(request.clone()));
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
