//! Named walking scenarios for `wayguard simulate`.

use std::fmt;
use std::str::FromStr;

use wayguard_hal::sim::{SceneSource, SimScene, SimSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Clear,
    Obstacle,
    Stairs,
    DropOff,
    TiltHigh,
    TiltLow,
    /// Every scene in turn, with a sensor hiccup between them.
    Mixed,
}

impl Scenario {
    pub const ALL: [Scenario; 7] = [
        Scenario::Clear,
        Scenario::Obstacle,
        Scenario::Stairs,
        Scenario::DropOff,
        Scenario::TiltHigh,
        Scenario::TiltLow,
        Scenario::Mixed,
    ];

    fn scene(self) -> Option<SimScene> {
        match self {
            Scenario::Clear => Some(SimScene::Floor),
            Scenario::Obstacle => Some(SimScene::Obstacle { distance_mm: 800 }),
            Scenario::Stairs => Some(SimScene::Stairs),
            Scenario::DropOff => Some(SimScene::DropOff),
            Scenario::TiltHigh => Some(SimScene::TiltHigh),
            Scenario::TiltLow => Some(SimScene::TiltLow),
            Scenario::Mixed => None,
        }
    }

    /// Frame source replaying about `frames` frames of this scenario.
    pub fn source(self, width: u32, height: u32, frames: usize) -> SceneSource {
        let session = SimSession::new(width, height);
        let session = match self.scene() {
            Some(scene) => session.with_scene(scene, frames),
            None => {
                let per_scene = (frames / SimScene::ALL.len()).max(1);
                SimScene::ALL.iter().fold(session, |s, scene| {
                    s.with_scene(*scene, per_scene).with_dropout(1)
                })
            }
        };
        session.build()
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::Clear => "clear",
            Scenario::Obstacle => "obstacle",
            Scenario::Stairs => "stairs",
            Scenario::DropOff => "dropoff",
            Scenario::TiltHigh => "tilt-high",
            Scenario::TiltLow => "tilt-low",
            Scenario::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<String> = Scenario::ALL.iter().map(|s| s.to_string()).collect();
                format!("unknown scenario '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
