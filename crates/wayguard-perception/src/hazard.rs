//! [`HazardClassifier`] – turns scan statistics and tilt into one hazard.
//!
//! The classifier evaluates a configurable priority cascade and returns the
//! first hazard whose condition holds.  The default order is:
//!
//! 1. [`HazardKind::ObstacleClose`] – `close > total × obstacle_fraction`
//! 2. [`HazardKind::TiltTooHigh`] – tilt above `tilt_too_high_above`
//! 3. [`HazardKind::Staircase`] – deep over threshold **and** the upper half
//!    of the region is deeper than the lower half by more than `stair_gap_mm`
//! 4. [`HazardKind::DeepDropOff`] – deep over threshold without the staircase
//!    signature
//! 5. [`HazardKind::TiltTooLow`] – tilt below `tilt_too_low_below`
//!
//! and [`HazardState::Clear`] otherwise.  Staircase and drop-off conditions are
//! mutually exclusive, so reordering them in the configuration never makes
//! one shadow the other.
//!
//! `classify` is a pure function: no I/O, no clock, no interior state.
//!
//! # Example
//!
//! ```rust
//! use wayguard_perception::hazard::{HazardClassifier, HazardThresholds};
//! use wayguard_perception::pose::TiltAngle;
//! use wayguard_perception::scanner::ScanStatistics;
//! use wayguard_types::HazardState;
//!
//! let classifier = HazardClassifier::new(HazardThresholds::default());
//! let stats = ScanStatistics {
//!     close_pixel_count: 300,
//!     total_scanned_pixels: 1000,
//!     ..Default::default()
//! };
//! let state = classifier.classify(&stats, TiltAngle::new(-0.6));
//! assert_eq!(state, HazardState::ObstacleClose(None));
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use wayguard_types::{HazardKind, HazardState, WayError};

use crate::pose::TiltAngle;
use crate::scanner::{RegionScanner, ScanStatistics};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Tunables for the scanner limits and the classifier cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardThresholds {
    /// Valid samples nearer than this are "close" (millimetres).
    pub obstacle_limit_mm: u16,
    /// Valid samples farther than this are "deep" (millimetres).
    pub drop_off_limit_mm: u16,
    /// Fraction of visited points that must be close to flag an obstacle.
    pub obstacle_fraction: f32,
    /// Fraction of visited points that must be deep to flag a drop.
    pub drop_fraction: f32,
    /// Minimum upper-minus-lower average depth for the staircase signature.
    pub stair_gap_mm: f32,
    /// Tilt values above this mean the device is held too level.
    pub tilt_too_high_above: f32,
    /// Tilt values below this mean the device points at the user's feet.
    pub tilt_too_low_below: f32,
    /// Evaluation order; the first matching hazard wins.  Kinds left out are
    /// never reported.
    pub priority: Vec<HazardKind>,
}

impl Default for HazardThresholds {
    fn default() -> Self {
        Self {
            obstacle_limit_mm: 1200,
            drop_off_limit_mm: 4000,
            obstacle_fraction: 0.15,
            drop_fraction: 0.40,
            stair_gap_mm: 500.0,
            tilt_too_high_above: -0.40,
            tilt_too_low_below: -0.75,
            priority: vec![
                HazardKind::ObstacleClose,
                HazardKind::TiltTooHigh,
                HazardKind::Staircase,
                HazardKind::DeepDropOff,
                HazardKind::TiltTooLow,
            ],
        }
    }
}

impl HazardThresholds {
    /// Check that fractions are in `(0, 1]`, the tilt band is non-empty and
    /// the priority list has no duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`WayError::Config`] describing the first violation.
    pub fn validate(&self) -> Result<(), WayError> {
        for (name, value) in [
            ("obstacle_fraction", self.obstacle_fraction),
            ("drop_fraction", self.drop_fraction),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(WayError::Config(format!("{name} = {value} must be in (0, 1]")));
            }
        }
        if self.obstacle_limit_mm == 0 {
            return Err(WayError::Config("obstacle_limit_mm must be > 0".to_string()));
        }
        if !(self.stair_gap_mm >= 0.0) {
            return Err(WayError::Config(format!(
                "stair_gap_mm = {} must be >= 0",
                self.stair_gap_mm
            )));
        }
        if !(self.tilt_too_low_below < self.tilt_too_high_above) {
            return Err(WayError::Config(format!(
                "tilt_too_low_below ({}) must be < tilt_too_high_above ({})",
                self.tilt_too_low_below, self.tilt_too_high_above
            )));
        }
        let mut seen = HashSet::new();
        for kind in &self.priority {
            if !seen.insert(kind) {
                return Err(WayError::Config(format!(
                    "hazard {kind:?} appears more than once in priority"
                )));
            }
        }
        Ok(())
    }

    /// A scanner using these distance limits.
    pub fn scanner(&self) -> RegionScanner {
        RegionScanner::new(self.obstacle_limit_mm, self.drop_off_limit_mm)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HazardClassifier
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic priority cascade over [`ScanStatistics`] and [`TiltAngle`].
#[derive(Debug, Clone)]
pub struct HazardClassifier {
    thresholds: HazardThresholds,
}

impl HazardClassifier {
    pub fn new(thresholds: HazardThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &HazardThresholds {
        &self.thresholds
    }

    /// Classify one frame.  Returns [`HazardState::Clear`] when nothing was
    /// scanned, whatever the tilt.
    ///
    /// The returned [`HazardState::ObstacleClose`] never carries a label; the
    /// frame loop attaches one from its label cache.
    pub fn classify(&self, stats: &ScanStatistics, tilt: TiltAngle) -> HazardState {
        if stats.total_scanned_pixels == 0 {
            return HazardState::Clear;
        }
        self.thresholds
            .priority
            .iter()
            .find(|kind| self.matches(**kind, stats, tilt))
            .map(|kind| match kind {
                HazardKind::ObstacleClose => HazardState::ObstacleClose(None),
                HazardKind::TiltTooHigh => HazardState::TiltTooHigh,
                HazardKind::Staircase => HazardState::Staircase,
                HazardKind::DeepDropOff => HazardState::DeepDropOff,
                HazardKind::TiltTooLow => HazardState::TiltTooLow,
            })
            .unwrap_or(HazardState::Clear)
    }

    fn matches(&self, kind: HazardKind, stats: &ScanStatistics, tilt: TiltAngle) -> bool {
        let t = &self.thresholds;
        match kind {
            HazardKind::ObstacleClose => exceeds(stats.close_pixel_count, stats, t.obstacle_fraction),
            HazardKind::TiltTooHigh => tilt.value() > t.tilt_too_high_above,
            HazardKind::Staircase => self.deep_over_threshold(stats) && self.stair_signature(stats),
            HazardKind::DeepDropOff => self.deep_over_threshold(stats) && !self.stair_signature(stats),
            HazardKind::TiltTooLow => tilt.value() < t.tilt_too_low_below,
        }
    }

    fn deep_over_threshold(&self, stats: &ScanStatistics) -> bool {
        exceeds(stats.deep_pixel_count, stats, self.thresholds.drop_fraction)
    }

    /// The far half of the region is measurably deeper than the near half.
    fn stair_signature(&self, stats: &ScanStatistics) -> bool {
        stats.upper_average_depth_mm > stats.lower_average_depth_mm + self.thresholds.stair_gap_mm
    }
}

fn exceeds(count: u32, stats: &ScanStatistics, fraction: f32) -> bool {
    f64::from(count) > f64::from(stats.total_scanned_pixels) * f64::from(fraction)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A comfortable walking tilt: inside both tilt limits.
    const OK_TILT: f32 = -0.6;

    fn classifier() -> HazardClassifier {
        HazardClassifier::new(HazardThresholds::default())
    }

    fn stats(close: u32, deep: u32, upper: f32, lower: f32) -> ScanStatistics {
        ScanStatistics {
            close_pixel_count: close,
            deep_pixel_count: deep,
            total_scanned_pixels: 1000,
            upper_average_depth_mm: upper,
            lower_average_depth_mm: lower,
            upper_sample_count: 500,
            lower_sample_count: 500,
        }
    }

    fn classify(s: &ScanStatistics, tilt: f32) -> HazardState {
        classifier().classify(s, TiltAngle::new(tilt))
    }

    #[test]
    fn nothing_notable_is_clear() {
        assert_eq!(classify(&stats(10, 10, 2000.0, 1800.0), OK_TILT), HazardState::Clear);
    }

    #[test]
    fn obstacle_fraction_is_strict() {
        assert_eq!(classify(&stats(150, 0, 0.0, 0.0), OK_TILT), HazardState::Clear);
        assert_eq!(
            classify(&stats(151, 0, 0.0, 0.0), OK_TILT),
            HazardState::ObstacleClose(None)
        );
    }

    #[test]
    fn twenty_percent_close_is_obstacle() {
        assert_eq!(
            classify(&stats(200, 0, 0.0, 0.0), OK_TILT),
            HazardState::ObstacleClose(None)
        );
    }

    #[test]
    fn staircase_needs_deep_fraction_and_gap() {
        assert_eq!(
            classify(&stats(0, 450, 5200.0, 4000.0), OK_TILT),
            HazardState::Staircase
        );
    }

    #[test]
    fn deep_without_gap_is_drop_off() {
        assert_eq!(
            classify(&stats(0, 450, 4100.0, 4000.0), OK_TILT),
            HazardState::DeepDropOff
        );
    }

    #[test]
    fn gap_without_deep_fraction_is_clear() {
        assert_eq!(classify(&stats(0, 399, 5200.0, 4000.0), OK_TILT), HazardState::Clear);
    }

    #[test]
    fn obstacle_outranks_drop_off_and_tilt() {
        let s = stats(500, 450, 4100.0, 4000.0);
        for tilt in [0.2, OK_TILT, -0.95] {
            assert_eq!(classify(&s, tilt), HazardState::ObstacleClose(None));
        }
    }

    #[test]
    fn obstacle_outranks_staircase() {
        assert_eq!(
            classify(&stats(500, 450, 5200.0, 4000.0), OK_TILT),
            HazardState::ObstacleClose(None)
        );
    }

    #[test]
    fn tilt_too_high_outranks_terrain() {
        assert_eq!(
            classify(&stats(0, 450, 5200.0, 4000.0), -0.2),
            HazardState::TiltTooHigh
        );
        assert_eq!(classify(&stats(0, 0, 0.0, 0.0), -0.2), HazardState::TiltTooHigh);
    }

    #[test]
    fn terrain_outranks_tilt_too_low() {
        assert_eq!(
            classify(&stats(0, 450, 4000.0, 4000.0), -0.9),
            HazardState::DeepDropOff
        );
        assert_eq!(classify(&stats(0, 0, 0.0, 0.0), -0.9), HazardState::TiltTooLow);
    }

    #[test]
    fn tilt_limits_are_strict() {
        let s = stats(0, 0, 0.0, 0.0);
        assert_eq!(classify(&s, -0.40), HazardState::Clear);
        assert_eq!(classify(&s, -0.75), HazardState::Clear);
    }

    #[test]
    fn empty_scan_is_clear_even_when_tilted() {
        let empty = ScanStatistics::default();
        assert_eq!(classify(&empty, 0.9), HazardState::Clear);
        assert_eq!(classify(&empty, -0.99), HazardState::Clear);
    }

    #[test]
    fn classify_is_deterministic() {
        let s = stats(100, 450, 5200.0, 4000.0);
        let first = classify(&s, OK_TILT);
        for _ in 0..100 {
            assert_eq!(classify(&s, OK_TILT), first);
        }
    }

    #[test]
    fn every_pair_of_conditions_resolves_by_priority() {
        // One statistic per kind that satisfies exactly that kind's condition
        // (plus its tilt), combined pairwise.
        let default_order = HazardThresholds::default().priority;
        let rank = |state: &HazardState| {
            state
                .kind()
                .and_then(|k| default_order.iter().position(|p| *p == k))
        };
        let cases: [(ScanStatistics, f32); 4] = [
            (stats(500, 0, 0.0, 0.0), -0.2),            // obstacle + tilt high
            (stats(0, 450, 5200.0, 4000.0), -0.9),      // staircase + tilt low
            (stats(0, 450, 4000.0, 4000.0), -0.2),      // drop-off + tilt high
            (stats(500, 450, 5200.0, 4000.0), -0.9),    // obstacle + staircase + tilt low
        ];
        let expected = [
            HazardState::ObstacleClose(None),
            HazardState::Staircase,
            HazardState::TiltTooHigh,
            HazardState::ObstacleClose(None),
        ];
        for ((s, tilt), want) in cases.iter().zip(expected) {
            let got = classify(s, *tilt);
            assert_eq!(got, want);
            assert!(rank(&got).is_some());
        }
    }

    #[test]
    fn custom_priority_reorders_cascade() {
        let thresholds = HazardThresholds {
            priority: vec![HazardKind::DeepDropOff, HazardKind::ObstacleClose],
            ..Default::default()
        };
        let c = HazardClassifier::new(thresholds);
        let s = stats(500, 450, 4000.0, 4000.0);
        assert_eq!(c.classify(&s, TiltAngle::new(-0.2)), HazardState::DeepDropOff);
        // Tilt kinds were left out of the order, so they never fire.
        assert_eq!(
            c.classify(&stats(0, 0, 0.0, 0.0), TiltAngle::new(-0.2)),
            HazardState::Clear
        );
    }

    #[test]
    fn custom_stair_gap() {
        let c = HazardClassifier::new(HazardThresholds {
            stair_gap_mm: 50.0,
            ..Default::default()
        });
        assert_eq!(
            c.classify(&stats(0, 450, 4100.0, 4000.0), TiltAngle::new(OK_TILT)),
            HazardState::Staircase
        );
    }

    #[test]
    fn validate_rejects_bad_thresholds() {
        assert!(HazardThresholds::default().validate().is_ok());

        let dup = HazardThresholds {
            priority: vec![HazardKind::Staircase, HazardKind::Staircase],
            ..Default::default()
        };
        assert!(dup.validate().is_err());

        let frac = HazardThresholds {
            obstacle_fraction: 0.0,
            ..Default::default()
        };
        assert!(frac.validate().is_err());

        let tilt = HazardThresholds {
            tilt_too_low_below: -0.2,
            tilt_too_high_above: -0.4,
            ..Default::default()
        };
        assert!(tilt.validate().is_err());
    }

    #[test]
    fn thresholds_deserialize_with_defaults() {
        let t: HazardThresholds =
            serde_json::from_str(r#"{"drop_off_limit_mm":2500,"priority":["staircase"]}"#).unwrap();
        assert_eq!(t.drop_off_limit_mm, 2500);
        assert_eq!(t.obstacle_limit_mm, 1200);
        assert_eq!(t.priority, vec![HazardKind::Staircase]);
    }
}
