//! `wayguard-perception` – depth-frame analysis.
//!
//! Turns one depth frame and one camera pose into a single hazard decision.
//! Everything here is synchronous and allocation-light; nothing blocks or
//! keeps state between frames.
//!
//! # Modules
//!
//! - [`roi`] – [`RegionOfInterest`][roi::RegionOfInterest]: fractional scan
//!   bounds and their conversion to pixel bounds.
//! - [`scanner`] – [`RegionScanner`][scanner::RegionScanner]: strided walk of
//!   the region producing [`ScanStatistics`][scanner::ScanStatistics].
//! - [`pose`] – [`PoseAngleEstimator`][pose::PoseAngleEstimator]: forward
//!   tilt of the device from its 4×4 pose.
//! - [`hazard`] – [`HazardClassifier`][hazard::HazardClassifier]: the
//!   priority cascade that yields one
//!   [`HazardState`][wayguard_types::HazardState] per frame.

pub mod hazard;
pub mod pose;
pub mod roi;
pub mod scanner;

pub use hazard::{HazardClassifier, HazardThresholds};
pub use pose::{Pose, PoseAngleEstimator, Quaternion, TiltAngle};
pub use roi::{PixelBounds, RegionOfInterest};
pub use scanner::{RegionScanner, ScanStatistics};
