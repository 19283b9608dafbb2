//! Device pose and forward-looking tilt.
//!
//! Spatial-sensing sessions report the camera pose either as a 4×4
//! column-major transform or as a translation plus unit quaternion.  The
//! third column of the rotation is the camera's local *backward* axis
//! (OpenGL convention: the camera looks down −Z), so the vertical component of
//! the forward vector is `-m[9]`.
//!
//! That component is a cosine-like pitch indicator in `[-1, 1]`: `0` when the
//! camera looks at the horizon, `-1` when it points straight at the floor.
//!
//! # Example
//!
//! ```rust
//! use wayguard_perception::pose::{Pose, PoseAngleEstimator, Quaternion};
//!
//! // Phone pitched 30° toward the floor.
//! let pose = Pose::new([0.0; 3], Quaternion::from_pitch(-30f32.to_radians()));
//! let tilt = PoseAngleEstimator::tilt(&pose.to_matrix());
//! assert!((tilt.value() + 0.5).abs() < 1e-5);
//! ```

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// Camera orientation as a unit quaternion, scalar part `w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    /// Components in the `(x, y, z, w)` order sensing sessions report them.
    /// Not normalised.
    pub fn from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn identity() -> Self {
        Self::from_xyzw(0.0, 0.0, 0.0, 1.0)
    }

    /// Pitch of `angle_rad` about the camera's X axis.  Negative angles look
    /// toward the floor.
    pub fn from_pitch(angle_rad: f32) -> Self {
        let (sin, cos) = (angle_rad * 0.5).sin_cos();
        Self::from_xyzw(sin, 0.0, 0.0, cos)
    }
}

/// Camera pose in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Metres, world frame.
    pub translation: [f32; 3],
    pub rotation: Quaternion,
}

impl Pose {
    pub fn new(translation: [f32; 3], rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Column-major 4×4 transform, as delivered by the sensing session.
    pub fn to_matrix(&self) -> [f32; 16] {
        let Quaternion { x, y, z, w } = self.rotation;
        let [tx, ty, tz] = self.translation;
        [
            // column 0
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y + w * z),
            2.0 * (x * z - w * y),
            0.0,
            // column 1
            2.0 * (x * y - w * z),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z + w * x),
            0.0,
            // column 2 (backward axis)
            2.0 * (x * z + w * y),
            2.0 * (y * z - w * x),
            1.0 - 2.0 * (x * x + y * y),
            0.0,
            // column 3
            tx,
            ty,
            tz,
            1.0,
        ]
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tilt
// ────────────────────────────────────────────────────────────────────────────

/// Vertical component of the camera's forward vector.  No memory between
/// frames; recompute it from every pose.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TiltAngle(f32);

impl TiltAngle {
    pub fn new(value: f32) -> Self {
        Self(value)
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

/// Derives [`TiltAngle`] from a pose matrix.
pub struct PoseAngleEstimator;

impl PoseAngleEstimator {
    /// Index of the backward axis' Y component in a column-major matrix.
    const BACKWARD_Y: usize = 9;

    /// Forward-looking tilt of a column-major 4×4 pose.
    pub fn tilt(pose: &[f32; 16]) -> TiltAngle {
        TiltAngle(-pose[Self::BACKWARD_Y])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, FRAC_PI_6};

    fn tilt_at(pitch_rad: f32) -> f32 {
        let pose = Pose::new([0.0; 3], Quaternion::from_pitch(pitch_rad));
        PoseAngleEstimator::tilt(&pose.to_matrix()).value()
    }

    #[test]
    fn level_camera_has_zero_tilt() {
        assert!(tilt_at(0.0).abs() < 1e-6);
        let level = Pose::new([0.0; 3], Quaternion::identity()).to_matrix();
        assert_eq!(PoseAngleEstimator::tilt(&level).value(), 0.0);
    }

    #[test]
    fn pitching_down_goes_negative() {
        // 45° down → forward.y = -sin 45°
        assert!((tilt_at(-FRAC_PI_4) + FRAC_PI_4.sin()).abs() < 1e-5);
        // straight down
        assert!((tilt_at(-FRAC_PI_2) + 1.0).abs() < 1e-5);
    }

    #[test]
    fn pitching_up_goes_positive() {
        assert!((tilt_at(FRAC_PI_6) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn yaw_does_not_change_tilt() {
        // Turning on the spot (rotation about world Y) keeps the view level.
        let (sin, cos) = (FRAC_PI_4 * 0.5).sin_cos();
        let yawed = Pose::new([0.0; 3], Quaternion::from_xyzw(0.0, sin, 0.0, cos));
        assert!(PoseAngleEstimator::tilt(&yawed.to_matrix()).value().abs() < 1e-6);
    }

    #[test]
    fn rotation_columns_are_unit_length() {
        let m = Pose::new([0.0; 3], Quaternion::from_pitch(-0.9)).to_matrix();
        for col in m.chunks(4).take(3) {
            let len = (col[0] * col[0] + col[1] * col[1] + col[2] * col[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn translation_lands_in_last_column() {
        let m = Pose::new([1.0, 2.0, 3.0], Quaternion::identity()).to_matrix();
        assert_eq!(&m[12..16], &[1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn tilt_reads_raw_matrix() {
        let mut m = [0.0f32; 16];
        m[9] = 0.6;
        assert!((PoseAngleEstimator::tilt(&m).value() + 0.6).abs() < f32::EPSILON);
    }
}
