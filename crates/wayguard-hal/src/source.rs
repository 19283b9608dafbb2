//! Generic `FrameSource` trait for spatial-sensing sessions.

use wayguard_types::{ColorImage, DepthImage, WayError};

/// Everything the engine consumes for one frame.
#[derive(Debug)]
pub struct SensorFrame<D> {
    /// The depth plane.  Consumed (and released) by the scanner.
    pub depth: D,
    /// Column-major 4×4 camera pose.
    pub pose: [f32; 16],
    /// Camera image for the object labeler, when the session provides one.
    pub color: Option<ColorImage>,
}

/// A depth-capable camera session.
///
/// Drivers own the session lifecycle (permissions, pause/resume) and only
/// hand out frames that are ready.
pub trait FrameSource {
    type Depth: DepthImage;

    /// Acquire the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`WayError::ResourceUnavailable`] when no depth frame is ready
    /// this cycle; callers skip the cycle and try again.
    fn next_frame(&mut self) -> Result<SensorFrame<Self::Depth>, WayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayguard_types::DepthFrame;

    struct OneShot(Option<DepthFrame>);

    impl FrameSource for OneShot {
        type Depth = DepthFrame;

        fn next_frame(&mut self) -> Result<SensorFrame<DepthFrame>, WayError> {
            let depth = self
                .0
                .take()
                .ok_or_else(|| WayError::ResourceUnavailable("depth not ready".to_string()))?;
            Ok(SensorFrame {
                depth,
                pose: [0.0; 16],
                color: None,
            })
        }
    }

    #[test]
    fn source_reports_unavailable_after_last_frame() {
        let mut src = OneShot(Some(DepthFrame::from_millimetres(1, 1, &[1000])));
        assert!(src.next_frame().is_ok());
        assert!(matches!(
            src.next_frame(),
            Err(WayError::ResourceUnavailable(_))
        ));
    }
}
