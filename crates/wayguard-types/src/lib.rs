use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One decoded distance reading at a pixel coordinate.
///
/// A `distance_mm` of `0` means the sensor had no confidence in the pixel; it
/// is never a real distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthSample {
    pub x: u32,
    pub y: u32,
    pub distance_mm: u16,
}

impl DepthSample {
    /// `true` when the reading carries a real distance.
    pub fn is_valid(&self) -> bool {
        self.distance_mm > 0
    }
}

/// A depth frame resource handed to the engine for exactly one scan.
///
/// Platform drivers wrap their hardware-backed image in a type implementing
/// this trait and release the underlying buffer in `Drop`.  The scanner takes
/// the frame by value, so the buffer is released as soon as the scan returns
/// or unwinds.
pub trait DepthImage {
    /// Frame width in pixels.
    fn width(&self) -> u32;
    /// Frame height in pixels.
    fn height(&self) -> u32;
    /// Bytes between the starts of two consecutive rows.
    fn row_stride(&self) -> usize;
    /// Bytes between two horizontally adjacent pixels.
    fn pixel_stride(&self) -> usize;
    /// Raw plane bytes.
    fn data(&self) -> &[u8];

    /// Decode the little-endian 16-bit distance stored at `(x, y)`.
    ///
    /// Returns `None` when the pixel lies outside the frame or its two bytes
    /// are not fully contained in [`data`][Self::data].
    fn sample(&self, x: u32, y: u32) -> Option<DepthSample> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let offset = (y as usize)
            .checked_mul(self.row_stride())?
            .checked_add((x as usize).checked_mul(self.pixel_stride())?)?;
        let bytes = self.data().get(offset..offset.checked_add(2)?)?;
        Some(DepthSample {
            x,
            y,
            distance_mm: u16::from_le_bytes([bytes[0], bytes[1]]),
        })
    }
}

/// An owned, heap-backed depth frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub row_stride: usize,
    pub pixel_stride: usize,
    pub data: Vec<u8>,
}

impl DepthFrame {
    /// Pack a row-major grid of millimetre readings into a tightly strided
    /// frame (pixel stride 2, row stride `width * 2`).
    ///
    /// Missing trailing readings are stored as `0` (invalid).
    pub fn from_millimetres(width: u32, height: u32, readings: &[u16]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * 2);
        for i in 0..count {
            let mm = readings.get(i).copied().unwrap_or(0);
            data.extend_from_slice(&mm.to_le_bytes());
        }
        Self {
            width,
            height,
            row_stride: width as usize * 2,
            pixel_stride: 2,
            data,
        }
    }
}

impl DepthImage for DepthFrame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn row_stride(&self) -> usize {
        self.row_stride
    }

    fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A camera image forwarded to the object labeler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    /// Clockwise rotation (degrees) needed to bring the image upright.
    pub rotation_degrees: u16,
    /// Raw pixel data (e.g. RGB24 or YUV420).
    pub pixels: Vec<u8>,
}

/// The discriminant of a [`HazardState`], used to configure priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    ObstacleClose,
    TiltTooHigh,
    Staircase,
    DeepDropOff,
    TiltTooLow,
}

/// The single classified outcome of one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "hazard", content = "label", rename_all = "snake_case")]
pub enum HazardState {
    Clear,
    /// Something is within collision range; the label names it when known.
    ObstacleClose(Option<String>),
    /// The device is held too level (or upward) to see the path.
    TiltTooHigh,
    /// The device points too steeply at the user's feet.
    TiltTooLow,
    Staircase,
    DeepDropOff,
}

impl HazardState {
    /// The configuration discriminant, or `None` for [`HazardState::Clear`].
    pub fn kind(&self) -> Option<HazardKind> {
        match self {
            HazardState::Clear => None,
            HazardState::ObstacleClose(_) => Some(HazardKind::ObstacleClose),
            HazardState::TiltTooHigh => Some(HazardKind::TiltTooHigh),
            HazardState::TiltTooLow => Some(HazardKind::TiltTooLow),
            HazardState::Staircase => Some(HazardKind::Staircase),
            HazardState::DeepDropOff => Some(HazardKind::DeepDropOff),
        }
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, HazardState::Clear)
    }
}

/// Which object-labeler implementation is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    /// Generic multi-label image classifier.
    #[default]
    Classifier,
    /// Single-shot object detector.
    Detector,
}

impl ClassifierBackend {
    /// The backend to fall back to when this one cannot be initialised.
    pub fn other(self) -> Self {
        match self {
            ClassifierBackend::Classifier => ClassifierBackend::Detector,
            ClassifierBackend::Detector => ClassifierBackend::Classifier,
        }
    }
}

impl std::fmt::Display for ClassifierBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierBackend::Classifier => write!(f, "classifier"),
            ClassifierBackend::Detector => write!(f, "detector"),
        }
    }
}

impl std::str::FromStr for ClassifierBackend {
    type Err = WayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classifier" | "mlkit" => Ok(ClassifierBackend::Classifier),
            "detector" | "yolo" => Ok(ClassifierBackend::Detector),
            other => Err(WayError::Config(format!("unknown classifier backend '{other}'"))),
        }
    }
}

/// A labeler result: what the obstacle probably is, and how sure the model is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub text: String,
    /// Model confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Label {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Error type shared by every Wayguard crate.
///
/// None of these are fatal: the frame loop degrades each one to "no alert this
/// frame" or "no label".
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WayError {
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Labeler Error: {0}")]
    Labeler(String),

    #[error("Labeler init failed for {backend}: {details}")]
    LabelerInit {
        backend: ClassifierBackend,
        details: String,
    },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Alert sink fault on {channel}: {details}")]
    Sink { channel: String, details: String },

    #[error("Persistence Error: {0}")]
    Persistence(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_decodes_little_endian() {
        let frame = DepthFrame::from_millimetres(2, 1, &[0x0102, 4000]);
        assert_eq!(frame.data[0], 0x02);
        assert_eq!(frame.data[1], 0x01);
        assert_eq!(frame.sample(0, 0).map(|s| s.distance_mm), Some(0x0102));
        assert_eq!(frame.sample(1, 0).map(|s| s.distance_mm), Some(4000));
    }

    #[test]
    fn sample_out_of_frame_is_none() {
        let frame = DepthFrame::from_millimetres(2, 2, &[1, 2, 3, 4]);
        assert!(frame.sample(2, 0).is_none());
        assert!(frame.sample(0, 2).is_none());
    }

    #[test]
    fn sample_respects_strides() {
        // 2×2 frame with 4-byte pixels and 10-byte rows (padding at the end).
        let mut data = vec![0u8; 20];
        data[10 + 4..10 + 6].copy_from_slice(&777u16.to_le_bytes());
        let frame = DepthFrame {
            width: 2,
            height: 2,
            row_stride: 10,
            pixel_stride: 4,
            data,
        };
        assert_eq!(frame.sample(1, 1).map(|s| s.distance_mm), Some(777));
        assert_eq!(frame.sample(0, 1).map(|s| s.distance_mm), Some(0));
    }

    #[test]
    fn sample_truncated_buffer_is_none() {
        let frame = DepthFrame {
            width: 4,
            height: 4,
            row_stride: 8,
            pixel_stride: 2,
            data: vec![0u8; 10],
        };
        assert!(frame.sample(0, 1).is_some());
        assert!(frame.sample(1, 1).is_none());
        assert!(frame.sample(3, 3).is_none());
    }

    #[test]
    fn zero_distance_is_invalid() {
        let s = DepthSample {
            x: 0,
            y: 0,
            distance_mm: 0,
        };
        assert!(!s.is_valid());
    }

    #[test]
    fn hazard_state_serialization_roundtrip() {
        let state = HazardState::ObstacleClose(Some("chair".to_string()));
        let json = serde_json::to_string(&state).unwrap();
        let back: HazardState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);

        let clear: HazardState = serde_json::from_str(r#"{"hazard":"clear"}"#).unwrap();
        assert!(clear.is_clear());
    }

    #[test]
    fn hazard_kind_mapping() {
        assert_eq!(HazardState::Clear.kind(), None);
        assert_eq!(
            HazardState::ObstacleClose(None).kind(),
            Some(HazardKind::ObstacleClose)
        );
        assert_eq!(HazardState::Staircase.kind(), Some(HazardKind::Staircase));
    }

    #[test]
    fn backend_parse_and_fallback() {
        assert_eq!(
            "detector".parse::<ClassifierBackend>().unwrap(),
            ClassifierBackend::Detector
        );
        assert_eq!(
            "YOLO".parse::<ClassifierBackend>().unwrap(),
            ClassifierBackend::Detector
        );
        assert!("tesseract".parse::<ClassifierBackend>().is_err());
        assert_eq!(
            ClassifierBackend::Classifier.other(),
            ClassifierBackend::Detector
        );
    }

    #[test]
    fn way_error_display() {
        let err = WayError::LabelerInit {
            backend: ClassifierBackend::Detector,
            details: "model missing".to_string(),
        };
        assert!(err.to_string().contains("detector"));
        assert!(err.to_string().contains("model missing"));
    }
}
