//! Single-shot detector backend.
//!
//! The model emits one raw tensor of shape `[4 + C, anchors]`: rows 0–3 hold
//! the box centre and size for every anchor, rows `4..4 + C` hold per-class
//! scores.  Decoding keeps each anchor's best class when it clears the score
//! threshold, suppresses overlapping boxes of the same class and reports the
//! strongest survivor whose class has a name.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wayguard_types::{ClassifierBackend, ColorImage, Label, WayError};

use crate::ObjectLabeler;

/// Number of leading box rows in the output tensor.
const BOX_ROWS: usize = 4;

/// The 80 COCO class names in model output order.
pub const COCO_CLASS_NAMES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

// ────────────────────────────────────────────────────────────────────────────
// Tensor and boxes
// ────────────────────────────────────────────────────────────────────────────

/// Raw detector output, row-major: `data[row * anchors + anchor]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorOutput {
    pub rows: usize,
    pub anchors: usize,
    pub data: Vec<f32>,
}

impl DetectorOutput {
    fn at(&self, row: usize, anchor: usize) -> f32 {
        self.data[row * self.anchors + anchor]
    }
}

/// Axis-aligned box in centre/size form, in model input coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    /// Intersection over union; `0.0` for disjoint or empty boxes.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let (ax0, ax1) = (self.cx - self.w / 2.0, self.cx + self.w / 2.0);
        let (ay0, ay1) = (self.cy - self.h / 2.0, self.cy + self.h / 2.0);
        let (bx0, bx1) = (other.cx - other.w / 2.0, other.cx + other.w / 2.0);
        let (by0, by1) = (other.cy - other.h / 2.0, other.cy + other.h / 2.0);
        let iw = (ax1.min(bx1) - ax0.max(bx0)).max(0.0);
        let ih = (ay1.min(by1) - ay0.max(by0)).max(0.0);
        let inter = iw * ih;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// One decoded detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_index: usize,
    pub score: f32,
    pub bbox: BoundingBox,
}

/// Decoding thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorTuning {
    /// Minimum best-class score for an anchor to count (exclusive).
    pub score_threshold: f32,
    /// Same-class boxes overlapping more than this are suppressed.
    pub iou_threshold: f32,
}

impl Default for DetectorTuning {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            iou_threshold: 0.45,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Decoding
// ────────────────────────────────────────────────────────────────────────────

/// Per-anchor best class above `score_threshold`.
///
/// # Errors
///
/// Returns [`WayError::Labeler`] when the tensor has no class rows or its
/// buffer does not match `rows × anchors`.
pub fn decode(output: &DetectorOutput, score_threshold: f32) -> Result<Vec<Detection>, WayError> {
    if output.rows <= BOX_ROWS {
        return Err(WayError::Labeler(format!(
            "detector output has {} rows, expected more than {BOX_ROWS}",
            output.rows
        )));
    }
    let expected = output
        .rows
        .checked_mul(output.anchors)
        .ok_or_else(|| WayError::Labeler("detector output shape overflows".to_string()))?;
    if output.data.len() != expected {
        return Err(WayError::Labeler(format!(
            "detector output holds {} values, shape needs {expected}",
            output.data.len()
        )));
    }

    let mut detections = Vec::new();
    for anchor in 0..output.anchors {
        let mut best: Option<(usize, f32)> = None;
        for row in BOX_ROWS..output.rows {
            let score = output.at(row, anchor);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((row - BOX_ROWS, score));
            }
        }
        let Some((class_index, score)) = best else { continue };
        if score > score_threshold {
            detections.push(Detection {
                class_index,
                score,
                bbox: BoundingBox {
                    cx: output.at(0, anchor),
                    cy: output.at(1, anchor),
                    w: output.at(2, anchor),
                    h: output.at(3, anchor),
                },
            });
        }
    }
    Ok(detections)
}

/// Class-wise greedy non-max suppression.  Survivors come back strongest
/// first.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        let suppressed = kept
            .iter()
            .any(|k| k.class_index == det.class_index && k.bbox.iou(&det.bbox) > iou_threshold);
        if !suppressed {
            kept.push(det);
        }
    }
    kept
}

// ────────────────────────────────────────────────────────────────────────────
// Backend
// ────────────────────────────────────────────────────────────────────────────

/// A synchronous detector model producing one raw output tensor.
pub trait DetectorModel: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns [`WayError::Labeler`] when inference fails.
    fn infer(&self, image: &ColorImage) -> Result<DetectorOutput, WayError>;
}

/// [`ObjectLabeler`] over a [`DetectorModel`].
pub struct SingleShotDetector<M> {
    model: Arc<M>,
    class_names: Arc<[String]>,
    tuning: DetectorTuning,
}

impl<M: DetectorModel> SingleShotDetector<M> {
    pub fn new(model: M, class_names: Vec<String>, tuning: DetectorTuning) -> Self {
        Self {
            model: Arc::new(model),
            class_names: class_names.into(),
            tuning,
        }
    }

    /// Detector labelled with [`COCO_CLASS_NAMES`] and default thresholds.
    pub fn coco(model: M) -> Self {
        Self::new(
            model,
            COCO_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            DetectorTuning::default(),
        )
    }

    fn strongest(&self, output: &DetectorOutput) -> Result<Option<Label>, WayError> {
        let detections = decode(output, self.tuning.score_threshold)?;
        let kept = non_max_suppression(detections, self.tuning.iou_threshold);
        debug!(survivors = kept.len(), "detector finished");
        Ok(kept.into_iter().find_map(|d| {
            self.class_names
                .get(d.class_index)
                .map(|name| Label::new(name.clone(), d.score))
        }))
    }
}

#[async_trait]
impl<M: DetectorModel> ObjectLabeler for SingleShotDetector<M> {
    fn backend(&self) -> ClassifierBackend {
        ClassifierBackend::Detector
    }

    async fn identify(&self, image: ColorImage) -> Result<Option<Label>, WayError> {
        let model = Arc::clone(&self.model);
        let output = tokio::task::spawn_blocking(move || model.infer(&image))
            .await
            .map_err(|e| WayError::Labeler(format!("detector task failed: {e}")))??;
        self.strongest(&output)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a `[4 + classes, n]` tensor from `(class, score, box)` anchors.
    fn tensor(classes: usize, anchors: &[(usize, f32, BoundingBox)]) -> DetectorOutput {
        let rows = BOX_ROWS + classes;
        let n = anchors.len();
        let mut data = vec![0.0; rows * n];
        for (i, (class, score, b)) in anchors.iter().enumerate() {
            data[i] = b.cx;
            data[n + i] = b.cy;
            data[2 * n + i] = b.w;
            data[3 * n + i] = b.h;
            data[(BOX_ROWS + class) * n + i] = *score;
        }
        DetectorOutput { rows, anchors: n, data }
    }

    fn bx(cx: f32, cy: f32) -> BoundingBox {
        BoundingBox { cx, cy, w: 10.0, h: 10.0 }
    }

    struct Fixed(DetectorOutput);

    impl DetectorModel for Fixed {
        fn infer(&self, _image: &ColorImage) -> Result<DetectorOutput, WayError> {
            Ok(self.0.clone())
        }
    }

    fn image() -> ColorImage {
        ColorImage {
            width: 2,
            height: 2,
            rotation_degrees: 90,
            pixels: vec![0; 12],
        }
    }

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        assert!((bx(0.0, 0.0).iou(&bx(0.0, 0.0)) - 1.0).abs() < 1e-6);
        assert_eq!(bx(0.0, 0.0).iou(&bx(100.0, 100.0)), 0.0);
        // Half-overlap along x: inter 50, union 150.
        assert!((bx(0.0, 0.0).iou(&bx(5.0, 0.0)) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn decode_applies_score_threshold() {
        let out = tensor(3, &[(0, 0.9, bx(1.0, 1.0)), (2, 0.5, bx(2.0, 2.0)), (1, 0.51, bx(3.0, 3.0))]);
        let dets = decode(&out, 0.5).unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_index, 0);
        assert_eq!(dets[1].class_index, 1);
        assert_eq!(dets[1].bbox.cx, 3.0);
    }

    #[test]
    fn decode_rejects_malformed_tensor() {
        let no_classes = DetectorOutput { rows: 4, anchors: 1, data: vec![0.0; 4] };
        assert!(decode(&no_classes, 0.5).is_err());
        let short = DetectorOutput { rows: 6, anchors: 2, data: vec![0.0; 11] };
        assert!(decode(&short, 0.5).is_err());
    }

    #[test]
    fn nms_is_class_wise() {
        let dets = vec![
            Detection { class_index: 0, score: 0.7, bbox: bx(0.0, 0.0) },
            Detection { class_index: 0, score: 0.9, bbox: bx(1.0, 0.0) },
            Detection { class_index: 1, score: 0.8, bbox: bx(0.0, 0.0) },
        ];
        let kept = non_max_suppression(dets, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!(kept[1].class_index, 1);
    }

    #[test]
    fn nms_keeps_distant_boxes_of_same_class() {
        let dets = vec![
            Detection { class_index: 3, score: 0.6, bbox: bx(0.0, 0.0) },
            Detection { class_index: 3, score: 0.7, bbox: bx(50.0, 50.0) },
        ];
        assert_eq!(non_max_suppression(dets, 0.45).len(), 2);
    }

    #[tokio::test]
    async fn reports_strongest_named_detection() {
        // Class 56 is "chair" in the COCO table.
        let out = tensor(80, &[(56, 0.8, bx(1.0, 1.0)), (0, 0.6, bx(40.0, 40.0))]);
        let det = SingleShotDetector::coco(Fixed(out));
        let label = det.identify(image()).await.unwrap().unwrap();
        assert_eq!(label.text, "chair");
        assert!((label.confidence - 0.8).abs() < 1e-6);
        assert_eq!(det.backend(), ClassifierBackend::Detector);
    }

    #[tokio::test]
    async fn unnamed_classes_are_dropped() {
        let out = tensor(3, &[(2, 0.95, bx(1.0, 1.0)), (0, 0.7, bx(30.0, 30.0))]);
        let det = SingleShotDetector::new(Fixed(out), vec!["door".to_string()], DetectorTuning::default());
        let label = det.identify(image()).await.unwrap().unwrap();
        assert_eq!(label.text, "door");
    }

    #[tokio::test]
    async fn nothing_above_threshold_is_none() {
        let out = tensor(2, &[(0, 0.2, bx(1.0, 1.0))]);
        let det = SingleShotDetector::new(Fixed(out), vec!["a".into(), "b".into()], DetectorTuning::default());
        assert_eq!(det.identify(image()).await.unwrap(), None);
    }
}
