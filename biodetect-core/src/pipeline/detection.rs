use super::anchors::{self, AnchorOptions, gen_anchors};
use super::model::{Layout, Model, ModelSpec, OutputRange, sigmoid};
use crate::estimate::{FaceDetection, FaceDetector};
use crate::shapes::point::PointF32;
use crate::shapes::rect::RectF32;
use anyhow::{Result, bail};
use image::RgbImage;
use std::path::Path;
use tracing::{Level, span, trace};

pub const FACE_DETECTION_MODEL: ModelSpec = ModelSpec {
    file: "face_detection_short_range.onnx",
    width: 128,
    height: 128,
    layout: Layout::Nhwc,
    range: OutputRange::NegOneToOne,
};

pub const PALM_DETECTION_MODEL: ModelSpec = ModelSpec {
    file: "palm_detection_full.onnx",
    width: 192,
    height: 192,
    layout: Layout::Nhwc,
    range: OutputRange::ZeroToOne,
};

// Boxes overlapping more than this (IoU, percent) are considered the same object
const MAX_OVERLAP_PCT: f32 = 30.;
const SCORE_CLIP: f32 = 100.;

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bounds: RectF32,
    pub keypoints: Vec<PointF32>,
    pub score: f32,
}

/// Single-shot detector: one model, one anchor grid.
///
/// Model Output:
/// - `N` confidence logits
/// - `N` rows of `4 + 2 * keypoints` regressor values
///
/// The first 4 regressor values are center offset, width and height of a
/// box relative to the anchor at the same row, in model input pixels. The
/// remaining values are keypoint offsets from the anchor center.
pub struct SsdDetector {
    model: Model,
    anchors: Vec<PointF32>,
    keypoints: usize,
    min_score: f32,
}

impl SsdDetector {
    pub fn new(model: Model, anchors: &AnchorOptions, keypoints: usize, min_score: f32) -> SsdDetector {
        SsdDetector {
            model,
            anchors: gen_anchors(anchors),
            keypoints,
            min_score,
        }
    }

    pub fn run(&self, img: &RgbImage) -> Result<Vec<Detection>> {
        let outputs = self.model.run(img)?;

        let n = self.anchors.len();
        let row = 4 + 2 * self.keypoints;
        let scores = outputs.iter().find(|o| o.len() == n);
        let regressors = outputs.iter().find(|o| o.len() == n * row);

        let (Some(scores), Some(regressors)) = (scores, regressors) else {
            bail!(
                "{}: expected outputs of {} and {} values",
                self.model.spec().file,
                n,
                n * row
            );
        };

        let spec = self.model.spec();
        Ok(decode(
            &self.anchors,
            scores,
            regressors,
            self.keypoints,
            spec.width as f32,
            spec.height as f32,
            self.min_score,
        ))
    }
}

fn decode(
    anchors: &[PointF32],
    scores: &[f32],
    regressors: &[f32],
    keypoints: usize,
    x_scale: f32,
    y_scale: f32,
    min_score: f32,
) -> Vec<Detection> {
    let row = 4 + 2 * keypoints;
    let mut candidates = Vec::new();

    for (i, anchor) in anchors.iter().enumerate() {
        let score = sigmoid(scores[i].clamp(-SCORE_CLIP, SCORE_CLIP));
        if score < min_score {
            continue;
        }

        let raw = &regressors[i * row..(i + 1) * row];
        let bounds = RectF32::from_center(
            raw[0] / x_scale + anchor.x,
            raw[1] / y_scale + anchor.y,
            raw[2] / x_scale,
            raw[3] / y_scale,
        );
        let keypoints = (0..keypoints)
            .map(|k| {
                PointF32::new(
                    raw[4 + 2 * k] / x_scale + anchor.x,
                    raw[5 + 2 * k] / y_scale + anchor.y,
                )
            })
            .collect();

        candidates.push(Detection {
            bounds,
            keypoints,
            score,
        });
    }

    suppress_overlaps(candidates)
}

/// Keeps the best scoring box of every overlapping group.
fn suppress_overlaps(mut candidates: Vec<Detection>) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut results: Vec<Detection> = Vec::new();
    for c in candidates {
        if results
            .iter()
            .all(|d| d.bounds.overlap_pct(&c.bounds) <= MAX_OVERLAP_PCT)
        {
            results.push(c);
        }
    }

    results
}

/// BlazeFace short range wrapper.
pub struct BlazeFace {
    ssd: SsdDetector,
}

impl BlazeFace {
    pub fn new(models_dir: &Path, threads: usize, min_score: f32) -> Result<BlazeFace> {
        let model = Model::load(models_dir, FACE_DETECTION_MODEL, threads)?;
        Ok(BlazeFace {
            ssd: SsdDetector::new(model, &anchors::FACE_SHORT_RANGE, 6, min_score),
        })
    }
}

impl FaceDetector for BlazeFace {
    fn detect(&mut self, img: &RgbImage) -> Result<Vec<FaceDetection>> {
        let span = span!(Level::DEBUG, "face_detector");
        let _guard = span.enter();

        let faces: Vec<FaceDetection> = self
            .ssd
            .run(img)?
            .into_iter()
            .map(|d| FaceDetection {
                bounds: d.bounds,
                score: d.score,
            })
            .collect();

        trace!("Detected {} faces", faces.len());
        Ok(faces)
    }
}
