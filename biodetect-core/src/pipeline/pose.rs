use super::extract_landmarks;
use super::model::{Layout, Model, ModelSpec, OutputRange, check_outputs};
use crate::estimate::{POSE_LANDMARKS, PoseEstimator};
use crate::landmark::NormalizedLandmark;
use crate::shapes::rect::Rect;
use anyhow::Result;
use image::{RgbImage, imageops};
use std::path::Path;
use tracing::{Level, debug, span};

pub const POSE_LANDMARK_MODEL: ModelSpec = ModelSpec {
    file: "pose_landmark_full.onnx",
    width: 256,
    height: 256,
    layout: Layout::Nhwc,
    range: OutputRange::ZeroToOne,
};

// 33 pose landmarks followed by 6 auxiliary ones, each
// [x, y, z, visibility, presence]
const MODEL_LANDMARKS: usize = 39;
const VALUES_PER_LANDMARK: usize = 5;

/// Runs the pose landmark network on the whole frame, padded to a square so
/// the body keeps its proportions.
pub struct PoseLandmarker {
    model: Model,
    min_score: f32,
}

impl PoseLandmarker {
    pub fn new(models_dir: &Path, threads: usize, min_score: f32) -> Result<PoseLandmarker> {
        Ok(PoseLandmarker {
            model: Model::load(models_dir, POSE_LANDMARK_MODEL, threads)?,
            min_score,
        })
    }
}

impl PoseEstimator for PoseLandmarker {
    fn estimate(&mut self, img: &RgbImage) -> Result<Option<Vec<NormalizedLandmark>>> {
        let span = span!(Level::DEBUG, "pose_landmarker");
        let _guard = span.enter();

        let side = img.width().max(img.height());
        let mut square = RgbImage::new(side, side);
        imageops::replace(&mut square, img, 0, 0);

        let outputs = self.model.run(&square)?;
        check_outputs(
            &outputs,
            POSE_LANDMARK_MODEL.file,
            &[MODEL_LANDMARKS * VALUES_PER_LANDMARK, 1],
        )?;

        let pose_flag = outputs[1][0];
        debug!("Pose flag: {pose_flag}");
        if pose_flag < self.min_score {
            return Ok(None);
        }

        let xyz = strip_scores(&outputs[0][..POSE_LANDMARKS * VALUES_PER_LANDMARK]);
        Ok(Some(extract_landmarks(
            &xyz,
            &POSE_LANDMARK_MODEL,
            Rect::from_tl(0, 0, side, side),
            img.width(),
            img.height(),
        )))
    }
}

/// Drops visibility and presence, leaving `[x, y, z]` triples.
fn strip_scores(raw: &[f32]) -> Vec<f32> {
    raw.chunks_exact(VALUES_PER_LANDMARK)
        .flat_map(|lm| lm[..3].iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_scores() {
        let raw = [1., 2., 3., 0.9, 0.8, 4., 5., 6., 0.7, 0.6];
        assert_eq!(strip_scores(&raw), vec![1., 2., 3., 4., 5., 6.]);
    }
}
