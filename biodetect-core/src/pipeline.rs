//! ONNX Runtime backed estimators.
//!
//! Expects MediaPipe's networks exported to ONNX in a single directory:
//!
//! - `face_detection_short_range.onnx` (BlazeFace)
//! - `face_landmarks_detector.onnx` (face mesh with iris, 478 landmarks)
//! - `palm_detection_full.onnx`
//! - `hand_landmark_full.onnx`
//! - `pose_landmark_full.onnx`

use anyhow::Result;
use std::path::PathBuf;
use tracing::{Level, info, span};

use crate::estimate::Estimators;
use crate::landmark::NormalizedLandmark;
use crate::shapes::rect::Rect;
use detection::BlazeFace;
use face_mesh::FaceMeshLandmarker;
use hands::HandLandmarker;
use model::ModelSpec;
use pose::PoseLandmarker;

pub mod anchors;
pub mod detection;
pub mod face_mesh;
pub mod hands;
pub mod model;
pub mod pose;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub models_dir: PathBuf,
    /// Intra-op threads per model
    pub threads: usize,
    pub min_detection_confidence: f32,
    pub max_hands: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            models_dir: PathBuf::from("models"),
            threads: 1,
            min_detection_confidence: 0.5,
            max_hands: 2,
        }
    }
}

pub fn load_estimators(config: &PipelineConfig) -> Result<Estimators> {
    let span = span!(Level::INFO, "load_estimators");
    let _guard = span.enter();

    model::init_runtime()?;

    let dir = config.models_dir.as_path();
    let min_score = config.min_detection_confidence;
    let threads = config.threads;

    let estimators = Estimators {
        pose: Box::new(PoseLandmarker::new(dir, threads, min_score)?),
        hands: Box::new(HandLandmarker::new(
            dir,
            threads,
            min_score,
            config.max_hands,
        )?),
        face_mesh: Box::new(FaceMeshLandmarker::new(dir, threads, min_score)?),
        faces: Box::new(BlazeFace::new(dir, threads, min_score)?),
    };

    info!("Loaded models from {dir:?}");
    Ok(estimators)
}

/// Maps `[x, y, z]` triples, in model input pixels of a crop, back to
/// relative coordinates of the full image. Depth is scaled like x.
fn extract_landmarks(
    r: &[f32],
    spec: &ModelSpec,
    crop: Rect,
    img_width: u32,
    img_height: u32,
) -> Vec<NormalizedLandmark> {
    let x_scale = crop.w as f32 / spec.width as f32;
    let y_scale = crop.h as f32 / spec.height as f32;
    let x_offset = crop.left() as f32;
    let y_offset = crop.top() as f32;

    r.chunks_exact(3)
        .map(|p| {
            NormalizedLandmark::new(
                (x_offset + p[0] * x_scale) / img_width as f32,
                (y_offset + p[1] * y_scale) / img_height as f32,
                p[2] * x_scale / img_width as f32,
            )
        })
        .collect()
}
