use super::detection::BlazeFace;
use super::extract_landmarks;
use super::model::{Layout, Model, ModelSpec, OutputRange, check_outputs, sigmoid};
use crate::estimate::{FACE_MESH_LANDMARKS, FaceDetector, FaceMeshEstimator};
use crate::landmark::NormalizedLandmark;
use anyhow::Result;
use image::{RgbImage, imageops};
use std::path::Path;
use tracing::{Level, debug, span};

/// Face mesh network with refined eye regions: 468 mesh points plus 5 iris
/// points per eye, in input pixels.
pub const FACE_LANDMARK_MODEL: ModelSpec = ModelSpec {
    file: "face_landmarks_detector.onnx",
    width: 256,
    height: 256,
    layout: Layout::Nhwc,
    range: OutputRange::ZeroToOne,
};

// pad 25% on each side
const FACE_PADDING: f32 = 1.5;

pub struct FaceMeshLandmarker {
    detector: BlazeFace,
    model: Model,
    min_score: f32,
}

impl FaceMeshLandmarker {
    pub fn new(models_dir: &Path, threads: usize, min_score: f32) -> Result<FaceMeshLandmarker> {
        Ok(FaceMeshLandmarker {
            detector: BlazeFace::new(models_dir, threads, min_score)?,
            model: Model::load(models_dir, FACE_LANDMARK_MODEL, threads)?,
            min_score,
        })
    }
}

impl FaceMeshEstimator for FaceMeshLandmarker {
    fn estimate(&mut self, img: &RgbImage) -> Result<Option<Vec<NormalizedLandmark>>> {
        let span = span!(Level::DEBUG, "face_landmarker");
        let _guard = span.enter();

        // Faces come back best first, and only one face is meshed
        let Some(face) = self.detector.detect(img)?.into_iter().next() else {
            return Ok(None);
        };

        let mut bounds = face.bounds;
        bounds.scale(FACE_PADDING);
        bounds.square(img.width(), img.height());
        let Some(crop) = bounds.to_pixels(img.width(), img.height()) else {
            return Ok(None);
        };

        let face_img = imageops::crop_imm(img, crop.left(), crop.top(), crop.w, crop.h).to_image();
        let outputs = self.model.run(&face_img)?;
        check_outputs(
            &outputs,
            FACE_LANDMARK_MODEL.file,
            &[FACE_MESH_LANDMARKS * 3, 1],
        )?;

        let face_flag = sigmoid(outputs[1][0]);
        debug!("Face flag: {face_flag}");
        if face_flag < self.min_score {
            return Ok(None);
        }

        Ok(Some(extract_landmarks(
            &outputs[0][..FACE_MESH_LANDMARKS * 3],
            &FACE_LANDMARK_MODEL,
            crop,
            img.width(),
            img.height(),
        )))
    }
}
