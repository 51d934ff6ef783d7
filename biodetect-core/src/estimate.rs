//! The model capabilities detectors are built on.
//!
//! Implementations return landmarks in relative image coordinates; converting
//! them into pixels is left to the detectors. [`crate::pipeline`] provides
//! ONNX Runtime backed implementations.

use crate::landmark::NormalizedLandmark;
use crate::shapes::rect::RectF32;
use anyhow::Result;
use image::RgbImage;

pub const POSE_LANDMARKS: usize = 33;
pub const HAND_LANDMARKS: usize = 21;
/// 468 mesh points followed by 5 iris points per eye.
pub const FACE_MESH_LANDMARKS: usize = 478;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandEstimate {
    pub handedness: Handedness,
    pub landmarks: Vec<NormalizedLandmark>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    pub bounds: RectF32,
    pub score: f32,
}

pub trait PoseEstimator {
    /// Body landmarks of the most prominent person, if any.
    fn estimate(&mut self, img: &RgbImage) -> Result<Option<Vec<NormalizedLandmark>>>;
}

pub trait HandEstimator {
    fn estimate(&mut self, img: &RgbImage) -> Result<Vec<HandEstimate>>;
}

pub trait FaceMeshEstimator {
    /// Mesh and iris landmarks of a single face, if any.
    fn estimate(&mut self, img: &RgbImage) -> Result<Option<Vec<NormalizedLandmark>>>;
}

pub trait FaceDetector {
    fn detect(&mut self, img: &RgbImage) -> Result<Vec<FaceDetection>>;
}

/// One of each capability, as used by the detectors.
pub struct Estimators {
    pub pose: Box<dyn PoseEstimator + Send>,
    pub hands: Box<dyn HandEstimator + Send>,
    pub face_mesh: Box<dyn FaceMeshEstimator + Send>,
    pub faces: Box<dyn FaceDetector + Send>,
}
