use super::anchors;
use super::detection::{Detection, PALM_DETECTION_MODEL, SsdDetector};
use super::extract_landmarks;
use super::model::{Layout, Model, ModelSpec, OutputRange, check_outputs};
use crate::estimate::{HAND_LANDMARKS, HandEstimate, HandEstimator, Handedness};
use crate::shapes::rect::RectF32;
use anyhow::Result;
use image::{RgbImage, imageops};
use std::path::Path;
use tracing::{Level, span, trace};

pub const HAND_LANDMARK_MODEL: ModelSpec = ModelSpec {
    file: "hand_landmark_full.onnx",
    width: 224,
    height: 224,
    layout: Layout::Nhwc,
    range: OutputRange::ZeroToOne,
};

const PALM_KEYPOINTS: usize = 7;
const WRIST: usize = 0;
const MIDDLE_FINGER_MCP: usize = 2;

// A palm box only covers the palm: move it toward the fingers and grow it to
// fit the whole hand.
const PALM_SHIFT: f32 = 0.5;
const PALM_SCALE: f32 = 2.6;

pub struct HandLandmarker {
    palm_detector: SsdDetector,
    model: Model,
    max_hands: usize,
    min_score: f32,
}

impl HandLandmarker {
    pub fn new(
        models_dir: &Path,
        threads: usize,
        min_score: f32,
        max_hands: usize,
    ) -> Result<HandLandmarker> {
        let palm_model = Model::load(models_dir, PALM_DETECTION_MODEL, threads)?;
        Ok(HandLandmarker {
            palm_detector: SsdDetector::new(palm_model, &anchors::PALM, PALM_KEYPOINTS, min_score),
            model: Model::load(models_dir, HAND_LANDMARK_MODEL, threads)?,
            max_hands,
            min_score,
        })
    }

    fn landmark_hand(&self, img: &RgbImage, palm: &Detection) -> Result<Option<HandEstimate>> {
        let bounds = hand_bounds(palm, img.width(), img.height());
        let Some(crop) = bounds.to_pixels(img.width(), img.height()) else {
            return Ok(None);
        };

        let hand_img = imageops::crop_imm(img, crop.left(), crop.top(), crop.w, crop.h).to_image();
        let outputs = self.model.run(&hand_img)?;
        check_outputs(&outputs, HAND_LANDMARK_MODEL.file, &[HAND_LANDMARKS * 3, 1, 1])?;

        // presence and handedness come out of the model already squashed
        let presence = outputs[1][0];
        trace!("Hand presence: {presence}");
        if presence < self.min_score {
            return Ok(None);
        }

        let handedness = if outputs[2][0] > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        };

        Ok(Some(HandEstimate {
            handedness,
            landmarks: extract_landmarks(
                &outputs[0][..HAND_LANDMARKS * 3],
                &HAND_LANDMARK_MODEL,
                crop,
                img.width(),
                img.height(),
            ),
        }))
    }
}

impl HandEstimator for HandLandmarker {
    fn estimate(&mut self, img: &RgbImage) -> Result<Vec<HandEstimate>> {
        let span = span!(Level::DEBUG, "hand_landmarker");
        let _guard = span.enter();

        let palms = self.palm_detector.run(img)?;
        trace!("Detected {} palms", palms.len());

        let mut hands = Vec::new();
        for palm in palms.iter().take(self.max_hands) {
            if let Some(hand) = self.landmark_hand(img, palm)? {
                hands.push(hand);
            }
        }

        Ok(hands)
    }
}

/// Region the hand landmark model runs on, derived from a palm detection.
fn hand_bounds(palm: &Detection, img_width: u32, img_height: u32) -> RectF32 {
    let mut bounds = palm.bounds;

    let wrist = palm.keypoints[WRIST];
    let middle = palm.keypoints[MIDDLE_FINGER_MCP];
    let dx = (middle.x - wrist.x) * img_width as f32;
    let dy = (middle.y - wrist.y) * img_height as f32;
    let len = dx.hypot(dy);

    if len > 0. {
        let shift_px = PALM_SHIFT * bounds.h * img_height as f32;
        bounds.shift(
            dx / len * shift_px / img_width as f32,
            dy / len * shift_px / img_height as f32,
        );
    }

    bounds.square(img_width, img_height);
    bounds.scale(PALM_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::point::PointF32;

    #[test]
    fn test_hand_bounds_follow_fingers() {
        let mut keypoints = vec![PointF32::new(0.5, 0.5); PALM_KEYPOINTS];
        keypoints[WRIST] = PointF32::new(0.5, 0.6);
        keypoints[MIDDLE_FINGER_MCP] = PointF32::new(0.5, 0.4);

        let palm = Detection {
            bounds: RectF32::from_center(0.5, 0.5, 0.1, 0.1),
            keypoints,
            score: 0.9,
        };

        let bounds = hand_bounds(&palm, 100, 100);

        // moved up by half the palm height, then grown
        assert!((bounds.x - 0.5).abs() < 1e-6);
        assert!((bounds.y - 0.45).abs() < 1e-6);
        assert!((bounds.w - 0.26).abs() < 1e-6);
        assert!((bounds.h - 0.26).abs() < 1e-6);
    }
}
