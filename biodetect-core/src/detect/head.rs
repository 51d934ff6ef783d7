use anyhow::Result;
use image::RgbImage;
use serde::Serialize;

use crate::estimate::FaceDetector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    NoFacesDetected,
}

/// Face bounds in pixels, truncated toward zero. The box may start left of or
/// above the image when the face is cut off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceBox {
    pub xmin: i32,
    pub ymin: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadReport {
    pub status: Status,
    pub faces: Vec<FaceBox>,
}

pub fn detect(faces: &mut dyn FaceDetector, img: &RgbImage) -> Result<HeadReport> {
    let detections = faces.detect(img)?;
    if detections.is_empty() {
        return Ok(HeadReport {
            status: Status::NoFacesDetected,
            faces: vec![],
        });
    }

    let w = img.width() as f32;
    let h = img.height() as f32;
    let faces = detections
        .iter()
        .map(|d| FaceBox {
            xmin: (d.bounds.left() * w) as i32,
            ymin: (d.bounds.top() * h) as i32,
            width: (d.bounds.w * w) as i32,
            height: (d.bounds.h * h) as i32,
            confidence: d.score,
        })
        .collect();

    Ok(HeadReport {
        status: Status::Success,
        faces,
    })
}
