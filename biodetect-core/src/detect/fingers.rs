use anyhow::Result;
use image::RgbImage;
use serde::Serialize;

use crate::estimate::HandEstimator;
use crate::landmark::IndexedLandmark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    NoHandsDetected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hand {
    pub label: &'static str,
    pub landmarks: Vec<IndexedLandmark>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandsReport {
    pub status: Status,
    pub hands: Vec<Hand>,
}

pub fn detect(hands: &mut dyn HandEstimator, img: &RgbImage) -> Result<HandsReport> {
    let estimates = hands.estimate(img)?;
    if estimates.is_empty() {
        return Ok(HandsReport {
            status: Status::NoHandsDetected,
            hands: vec![],
        });
    }

    let hands = estimates
        .into_iter()
        .map(|hand| Hand {
            label: hand.handedness.label(),
            landmarks: hand
                .landmarks
                .iter()
                .enumerate()
                .map(|(i, lm)| IndexedLandmark::new(i, lm.to_pixels(img.width(), img.height())))
                .collect(),
        })
        .collect();

    Ok(HandsReport {
        status: Status::Success,
        hands,
    })
}
