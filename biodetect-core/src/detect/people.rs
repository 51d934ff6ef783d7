use anyhow::Result;
use image::RgbImage;
use serde::Serialize;
use tracing::info;

use crate::estimate::PoseEstimator;
use crate::landmark::LandmarkSet;
use crate::presence::PresenceTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    NoPoseDetected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeopleReport {
    pub status: Status,
    /// 1 when the pose belongs to a subject not seen in the previous detection.
    pub count: u32,
    pub landmarks: LandmarkSet,
}

/// Estimates a pose and feeds it to the tracker. Without a pose, or with an
/// empty one, the tracker keeps its state.
pub fn detect(
    pose: &mut dyn PoseEstimator,
    tracker: &mut PresenceTracker,
    img: &RgbImage,
) -> Result<PeopleReport> {
    let Some(landmarks) = pose.estimate(img)?.filter(|l| !l.is_empty()) else {
        return Ok(PeopleReport {
            status: Status::NoPoseDetected,
            count: 0,
            landmarks: LandmarkSet::default(),
        });
    };

    let landmarks = LandmarkSet::from_normalized(&landmarks, img.width(), img.height());
    let is_new = tracker.observe(landmarks.clone())?;
    if is_new {
        info!("New person detected");
    }

    Ok(PeopleReport {
        status: Status::Success,
        count: is_new as u32,
        landmarks,
    })
}
