use anyhow::{Result, anyhow};
use image::RgbImage;
use serde::Serialize;

use crate::estimate::PoseEstimator;
use crate::landmark::NamedLandmark;

/// Pose indices of the shoulder, elbow and wrist of each arm.
pub const ARM_LANDMARKS: [(usize, &str); 6] = [
    (11, "left_shoulder"),
    (13, "left_elbow"),
    (15, "left_wrist"),
    (12, "right_shoulder"),
    (14, "right_elbow"),
    (16, "right_wrist"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    NoPoseDetected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmReport {
    pub status: Status,
    pub landmarks: Vec<NamedLandmark>,
}

pub fn detect(pose: &mut dyn PoseEstimator, img: &RgbImage) -> Result<ArmReport> {
    let Some(landmarks) = pose.estimate(img)? else {
        return Ok(ArmReport {
            status: Status::NoPoseDetected,
            landmarks: vec![],
        });
    };

    let landmarks = ARM_LANDMARKS
        .iter()
        .map(|&(idx, name)| {
            let lm = landmarks
                .get(idx)
                .ok_or_else(|| anyhow!("pose has {} landmarks, {name} is {idx}", landmarks.len()))?;
            Ok(NamedLandmark::new(name, lm.to_pixels(img.width(), img.height())))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ArmReport {
        status: Status::Success,
        landmarks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::tests::Canned;
    use crate::landmark::NormalizedLandmark;

    #[test]
    fn test_arm_landmarks_in_order() {
        let pose = (0..33)
            .map(|i| NormalizedLandmark::new(i as f32 / 32., 0.5, -0.1))
            .collect();
        let mut canned = Canned::default();
        canned.poses.push_back(Some(pose));

        let report = detect(&mut canned, &RgbImage::new(64, 100)).unwrap();

        assert_eq!(report.status, Status::Success);
        let names: Vec<_> = report.landmarks.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "left_shoulder",
                "left_elbow",
                "left_wrist",
                "right_shoulder",
                "right_elbow",
                "right_wrist"
            ]
        );
        assert_eq!(report.landmarks[0], NamedLandmark {
            name: "left_shoulder".to_string(),
            x: 22.,
            y: 50.,
            z: -0.1f32 as f64,
        });
        assert_eq!(report.landmarks[3].x, 24.);
    }

    #[test]
    fn test_arm_no_pose() {
        let report = detect(&mut Canned::default(), &RgbImage::new(10, 10)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "no_pose_detected", "landmarks": []})
        );
    }

    #[test]
    fn test_arm_short_pose_is_error() {
        let mut canned = Canned::default();
        canned
            .poses
            .push_back(Some(vec![NormalizedLandmark::default(); 12]));
        assert!(detect(&mut canned, &RgbImage::new(10, 10)).is_err());
    }
}
