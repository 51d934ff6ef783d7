use anyhow::{Result, bail};
use image::RgbImage;
use serde::Serialize;

use crate::estimate::{FACE_MESH_LANDMARKS, FaceMeshEstimator};
use crate::landmark::NamedLandmark;

const IRIS_POINTS: usize = 5;
const LEFT_IRIS: usize = 468;
const RIGHT_IRIS: usize = LEFT_IRIS + IRIS_POINTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    NoFaceDetected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EyesReport {
    pub status: Status,
    pub landmarks: Vec<NamedLandmark>,
}

pub fn detect(face_mesh: &mut dyn FaceMeshEstimator, img: &RgbImage) -> Result<EyesReport> {
    let Some(mesh) = face_mesh.estimate(img)? else {
        return Ok(EyesReport {
            status: Status::NoFaceDetected,
            landmarks: vec![],
        });
    };

    if mesh.len() < FACE_MESH_LANDMARKS {
        bail!(
            "face mesh has {} landmarks, iris needs {FACE_MESH_LANDMARKS}",
            mesh.len()
        );
    }

    let eyes = [("left", LEFT_IRIS), ("right", RIGHT_IRIS)];
    let landmarks = eyes
        .iter()
        .flat_map(|&(side, start)| {
            mesh[start..start + IRIS_POINTS]
                .iter()
                .enumerate()
                .map(move |(i, lm)| {
                    NamedLandmark::new(
                        format!("{side}_iris_{i}"),
                        lm.to_pixels(img.width(), img.height()),
                    )
                })
        })
        .collect();

    Ok(EyesReport {
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
    fn test_iris_landmarks() {
        let mesh = (0..FACE_MESH_LANDMARKS)
            .map(|i| NormalizedLandmark::new(i as f32 / 1024., 0.1, 0.))
            .collect();
        let mut canned = Canned::default();
        canned.meshes.push_back(Some(mesh));

        let report = detect(&mut canned, &RgbImage::new(1024, 10)).unwrap();

        assert_eq!(report.status, Status::Success);
        assert_eq!(report.landmarks.len(), 10);
        assert_eq!(report.landmarks[0].name, "left_iris_0");
        assert_eq!(report.landmarks[0].x, 468.);
        assert_eq!(report.landmarks[4].name, "left_iris_4");
        assert_eq!(report.landmarks[5].name, "right_iris_0");
        assert_eq!(report.landmarks[5].x, 473.);
        assert_eq!(report.landmarks[9].name, "right_iris_4");
        assert_eq!(report.landmarks[9].x, 477.);
    }

    #[test]
    fn test_mesh_without_iris_is_error() {
        let mut canned = Canned::default();
        canned
            .meshes
            .push_back(Some(vec![NormalizedLandmark::default(); 468]));
        assert!(detect(&mut canned, &RgbImage::new(10, 10)).is_err());
    }

    #[test]
    fn test_no_face() {
        let report = detect(&mut Canned::default(), &RgbImage::new(10, 10)).unwrap();
        assert_eq!(report.status, Status::NoFaceDetected);
    }
}
