use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// A landmark as produced by a model: `x`/`y` relative to the image (0..1),
/// `z` relative depth.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl NormalizedLandmark {
    pub fn new(x: f32, y: f32, z: f32) -> NormalizedLandmark {
        NormalizedLandmark { x, y, z }
    }

    /// Scales into pixel space in double precision. Depth has no pixel unit
    /// and passes through.
    pub fn to_pixels(&self, width: u32, height: u32) -> Landmark {
        Landmark {
            x: self.x as f64 * width as f64,
            y: self.y as f64 * height as f64,
            z: self.z as f64,
        }
    }
}

/// A landmark in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Landmark {
        Landmark { x, y, z }
    }
}

/// Ordered landmarks from a single detection pass. The index encodes the body
/// part, so order is kept exactly as the model produced it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet(Vec<Landmark>);

impl LandmarkSet {
    pub fn new(landmarks: Vec<Landmark>) -> LandmarkSet {
        LandmarkSet(landmarks)
    }

    pub fn from_normalized(landmarks: &[NormalizedLandmark], width: u32, height: u32) -> LandmarkSet {
        LandmarkSet(
            landmarks
                .iter()
                .map(|lm| lm.to_pixels(width, height))
                .collect(),
        )
    }

    pub fn into_inner(self) -> Vec<Landmark> {
        self.0
    }
}

impl Deref for LandmarkSet {
    type Target = [Landmark];

    fn deref(&self) -> &[Landmark] {
        &self.0
    }
}

impl From<Vec<Landmark>> for LandmarkSet {
    fn from(landmarks: Vec<Landmark>) -> LandmarkSet {
        LandmarkSet(landmarks)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedLandmark {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl NamedLandmark {
    pub fn new(name: impl Into<String>, lm: Landmark) -> NamedLandmark {
        NamedLandmark {
            name: name.into(),
            x: lm.x,
            y: lm.y,
            z: lm.z,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedLandmark {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl IndexedLandmark {
    pub fn new(index: usize, lm: Landmark) -> IndexedLandmark {
        IndexedLandmark {
            index,
            x: lm.x,
            y: lm.y,
            z: lm.z,
        }
    }
}
