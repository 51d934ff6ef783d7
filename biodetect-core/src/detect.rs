//! The detectors exposed by the API, one per [`DetectionKind`].
//!
//! Every detector wraps one estimator, converts its relative output into
//! pixel coordinates and shapes it into a serializable report. The people
//! counter additionally owns the presence state across calls.

use anyhow::Result;
use image::RgbImage;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{Level, debug, span};

use crate::estimate::Estimators;
use crate::presence::PresenceTracker;

pub mod arm;
pub mod eyes;
pub mod fingers;
pub mod head;
pub mod people;

pub use arm::ArmReport;
pub use eyes::EyesReport;
pub use fingers::HandsReport;
pub use head::HeadReport;
pub use people::PeopleReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionKind {
    Arm,
    ArmFingers,
    Eyes,
    Head,
    People,
}

impl DetectionKind {
    pub const ALL: [DetectionKind; 5] = [
        DetectionKind::Arm,
        DetectionKind::ArmFingers,
        DetectionKind::Eyes,
        DetectionKind::Head,
        DetectionKind::People,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::Arm => "arm",
            DetectionKind::ArmFingers => "arm-fingers",
            DetectionKind::Eyes => "eyes",
            DetectionKind::Head => "head",
            DetectionKind::People => "people",
        }
    }
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown detection kind {0:?}")]
pub struct UnknownKind(pub String);

impl FromStr for DetectionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetectionKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Arm(ArmReport),
    ArmFingers(HandsReport),
    Eyes(EyesReport),
    Head(HeadReport),
    People(PeopleReport),
}

impl Report {
    /// Whether the estimator found what this detector looks for.
    pub fn is_success(&self) -> bool {
        match self {
            Report::Arm(r) => r.status == arm::Status::Success,
            Report::ArmFingers(r) => r.status == fingers::Status::Success,
            Report::Eyes(r) => r.status == eyes::Status::Success,
            Report::Head(r) => r.status == head::Status::Success,
            Report::People(r) => r.status == people::Status::Success,
        }
    }
}

pub struct Detectors {
    estimators: Estimators,
    tracker: PresenceTracker,
}

impl Detectors {
    pub fn new(estimators: Estimators, tracker: PresenceTracker) -> Detectors {
        Detectors {
            estimators,
            tracker,
        }
    }

    pub fn run(&mut self, kind: DetectionKind, img: &RgbImage) -> Result<Report> {
        let span = span!(Level::DEBUG, "detect", kind = kind.as_str());
        let _guard = span.enter();

        let report = match kind {
            DetectionKind::Arm => Report::Arm(arm::detect(self.estimators.pose.as_mut(), img)?),
            DetectionKind::ArmFingers => {
                Report::ArmFingers(fingers::detect(self.estimators.hands.as_mut(), img)?)
            }
            DetectionKind::Eyes => {
                Report::Eyes(eyes::detect(self.estimators.face_mesh.as_mut(), img)?)
            }
            DetectionKind::Head => Report::Head(head::detect(self.estimators.faces.as_mut(), img)?),
            DetectionKind::People => Report::People(people::detect(
                self.estimators.pose.as_mut(),
                &mut self.tracker,
                img,
            )?),
        };

        debug!("{kind} detection, success: {}", report.is_success());
        Ok(report)
    }

    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }
}
