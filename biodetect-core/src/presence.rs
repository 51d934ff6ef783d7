//! Cross-frame "new person" heuristic.
//!
//! A detection counts as a new subject when there is nothing to compare it to
//! (no retained set, or an empty one), or when any landmark moved further than a fixed fraction of the reference
//! frame since the previous detection. Only one subject is ever tracked.

use crate::landmark::LandmarkSet;
use thiserror::Error;
use tracing::trace;

/// Fraction of the reference frame a landmark must move to count as a new subject.
pub const DISPLACEMENT_FRACTION: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    pub width: f64,
    pub height: f64,
}

impl ReferenceFrame {
    pub fn new(width: f64, height: f64) -> ReferenceFrame {
        ReferenceFrame { width, height }
    }

    fn max_dx(&self) -> f64 {
        DISPLACEMENT_FRACTION * self.width
    }

    fn max_dy(&self) -> f64 {
        DISPLACEMENT_FRACTION * self.height
    }
}

impl Default for ReferenceFrame {
    fn default() -> Self {
        ReferenceFrame::new(640., 480.)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub is_new: bool,
    pub retained: LandmarkSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("landmark count mismatch: current has {current}, previous has {previous}")]
pub struct ShapeMismatch {
    pub current: usize,
    pub previous: usize,
}

/// What to do when consecutive landmark sets differ in length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapePolicy {
    /// Compare the common prefix, ignore the rest.
    #[default]
    Truncate,
    /// Refuse to compare, leaving the retained set as it was.
    Reject,
}

pub fn evaluate(
    current: LandmarkSet,
    previous: Option<&LandmarkSet>,
    frame: ReferenceFrame,
) -> Evaluation {
    let is_new = match previous {
        None => true,
        Some(previous) if previous.is_empty() => true,
        Some(previous) => current.iter().zip(previous.iter()).any(|(c, p)| {
            (c.x - p.x).abs() > frame.max_dx() || (c.y - p.y).abs() > frame.max_dy()
        }),
    };

    Evaluation {
        is_new,
        retained: current,
    }
}

/// Like [`evaluate`], but mismatched lengths are an error instead of being truncated.
pub fn evaluate_strict(
    current: LandmarkSet,
    previous: Option<&LandmarkSet>,
    frame: ReferenceFrame,
) -> Result<Evaluation, ShapeMismatch> {
    if let Some(previous) = previous {
        if previous.len() != current.len() {
            return Err(ShapeMismatch {
                current: current.len(),
                previous: previous.len(),
            });
        }
    }

    Ok(evaluate(current, previous, frame))
}

/// Owns the retained landmark set between detections.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    previous: Option<LandmarkSet>,
    frame: ReferenceFrame,
    policy: ShapePolicy,
}

impl PresenceTracker {
    pub fn new(frame: ReferenceFrame, policy: ShapePolicy) -> PresenceTracker {
        PresenceTracker {
            previous: None,
            frame,
            policy,
        }
    }

    /// Compares `current` with the retained set and retains `current`.
    /// Returns whether it counts as a new subject.
    pub fn observe(&mut self, current: LandmarkSet) -> Result<bool, ShapeMismatch> {
        let previous = self.previous.as_ref();
        let eval = match self.policy {
            ShapePolicy::Truncate => evaluate(current, previous, self.frame),
            ShapePolicy::Reject => evaluate_strict(current, previous, self.frame)?,
        };

        trace!("Presence evaluated, new subject: {}", eval.is_new);
        self.previous = Some(eval.retained);
        Ok(eval.is_new)
    }

    pub fn previous(&self) -> Option<&LandmarkSet> {
        self.previous.as_ref()
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}
