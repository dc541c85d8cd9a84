use serde::{Deserialize, Serialize};

use crate::matcher::MatchOutcome;

/// Bounding box for a detected face, person or region, in image-pixel space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: 1.0,
        }
    }

    /// Center point of the box, used for zone membership tests.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Face embedding vector (128-dimensional for the default recognition model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Compute Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// A detected face with its resolved identity for one frame.
#[derive(Debug, Clone)]
pub struct FaceObservation {
    pub bounds: BoundingBox,
    pub outcome: MatchOutcome,
}

/// One frame's worth of classified detections. Ephemeral: consumed by
/// the reconciler and discarded.
#[derive(Debug, Clone, Default)]
pub struct FrameObservations {
    pub faces: Vec<FaceObservation>,
    pub persons: Vec<BoundingBox>,
    pub fire_regions: Vec<BoundingBox>,
    /// True when person boxes are face-detection proxies because the
    /// person detector was unavailable. Tightens the zone-intrusion
    /// cooldown.
    pub persons_from_faces: bool,
}
