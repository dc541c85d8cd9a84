//! External collaborator contracts.
//!
//! Camera capture, the employee/environment/assignment backend and the
//! neural detection models live outside this process; the engine
//! consumes them through these traits. Implementations are free to be
//! HTTP clients, local files or test doubles.

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use vigil_core::{Assignment, BoundingBox, Embedding, Violation, Zone};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub name: String,
    #[serde(default)]
    pub department: String,
    pub photo_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image_reference: String,
}

/// Employee roster backend.
pub trait RosterSource {
    fn list_employees(&self) -> Result<Vec<EmployeeRecord>>;
    fn photo_bytes(&self, reference: &str) -> Result<Vec<u8>>;
    /// Monotonic server-side marker; a change means the roster must be
    /// rebuilt wholesale.
    fn roster_version(&self) -> Result<f64>;
}

/// Environment and zone backend.
pub trait EnvironmentSource {
    fn list_environments(&self) -> Result<Vec<EnvironmentRecord>>;
    fn load_zones(&self, environment_id: &str) -> Result<Vec<Zone>>;
    fn save_zones(&self, environment_id: &str, zones: &[Zone]) -> Result<()>;
}

/// Assignment backend.
pub trait AssignmentSource {
    fn list_assignments(&self) -> Result<Vec<Assignment>>;
    fn create_assignment(&self, assignment: Assignment) -> Result<()>;
    fn delete_assignment(&self, index: usize) -> Result<()>;
}

/// Face embedding and person detection capability.
pub trait DetectionProvider {
    fn extract_face_embeddings(&mut self, image: &RgbImage)
        -> Result<Vec<(BoundingBox, Embedding)>>;

    /// `Ok(None)` means person detection is unavailable; the engine
    /// degrades to face boxes as person proxies.
    fn detect_persons(&mut self, image: &RgbImage) -> Result<Option<Vec<BoundingBox>>>;

    /// Color-threshold heuristic; the default needs no model.
    fn detect_fire_regions(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>> {
        Ok(vigil_core::fire::detect_fire_regions(image))
    }
}

/// Camera or stream feeding the monitor loop. `Ok(None)` means no frame
/// was ready this tick.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Where one frame's emitted violations go (operator log transport).
pub trait EventSink {
    fn emit(&mut self, violations: &[Violation]);
}
