//! vigil-core: zone-based security reconciliation engine.
//!
//! Models monitored-space geometry as editable polygons, evaluates
//! time-windowed access permissions, matches detected faces against a
//! known roster, and turns raw per-frame detections into a bounded,
//! de-duplicated, rate-limited stream of violations.

pub mod editor;
pub mod fire;
pub mod matcher;
pub mod permit;
pub mod reconciler;
pub mod types;
pub mod zone;

pub use matcher::{MatchOutcome, NearestMatcher, RosterEntry};
pub use permit::{Assignment, PermissionEvaluator};
pub use reconciler::{Reconciler, ReconcilerConfig, Violation, ViolationKind};
pub use types::{BoundingBox, Embedding, FaceObservation, FrameObservations};
pub use zone::{Zone, ZoneKind};
