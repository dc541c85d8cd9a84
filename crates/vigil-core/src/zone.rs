//! Zone geometry: polygonal restricted regions within an environment.
//!
//! Rectangles and free polygons share one ordered vertex-list
//! representation, so containment, mutation and serialization are
//! uniform across both. All coordinates are in image-pixel space; any
//! image-to-canvas scaling is the caller's concern.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Denominator epsilon for the ray-cast test, so horizontal edges
/// never divide by zero.
const RAY_EPS: f32 = 1e-9;

#[derive(Error, Debug)]
pub enum ZoneError {
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("polygon vertices are collinear")]
    Degenerate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Rect,
    Poly,
}

/// A polygonal region within an environment's reference image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(rename = "type")]
    pub kind: ZoneKind,
    pub points: Vec<(f32, f32)>,
}

impl Zone {
    /// Build an axis-aligned rectangle from two opposite corners.
    /// Vertices run clockwise starting at the top-left corner.
    pub fn rect(p0: (f32, f32), p1: (f32, f32)) -> Self {
        let (x0, x1) = (p0.0.min(p1.0), p0.0.max(p1.0));
        let (y0, y1) = (p0.1.min(p1.1), p0.1.max(p1.1));
        Self {
            kind: ZoneKind::Rect,
            points: vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
        }
    }

    /// Build a free polygon from raw click points.
    ///
    /// Vertices are re-ordered by angle around their centroid before
    /// being committed, so a self-intersecting click order is corrected
    /// into a simple polygon. Fewer than 3 vertices or an all-collinear
    /// set is rejected.
    pub fn polygon(points: Vec<(f32, f32)>) -> Result<Self, ZoneError> {
        if points.len() < 3 {
            return Err(ZoneError::TooFewVertices(points.len()));
        }
        if all_collinear(&points) {
            return Err(ZoneError::Degenerate);
        }
        let n = points.len() as f32;
        let cx = points.iter().map(|p| p.0).sum::<f32>() / n;
        let cy = points.iter().map(|p| p.1).sum::<f32>() / n;
        let mut points = points;
        points.sort_by(|a, b| {
            let aa = (a.1 - cy).atan2(a.0 - cx);
            let ab = (b.1 - cy).atan2(b.0 - cx);
            aa.partial_cmp(&ab).unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(Self {
            kind: ZoneKind::Poly,
            points,
        })
    }

    /// Ray-casting point-in-polygon test (horizontal crossing parity).
    ///
    /// Points exactly on an edge may classify either way; callers must
    /// not depend on boundary classification.
    pub fn contains(&self, point: (f32, f32)) -> bool {
        let (x, y) = point;
        let pts = &self.points;
        let n = pts.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let (mut px, mut py) = pts[0];
        for i in 1..=n {
            let (nx, ny) = pts[i % n];
            if (py > y) != (ny > y) && x < (nx - px) * (y - py) / (ny - py + RAY_EPS) + px {
                inside = !inside;
            }
            px = nx;
            py = ny;
        }
        inside
    }

    /// Move one vertex to a new position.
    pub fn move_vertex(&mut self, index: usize, point: (f32, f32)) {
        if let Some(p) = self.points.get_mut(index) {
            *p = point;
        }
    }

    /// Translate the whole zone.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        for p in &mut self.points {
            p.0 += dx;
            p.1 += dy;
        }
    }

    /// Nearest vertex within `radius`, if any. Used to discriminate a
    /// vertex-drag gesture from a whole-zone drag or a new shape.
    pub fn hit_test_vertex(&self, point: (f32, f32), radius: f32) -> Option<usize> {
        let r2 = radius * radius;
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, (p.0 - point.0).powi(2) + (p.1 - point.1).powi(2)))
            .filter(|&(_, d2)| d2 <= r2)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }

    /// Axis-aligned bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for &(x, y) in &self.points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        (min_x, min_y, max_x, max_y)
    }
}

fn all_collinear(points: &[(f32, f32)]) -> bool {
    let (ax, ay) = points[0];
    let (bx, by) = points[1];
    points[2..].iter().all(|&(cx, cy)| {
        let cross = (bx - ax) * (cy - ay) - (by - ay) * (cx - ax);
        cross.abs() < 1e-6
    })
}

/// Persisted wire format: `{"zones": [{"type": "rect"|"poly", "points": [[x,y],...]}]}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ZoneDocument {
    pub zones: Vec<Zone>,
}

/// Parse one stored zone record leniently.
///
/// Accepts the tagged `{"type", "points"}` form and the legacy bare
/// `[x0, y0, x1, y1]` rectangle form. Returns `None` for anything
/// malformed (wrong point count, non-numeric).
pub fn zone_from_value(value: &serde_json::Value) -> Option<Zone> {
    if let Some(nums) = value.as_array() {
        if nums.len() == 4 && nums.iter().all(|v| v.is_number()) {
            let n: Vec<f32> = nums.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
            return Some(Zone::rect((n[0], n[1]), (n[2], n[3])));
        }
    }
    let zone: Zone = serde_json::from_value(value.clone()).ok()?;
    if zone.points.len() < 3 {
        return None;
    }
    if all_collinear(&zone.points) {
        return None;
    }
    Some(zone)
}

/// Load a zone list from its persisted JSON document, skipping corrupt
/// records. A corrupt zone never blocks loading the rest.
pub fn load_zones(json: &str) -> Vec<Zone> {
    let doc: serde_json::Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(err) => {
            tracing::warn!(error = %err, "zone document unparsable; loading no zones");
            return Vec::new();
        }
    };
    let records = doc
        .get("zones")
        .and_then(|z| z.as_array())
        .cloned()
        .unwrap_or_default();

    let mut zones = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        match zone_from_value(record) {
            Some(z) => zones.push(z),
            None => tracing::warn!(index = i, "skipping malformed zone record"),
        }
    }
    zones
}

/// Serialize a zone list into its persisted JSON document.
pub fn save_zones(zones: &[Zone]) -> String {
    // Zone is serde-friendly; serialization of in-memory zones cannot fail.
    serde_json::to_string(&ZoneDocument {
        zones: zones.to_vec(),
    })
    .unwrap_or_else(|_| r#"{"zones":[]}"#.to_string())
}
