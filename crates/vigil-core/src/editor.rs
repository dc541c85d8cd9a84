//! Interactive zone editing as an explicit finite-state machine.
//!
//! Pointer events (press / drag / release) drive pure transitions over
//! an owned zone list, decoupled from any UI toolkit. The editor works
//! on a snapshot of an environment's zones; the caller persists the
//! result of [`ZoneEditor::finish`] explicitly (push-on-save).

use crate::zone::Zone;

/// Vertex-handle pick radius, squared-distance compared.
const HANDLE_RADIUS: f32 = 15.0;
/// Zones with a bounding box under this area get a padded hit box for
/// deletion, since their interior is hard to click.
const SMALL_ZONE_AREA: f32 = 400.0;
const SMALL_ZONE_MARGIN: f32 = 5.0;
/// The interactive tool commits a polygon at exactly this many clicks.
/// Storage and containment accept any N >= 3.
const POLY_CLICKS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Rect,
    Poly,
    MoveVertex,
    DragZone,
    Delete,
}

#[derive(Debug, Clone, Copy)]
pub enum PointerEvent {
    Press((f32, f32)),
    Drag((f32, f32)),
    Release((f32, f32)),
}

/// What a vertex drag is attached to: a committed zone or the
/// in-progress polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragTarget {
    Zone { zone: usize, vertex: usize },
    Pending { vertex: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    DrawingRect { anchor: (f32, f32), cursor: (f32, f32) },
    DrawingPolygon,
    DraggingVertex(DragTarget),
    DraggingZone { zone: usize, last: (f32, f32) },
}

/// Editor over a snapshot of an environment's zones.
pub struct ZoneEditor {
    tool: Tool,
    state: State,
    zones: Vec<Zone>,
    /// Click-to-place vertices of a polygon being drawn.
    pending: Vec<(f32, f32)>,
}

impl ZoneEditor {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            tool: Tool::Rect,
            state: State::Idle,
            zones,
            pending: Vec::new(),
        }
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        // An in-flight drag or rubber-band rect does not survive a tool
        // switch; an in-progress polygon does.
        if !matches!(self.state, State::DrawingPolygon) {
            self.state = State::Idle;
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// In-progress polygon vertices, for preview rendering.
    pub fn pending_points(&self) -> &[(f32, f32)] {
        &self.pending
    }

    /// Consume the editor, yielding the zone list to persist.
    pub fn finish(self) -> Vec<Zone> {
        self.zones
    }

    pub fn clear_all(&mut self) {
        self.zones.clear();
        self.pending.clear();
        self.state = State::Idle;
    }

    pub fn handle(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Press(p) => self.on_press(p),
            PointerEvent::Drag(p) => self.on_drag(p),
            PointerEvent::Release(p) => self.on_release(p),
        }
    }

    fn on_press(&mut self, p: (f32, f32)) {
        if self.tool == Tool::DragZone {
            // Topmost zone under the cursor wins.
            for (i, z) in self.zones.iter().enumerate().rev() {
                if z.contains(p) {
                    self.state = State::DraggingZone { zone: i, last: p };
                    return;
                }
            }
            return;
        }

        // Any other tool: a press on a vertex handle starts a vertex drag.
        if let Some(target) = self.find_handle(p) {
            self.state = State::DraggingVertex(target);
            return;
        }

        match self.tool {
            Tool::Delete => self.delete_at(p),
            Tool::Rect => {
                self.state = State::DrawingRect { anchor: p, cursor: p };
            }
            Tool::Poly => {
                self.pending.push(p);
                self.state = State::DrawingPolygon;
                if self.pending.len() == POLY_CLICKS {
                    match Zone::polygon(std::mem::take(&mut self.pending)) {
                        Ok(zone) => self.zones.push(zone),
                        Err(err) => {
                            tracing::warn!(error = %err, "discarding invalid polygon");
                        }
                    }
                    self.state = State::Idle;
                }
            }
            Tool::MoveVertex | Tool::DragZone => {}
        }
    }

    fn on_drag(&mut self, p: (f32, f32)) {
        match self.state {
            State::DrawingRect { anchor, .. } => {
                self.state = State::DrawingRect { anchor, cursor: p };
            }
            State::DraggingVertex(DragTarget::Zone { zone, vertex }) => {
                if let Some(z) = self.zones.get_mut(zone) {
                    z.move_vertex(vertex, p);
                }
            }
            State::DraggingVertex(DragTarget::Pending { vertex }) => {
                if let Some(v) = self.pending.get_mut(vertex) {
                    *v = p;
                }
            }
            State::DraggingZone { zone, last } => {
                if let Some(z) = self.zones.get_mut(zone) {
                    z.translate(p.0 - last.0, p.1 - last.1);
                }
                self.state = State::DraggingZone { zone, last: p };
            }
            State::Idle | State::DrawingPolygon => {}
        }
    }

    fn on_release(&mut self, p: (f32, f32)) {
        match self.state {
            State::DrawingRect { anchor, .. } => {
                self.zones.push(Zone::rect(anchor, p));
                self.state = State::Idle;
            }
            State::DraggingVertex(_) | State::DraggingZone { .. } => {
                self.state = State::Idle;
            }
            State::Idle | State::DrawingPolygon => {}
        }
    }

    fn find_handle(&self, p: (f32, f32)) -> Option<DragTarget> {
        for (i, &(x, y)) in self.pending.iter().enumerate() {
            if (x - p.0).powi(2) + (y - p.1).powi(2) <= HANDLE_RADIUS * HANDLE_RADIUS {
                return Some(DragTarget::Pending { vertex: i });
            }
        }
        for (zi, z) in self.zones.iter().enumerate() {
            if let Some(vi) = z.hit_test_vertex(p, HANDLE_RADIUS) {
                return Some(DragTarget::Zone { zone: zi, vertex: vi });
            }
        }
        None
    }

    fn delete_at(&mut self, p: (f32, f32)) {
        // An in-progress polygon vertex under the cursor is removed first.
        if let Some(i) = self
            .pending
            .iter()
            .position(|&(x, y)| (x - p.0).powi(2) + (y - p.1).powi(2) <= HANDLE_RADIUS * HANDLE_RADIUS)
        {
            self.pending.remove(i);
            if self.pending.is_empty() {
                self.state = State::Idle;
            }
            return;
        }

        for (i, z) in self.zones.iter().enumerate() {
            if z.contains(p) {
                self.zones.remove(i);
                return;
            }
            let (min_x, min_y, max_x, max_y) = z.bounds();
            if (max_x - min_x) * (max_y - min_y) < SMALL_ZONE_AREA
                && min_x - SMALL_ZONE_MARGIN <= p.0
                && p.0 <= max_x + SMALL_ZONE_MARGIN
                && min_y - SMALL_ZONE_MARGIN <= p.1
                && p.1 <= max_y + SMALL_ZONE_MARGIN
            {
                self.zones.remove(i);
                return;
            }
        }
    }
}
