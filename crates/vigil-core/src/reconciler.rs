//! Violation reconciliation: per-frame detections in, rate-limited
//! violations out.
//!
//! Raw per-frame signals are noisy; without debouncing, one person
//! standing in a zone would raise thirty warnings a second. Each
//! violation category keeps its own accumulator, and the emission rule
//! is uniform: the trigger must hold on this frame AND the category's
//! cooldown must have elapsed since its last emission. The result is at
//! most one violation per category-key per cooldown interval.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::matcher::MatchOutcome;
use crate::permit::PermissionEvaluator;
use crate::types::FrameObservations;
use crate::zone::Zone;

/// Severity carried to the event sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Warning => write!(f, "WARNING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    ZoneIntrusion,
    UnauthorizedPresence,
    FaceMismatch,
    Overcrowding,
    Fire,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::ZoneIntrusion => "zone-intrusion",
            ViolationKind::UnauthorizedPresence => "unauthorized-presence",
            ViolationKind::FaceMismatch => "face-mismatch",
            ViolationKind::Overcrowding => "overcrowding",
            ViolationKind::Fire => "fire",
        };
        f.write_str(s)
    }
}

/// An emitted violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Violation {
    /// Stable textual identity, the key into the acknowledgement store.
    /// A recurring condition produces the same id; a new occurrence
    /// with a different subject (another employee, another count)
    /// produces a different one.
    pub fn id(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }

    pub fn level(&self) -> Level {
        Level::Warning
    }
}

/// The monitored space a reconciler instance watches. One instance per
/// environment; the per-environment keying of the intrusion and
/// occupancy categories falls out of that.
#[derive(Debug, Clone)]
pub struct MonitoredEnvironment {
    pub id: String,
    pub name: String,
    pub zones: Vec<Zone>,
}

/// Windows, thresholds and cooldowns per category. Defaults are the
/// observed production values.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub zone_intrusion_cooldown: Duration,
    /// Tighter cooldown when person boxes are face-detection proxies.
    pub zone_intrusion_proxy_cooldown: Duration,
    pub unauthorized_window: Duration,
    /// Sightings within the window needed to emit (inclusive).
    pub unauthorized_threshold: usize,
    pub unauthorized_cooldown: Duration,
    pub mismatch_window: Duration,
    /// Sightings within the window that must be exceeded to emit.
    pub mismatch_threshold: usize,
    pub mismatch_cooldown: Duration,
    pub overcrowd_cooldown: Duration,
    pub fire_cooldown: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            zone_intrusion_cooldown: Duration::seconds(15),
            zone_intrusion_proxy_cooldown: Duration::seconds(5),
            unauthorized_window: Duration::seconds(30),
            unauthorized_threshold: 3,
            unauthorized_cooldown: Duration::seconds(30),
            mismatch_window: Duration::seconds(30),
            mismatch_threshold: 7,
            mismatch_cooldown: Duration::seconds(30),
            overcrowd_cooldown: Duration::seconds(30),
            fire_cooldown: Duration::seconds(5),
        }
    }
}

/// Rate limiter for one category key.
#[derive(Debug, Clone, Default)]
struct Debounce {
    last_emitted: Option<DateTime<Utc>>,
}

impl Debounce {
    /// True (and records the emission) iff the cooldown has elapsed.
    /// Only called when the trigger condition already holds.
    fn try_emit(&mut self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        let ready = self.last_emitted.map_or(true, |t| now - t > cooldown);
        if ready {
            self.last_emitted = Some(now);
        }
        ready
    }
}

/// Sliding-window occurrence counter with its own debounce.
#[derive(Debug, Clone, Default)]
struct WindowCounter {
    timestamps: VecDeque<DateTime<Utc>>,
    debounce: Debounce,
}

impl WindowCounter {
    /// Record one occurrence, prune entries older than the window, and
    /// return the occurrence count within the window. Pruning happens
    /// on every observation, never lazily.
    fn observe(&mut self, now: DateTime<Utc>, window: Duration) -> usize {
        self.timestamps.push_back(now);
        while let Some(&front) = self.timestamps.front() {
            if now - front > window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        self.timestamps.len()
    }
}

/// All mutable accumulator state, owned by the reconciler so it can be
/// reset and inspected as one unit.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerState {
    zone_intrusion: Debounce,
    fire: Debounce,
    overcrowd: Debounce,
    mismatch: WindowCounter,
    unauthorized: HashMap<String, WindowCounter>,
}

/// Consumes one frame's worth of classified detections per call and
/// emits rate-limited violations.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcilerConfig,
    state: ReconcilerState,
}

impl Reconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            state: ReconcilerState::default(),
        }
    }

    pub fn reset(&mut self) {
        self.state = ReconcilerState::default();
    }

    /// Process one frame. Deterministic order: zone membership, then
    /// per-face identity and authorization, then occupancy, then fire.
    /// The accumulators are the only state this touches.
    pub fn observe_frame(
        &mut self,
        frame: &FrameObservations,
        env: &MonitoredEnvironment,
        permits: &PermissionEvaluator,
        now: DateTime<Utc>,
    ) -> Vec<Violation> {
        let mut out = Vec::new();
        let naive_now = now.naive_utc();

        // (1) Person centroids against zone polygons.
        let intruding = frame.persons.iter().any(|p| {
            let c = p.center();
            env.zones.iter().any(|z| z.contains(c))
        });
        if intruding {
            let cooldown = if frame.persons_from_faces {
                self.config.zone_intrusion_proxy_cooldown
            } else {
                self.config.zone_intrusion_cooldown
            };
            if self.state.zone_intrusion.try_emit(now, cooldown) {
                out.push(Violation {
                    kind: ViolationKind::ZoneIntrusion,
                    message: format!("person detected in restricted zone of {}", env.name),
                    at: now,
                });
            }
        }

        // (2) Identified faces without permission, and unidentified faces.
        for face in &frame.faces {
            match &face.outcome {
                MatchOutcome::Identified(name) => {
                    if permits.is_authorized(name, &env.id, naive_now) {
                        continue;
                    }
                    let counter = self.state.unauthorized.entry(name.clone()).or_default();
                    let count = counter.observe(now, self.config.unauthorized_window);
                    if count >= self.config.unauthorized_threshold
                        && counter.debounce.try_emit(now, self.config.unauthorized_cooldown)
                    {
                        out.push(Violation {
                            kind: ViolationKind::UnauthorizedPresence,
                            message: format!("unauthorized access in {}: {}", env.name, name),
                            at: now,
                        });
                    }
                }
                MatchOutcome::Unknown => {
                    let count = self.state.mismatch.observe(now, self.config.mismatch_window);
                    if count > self.config.mismatch_threshold
                        && self
                            .state
                            .mismatch
                            .debounce
                            .try_emit(now, self.config.mismatch_cooldown)
                    {
                        out.push(Violation {
                            kind: ViolationKind::FaceMismatch,
                            message: format!(
                                "unidentified person in {} has no access",
                                env.name
                            ),
                            at: now,
                        });
                    }
                }
            }
        }

        // (3) Occupancy against currently-valid assignments.
        let person_count = frame.persons.len();
        let allowed = permits.count_authorized(&env.id, naive_now);
        if person_count > allowed && self.state.overcrowd.try_emit(now, self.config.overcrowd_cooldown)
        {
            out.push(Violation {
                kind: ViolationKind::Overcrowding,
                message: format!(
                    "occupancy exceeded in {}: allowed {allowed}, detected {person_count}",
                    env.name
                ),
                at: now,
            });
        }

        // (4) Fire regions, independent of identity and zone logic.
        if !frame.fire_regions.is_empty()
            && self.state.fire.try_emit(now, self.config.fire_cooldown)
        {
            out.push(Violation {
                kind: ViolationKind::Fire,
                message: format!("fire-like region detected in {}", env.name),
                at: now,
            });
        }

        out
    }
}
