//! The monitoring engine: one logical timeline driven by frame arrival.
//!
//! Detection, identity resolution, reconciliation and the time-gated
//! roster refresh all run on a single task, so the accumulators have
//! one writer and emissions stay ordered by wall-clock time. A failed
//! detection call degrades to "no signal this frame"; nothing here
//! stops the pipeline.

use std::time::Instant;

use chrono::{DateTime, Utc};
use image::RgbImage;
use tokio::sync::watch;
use vigil_core::reconciler::MonitoredEnvironment;
use vigil_core::{
    FaceObservation, FrameObservations, NearestMatcher, PermissionEvaluator, Reconciler, Violation,
};

use crate::roster::RosterCache;
use crate::sources::{AssignmentSource, DetectionProvider, EventSink, FrameSource, RosterSource};

pub struct Engine {
    matcher: NearestMatcher,
    reconciler: Reconciler,
    env: MonitoredEnvironment,
    permits: PermissionEvaluator,
    roster: RosterCache,
    provider: Box<dyn DetectionProvider + Send>,
    roster_source: Box<dyn RosterSource + Send>,
    sink: Box<dyn EventSink + Send>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        matcher: NearestMatcher,
        reconciler: Reconciler,
        env: MonitoredEnvironment,
        permits: PermissionEvaluator,
        roster: RosterCache,
        provider: Box<dyn DetectionProvider + Send>,
        roster_source: Box<dyn RosterSource + Send>,
        sink: Box<dyn EventSink + Send>,
    ) -> Self {
        Self {
            matcher,
            reconciler,
            env,
            permits,
            roster,
            provider,
            roster_source,
            sink,
        }
    }

    /// Pull a fresh assignment snapshot. On failure the last good
    /// snapshot stays in effect.
    pub fn refresh_assignments(&mut self, source: &dyn AssignmentSource) {
        match source.list_assignments() {
            Ok(assignments) => {
                tracing::debug!(count = assignments.len(), "assignments refreshed");
                self.permits.replace(assignments);
            }
            Err(err) => {
                tracing::warn!(error = %err, "assignment refresh failed; keeping snapshot");
            }
        }
    }

    /// Process one frame: detect, resolve identities, reconcile, emit.
    ///
    /// `now` is the wall clock the reconciler reasons in; `mono` gates
    /// the roster poll. Both are injected so tests control time.
    pub fn process_frame(
        &mut self,
        image: &RgbImage,
        now: DateTime<Utc>,
        mono: Instant,
    ) -> Vec<Violation> {
        self.roster
            .maybe_refresh(&*self.roster_source, &mut *self.provider, mono);

        let raw_faces = match self.provider.extract_face_embeddings(image) {
            Ok(f) => f,
            Err(err) => {
                tracing::warn!(error = %err, "face extraction failed; zero faces this frame");
                Vec::new()
            }
        };

        let (persons, persons_from_faces) = match self.provider.detect_persons(image) {
            Ok(Some(boxes)) => (boxes, false),
            Ok(None) => {
                // Person detector unavailable: faces stand in for persons.
                (raw_faces.iter().map(|(b, _)| b.clone()).collect(), true)
            }
            Err(err) => {
                tracing::warn!(error = %err, "person detection failed; zero persons this frame");
                (Vec::new(), false)
            }
        };

        let fire_regions = match self.provider.detect_fire_regions(image) {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(error = %err, "fire detection failed; zero regions this frame");
                Vec::new()
            }
        };

        let faces = raw_faces
            .into_iter()
            .map(|(bounds, embedding)| FaceObservation {
                outcome: self.matcher.match_face(&embedding, self.roster.entries()),
                bounds,
            })
            .collect();

        let frame = FrameObservations {
            faces,
            persons,
            fire_regions,
            persons_from_faces,
        };

        let violations = self
            .reconciler
            .observe_frame(&frame, &self.env, &self.permits, now);
        self.sink.emit(&violations);
        violations
    }

    /// Frame-arrival loop. Runs until the frame source ends or the
    /// shutdown flag flips; "stop processing frames" is the only
    /// cancellation semantic.
    pub async fn run(
        &mut self,
        frames: &mut (dyn FrameSource + Send),
        frame_period: std::time::Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(frame_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(env = %self.env.name, period_ms = frame_period.as_millis() as u64,
            "engine loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match frames.next_frame() {
                        Ok(Some(image)) => {
                            self.process_frame(&image, Utc::now(), Instant::now());
                        }
                        Ok(None) => {
                            // No frame ready this tick; skip, never block.
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "frame capture failed; skipping frame");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    // A dropped sender means the daemon is going away too.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("engine loop stopped");
    }
}
