//! Roster cache with version-gated wholesale rebuilds.
//!
//! Rebuilding re-derives an embedding from every reference photo, so it
//! only happens when the server-side version marker changes, and the
//! marker is only polled on a fixed interval rather than per frame. A
//! failed refresh keeps the last good snapshot.

use std::time::{Duration, Instant};

use vigil_core::RosterEntry;

use crate::sources::{DetectionProvider, RosterSource};

pub struct RosterCache {
    entries: Vec<RosterEntry>,
    version: f64,
    last_check: Option<Instant>,
    poll_interval: Duration,
}

impl RosterCache {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            entries: Vec::new(),
            version: 0.0,
            last_check: None,
            poll_interval,
        }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Check staleness if the poll interval has elapsed, and rebuild on
    /// a changed version marker. Cheap no-op on every other call.
    pub fn maybe_refresh(
        &mut self,
        source: &dyn RosterSource,
        provider: &mut dyn DetectionProvider,
        now: Instant,
    ) {
        if let Some(last) = self.last_check {
            if now.duration_since(last) < self.poll_interval {
                return;
            }
        }
        self.last_check = Some(now);

        let version = match source.roster_version() {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "roster version check failed; keeping snapshot");
                return;
            }
        };
        if version == self.version {
            return;
        }

        match rebuild(source, provider) {
            Ok(entries) => {
                tracing::info!(
                    old_version = self.version,
                    new_version = version,
                    count = entries.len(),
                    "roster rebuilt"
                );
                self.entries = entries;
                self.version = version;
            }
            Err(err) => {
                tracing::warn!(error = %err, "roster rebuild failed; keeping snapshot");
            }
        }
    }

    /// Force a rebuild on the next call regardless of the poll gate.
    pub fn invalidate(&mut self) {
        self.last_check = None;
        self.version = 0.0;
    }
}

/// Fetch every employee's reference photo and derive one embedding from
/// its first detected face. Employees whose photo cannot be fetched,
/// decoded or contains no face are skipped.
fn rebuild(
    source: &dyn RosterSource,
    provider: &mut dyn DetectionProvider,
) -> anyhow::Result<Vec<RosterEntry>> {
    let employees = source.list_employees()?;
    let mut entries = Vec::with_capacity(employees.len());

    for emp in employees {
        let bytes = match source.photo_bytes(&emp.photo_reference) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(employee = %emp.name, error = %err, "photo fetch failed; skipping");
                continue;
            }
        };
        let image = match image::load_from_memory(&bytes) {
            Ok(img) => img.to_rgb8(),
            Err(err) => {
                tracing::warn!(employee = %emp.name, error = %err, "photo decode failed; skipping");
                continue;
            }
        };
        let faces = match provider.extract_face_embeddings(&image) {
            Ok(f) => f,
            Err(err) => {
                tracing::warn!(employee = %emp.name, error = %err, "embedding failed; skipping");
                continue;
            }
        };
        match faces.into_iter().next() {
            Some((_, embedding)) => entries.push(RosterEntry {
                name: emp.name,
                department: emp.department,
                embedding,
            }),
            None => {
                tracing::warn!(employee = %emp.name, "no face in reference photo; skipping");
            }
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::EmployeeRecord;
    use anyhow::anyhow;
    use image::RgbImage;
    use std::cell::Cell;
    use vigil_core::{BoundingBox, Embedding};

    struct FakeRoster {
        version: Cell<f64>,
        employees: Vec<EmployeeRecord>,
        fail_listing: Cell<bool>,
        version_checks: Cell<usize>,
    }

    impl FakeRoster {
        fn with(names: &[&str]) -> Self {
            Self {
                version: Cell::new(1.0),
                employees: names
                    .iter()
                    .map(|n| EmployeeRecord {
                        name: n.to_string(),
                        department: "ops".to_string(),
                        photo_reference: format!("{n}.png"),
                    })
                    .collect(),
                fail_listing: Cell::new(false),
                version_checks: Cell::new(0),
            }
        }
    }

    impl RosterSource for FakeRoster {
        fn list_employees(&self) -> anyhow::Result<Vec<EmployeeRecord>> {
            if self.fail_listing.get() {
                return Err(anyhow!("backend unreachable"));
            }
            Ok(self.employees.clone())
        }

        fn photo_bytes(&self, reference: &str) -> anyhow::Result<Vec<u8>> {
            if reference.starts_with("broken") {
                return Err(anyhow!("404"));
            }
            // A valid 1x1 PNG is enough for the decode step.
            let img = RgbImage::from_pixel(1, 1, image::Rgb([0, 0, 0]));
            let mut bytes = Vec::new();
            img.write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )?;
            Ok(bytes)
        }

        fn roster_version(&self) -> anyhow::Result<f64> {
            self.version_checks.set(self.version_checks.get() + 1);
            Ok(self.version.get())
        }
    }

    struct FakeProvider {
        face_for_all: bool,
    }

    impl DetectionProvider for FakeProvider {
        fn extract_face_embeddings(
            &mut self,
            _image: &RgbImage,
        ) -> anyhow::Result<Vec<(BoundingBox, Embedding)>> {
            if self.face_for_all {
                Ok(vec![(
                    BoundingBox::new(0.0, 0.0, 1.0, 1.0),
                    Embedding::new(vec![0.5, 0.5]),
                )])
            } else {
                Ok(Vec::new())
            }
        }

        fn detect_persons(&mut self, _image: &RgbImage) -> anyhow::Result<Option<Vec<BoundingBox>>> {
            Ok(None)
        }
    }

    #[test]
    fn test_rebuild_on_version_change() {
        let source = FakeRoster::with(&["Alice", "Bob"]);
        let mut provider = FakeProvider { face_for_all: true };
        let mut cache = RosterCache::new(Duration::from_secs(10));

        cache.maybe_refresh(&source, &mut provider, Instant::now());
        assert_eq!(cache.entries().len(), 2);
    }

    #[test]
    fn test_poll_interval_gates_checks() {
        let source = FakeRoster::with(&["Alice"]);
        let mut provider = FakeProvider { face_for_all: true };
        let mut cache = RosterCache::new(Duration::from_secs(10));

        let start = Instant::now();
        cache.maybe_refresh(&source, &mut provider, start);
        cache.maybe_refresh(&source, &mut provider, start + Duration::from_secs(1));
        cache.maybe_refresh(&source, &mut provider, start + Duration::from_secs(5));
        assert_eq!(source.version_checks.get(), 1);

        cache.maybe_refresh(&source, &mut provider, start + Duration::from_secs(11));
        assert_eq!(source.version_checks.get(), 2);
    }

    #[test]
    fn test_unchanged_version_skips_rebuild() {
        let source = FakeRoster::with(&["Alice"]);
        let mut provider = FakeProvider { face_for_all: true };
        let mut cache = RosterCache::new(Duration::from_secs(10));

        let start = Instant::now();
        cache.maybe_refresh(&source, &mut provider, start);
        assert_eq!(cache.entries().len(), 1);

        // Same version: the (possibly expensive) rebuild must not run,
        // even though the listing would now fail.
        source.fail_listing.set(true);
        cache.maybe_refresh(&source, &mut provider, start + Duration::from_secs(20));
        assert_eq!(cache.entries().len(), 1);
    }

    #[test]
    fn test_failed_rebuild_keeps_snapshot() {
        let source = FakeRoster::with(&["Alice"]);
        let mut provider = FakeProvider { face_for_all: true };
        let mut cache = RosterCache::new(Duration::from_secs(10));

        let start = Instant::now();
        cache.maybe_refresh(&source, &mut provider, start);
        assert_eq!(cache.entries().len(), 1);

        source.version.set(2.0);
        source.fail_listing.set(true);
        cache.maybe_refresh(&source, &mut provider, start + Duration::from_secs(20));
        // Last good snapshot retained.
        assert_eq!(cache.entries().len(), 1);

        // The failure did not consume the version bump: once the source
        // recovers the rebuild happens.
        source.fail_listing.set(false);
        cache.maybe_refresh(&source, &mut provider, start + Duration::from_secs(40));
        assert_eq!(cache.entries().len(), 1);
        assert_eq!(source.version_checks.get(), 3);
    }

    #[test]
    fn test_employee_without_face_skipped() {
        let source = FakeRoster::with(&["Alice", "Bob"]);
        let mut provider = FakeProvider { face_for_all: false };
        let mut cache = RosterCache::new(Duration::from_secs(10));

        cache.maybe_refresh(&source, &mut provider, Instant::now());
        assert!(cache.entries().is_empty());
    }

    #[test]
    fn test_broken_photo_skipped_not_fatal() {
        let mut source = FakeRoster::with(&["Alice"]);
        source.employees.push(EmployeeRecord {
            name: "Broken".to_string(),
            department: "ops".to_string(),
            photo_reference: "broken.png".to_string(),
        });
        let mut provider = FakeProvider { face_for_all: true };
        let mut cache = RosterCache::new(Duration::from_secs(10));

        cache.maybe_refresh(&source, &mut provider, Instant::now());
        assert_eq!(cache.entries().len(), 1);
        assert_eq!(cache.entries()[0].name, "Alice");
    }
}
