//! Local-file collaborators for standalone operation.
//!
//! Without a networked backend the daemon reads its roster,
//! environments and assignments from JSON files under a single data
//! directory. The same traits admit richer backends; this module is
//! the composition the binary ships with.

use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use anyhow::{bail, Context, Result};
use image::RgbImage;
use vigil_core::reconciler::MonitoredEnvironment;
use vigil_core::{permit, zone, Assignment, BoundingBox, Embedding, Zone};

use crate::sources::{
    AssignmentSource, DetectionProvider, EmployeeRecord, EnvironmentRecord, EnvironmentSource,
    FrameSource, RosterSource,
};

/// JSON-file backend rooted at one data directory: `employees.json`,
/// `environments.json`, `assignments.json` and
/// `zones/<environment-id>.json`. Missing files read as empty lists.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    dir: PathBuf,
}

impl LocalBackend {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn read_optional(&self, file: &str) -> Result<Option<String>> {
        let path = self.dir.join(file);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn write_assignments(&self, assignments: &[Assignment]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.dir.join("assignments.json");
        let text = serde_json::to_string_pretty(assignments)?;
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))
    }
}

impl RosterSource for LocalBackend {
    fn list_employees(&self) -> Result<Vec<EmployeeRecord>> {
        match self.read_optional("employees.json")? {
            Some(text) => serde_json::from_str(&text).context("parsing employees.json"),
            None => Ok(Vec::new()),
        }
    }

    fn photo_bytes(&self, reference: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(reference);
        std::fs::read(&path).with_context(|| format!("reading {}", path.display()))
    }

    /// Modification time of `employees.json` in epoch seconds, so file
    /// edits surface as a version change on the next poll. A missing
    /// file is version 0.
    fn roster_version(&self) -> Result<f64> {
        let path = self.dir.join("employees.json");
        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0.0),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", path.display()))
            }
        };
        let mtime = meta
            .modified()
            .with_context(|| format!("reading mtime of {}", path.display()))?;
        Ok(mtime
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0))
    }
}

impl EnvironmentSource for LocalBackend {
    fn list_environments(&self) -> Result<Vec<EnvironmentRecord>> {
        match self.read_optional("environments.json")? {
            Some(text) => serde_json::from_str(&text).context("parsing environments.json"),
            None => Ok(Vec::new()),
        }
    }

    fn load_zones(&self, environment_id: &str) -> Result<Vec<Zone>> {
        match self.read_optional(&format!("zones/{environment_id}.json"))? {
            Some(text) => Ok(zone::load_zones(&text)),
            None => Ok(Vec::new()),
        }
    }

    fn save_zones(&self, environment_id: &str, zones: &[Zone]) -> Result<()> {
        let dir = self.dir.join("zones");
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        let path = dir.join(format!("{environment_id}.json"));
        std::fs::write(&path, zone::save_zones(zones))
            .with_context(|| format!("writing {}", path.display()))
    }
}

impl AssignmentSource for LocalBackend {
    fn list_assignments(&self) -> Result<Vec<Assignment>> {
        match self.read_optional("assignments.json")? {
            Some(text) => Ok(permit::load_assignments(&text)),
            None => Ok(Vec::new()),
        }
    }

    fn create_assignment(&self, assignment: Assignment) -> Result<()> {
        let mut all = self.list_assignments()?;
        all.push(assignment);
        self.write_assignments(&all)
    }

    fn delete_assignment(&self, index: usize) -> Result<()> {
        let mut all = self.list_assignments()?;
        if index >= all.len() {
            bail!(
                "assignment index {index} out of range ({} records)",
                all.len()
            );
        }
        all.remove(index);
        self.write_assignments(&all)
    }
}

/// Pick the monitored environment and load its zones. A requested id
/// that is not listed falls back to the first environment; an empty
/// backend yields a zoneless default so the daemon still starts.
pub fn resolve_environment(
    source: &dyn EnvironmentSource,
    wanted: Option<&str>,
) -> Result<MonitoredEnvironment> {
    let records = source.list_environments()?;
    let mut record = records.first();
    if let Some(id) = wanted {
        match records.iter().find(|r| r.id == id) {
            Some(found) => record = Some(found),
            None => {
                tracing::warn!(environment = id, "requested environment not listed; using the first");
            }
        }
    }
    match record {
        Some(r) => Ok(MonitoredEnvironment {
            id: r.id.clone(),
            name: r.name.clone(),
            zones: source.load_zones(&r.id)?,
        }),
        None => {
            tracing::warn!("no environments configured; monitoring a zoneless default");
            Ok(MonitoredEnvironment {
                id: "default".to_string(),
                name: "default".to_string(),
                zones: Vec::new(),
            })
        }
    }
}

/// Detection provider with no neural models attached: no faces, no
/// person boxes, fire via the built-in color heuristic. Inference-backed
/// providers implement the same trait.
pub struct HeuristicDetector;

impl DetectionProvider for HeuristicDetector {
    fn extract_face_embeddings(
        &mut self,
        _image: &RgbImage,
    ) -> Result<Vec<(BoundingBox, Embedding)>> {
        Ok(Vec::new())
    }

    fn detect_persons(&mut self, _image: &RgbImage) -> Result<Option<Vec<BoundingBox>>> {
        Ok(None)
    }
}

/// Frame source with no capture device attached; the loop idles until a
/// camera implementation replaces it.
pub struct IdleCamera;

impl FrameSource for IdleCamera {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acks::{AckStore, OperatorLog};
    use crate::engine::Engine;
    use crate::roster::RosterCache;
    use chrono::Utc;
    use std::time::{Duration, Instant};
    use vigil_core::{
        NearestMatcher, PermissionEvaluator, Reconciler, ReconcilerConfig, ViolationKind,
    };

    fn backend(dir: &tempfile::TempDir) -> LocalBackend {
        LocalBackend::new(dir.path().to_path_buf())
    }

    fn write_environments(dir: &tempfile::TempDir) {
        std::fs::write(
            dir.path().join("environments.json"),
            r#"[{"id": "env-1", "name": "lab"}, {"id": "env-2", "name": "vault"}]"#,
        )
        .unwrap();
    }

    #[test]
    fn test_empty_data_dir_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        assert!(b.list_employees().unwrap().is_empty());
        assert!(b.list_environments().unwrap().is_empty());
        assert!(b.list_assignments().unwrap().is_empty());
        assert!(b.load_zones("env-1").unwrap().is_empty());
        assert_eq!(b.roster_version().unwrap(), 0.0);
    }

    #[test]
    fn test_zone_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        let zones = vec![Zone::rect((0.0, 0.0), (50.0, 50.0))];
        b.save_zones("env-1", &zones).unwrap();
        assert_eq!(b.load_zones("env-1").unwrap(), zones);
        assert!(b.load_zones("env-2").unwrap().is_empty());
    }

    #[test]
    fn test_assignment_create_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        let mk = |emp: &str| Assignment {
            employee: emp.to_string(),
            environment_id: "env-1".to_string(),
            enter_until: None,
            exit_until: None,
        };
        b.create_assignment(mk("Alice")).unwrap();
        b.create_assignment(mk("Bob")).unwrap();
        assert_eq!(b.list_assignments().unwrap().len(), 2);
        b.delete_assignment(0).unwrap();
        let left = b.list_assignments().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].employee, "Bob");
        assert!(b.delete_assignment(5).is_err());
    }

    #[test]
    fn test_roster_version_tracks_file() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        std::fs::write(dir.path().join("employees.json"), "[]").unwrap();
        assert!(b.roster_version().unwrap() > 0.0);
    }

    #[test]
    fn test_resolve_prefers_requested_environment() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        write_environments(&dir);
        b.save_zones("env-2", &[Zone::rect((0.0, 0.0), (10.0, 10.0))])
            .unwrap();

        let env = resolve_environment(&b, Some("env-2")).unwrap();
        assert_eq!(env.id, "env-2");
        assert_eq!(env.name, "vault");
        assert_eq!(env.zones.len(), 1);
    }

    #[test]
    fn test_resolve_falls_back_to_first() {
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        write_environments(&dir);
        assert_eq!(resolve_environment(&b, None).unwrap().id, "env-1");
        assert_eq!(resolve_environment(&b, Some("nope")).unwrap().id, "env-1");
    }

    #[test]
    fn test_resolve_empty_backend_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let env = resolve_environment(&backend(&dir), None).unwrap();
        assert_eq!(env.id, "default");
        assert!(env.zones.is_empty());
    }

    #[test]
    fn test_standalone_composition_detects_fire() {
        // The exact wiring the binary performs: file backend, heuristic
        // detector, ack-filtered operator log.
        let dir = tempfile::tempdir().unwrap();
        let b = backend(&dir);
        write_environments(&dir);
        let acks = AckStore::load(dir.path().join("acknowledged.json"));

        let env = resolve_environment(&b, Some("env-1")).unwrap();
        let mut engine = Engine::new(
            NearestMatcher::default(),
            Reconciler::new(ReconcilerConfig::default()),
            env,
            PermissionEvaluator::default(),
            RosterCache::new(Duration::from_secs(10)),
            Box::new(HeuristicDetector),
            Box::new(b.clone()),
            Box::new(OperatorLog::new(acks)),
        );
        engine.refresh_assignments(&b);

        let mut img = RgbImage::from_pixel(100, 100, image::Rgb([40, 90, 220]));
        for y in 10..50 {
            for x in 10..50 {
                img.put_pixel(x, y, image::Rgb([255, 80, 0]));
            }
        }
        let violations = engine.process_frame(&img, Utc::now(), Instant::now());
        assert!(violations.iter().any(|v| v.kind == ViolationKind::Fire));
    }
}
