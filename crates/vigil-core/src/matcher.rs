//! Nearest-neighbor identity matching over a roster of known faces.

use crate::types::Embedding;

/// Distance at or under which a roster entry counts as a match. This is
/// the recognition library's own threshold, not a tunable similarity
/// score.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// One known identity: a name, a department, and the embedding derived
/// from the first detected face of the reference photo.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub name: String,
    pub department: String,
    pub embedding: Embedding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Identified(String),
    Unknown,
}

impl MatchOutcome {
    pub fn name(&self) -> Option<&str> {
        match self {
            MatchOutcome::Identified(name) => Some(name),
            MatchOutcome::Unknown => None,
        }
    }
}

/// Minimum-distance matcher gated by a per-entry threshold flag.
#[derive(Debug, Clone, Copy)]
pub struct NearestMatcher {
    pub threshold: f32,
}

impl Default for NearestMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl NearestMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Match a probe embedding against the roster.
    ///
    /// Two-step policy: compute a boolean is-a-match flag per entry
    /// (distance within threshold), pick the entry with minimum
    /// Euclidean distance, and accept it only if that same entry's flag
    /// is true. The gate matters: argmin alone would identify a distant
    /// stranger as the closest-but-still-wrong employee.
    pub fn match_face(&self, probe: &Embedding, roster: &[RosterEntry]) -> MatchOutcome {
        let mut best_dist = f32::INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, entry) in roster.iter().enumerate() {
            let dist = probe.euclidean_distance(&entry.embedding);
            if dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_dist <= self.threshold => {
                MatchOutcome::Identified(roster[idx].name.clone())
            }
            _ => MatchOutcome::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, values: Vec<f32>) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            department: "ops".to_string(),
            embedding: Embedding::new(values),
        }
    }

    #[test]
    fn test_exact_match_identified() {
        let roster = vec![entry("Alice", vec![0.1, 0.2, 0.3])];
        let probe = Embedding::new(vec![0.1, 0.2, 0.3]);
        assert_eq!(
            NearestMatcher::default().match_face(&probe, &roster),
            MatchOutcome::Identified("Alice".to_string())
        );
    }

    #[test]
    fn test_far_probe_is_unknown() {
        let roster = vec![entry("Alice", vec![0.0, 0.0]), entry("Bob", vec![1.0, 0.0])];
        let probe = Embedding::new(vec![10.0, 10.0]);
        assert_eq!(
            NearestMatcher::default().match_face(&probe, &roster),
            MatchOutcome::Unknown
        );
    }

    #[test]
    fn test_gate_blocks_closest_but_distant() {
        // Bob is nearest, but still outside the threshold: the argmin
        // must not be accepted without its flag.
        let roster = vec![entry("Alice", vec![5.0, 5.0]), entry("Bob", vec![2.0, 0.0])];
        let probe = Embedding::new(vec![0.0, 0.0]);
        assert_eq!(
            NearestMatcher::default().match_face(&probe, &roster),
            MatchOutcome::Unknown
        );
    }

    #[test]
    fn test_nearest_of_several_matches_wins() {
        let roster = vec![
            entry("Alice", vec![0.5, 0.0]),
            entry("Bob", vec![0.1, 0.0]),
            entry("Carol", vec![0.3, 0.0]),
        ];
        let probe = Embedding::new(vec![0.0, 0.0]);
        assert_eq!(
            NearestMatcher::default().match_face(&probe, &roster),
            MatchOutcome::Identified("Bob".to_string())
        );
    }

    #[test]
    fn test_empty_roster_is_unknown() {
        let probe = Embedding::new(vec![0.0, 0.0]);
        assert_eq!(
            NearestMatcher::default().match_face(&probe, &[]),
            MatchOutcome::Unknown
        );
    }
}
