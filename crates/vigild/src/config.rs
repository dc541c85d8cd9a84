use std::path::PathBuf;

use chrono::Duration;
use vigil_core::ReconcilerConfig;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Euclidean distance threshold for a positive identity match.
    pub match_threshold: f32,
    /// Frame-loop period in milliseconds (~30 fps).
    pub frame_period_ms: u64,
    /// Seconds between roster staleness checks.
    pub roster_poll_secs: u64,
    /// Data directory for the local file backend.
    pub data_dir: PathBuf,
    /// Path to the acknowledged-warnings store.
    pub ack_path: PathBuf,
    /// Environment to monitor; defaults to the first one the
    /// environment source lists.
    pub environment_id: Option<String>,

    pub zone_cooldown_secs: i64,
    pub zone_proxy_cooldown_secs: i64,
    pub unauth_window_secs: i64,
    pub unauth_count: usize,
    pub unauth_cooldown_secs: i64,
    pub mismatch_window_secs: i64,
    pub mismatch_count: usize,
    pub mismatch_cooldown_secs: i64,
    pub overcrowd_cooldown_secs: i64,
    pub fire_cooldown_secs: i64,
}

impl Config {
    /// Load configuration from `VIGIL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("VIGIL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("XDG_DATA_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| {
                        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                        PathBuf::from(home).join(".local/share")
                    })
                    .join("vigil")
            });

        let ack_path = std::env::var("VIGIL_ACK_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("acknowledged.json"));

        Self {
            match_threshold: env_f32("VIGIL_MATCH_THRESHOLD", 0.6),
            frame_period_ms: env_u64("VIGIL_FRAME_PERIOD_MS", 33),
            roster_poll_secs: env_u64("VIGIL_ROSTER_POLL_SECS", 10),
            data_dir,
            ack_path,
            environment_id: std::env::var("VIGIL_ENVIRONMENT_ID").ok(),
            zone_cooldown_secs: env_i64("VIGIL_ZONE_COOLDOWN_SECS", 15),
            zone_proxy_cooldown_secs: env_i64("VIGIL_ZONE_PROXY_COOLDOWN_SECS", 5),
            unauth_window_secs: env_i64("VIGIL_UNAUTH_WINDOW_SECS", 30),
            unauth_count: env_usize("VIGIL_UNAUTH_COUNT", 3),
            unauth_cooldown_secs: env_i64("VIGIL_UNAUTH_COOLDOWN_SECS", 30),
            mismatch_window_secs: env_i64("VIGIL_MISMATCH_WINDOW_SECS", 30),
            mismatch_count: env_usize("VIGIL_MISMATCH_COUNT", 7),
            mismatch_cooldown_secs: env_i64("VIGIL_MISMATCH_COOLDOWN_SECS", 30),
            overcrowd_cooldown_secs: env_i64("VIGIL_OVERCROWD_COOLDOWN_SECS", 30),
            fire_cooldown_secs: env_i64("VIGIL_FIRE_COOLDOWN_SECS", 5),
        }
    }

    /// Per-category windows and cooldowns for the reconciler.
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            zone_intrusion_cooldown: Duration::seconds(self.zone_cooldown_secs),
            zone_intrusion_proxy_cooldown: Duration::seconds(self.zone_proxy_cooldown_secs),
            unauthorized_window: Duration::seconds(self.unauth_window_secs),
            unauthorized_threshold: self.unauth_count,
            unauthorized_cooldown: Duration::seconds(self.unauth_cooldown_secs),
            mismatch_window: Duration::seconds(self.mismatch_window_secs),
            mismatch_threshold: self.mismatch_count,
            mismatch_cooldown: Duration::seconds(self.mismatch_cooldown_secs),
            overcrowd_cooldown: Duration::seconds(self.overcrowd_cooldown_secs),
            fire_cooldown: Duration::seconds(self.fire_cooldown_secs),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
