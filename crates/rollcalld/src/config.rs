use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Path to the enrollment gallery JSON file.
    pub gallery_path: PathBuf,
    /// Path to the attendance ledger CSV file.
    pub ledger_path: PathBuf,
    /// Maximum Euclidean distance for a positive identity match.
    pub match_threshold: f32,
    /// Optional replay feed (JSONL of per-frame detections) standing in for
    /// the live camera and detection model.
    pub replay_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = rollcall_core::default_data_dir();

        let gallery_path = std::env::var("ROLLCALL_GALLERY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("gallery.json"));

        let ledger_path = std::env::var("ROLLCALL_LEDGER_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("attendance.csv"));

        Self {
            gallery_path,
            ledger_path,
            match_threshold: env_f32(
                "ROLLCALL_MATCH_THRESHOLD",
                rollcall_core::DEFAULT_MATCH_THRESHOLD,
            ),
            replay_path: std::env::var("ROLLCALL_REPLAY_PATH").ok().map(PathBuf::from),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
