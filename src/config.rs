use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Process settings, read from `LANECONTROL_*` environment variables.
/// Values that fail to parse fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// JSON seed for the alley/lane catalog. Unset serves an empty catalog.
    pub catalog_path: Option<PathBuf>,
    pub metrics_port: Option<u16>,
    /// WAL appends since the last compaction that trigger the next one.
    pub compact_threshold: u64,
    /// How long shutdown waits for in-flight requests.
    pub drain_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            catalog_path: None,
            metrics_port: None,
            compact_threshold: 1000,
            drain_timeout: Duration::from_secs(10),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind: lookup("LANECONTROL_BIND").unwrap_or(defaults.bind),
            port: parsed(&lookup, "LANECONTROL_PORT").unwrap_or(defaults.port),
            data_dir: lookup("LANECONTROL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            catalog_path: lookup("LANECONTROL_CATALOG").map(PathBuf::from),
            metrics_port: parsed(&lookup, "LANECONTROL_METRICS_PORT"),
            compact_threshold: parsed(&lookup, "LANECONTROL_COMPACT_THRESHOLD")
                .unwrap_or(defaults.compact_threshold),
            drain_timeout: parsed(&lookup, "LANECONTROL_DRAIN_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.drain_timeout),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("reservations.wal")
    }
}
