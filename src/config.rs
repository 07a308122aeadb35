use anyhow::{Context, Result};
use pogo_core::{AuthProvider, Geoposition};
use pogo_net::DeviceProfile;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/client.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub credentials_path: PathBuf,
    /// Data cache file. No caching across runs when unset.
    pub cache_path: Option<PathBuf>,
    /// Exchange log to serve the session from.
    pub replay_path: Option<PathBuf>,
    /// Stop after this many polling ticks. Runs until interrupted when unset.
    pub max_ticks: Option<u64>,
    /// Tick period of the polling timer. Defaults to the server's minimum
    /// refresh interval.
    pub poll_interval_ms: Option<u64>,
    pub account: AccountConfig,
    pub position: PositionConfig,
    pub device: DeviceProfile,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AccountConfig {
    pub provider: AuthProvider,
    /// Logs in with these credentials when set, otherwise from stored state.
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct PositionConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            credentials_path: PathBuf::from("data/credentials.json"),
            cache_path: Some(PathBuf::from("data/cache.json")),
            replay_path: None,
            max_ticks: None,
            poll_interval_ms: None,
            account: AccountConfig::default(),
            position: PositionConfig::default(),
            device: DeviceProfile::default(),
        }
    }
}

impl Default for PositionConfig {
    fn default() -> Self {
        // Central Park, New York.
        Self {
            latitude: 40.7829,
            longitude: -73.9654,
            altitude: 10.0,
            accuracy: 10.0,
        }
    }
}

impl PositionConfig {
    pub fn geoposition(&self) -> Geoposition {
        Geoposition::new(self.latitude, self.longitude, self.altitude)
    }
}

impl ClientConfig {
    /// Read and parse a config file, returning errors to the caller.
    pub fn read(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_ms.map(Duration::from_millis)
    }
}

/// Whether a failure to load `path` is the default config simply being absent.
pub fn is_missing_default(path: &Path, err: &anyhow::Error) -> bool {
    path == Path::new(DEFAULT_CONFIG_PATH)
        && err
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}
