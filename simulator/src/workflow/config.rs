use anyhow::Context;
use iqrcore::config::ViewerConfig;
use iqrcore::records::{GeoLocation, Timestamp};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Value answered to `getQueryUrl`.
    pub query_url: String,
    pub stream_id: String,
    /// `query:isCompleted` polls answered `false` before completion.
    pub completion_polls: u32,
    pub result_count: usize,
    pub feedback_count: usize,
    pub seed: u64,
    pub center: GeoLocation,
    /// Half-width of the scatter around `center`, in degrees.
    pub spread: f64,
    /// Microseconds since the epoch of the earliest result.
    pub start_time: Timestamp,
    /// Document served on `GET /config`.
    pub viewer: ViewerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            query_url: "iqr://127.0.0.1:12345/simulated".into(),
            stream_id: "sim-stream-0".into(),
            completion_polls: 2,
            result_count: 250,
            feedback_count: 8,
            seed: 0,
            center: GeoLocation {
                northing: 42.8496,
                easting: -73.7553,
            },
            spread: 0.05,
            start_time: 1_367_366_400_000_000,
            viewer: ViewerConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading service config {}", path_ref.display()))?;
        let config: ServiceConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing service config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(seed: u64, result_count: usize, completion_polls: u32) -> Self {
        Self {
            seed,
            result_count,
            completion_polls,
            ..Default::default()
        }
    }
}
