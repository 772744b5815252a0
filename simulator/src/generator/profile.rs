use crate::workflow::config::ServiceConfig;
use anyhow::ensure;
use iqrcore::records::{GeoLocation, InstanceId, QueryResult, Timestamp, TrackId, TrackMetadata};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Instance ids start here so they never collide with ranks in the UI.
const FIRST_INSTANCE_ID: InstanceId = 1000;
const SECOND: Timestamp = 1_000_000;

/// Configuration for generating a synthetic result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub count: usize,
    pub seed: u64,
    pub start_time: Timestamp,
    pub center: GeoLocation,
    pub spread: f64,
    /// Fraction of results carrying a location.
    pub located_ratio: f64,
    pub stream_id: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let service = ServiceConfig::default();
        Self::from(&service)
    }
}

impl From<&ServiceConfig> for GeneratorConfig {
    fn from(service: &ServiceConfig) -> Self {
        Self {
            count: service.result_count,
            seed: service.seed,
            start_time: service.start_time,
            center: service.center,
            spread: service.spread,
            located_ratio: 0.8,
            stream_id: service.stream_id.clone(),
        }
    }
}

/// Builds `config.count` results ranked by descending relevancy.
pub fn build_result_set(
    config: &GeneratorConfig,
) -> anyhow::Result<BTreeMap<InstanceId, QueryResult>> {
    ensure!(
        (0.0..=1.0).contains(&config.located_ratio),
        "located_ratio {} outside [0, 1]",
        config.located_ratio
    );
    ensure!(
        config.spread >= 0.0,
        "spread {} must not be negative",
        config.spread
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut results: Vec<QueryResult> = (0..config.count)
        .map(|index| {
            let instance_id = FIRST_INSTANCE_ID + index as InstanceId;
            let relevancy: f64 = rng.gen_range(0.0..1.0);
            let mut result = QueryResult::new(instance_id, 0, relevancy);
            result.preference_score = (relevancy + rng.gen_range(-0.15..0.15)).clamp(0.0, 1.0);
            result.start_time =
                config.start_time + index as Timestamp * 45 * SECOND + rng.gen_range(0..SECOND);
            result.end_time = result.start_time + rng.gen_range(2..30) * SECOND;
            if rng.gen_bool(config.located_ratio) {
                result.location = Some(GeoLocation {
                    northing: config.center.northing
                        + rng.gen_range(-config.spread..=config.spread),
                    easting: config.center.easting
                        + rng.gen_range(-config.spread..=config.spread),
                });
            }
            let track_count = rng.gen_range(1..=3);
            result.tracks = (0..track_count)
                .map(|_| TrackMetadata {
                    id: TrackId {
                        serial_number: rng.gen_range(1..10_000),
                        source: config.stream_id.clone(),
                    },
                })
                .collect();
            result.stream_id = Some(config.stream_id.clone());
            result
        })
        .collect();

    assign_ranks(&mut results);
    Ok(results
        .into_iter()
        .map(|result| (result.instance_id, result))
        .collect())
}

/// Sorts by descending relevancy and numbers the ranks from 1.
pub fn assign_ranks(results: &mut [QueryResult]) {
    results.sort_by(|a, b| {
        b.relevancy_score
            .total_cmp(&a.relevancy_score)
            .then(a.instance_id.cmp(&b.instance_id))
    });
    for (index, result) in results.iter_mut().enumerate() {
        result.rank = index as i64 + 1;
    }
}
