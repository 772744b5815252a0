use super::{InstanceId, IqrClassification, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Geographic position in WGS84 degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoLocation {
    pub northing: f64,
    pub easting: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackId {
    pub serial_number: i64,
    pub source: String,
}

/// Display-only description of one track contributing to a result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackMetadata {
    pub id: TrackId,
}

/// One query result as serialized by the query service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub instance_id: InstanceId,
    pub rank: i64,
    #[serde(default)]
    pub relevancy_score: f64,
    #[serde(default)]
    pub preference_score: f64,
    #[serde(default)]
    pub user_score: IqrClassification,
    #[serde(default)]
    pub start_time: Timestamp,
    #[serde(default)]
    pub end_time: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoLocation>,
    #[serde(default)]
    pub tracks: Vec<TrackMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_id: Option<String>,
}

impl QueryResult {
    pub fn new(instance_id: InstanceId, rank: i64, relevancy_score: f64) -> Self {
        Self {
            instance_id,
            rank,
            relevancy_score,
            preference_score: 0.0,
            user_score: IqrClassification::Unclassified,
            start_time: 0,
            end_time: 0,
            location: None,
            tracks: Vec::new(),
            stream_id: None,
            mission_id: None,
        }
    }
}

/// Reply of `query:getAllResults`: ranked ids, feedback requests and every
/// record either list references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    #[serde(default)]
    pub result_ids: Vec<InstanceId>,
    #[serde(default)]
    pub feedback_ids: Vec<InstanceId>,
    #[serde(default)]
    pub results: BTreeMap<InstanceId, QueryResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_decodes_service_payload() {
        let payload = r#"{
            "resultIds": [7, 3],
            "feedbackIds": [3],
            "results": {
                "7": {"instanceId": 7, "rank": 1, "relevancyScore": 0.9,
                      "preferenceScore": 0.1, "userScore": 0,
                      "startTime": 1000, "endTime": 2000,
                      "location": {"northing": 42.8, "easting": -73.7},
                      "tracks": [{"id": {"serialNumber": 4, "source": "kw18"}}]},
                "3": {"instanceId": 3, "rank": 2, "relevancyScore": 0.4,
                      "streamId": "cam-1"}
            }
        }"#;

        let page: ResultPage = serde_json::from_str(payload).unwrap();
        assert_eq!(page.result_ids, vec![7, 3]);
        let first = &page.results[&7];
        assert_eq!(first.user_score, IqrClassification::Positive);
        assert_eq!(first.tracks[0].id.serial_number, 4);
        let second = &page.results[&3];
        assert!(second.location.is_none());
        assert_eq!(second.user_score, IqrClassification::Unclassified);
        assert_eq!(second.stream_id.as_deref(), Some("cam-1"));
    }

    #[test]
    fn page_without_result_ids_defaults_to_empty() {
        let page: ResultPage = serde_json::from_str(r#"{"results": {}, "feedbackIds": []}"#).unwrap();
        assert!(page.result_ids.is_empty());
        assert!(page.results.is_empty());
    }
}
