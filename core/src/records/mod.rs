pub mod classification;
pub mod result;

pub use classification::IqrClassification;
pub use result::{GeoLocation, QueryResult, ResultPage, TrackId, TrackMetadata};

/// Key identifying one detection/track result within a result set.
pub type InstanceId = i64;

/// Microseconds since the Unix epoch.
pub type Timestamp = i64;
