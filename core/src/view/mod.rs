//! Display-side state: rows, markers, map viewport and selection.

pub mod display;
pub mod map;
pub mod markers;
pub mod rows;
pub mod selection;

pub use display::{ResultDisplay, TrackRow};
pub use map::{MapPoint, MapProjection, MapViewport, RESULT_ZOOM};
pub use markers::{Marker, MarkerIcon, MarkerOverlay};
pub use rows::{render_row, Relevance, ResultRow, ScoreField};
pub use selection::{FeedbackUpdate, Panel, RowKey, SelectionChange, VideoScrubber};
