//! Pure helpers shared by the row renderer and the display pipeline.

pub mod color;
pub mod sort;
pub mod time;

pub use color::{color_for_score, default_color_stops, ColorStop, DEFAULT_COLOR};
pub use sort::{sort_by_fields, SortField, SortKey, FEEDBACK_ORDER, RANK_ORDER};
pub use time::format_timestamp;
