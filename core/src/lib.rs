//! Core of the IQR result viewer: result records, formatting, the display
//! pipeline with marker overlay and selection, and the typed session facade
//! that drives a remote query/visualization service.
//!
//! The crate holds no UI toolkit code; the visualizer renders the view models
//! produced here and the simulator serves the remote side of the session.

pub mod config;
pub mod format;
pub mod prelude;
pub mod query;
pub mod records;
pub mod session;
pub mod telemetry;
pub mod video;
pub mod view;

pub use config::ViewerConfig;
pub use prelude::{
    ConfigParseError, ConnectionError, OverlayError, QueryError, RpcError, RpcResult,
};
