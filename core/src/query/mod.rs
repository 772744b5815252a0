//! Query submission, completion polling and result fetch.

pub mod controller;
pub mod state;

pub use controller::{QueryController, DEFAULT_POLL_INTERVAL};
pub use state::{QueryKind, QueryPhase};
