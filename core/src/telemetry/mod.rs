pub mod log;
pub mod metrics;

pub use self::log::log_rpc_failure;
pub use self::metrics::{Metrics, SessionMetrics};
