use crate::prelude::RpcError;
use log::warn;

/// Logs a failed remote call under `label`, one line per service detail.
pub fn log_rpc_failure(label: &str, err: &RpcError) {
    warn!("{label}: {err}");
    for line in err.detail() {
        warn!("{line}");
    }
}
