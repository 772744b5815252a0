use crate::records::InstanceId;

/// Failure of a single remote call against the visualization session.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("{method} rejected: {message}")]
    Call {
        method: String,
        message: String,
        detail: Vec<String>,
    },
    #[error("transport failure calling {method}: {reason}")]
    Transport { method: String, reason: String },
    #[error("unexpected reply to {method}: {reason}")]
    Decode { method: String, reason: String },
}

impl RpcError {
    /// Extra diagnostic lines the service attached to a rejection.
    pub fn detail(&self) -> &[String] {
        match self {
            RpcError::Call { detail, .. } => detail,
            _ => &[],
        }
    }

    pub fn method(&self) -> &str {
        match self {
            RpcError::Call { method, .. }
            | RpcError::Transport { method, .. }
            | RpcError::Decode { method, .. } => method,
        }
    }
}

/// The remote session could not be started or connected.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("unable to reach session at {url}: {reason}")]
    Unreachable { url: String, reason: String },
    #[error("session did not start on {primary} nor on embedded url {fallback}")]
    Exhausted { primary: String, fallback: String },
}

/// The viewer configuration document could not be used.
#[derive(thiserror::Error, Debug)]
pub enum ConfigParseError {
    #[error("configuration document is empty")]
    Empty,
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Outcome of a query submission that did not produce a result page.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("a query is already in flight")]
    Busy,
    #[error("invalid query url")]
    InvalidQueryUrl,
    #[error("query was not accepted: {status}")]
    Rejected { status: String },
    #[error("query superseded before completion")]
    Cancelled,
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    #[error("no marker layer exists for marker {instance_id}")]
    NoLayer { instance_id: InstanceId },
}

pub type RpcResult<T> = Result<T, RpcError>;
