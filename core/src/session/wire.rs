use crate::prelude::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /rpc`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcFault {
    pub message: String,
    #[serde(default)]
    pub detail: Vec<String>,
}

/// Either `{"result": ..}` or `{"error": {"message", "detail"}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RpcReply {
    Result(Value),
    Error(RpcFault),
}

impl RpcReply {
    pub fn into_result(self, method: &str) -> Result<Value, RpcError> {
        match self {
            RpcReply::Result(value) => Ok(value),
            RpcReply::Error(fault) => Err(RpcError::Call {
                method: method.to_string(),
                message: fault.message,
                detail: fault.detail,
            }),
        }
    }
}
