use iqrcore::prelude::{ConnectionError, RpcError};
use iqrcore::session::{RpcReply, RpcRequest, RpcTransport};
use serde_json::Value;
use std::time::Duration;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON-over-HTTP transport against the service's `/rpc` route.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Probes `GET {url}/health` before handing out the transport.
    pub async fn connect(url: String) -> Result<Self, ConnectionError> {
        let base_url = url.trim_end_matches('/').to_string();
        let client = reqwest::Client::new();
        let failure = |reason: String| ConnectionError::Unreachable {
            url: base_url.clone(),
            reason,
        };

        let response = client
            .get(format!("{base_url}/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|err| failure(err.to_string()))?;
        if !response.status().is_success() {
            return Err(failure(format!(
                "health check returned {}",
                response.status()
            )));
        }

        Ok(Self { client, base_url })
    }
}

impl RpcTransport for HttpTransport {
    async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        let response = self
            .client
            .post(format!("{}/rpc", self.base_url))
            .json(&RpcRequest::new(method, args))
            .send()
            .await
            .map_err(|err| RpcError::Transport {
                method: method.to_string(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Transport {
                method: method.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let reply: RpcReply = response.json().await.map_err(|err| RpcError::Decode {
            method: method.to_string(),
            reason: err.to_string(),
        })?;
        reply.into_result(method)
    }
}
