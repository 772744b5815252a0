use crate::prelude::RpcError;
use serde_json::Value;
use std::future::Future;

/// Request/response call against the remote session.
///
/// Each call resolves once to a reply value or an [`RpcError`]; calls are not
/// cancellable once issued.
pub trait RpcTransport: Send + Sync {
    fn call(
        &self,
        method: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Value, RpcError>> + Send;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Transport answering from per-method reply queues, then from sticky
    /// replies, recording every call.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        queued: Mutex<HashMap<String, VecDeque<Result<Value, RpcError>>>>,
        sticky: Mutex<HashMap<String, Result<Value, RpcError>>>,
        calls: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn reply(self, method: &str, value: Value) -> Self {
            self.queued
                .lock()
                .unwrap()
                .entry(method.to_string())
                .or_default()
                .push_back(Ok(value));
            self
        }

        pub(crate) fn fail(self, method: &str, message: &str) -> Self {
            self.queued
                .lock()
                .unwrap()
                .entry(method.to_string())
                .or_default()
                .push_back(Err(RpcError::Call {
                    method: method.to_string(),
                    message: message.to_string(),
                    detail: vec![],
                }));
            self
        }

        pub(crate) fn always(self, method: &str, value: Value) -> Self {
            self.sticky
                .lock()
                .unwrap()
                .insert(method.to_string(), Ok(value));
            self
        }

        pub(crate) fn calls(&self) -> Vec<(String, Vec<Value>)> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn count(&self, method: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(name, _)| name == method)
                .count()
        }
    }

    impl RpcTransport for ScriptedTransport {
        async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, RpcError> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), args));
            let queued = self
                .queued
                .lock()
                .unwrap()
                .get_mut(method)
                .and_then(VecDeque::pop_front);
            if let Some(reply) = queued {
                return reply;
            }
            self.sticky
                .lock()
                .unwrap()
                .get(method)
                .cloned()
                .unwrap_or_else(|| {
                    Err(RpcError::Transport {
                        method: method.to_string(),
                        reason: "no scripted reply".into(),
                    })
                })
        }
    }
}
