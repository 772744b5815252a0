use super::transport::RpcTransport;
use crate::prelude::{RpcError, RpcResult};
use crate::records::{InstanceId, IqrClassification, ResultPage, Timestamp};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Handle of a video player created on the service.
pub type PlayerId = i64;

/// Working set size passed with every query execution.
pub const WORKING_SET_SIZE: u32 = 1500;

/// Results fetched per completed query.
pub const RESULT_PAGE_LIMIT: usize = 100;

/// Remote method names.
pub mod methods {
    pub const CREATE_VIDEO_PLAYER: &str = "createVideoPlayer";
    pub const SET_VIDEO_DATA: &str = "setVideoData";
    pub const RENDER: &str = "render";
    pub const PLAY: &str = "videoPlayer:play";
    pub const STOP: &str = "videoPlayer:stop";
    pub const SEEK: &str = "videoPlayer:seek";
    pub const SET_TRAILS_VISIBLE: &str = "videoPlayer:setTrailsVisible";
    pub const SET_RESULT_FEEDBACK: &str = "query:setResultFeedback";
    pub const REFINE: &str = "query:refine";
    pub const GET_QUERY_URL: &str = "getQueryUrl";
    pub const EXECUTE_QUERY: &str = "executeQuery";
    pub const IS_COMPLETED: &str = "query:isCompleted";
    pub const GET_ALL_RESULTS: &str = "query:getAllResults";
    pub const GET_STATUS: &str = "query:getStatus";
    pub const SHUT_DOWN: &str = "query:shutDown";
}

/// Typed calls over an [`RpcTransport`].
pub struct Session<T> {
    transport: T,
}

impl<T: RpcTransport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call(&self, method: &'static str, args: Vec<Value>) -> RpcResult<Value> {
        debug!("rpc {method} {args:?}");
        self.transport.call(method, args).await
    }

    async fn call_typed<R: DeserializeOwned>(
        &self,
        method: &'static str,
        args: Vec<Value>,
    ) -> RpcResult<R> {
        let value = self.call(method, args).await?;
        serde_json::from_value(value).map_err(|err| RpcError::Decode {
            method: method.to_string(),
            reason: err.to_string(),
        })
    }

    async fn call_timestamp(&self, method: &'static str, args: Vec<Value>) -> RpcResult<Timestamp> {
        let value = self.call(method, args).await?;
        value
            .as_f64()
            .map(|micros| micros.round() as Timestamp)
            .ok_or_else(|| RpcError::Decode {
                method: method.to_string(),
                reason: format!("expected a timestamp, got {value}"),
            })
    }

    pub async fn create_video_player(&self) -> RpcResult<PlayerId> {
        self.call_typed(methods::CREATE_VIDEO_PLAYER, vec![]).await
    }

    /// Switches the player to a result. `Some` carries the service's error text.
    pub async fn set_video_data(
        &self,
        player: PlayerId,
        instance_id: InstanceId,
    ) -> RpcResult<Option<String>> {
        let value = self
            .call(methods::SET_VIDEO_DATA, vec![json!(player), json!(instance_id)])
            .await?;
        Ok(match value {
            Value::Null => None,
            Value::String(message) => Some(message),
            other => Some(other.to_string()),
        })
    }

    pub async fn render(&self) -> RpcResult<()> {
        self.call(methods::RENDER, vec![]).await.map(drop)
    }

    pub async fn play(&self, player: PlayerId) -> RpcResult<Timestamp> {
        self.call_timestamp(methods::PLAY, vec![json!(player)]).await
    }

    pub async fn stop(&self, player: PlayerId) -> RpcResult<()> {
        self.call(methods::STOP, vec![json!(player)]).await.map(drop)
    }

    pub async fn seek(&self, player: PlayerId, position: Timestamp) -> RpcResult<Timestamp> {
        self.call_timestamp(methods::SEEK, vec![json!(player), json!(position)])
            .await
    }

    pub async fn set_trails_visible(&self, player: PlayerId, visible: bool) -> RpcResult<()> {
        self.call(methods::SET_TRAILS_VISIBLE, vec![json!(player), json!(visible)])
            .await
            .map(drop)
    }

    pub async fn set_result_feedback(
        &self,
        instance_id: InstanceId,
        classification: IqrClassification,
    ) -> RpcResult<()> {
        self.call(
            methods::SET_RESULT_FEEDBACK,
            vec![json!(instance_id), json!(classification)],
        )
        .await
        .map(drop)
    }

    /// Whether the service accepted the refinement.
    pub async fn refine(&self) -> RpcResult<bool> {
        let value = self.call(methods::REFINE, vec![]).await?;
        Ok(truthy(&value))
    }

    pub async fn get_query_url(&self) -> RpcResult<String> {
        let value = self.call(methods::GET_QUERY_URL, vec![]).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Anything but an explicit `false` means the query is executing.
    pub async fn execute_query(
        &self,
        query_url: &str,
        plan: &str,
        working_set_size: u32,
    ) -> RpcResult<bool> {
        let value = self
            .call(
                methods::EXECUTE_QUERY,
                vec![json!(query_url), json!(plan), json!(working_set_size)],
            )
            .await?;
        Ok(value != Value::Bool(false))
    }

    /// Only an explicit `true` counts as completed.
    pub async fn is_completed(&self) -> RpcResult<bool> {
        let value = self.call(methods::IS_COMPLETED, vec![]).await?;
        Ok(value == Value::Bool(true))
    }

    pub async fn get_all_results(&self, offset: usize, limit: usize) -> RpcResult<ResultPage> {
        self.call_typed(methods::GET_ALL_RESULTS, vec![json!(offset), json!(limit)])
            .await
    }

    pub async fn get_status(&self) -> RpcResult<String> {
        let value = self.call(methods::GET_STATUS, vec![]).await?;
        Ok(match value {
            Value::String(status) => status,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub async fn shut_down(&self) -> RpcResult<()> {
        self.call(methods::SHUT_DOWN, vec![]).await.map(drop)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::transport::mock::ScriptedTransport;

    #[tokio::test]
    async fn completion_requires_explicit_true() {
        let session = Session::new(
            ScriptedTransport::new()
                .reply(methods::IS_COMPLETED, json!([1, 2]))
                .reply(methods::IS_COMPLETED, json!(true)),
        );
        assert!(!session.is_completed().await.unwrap());
        assert!(session.is_completed().await.unwrap());
    }

    #[tokio::test]
    async fn execute_is_rejected_only_by_false() {
        let session = Session::new(
            ScriptedTransport::new()
                .reply(methods::EXECUTE_QUERY, json!(false))
                .reply(methods::EXECUTE_QUERY, Value::Null),
        );
        assert!(!session.execute_query("svc://", "plan", 1500).await.unwrap());
        assert!(session.execute_query("svc://", "plan", 1500).await.unwrap());

        let calls = session.transport().calls();
        assert_eq!(calls[0].1, vec![json!("svc://"), json!("plan"), json!(1500)]);
    }

    #[tokio::test]
    async fn timestamps_accept_float_replies() {
        let session = Session::new(
            ScriptedTransport::new()
                .reply(methods::PLAY, json!(1_500_000.4))
                .reply(methods::SEEK, Value::Null),
        );
        assert_eq!(session.play(1).await.unwrap(), 1_500_000);
        assert!(matches!(
            session.seek(1, 5).await,
            Err(RpcError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn feedback_sends_classification_code() {
        let session = Session::new(
            ScriptedTransport::new().always(methods::SET_RESULT_FEEDBACK, json!(true)),
        );
        session
            .set_result_feedback(8, IqrClassification::Negative)
            .await
            .unwrap();
        assert_eq!(
            session.transport().calls()[0],
            (methods::SET_RESULT_FEEDBACK.to_string(), vec![json!(8), json!(1)])
        );
    }

    #[tokio::test]
    async fn video_data_error_text_is_returned() {
        let session = Session::new(
            ScriptedTransport::new()
                .reply(methods::SET_VIDEO_DATA, json!("Video player 4 not found"))
                .reply(methods::SET_VIDEO_DATA, Value::Null),
        );
        assert_eq!(
            session.set_video_data(4, 1).await.unwrap().as_deref(),
            Some("Video player 4 not found")
        );
        assert_eq!(session.set_video_data(1, 1).await.unwrap(), None);
    }
}
