//! Remote video render control for the selected result.

use crate::prelude::RpcResult;
use crate::records::{InstanceId, Timestamp};
use crate::session::{PlayerId, RpcTransport, Session};
use crate::telemetry::log_rpc_failure;
use log::warn;
use std::sync::Arc;

/// Issues player calls for the session's single video player and asks the
/// service to re-render after each change.
pub struct VideoController<T> {
    session: Arc<Session<T>>,
    player: PlayerId,
}

impl<T> Clone for VideoController<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            player: self.player,
        }
    }
}

impl<T: RpcTransport> VideoController<T> {
    pub fn new(session: Arc<Session<T>>, player: PlayerId) -> Self {
        Self { session, player }
    }

    /// Creates the player on the service.
    pub async fn create(session: Arc<Session<T>>) -> RpcResult<Self> {
        let player = session.create_video_player().await?;
        Ok(Self::new(session, player))
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Switches the render to `instance_id`. An error string from the service
    /// is logged and does not prevent the render.
    pub async fn load_result(&self, instance_id: InstanceId) -> RpcResult<()> {
        let reply = self
            .session
            .set_video_data(self.player, instance_id)
            .await
            .inspect_err(|err| log_rpc_failure("Failed to set video data", err))?;
        if let Some(message) = reply {
            warn!("Failed to set video data: {message}");
        }
        self.render().await
    }

    /// Advances playback one step and returns the new video timestamp.
    pub async fn play_step(&self) -> RpcResult<Timestamp> {
        let timestamp = self
            .session
            .play(self.player)
            .await
            .inspect_err(|err| log_rpc_failure("Failed to play video", err))?;
        self.render().await?;
        Ok(timestamp)
    }

    pub async fn stop(&self) -> RpcResult<()> {
        self.session
            .stop(self.player)
            .await
            .inspect_err(|err| log_rpc_failure("Failed to stop video playback", err))
    }

    pub async fn seek(&self, position: Timestamp) -> RpcResult<Timestamp> {
        let timestamp = self
            .session
            .seek(self.player, position)
            .await
            .inspect_err(|err| log_rpc_failure("Failed to seek video", err))?;
        self.render().await?;
        Ok(timestamp)
    }

    pub async fn set_trails_visible(&self, visible: bool) -> RpcResult<()> {
        self.session
            .set_trails_visible(self.player, visible)
            .await
            .inspect_err(|err| log_rpc_failure("Failed to set trail visibility", err))?;
        self.render().await
    }

    async fn render(&self) -> RpcResult<()> {
        self.session
            .render()
            .await
            .inspect_err(|err| log_rpc_failure("Failed to render", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::methods;
    use crate::session::transport::mock::ScriptedTransport;
    use serde_json::{json, Value};

    fn controller(transport: ScriptedTransport) -> VideoController<ScriptedTransport> {
        VideoController::new(Arc::new(Session::new(transport)), 2)
    }

    #[tokio::test]
    async fn load_result_renders_even_with_service_error() {
        let video = controller(
            ScriptedTransport::new()
                .reply(methods::SET_VIDEO_DATA, json!("no stream"))
                .always(methods::RENDER, Value::Null),
        );
        video.load_result(9).await.unwrap();
        let names: Vec<_> = video
            .session
            .transport()
            .calls()
            .into_iter()
            .map(|(method, _)| method)
            .collect();
        assert_eq!(names, vec![methods::SET_VIDEO_DATA, methods::RENDER]);
    }

    #[tokio::test]
    async fn seek_returns_service_timestamp() {
        let video = controller(
            ScriptedTransport::new()
                .reply(methods::SEEK, json!(4_000_000.0))
                .always(methods::RENDER, Value::Null),
        );
        assert_eq!(video.seek(3_999_999).await.unwrap(), 4_000_000);
        assert_eq!(
            video.session.transport().calls()[0].1,
            vec![json!(2), json!(3_999_999)]
        );
    }

    #[tokio::test]
    async fn failed_play_skips_render() {
        let video = controller(ScriptedTransport::new().fail(methods::PLAY, "player gone"));
        assert!(video.play_step().await.is_err());
        assert_eq!(video.session.transport().count(methods::RENDER), 0);
    }

    #[tokio::test]
    async fn trails_toggle_then_render() {
        let video = controller(
            ScriptedTransport::new()
                .always(methods::SET_TRAILS_VISIBLE, json!(null))
                .always(methods::RENDER, Value::Null),
        );
        video.set_trails_visible(false).await.unwrap();
        assert_eq!(
            video.session.transport().calls()[0],
            (methods::SET_TRAILS_VISIBLE.to_string(), vec![json!(2), json!(false)])
        );
        assert_eq!(video.session.transport().count(methods::RENDER), 1);
    }
}
