use super::facade::{PlayerId, Session};
use super::transport::RpcTransport;
use crate::prelude::ConnectionError;
use crate::telemetry::log_rpc_failure;
use crate::video::VideoController;
use log::{info, warn};
use std::future::Future;
use std::sync::Arc;

/// Downgrades secure schemes when the viewer itself is not served securely.
pub fn normalize_session_url(url: &str, secure: bool) -> String {
    if secure {
        return url.to_string();
    }
    if let Some(rest) = url.strip_prefix("wss:") {
        format!("ws:{rest}")
    } else if let Some(rest) = url.strip_prefix("https:") {
        format!("http:{rest}")
    } else {
        url.to_string()
    }
}

/// Connects to `primary`, falling back once to the embedded `fallback` url.
pub async fn start_session<T, F, Fut>(
    primary: &str,
    fallback: &str,
    connect: F,
) -> Result<Session<T>, ConnectionError>
where
    T: RpcTransport,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, ConnectionError>>,
{
    info!("starting session at {primary}");
    match connect(primary.to_string()).await {
        Ok(transport) => return Ok(Session::new(transport)),
        Err(err) => {
            warn!("{err}");
            warn!("The remote session did not properly start. Trying embedded URL.");
        }
    }

    match connect(fallback.to_string()).await {
        Ok(transport) => Ok(Session::new(transport)),
        Err(err) => {
            warn!("{err}");
            Err(ConnectionError::Exhausted {
                primary: primary.to_string(),
                fallback: fallback.to_string(),
            })
        }
    }
}

/// The one live session of the viewer and the video player bound to it.
pub struct AppSession<T> {
    session: Arc<Session<T>>,
    player: Option<PlayerId>,
}

impl<T: RpcTransport> AppSession<T> {
    /// Starts the session and creates its video player. A player creation
    /// failure is logged and leaves the session usable for queries.
    pub async fn start<F, Fut>(
        primary: &str,
        fallback: &str,
        connect: F,
    ) -> Result<Self, ConnectionError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ConnectionError>>,
    {
        let session = start_session(primary, fallback, connect).await?;
        let player = match session.create_video_player().await {
            Ok(player) => Some(player),
            Err(err) => {
                log_rpc_failure("Failed to create video player", &err);
                None
            }
        };
        Ok(Self {
            session: Arc::new(session),
            player,
        })
    }

    pub fn session(&self) -> Arc<Session<T>> {
        Arc::clone(&self.session)
    }

    pub fn player(&self) -> Option<PlayerId> {
        self.player
    }

    /// Controller for the session's video player, if one was created.
    pub fn video(&self) -> Option<VideoController<T>> {
        self.player
            .map(|player| VideoController::new(self.session(), player))
    }

    /// Tears the session down; it is never reused afterwards.
    pub async fn end(self) {
        if let Err(err) = self.session.shut_down().await {
            log_rpc_failure("Failed to shut down query session", &err);
        }
        info!("session ended");
    }
}
