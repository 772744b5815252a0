use anyhow::anyhow;
use iqrcore::records::{QueryResult, Timestamp};
use iqrcore::session::PlayerId;
use log::debug;
use std::collections::BTreeMap;
use std::time::Instant;

/// Playback state of one simulated video player.
#[derive(Debug, Clone, Default)]
pub struct VideoPlayer {
    pub stream_id: Option<String>,
    pub begin_time: Timestamp,
    pub end_time: Timestamp,
    pub current_time: f64,
    pub trails_visible: bool,
    pub track_count: usize,
    first_play: Option<Instant>,
}

impl VideoPlayer {
    fn new() -> Self {
        Self {
            trails_visible: true,
            ..Default::default()
        }
    }

    fn load(&mut self, result: &QueryResult) {
        self.stream_id = result.stream_id.clone();
        self.begin_time = result.start_time;
        self.end_time = result.end_time;
        self.current_time = result.start_time as f64;
        self.track_count = result.tracks.len();
        self.first_play = None;
    }

    /// Begin time plus the wall time elapsed since the first play after a stop.
    fn play_at(&mut self, now: Instant) -> f64 {
        let first = *self.first_play.get_or_insert(now);
        let elapsed = now.duration_since(first).as_micros() as f64;
        self.current_time = self.begin_time as f64 + elapsed;
        self.current_time
    }
}

/// Players created through `createVideoPlayer`, numbered from 1.
#[derive(Debug, Default)]
pub struct VideoPlayers {
    last_id: PlayerId,
    players: BTreeMap<PlayerId, VideoPlayer>,
}

impl VideoPlayers {
    pub fn create(&mut self) -> PlayerId {
        self.last_id += 1;
        self.players.insert(self.last_id, VideoPlayer::new());
        debug!("created video player {}", self.last_id);
        self.last_id
    }

    /// One status line per player, as drawn by the next frame.
    pub fn render(&self) -> Vec<String> {
        self.players
            .iter()
            .map(|(id, player)| {
                format!(
                    "player {id}: stream {} {}..{} at {:.0}, {} tracks, trails {}",
                    player.stream_id.as_deref().unwrap_or("-"),
                    player.begin_time,
                    player.end_time,
                    player.current_time,
                    player.track_count,
                    if player.trails_visible { "on" } else { "off" }
                )
            })
            .collect()
    }

    fn player_mut(&mut self, id: PlayerId) -> anyhow::Result<&mut VideoPlayer> {
        self.players
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Video player {id} not found"))
    }

    /// Loads a result into a player. Failures are reported as a message
    /// rather than an error, matching the `setVideoData` reply shape.
    pub fn set_video_data(&mut self, id: PlayerId, result: Option<&QueryResult>) -> Option<String> {
        let Some(player) = self.players.get_mut(&id) else {
            return Some(format!("Video player {id} not found"));
        };
        match result {
            Some(result) => {
                player.load(result);
                None
            }
            None => Some("No result loaded for video player".into()),
        }
    }

    pub fn play(&mut self, id: PlayerId) -> anyhow::Result<f64> {
        self.play_at(id, Instant::now())
    }

    pub fn play_at(&mut self, id: PlayerId, now: Instant) -> anyhow::Result<f64> {
        Ok(self.player_mut(id)?.play_at(now))
    }

    pub fn stop(&mut self, id: PlayerId) -> anyhow::Result<()> {
        self.player_mut(id)?.first_play = None;
        Ok(())
    }

    pub fn seek(&mut self, id: PlayerId, timestamp: f64) -> anyhow::Result<f64> {
        let player = self.player_mut(id)?;
        player.current_time = timestamp;
        Ok(player.current_time)
    }

    pub fn set_trails_visible(&mut self, id: PlayerId, visible: bool) -> anyhow::Result<()> {
        self.player_mut(id)?.trails_visible = visible;
        Ok(())
    }
}
