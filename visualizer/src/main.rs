use iced::{
    time,
    widget::{
        button, column, mouse_area, row, scrollable, slider, text, text_input, Canvas, Column,
        Container,
    },
    Alignment, Color, Element, Length, Subscription, Task, Theme,
};
use iqrcore::config::ViewerConfig;
use iqrcore::prelude::QueryError;
use iqrcore::query::{QueryController, QueryKind, QueryPhase};
use iqrcore::records::{IqrClassification, ResultPage, Timestamp};
use iqrcore::session::{normalize_session_url, AppSession};
use iqrcore::video::VideoController;
use iqrcore::view::{Panel, Relevance, ResultDisplay, ResultRow, RowKey, SelectionChange};
use log::{info, warn};
use map_view::MarkerMap;
use std::{convert::identity, fmt, sync::Arc, time::Duration};
use transport::HttpTransport;

mod map_view;
mod transport;

const CONFIG_URL: &str = "http://127.0.0.1:9000/config";
const EMBEDDED_SESSION_URL: &str = "http://127.0.0.1:9000";
const PLAY_STEP: Duration = Duration::from_millis(100);

fn main() -> iced::Result {
    env_logger::init();
    iced::application(Viewer::boot, Viewer::update, Viewer::view)
        .title(application_title)
        .subscription(application_subscription)
        .theme(application_theme)
        .run()
}

fn application_title(state: &Viewer) -> String {
    state
        .config
        .as_ref()
        .and_then(|config| config.name.clone())
        .unwrap_or_else(|| "IQR Result Viewer".into())
}

fn application_subscription(state: &Viewer) -> Subscription<Message> {
    let tick = time::every(Duration::from_secs(1)).map(|_| Message::Tick);
    if state.playing {
        Subscription::batch([tick, time::every(PLAY_STEP).map(|_| Message::PlayTick)])
    } else {
        tick
    }
}

fn application_theme(_: &Viewer) -> Theme {
    Theme::Dark
}

type Session = AppSession<HttpTransport>;

/// Started session handed from the connect task to the update loop.
#[derive(Clone)]
struct Connected(Arc<Session>);

impl fmt::Debug for Connected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connected")
            .field("player", &self.0.player())
            .finish()
    }
}

struct Viewer {
    config: Option<ViewerConfig>,
    session: Option<Arc<Session>>,
    queries: Option<Arc<QueryController<HttpTransport>>>,
    video: Option<VideoController<HttpTransport>>,
    display: ResultDisplay,
    phase: QueryPhase,
    plan_path: String,
    playing: bool,
    play_pending: bool,
    trails_visible: bool,
    status: String,
    history: Vec<String>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick,
    ConfigFetched(Result<ViewerConfig, String>),
    SessionStarted(Result<Connected, String>),
    PlanPathChanged(String),
    Execute,
    Refine,
    QueryFinished(Result<ResultPage, String>),
    QueryRefused,
    RowClicked(RowKey),
    RowRightClicked(RowKey),
    PanelClicked,
    Rate(IqrClassification),
    FeedbackSent(Result<(), String>),
    VideoLoaded(Result<(), String>),
    ScrubberMoved(f64),
    ScrubberReleased,
    Seeked(Result<Timestamp, String>),
    TogglePlay,
    PlayTick,
    Played(Result<Timestamp, String>),
    ToggleTrails,
    VideoCommandDone(Result<(), String>),
    EndSession,
    SessionEnded,
}

impl Viewer {
    fn boot() -> (Self, Task<Message>) {
        (
            Viewer {
                config: None,
                session: None,
                queries: None,
                video: None,
                display: ResultDisplay::new(Default::default()),
                phase: QueryPhase::Idle,
                plan_path: "query_plan.json".into(),
                playing: false,
                play_pending: false,
                trails_visible: true,
                status: "Loading configuration...".into(),
                history: Vec::new(),
            },
            Task::perform(fetch_config(), Message::ConfigFetched),
        )
    }

    fn update(state: &mut Self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                if let Some(queries) = &state.queries {
                    // a local submission is only cleared by its QueryFinished
                    let phase = queries.phase();
                    if phase.is_busy() || !state.phase.is_busy() {
                        state.phase = phase;
                    }
                }
                Task::none()
            }
            Message::ConfigFetched(Ok(config)) => {
                state.display = ResultDisplay::new(config.projection());
                let primary = normalize_session_url(
                    &config.session_url_or(EMBEDDED_SESSION_URL),
                    false,
                );
                state.config = Some(config);
                state.status = format!("Connecting to {primary}...");
                Task::perform(start_session(primary), Message::SessionStarted)
            }
            Message::ConfigFetched(Err(err)) => {
                warn!("Failed to load viewer configuration: {err}");
                state.status = format!("Config error: {err}");
                state.push_history(state.status.clone());
                Task::perform(
                    start_session(EMBEDDED_SESSION_URL.into()),
                    Message::SessionStarted,
                )
            }
            Message::SessionStarted(Ok(Connected(session))) => {
                state.queries = Some(Arc::new(QueryController::new(session.session())));
                state.video = session.video();
                state.session = Some(session);
                state.status = "Session started".into();
                state.push_history("Session started".into());
                Task::none()
            }
            Message::SessionStarted(Err(err)) => {
                state.status = format!("Session error: {err}");
                Task::none()
            }
            Message::PlanPathChanged(path) => {
                state.plan_path = path;
                Task::none()
            }
            Message::Execute => {
                let Some(queries) = state.queries.clone() else {
                    return Task::none();
                };
                if !state.begin_query(QueryKind::Execute) {
                    return Task::none();
                }
                let path = state.plan_path.clone();
                let stop = state.stop_playback();
                state.status = format!("Submitting {path}");
                let submit = Task::perform(
                    async move {
                        match tokio::fs::read_to_string(&path).await {
                            Ok(plan) => query_outcome(queries.execute_query(&plan).await),
                            Err(err) => Message::QueryFinished(Err(format!("reading {path}: {err}"))),
                        }
                    },
                    identity,
                );
                Task::batch([stop, submit])
            }
            Message::Refine => {
                let Some(queries) = state.queries.clone() else {
                    return Task::none();
                };
                if !state.begin_query(QueryKind::Refine) {
                    return Task::none();
                }
                let stop = state.stop_playback();
                state.status = "Refining...".into();
                let refine = Task::perform(
                    async move { query_outcome(queries.refine().await) },
                    identity,
                );
                Task::batch([stop, refine])
            }
            Message::QueryFinished(Ok(page)) => {
                state.display.display_results(&page);
                state.sync_phase();
                state.status = format!(
                    "{} results, {} feedback requests",
                    page.result_ids.len(),
                    page.feedback_ids.len()
                );
                state.push_history(state.status.clone());
                Task::none()
            }
            Message::QueryRefused => {
                // the query already in flight will replace the faded markers
                state.sync_phase();
                state.push_history("Query refused: another query is in flight".into());
                Task::none()
            }
            Message::QueryFinished(Err(err)) => {
                state.display.markers_mut().fade_in_all(None);
                state.sync_phase();
                state.status = format!("Query error: {err}");
                state.push_history(state.status.clone());
                Task::none()
            }
            Message::RowClicked(key) => {
                let stop = state.stop_playback();
                let load = match (state.display.select_row(key), state.video.clone()) {
                    (Some(SelectionChange::Selected { instance_id, .. }), Some(video)) => {
                        Task::perform(
                            async move {
                                video
                                    .load_result(instance_id)
                                    .await
                                    .map_err(|err| err.to_string())
                            },
                            Message::VideoLoaded,
                        )
                    }
                    _ => Task::none(),
                };
                Task::batch([stop, load])
            }
            Message::RowRightClicked(key) => {
                state.display.open_context_menu(key);
                Task::none()
            }
            Message::PanelClicked => {
                state.display.clear_selection();
                Task::none()
            }
            Message::Rate(classification) => {
                let Some(update) = state.display.rate_context_row(classification) else {
                    return Task::none();
                };
                let Some(session) = state.session.as_ref().map(|session| session.session()) else {
                    return Task::none();
                };
                Task::perform(
                    async move {
                        session
                            .set_result_feedback(update.instance_id, update.classification)
                            .await
                            .map_err(|err| err.to_string())
                    },
                    Message::FeedbackSent,
                )
            }
            Message::FeedbackSent(result) | Message::VideoCommandDone(result) => {
                if let Err(err) = result {
                    state.status = err;
                }
                Task::none()
            }
            Message::VideoLoaded(result) => {
                match result {
                    Ok(()) => state.push_history("Video loaded".into()),
                    Err(err) => state.status = format!("Video error: {err}"),
                }
                Task::none()
            }
            Message::ScrubberMoved(value) => {
                state.display.update_timestamp_display(value.round() as Timestamp);
                Task::none()
            }
            Message::ScrubberReleased => {
                let Some(video) = state.video.clone() else {
                    return Task::none();
                };
                let stop = state.stop_playback();
                let position = state.display.scrubber().value;
                let seek = Task::perform(
                    async move { video.seek(position).await.map_err(|err| err.to_string()) },
                    Message::Seeked,
                );
                Task::batch([stop, seek])
            }
            Message::Played(result) => {
                state.play_pending = false;
                Task::done(Message::Seeked(result))
            }
            Message::Seeked(result) => {
                match result {
                    Ok(timestamp) => {
                        state.display.update_timestamp_display(timestamp);
                    }
                    Err(err) => {
                        state.playing = false;
                        state.status = format!("Video error: {err}");
                    }
                }
                Task::none()
            }
            Message::TogglePlay => {
                if state.playing {
                    return state.stop_playback();
                }
                if state.video.is_some() && state.display.scrubber().enabled {
                    state.playing = true;
                }
                Task::none()
            }
            Message::PlayTick => {
                if !state.claim_play_step() {
                    return Task::none();
                }
                let Some(video) = state.video.clone() else {
                    state.play_pending = false;
                    return Task::none();
                };
                Task::perform(
                    async move { video.play_step().await.map_err(|err| err.to_string()) },
                    Message::Played,
                )
            }
            Message::ToggleTrails => {
                let Some(video) = state.video.clone() else {
                    return Task::none();
                };
                state.trails_visible = !state.trails_visible;
                let visible = state.trails_visible;
                Task::perform(
                    async move {
                        video
                            .set_trails_visible(visible)
                            .await
                            .map_err(|err| err.to_string())
                    },
                    Message::VideoCommandDone,
                )
            }
            Message::EndSession => {
                if let Some(queries) = state.queries.take() {
                    queries.cancel();
                }
                state.video = None;
                state.playing = false;
                let Some(session) = state.session.take() else {
                    return Task::none();
                };
                match Arc::try_unwrap(session) {
                    Ok(session) => Task::perform(session.end(), |_| Message::SessionEnded),
                    Err(_) => {
                        warn!("session still shared; dropping without shutdown");
                        Task::done(Message::SessionEnded)
                    }
                }
            }
            Message::SessionEnded => {
                info!("session ended");
                state.status = "Session ended".into();
                state.push_history("Session ended".into());
                Task::none()
            }
        }
    }

    fn view(state: &Self) -> Element<'_, Message> {
        let busy = state.phase.is_busy();
        let connected = state.queries.is_some();

        let query_column = column![
            text("Query").size(26),
            text_input("Query plan file", &state.plan_path)
                .on_input(Message::PlanPathChanged)
                .padding(6),
            row![
                button("Execute")
                    .on_press_maybe((connected && !busy).then_some(Message::Execute))
                    .padding(10),
                button("Refine")
                    .on_press_maybe((connected && !busy).then_some(Message::Refine))
                    .padding(10),
                button("End session")
                    .on_press_maybe(connected.then_some(Message::EndSession))
                    .padding(10),
            ]
            .spacing(8),
            text(state.phase.loading_message().unwrap_or_default()).size(16),
            text(&state.status).size(14),
            text("Results").size(18),
            panel(state.display.results_panel(), Panel::Results, 260.0),
            text("Feedback requests").size(18),
            panel(state.display.feedback_panel(), Panel::FeedbackRequests, 160.0),
            state.rating_bar(),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fixed(520.0));

        let scrubber = state.display.scrubber();
        let scrubber_row: Element<'_, Message> = if scrubber.enabled && scrubber.max > scrubber.min
        {
            slider(
                scrubber.min as f64..=scrubber.max as f64,
                scrubber.value as f64,
                Message::ScrubberMoved,
            )
            .on_release(Message::ScrubberReleased)
            .into()
        } else {
            text("No result selected").size(12).into()
        };

        let tracks = state.display.displayed_tracks().iter().fold(
            Column::new().spacing(4),
            |col, track| col.push(text(format!("{}  {}", track.label, track.source)).size(12)),
        );

        let history_list = if state.history.is_empty() {
            Column::new().push(text("No activity yet").size(12))
        } else {
            state
                .history
                .iter()
                .rev()
                .fold(Column::new().spacing(4), |col, entry| {
                    col.push(text(entry.clone()).size(12))
                })
        };

        let map = Canvas::new(MarkerMap::new(
            state.display.markers(),
            state.display.viewport(),
        ))
        .width(Length::Fill)
        .height(Length::Fixed(300.0));

        let video_column = column![
            text("Map").size(26),
            map,
            text("Video").size(26),
            row![
                button(if state.playing { "Stop" } else { "Play" })
                    .on_press_maybe(state.video.as_ref().map(|_| Message::TogglePlay))
                    .padding(8),
                button(if state.trails_visible { "Hide trails" } else { "Show trails" })
                    .on_press_maybe(state.video.as_ref().map(|_| Message::ToggleTrails))
                    .padding(8),
                text(&scrubber.label).size(16),
            ]
            .spacing(8)
            .align_y(Alignment::Center),
            scrubber_row,
            text("Tracks").size(16),
            Container::new(scrollable(tracks).height(Length::Fixed(90.0))).padding(6),
            text("Activity log").size(16),
            Container::new(scrollable(history_list).height(Length::Fixed(90.0))).padding(6),
        ]
        .spacing(10)
        .padding(16)
        .width(Length::Fill);

        let layout = row![query_column, video_column]
            .spacing(20)
            .align_y(Alignment::Start)
            .padding(20);

        Container::new(layout)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn rating_bar(&self) -> Element<'_, Message> {
        let Some(key) = self.display.context_row() else {
            return text("Right-click a row to rate it").size(12).into();
        };
        row![
            text(format!("Rate {}:", key.instance_id)).size(14),
            button("Relevant").on_press(Message::Rate(IqrClassification::Positive)),
            button("Not relevant").on_press(Message::Rate(IqrClassification::Negative)),
            button("Clear").on_press(Message::Rate(IqrClassification::Unclassified)),
        ]
        .spacing(6)
        .align_y(Alignment::Center)
        .into()
    }

    /// Marks a submission as started unless one is already in flight.
    fn begin_query(&mut self, kind: QueryKind) -> bool {
        if self.phase.is_busy() {
            return false;
        }
        self.phase = QueryPhase::Submitting(kind);
        self.display.markers_mut().fade_out_all(None);
        true
    }

    /// At most one `videoPlayer:play` is outstanding; the next step waits for its reply.
    fn claim_play_step(&mut self) -> bool {
        if !self.playing || self.play_pending {
            return false;
        }
        self.play_pending = true;
        true
    }

    fn sync_phase(&mut self) {
        if let Some(queries) = &self.queries {
            self.phase = queries.phase();
        }
    }

    fn stop_playback(&mut self) -> Task<Message> {
        if !self.playing {
            return Task::none();
        }
        self.playing = false;
        let Some(video) = self.video.clone() else {
            return Task::none();
        };
        Task::perform(
            async move { video.stop().await.map_err(|err| err.to_string()) },
            Message::VideoCommandDone,
        )
    }

    fn push_history(&mut self, entry: String) {
        self.history.push(entry);
        if self.history.len() > 20 {
            self.history.remove(0);
        }
    }
}

fn query_outcome(outcome: Result<ResultPage, QueryError>) -> Message {
    match outcome {
        Err(QueryError::Busy) => Message::QueryRefused,
        outcome => Message::QueryFinished(outcome.map_err(|err| err.to_string())),
    }
}

fn panel<'a>(rows: &'a [ResultRow], which: Panel, height: f32) -> Element<'a, Message> {
    let list = if rows.is_empty() {
        Column::new().push(text("No results").size(12))
    } else {
        rows.iter().fold(Column::new().spacing(2), |col, result| {
            col.push(result_row(
                result,
                RowKey {
                    panel: which,
                    instance_id: result.instance_id,
                },
            ))
        })
    };
    mouse_area(Container::new(scrollable(list).height(Length::Fixed(height))).padding(6))
        .on_press(Message::PanelClicked)
        .into()
}

fn result_row(result: &ResultRow, key: RowKey) -> Element<'_, Message> {
    let number_color = match result.relevance {
        Relevance::Relevant => Color::from_rgb(0.3, 0.85, 0.4),
        Relevance::NotRelevant => Color::from_rgb(0.9, 0.3, 0.3),
        Relevance::Unrated => Color::WHITE,
    };
    let content = row![
        text(if result.highlighted { ">" } else { " " })
            .size(12)
            .width(Length::Fixed(10.0)),
        text(&result.number)
            .size(12)
            .color(number_color)
            .width(Length::Fixed(48.0)),
        text(&result.rank).size(12).width(Length::Fixed(36.0)),
        text("■").size(12).color(swatch_color(&result.swatch)),
        text(&result.score).size(12).width(Length::Fixed(52.0)),
        text(&result.start).size(12).width(Length::Fixed(72.0)),
        text(&result.end).size(12).width(Length::Fixed(72.0)),
    ]
    .spacing(6);
    mouse_area(content)
        .on_press(Message::RowClicked(key))
        .on_right_press(Message::RowRightClicked(key))
        .into()
}

fn swatch_color(name: &str) -> Color {
    match name {
        "green" => Color::from_rgb(0.2, 0.8, 0.3),
        "yellow" => Color::from_rgb(0.95, 0.85, 0.2),
        "red" => Color::from_rgb(0.9, 0.25, 0.2),
        _ => Color::from_rgb(0.5, 0.5, 0.5),
    }
}

async fn fetch_config() -> Result<ViewerConfig, String> {
    let response = reqwest::get(CONFIG_URL).await.map_err(|e| e.to_string())?;
    let body = response.text().await.map_err(|e| e.to_string())?;
    ViewerConfig::parse(&body).map_err(|e| e.to_string())
}

async fn start_session(primary: String) -> Result<Connected, String> {
    AppSession::start(&primary, EMBEDDED_SESSION_URL, HttpTransport::connect)
        .await
        .map(|session| Connected(Arc::new(session)))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqrcore::records::{GeoLocation, QueryResult};

    fn viewer() -> Viewer {
        Viewer::boot().0
    }

    fn located_page() -> ResultPage {
        let mut result = QueryResult::new(1, 1, 0.9);
        result.location = Some(GeoLocation {
            northing: 10.0,
            easting: 20.0,
        });
        ResultPage {
            result_ids: vec![1],
            feedback_ids: vec![],
            results: [(1, result)].into_iter().collect(),
        }
    }

    #[test]
    fn second_submission_is_held_until_the_first_finishes() {
        let mut state = viewer();
        state.display.display_results(&located_page());

        assert!(state.begin_query(QueryKind::Execute));
        assert_eq!(state.phase, QueryPhase::Submitting(QueryKind::Execute));
        assert!(state.display.markers().get(1).unwrap().opacity < 1.0);
        assert!(!state.begin_query(QueryKind::Refine));
        assert_eq!(state.phase, QueryPhase::Submitting(QueryKind::Execute));
    }

    #[test]
    fn busy_rejection_keeps_markers_faded() {
        let mut state = viewer();
        state.display.display_results(&located_page());
        state.begin_query(QueryKind::Refine);

        let message = query_outcome(Err(QueryError::Busy));
        assert!(matches!(message, Message::QueryRefused));
        let _ = Viewer::update(&mut state, message);
        assert!(state.display.markers().get(1).unwrap().opacity < 1.0);

        let _ = Viewer::update(
            &mut state,
            query_outcome(Err(QueryError::InvalidQueryUrl)),
        );
        assert_eq!(state.display.markers().get(1).unwrap().opacity, 1.0);
        assert!(state.status.starts_with("Query error"));
    }

    #[test]
    fn play_steps_wait_for_the_previous_reply() {
        let mut state = viewer();
        assert!(!state.claim_play_step());

        state.playing = true;
        assert!(state.claim_play_step());
        assert!(!state.claim_play_step());

        let _ = Viewer::update(&mut state, Message::Played(Ok(0)));
        assert!(!state.play_pending);
        assert!(state.claim_play_step());
    }
}
