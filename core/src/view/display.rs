use super::map::{MapPoint, MapProjection, MapViewport, RESULT_ZOOM};
use super::markers::MarkerOverlay;
use super::rows::{render_row, ResultRow, ScoreField};
use super::selection::{RowKey, VideoScrubber};
use crate::format::{default_color_stops, sort_by_fields, ColorStop, FEEDBACK_ORDER, RANK_ORDER};
use crate::records::{GeoLocation, InstanceId, ResultPage, TrackMetadata};
use chrono::{Local, TimeZone};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fmt::Display;

/// One line of the track metadata table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    pub label: String,
    pub source: String,
}

impl From<&TrackMetadata> for TrackRow {
    fn from(track: &TrackMetadata) -> Self {
        Self {
            label: format!("Track-{}", track.id.serial_number),
            source: track.id.source.clone(),
        }
    }
}

/// View model of everything derived from the current result set: both row
/// panels, the marker overlay, the map viewport, the track metadata cache and
/// the selection/scrubber state.
#[derive(Debug)]
pub struct ResultDisplay<Tz = Local> {
    pub(super) tz: Tz,
    pub(super) color_stops: Vec<ColorStop>,
    pub(super) results_panel: Vec<ResultRow>,
    pub(super) feedback_panel: Vec<ResultRow>,
    pub(super) markers: MarkerOverlay,
    pub(super) viewport: MapViewport,
    pub(super) tracks_cache: BTreeMap<InstanceId, Vec<TrackMetadata>>,
    pub(super) displayed_tracks: Vec<TrackRow>,
    pub(super) selection: Option<RowKey>,
    pub(super) context_row: Option<RowKey>,
    pub(super) scrubber: VideoScrubber,
}

impl ResultDisplay<Local> {
    pub fn new(projection: MapProjection) -> Self {
        Self::with_timezone(projection, Local)
    }
}

impl<Tz> ResultDisplay<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn with_timezone(projection: MapProjection, tz: Tz) -> Self {
        Self {
            tz,
            color_stops: default_color_stops(),
            results_panel: Vec::new(),
            feedback_panel: Vec::new(),
            markers: MarkerOverlay::new(),
            viewport: MapViewport::new(projection),
            tracks_cache: BTreeMap::new(),
            displayed_tracks: Vec::new(),
            selection: None,
            context_row: None,
            scrubber: VideoScrubber::default(),
        }
    }

    pub fn with_color_stops(mut self, stops: Vec<ColorStop>) -> Self {
        self.color_stops = stops;
        self
    }

    /// Replaces everything shown with the contents of `page`.
    pub fn display_results(&mut self, page: &ResultPage) {
        self.results_panel.clear();
        self.feedback_panel.clear();

        self.tracks_cache.clear();
        self.displayed_tracks.clear();
        self.selection = None;
        self.context_row = None;
        self.scrubber = VideoScrubber::default();
        self.markers.clear_all();

        let projection = self.viewport.projection();
        let mut center = (0.0, 0.0);
        let mut location_count = 0usize;

        for result in page.results.values() {
            self.tracks_cache
                .insert(result.instance_id, result.tracks.clone());

            let Some(location) = result.location else {
                continue;
            };
            self.markers.ensure_layer();
            let point = projection.project(location);
            if let Err(err) = self.markers.add_marker(result.instance_id, point) {
                warn!("skipping marker: {err}");
                continue;
            }
            center.0 += location.northing;
            center.1 += location.easting;
            location_count += 1;
        }

        let mut result_ids = page.result_ids.clone();
        sort_by_fields(&mut result_ids, &page.results, &RANK_ORDER);
        self.results_panel = self.render_rows(page, &result_ids, ScoreField::Relevancy);

        let mut feedback_ids = page.feedback_ids.clone();
        sort_by_fields(&mut feedback_ids, &page.results, &FEEDBACK_ORDER);
        self.feedback_panel = self.render_rows(page, &feedback_ids, ScoreField::Preference);

        if location_count > 0 {
            let mean = GeoLocation {
                northing: center.0 / location_count as f64,
                easting: center.1 / location_count as f64,
            };
            self.viewport
                .set_center(projection.project(mean), RESULT_ZOOM);
        }

        debug!(
            "displayed {} results, {} feedback requests, {} markers",
            self.results_panel.len(),
            self.feedback_panel.len(),
            self.markers.len()
        );
    }

    fn render_rows(
        &self,
        page: &ResultPage,
        ids: &[InstanceId],
        score_field: ScoreField,
    ) -> Vec<ResultRow> {
        ids.iter()
            .filter_map(|id| {
                let result = page.results.get(id);
                if result.is_none() {
                    warn!("result {id} listed without a record");
                }
                result
            })
            .map(|result| render_row(result, score_field, &self.color_stops, &self.tz))
            .collect()
    }

    /// Fills the track table from the cached metadata of `instance_id`.
    pub fn display_tracks_metadata(&mut self, instance_id: InstanceId) {
        self.displayed_tracks = self
            .tracks_cache
            .get(&instance_id)
            .map(|tracks| tracks.iter().map(TrackRow::from).collect())
            .unwrap_or_default();
    }

    pub fn results_panel(&self) -> &[ResultRow] {
        &self.results_panel
    }

    pub fn feedback_panel(&self) -> &[ResultRow] {
        &self.feedback_panel
    }

    pub fn markers(&self) -> &MarkerOverlay {
        &self.markers
    }

    pub fn markers_mut(&mut self) -> &mut MarkerOverlay {
        &mut self.markers
    }

    pub fn viewport(&self) -> &MapViewport {
        &self.viewport
    }

    pub fn map_center(&self) -> Option<MapPoint> {
        self.viewport.center()
    }

    pub fn tracks_cache(&self) -> &BTreeMap<InstanceId, Vec<TrackMetadata>> {
        &self.tracks_cache
    }

    pub fn displayed_tracks(&self) -> &[TrackRow] {
        &self.displayed_tracks
    }

    pub fn scrubber(&self) -> &VideoScrubber {
        &self.scrubber
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }
}
