use super::display::ResultDisplay;
use super::rows::{Relevance, ResultRow};
use crate::format::format_timestamp;
use crate::records::{InstanceId, IqrClassification, Timestamp};
use chrono::TimeZone;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Results,
    FeedbackRequests,
}

/// Identifies one rendered row; the same instance may appear in both panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub panel: Panel,
    pub instance_id: InstanceId,
}

impl RowKey {
    pub fn results(instance_id: InstanceId) -> Self {
        Self {
            panel: Panel::Results,
            instance_id,
        }
    }

    pub fn feedback(instance_id: InstanceId) -> Self {
        Self {
            panel: Panel::FeedbackRequests,
            instance_id,
        }
    }
}

/// What a row click changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Cleared,
    Selected {
        instance_id: InstanceId,
        start_time: Timestamp,
        end_time: Timestamp,
    },
}

/// Feedback to forward to the query service after a rating action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackUpdate {
    pub instance_id: InstanceId,
    pub classification: IqrClassification,
}

/// Video scrubber state. Disabled until a result is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoScrubber {
    pub enabled: bool,
    pub min: Timestamp,
    pub max: Timestamp,
    pub value: Timestamp,
    pub label: String,
}

impl Default for VideoScrubber {
    fn default() -> Self {
        Self {
            enabled: false,
            min: -1,
            max: -1,
            value: 0,
            label: "-".into(),
        }
    }
}

impl VideoScrubber {
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.min && timestamp <= self.max
    }
}

impl<Tz> ResultDisplay<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    /// Row click. Re-clicking the selected row clears the selection; any
    /// other known row becomes the single selection. Unknown rows are ignored.
    ///
    /// On `Selected` the caller still has to switch the remote video render
    /// to the returned instance.
    pub fn select_row(&mut self, key: RowKey) -> Option<SelectionChange> {
        if self.selection == Some(key) {
            self.clear_selection();
            return Some(SelectionChange::Cleared);
        }

        let (start_time, end_time) = {
            let row = self.row(key)?;
            (row.start_time, row.end_time)
        };

        for row in self.rows_mut() {
            row.highlighted = false;
        }
        if let Some(row) = self.row_mut(key) {
            row.highlighted = true;
        }
        self.selection = Some(key);

        self.scrubber.enabled = true;
        self.scrubber.min = start_time;
        self.scrubber.max = end_time;
        self.update_timestamp_display(start_time);

        self.markers.unhighlight_all();
        self.markers.highlight(key.instance_id);
        self.display_tracks_metadata(key.instance_id);

        Some(SelectionChange::Selected {
            instance_id: key.instance_id,
            start_time,
            end_time,
        })
    }

    /// Panel background click, or re-click of the selected row.
    pub fn clear_selection(&mut self) {
        for row in self.rows_mut() {
            row.highlighted = false;
        }
        self.selection = None;
        self.markers.unhighlight_all();
    }

    pub fn selected(&self) -> Option<RowKey> {
        self.selection
    }

    /// Moves the scrubber when `timestamp` lies within the selected bounds.
    pub fn update_timestamp_display(&mut self, timestamp: Timestamp) -> bool {
        if !self.scrubber.contains(timestamp) {
            return false;
        }
        self.scrubber.value = timestamp;
        self.scrubber.label = format_timestamp(timestamp, false, &self.tz);
        true
    }

    /// Right-click on a row: remembers it for the rating actions.
    pub fn open_context_menu(&mut self, key: RowKey) -> bool {
        if self.row(key).is_none() {
            return false;
        }
        self.context_row = Some(key);
        true
    }

    pub fn context_row(&self) -> Option<RowKey> {
        self.context_row
    }

    /// Applies a rating action to the context menu's row.
    pub fn rate_context_row(
        &mut self,
        classification: IqrClassification,
    ) -> Option<FeedbackUpdate> {
        let key = self.context_row?;
        Some(self.rate(key.instance_id, classification))
    }

    /// Marks every row showing `instance_id` with the new relevance.
    pub fn rate(
        &mut self,
        instance_id: InstanceId,
        classification: IqrClassification,
    ) -> FeedbackUpdate {
        let relevance = Relevance::from(classification);
        for row in self
            .rows_mut()
            .filter(|row| row.instance_id == instance_id)
        {
            row.relevance = relevance;
        }
        FeedbackUpdate {
            instance_id,
            classification,
        }
    }

    fn row(&self, key: RowKey) -> Option<&ResultRow> {
        self.panel(key.panel)
            .iter()
            .find(|row| row.instance_id == key.instance_id)
    }

    fn row_mut(&mut self, key: RowKey) -> Option<&mut ResultRow> {
        let panel = match key.panel {
            Panel::Results => &mut self.results_panel,
            Panel::FeedbackRequests => &mut self.feedback_panel,
        };
        panel
            .iter_mut()
            .find(|row| row.instance_id == key.instance_id)
    }

    fn panel(&self, panel: Panel) -> &[ResultRow] {
        match panel {
            Panel::Results => &self.results_panel,
            Panel::FeedbackRequests => &self.feedback_panel,
        }
    }

    fn rows_mut(&mut self) -> impl Iterator<Item = &mut ResultRow> {
        self.results_panel
            .iter_mut()
            .chain(self.feedback_panel.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::display::tests::{display, sample_page};
    use crate::view::markers::MarkerIcon;

    fn highlighted_rows<Tz>(display: &ResultDisplay<Tz>) -> Vec<RowKey>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let results = display
            .results_panel()
            .iter()
            .filter(|row| row.highlighted)
            .map(|row| RowKey::results(row.instance_id));
        let feedback = display
            .feedback_panel()
            .iter()
            .filter(|row| row.highlighted)
            .map(|row| RowKey::feedback(row.instance_id));
        results.chain(feedback).collect()
    }

    #[test]
    fn selecting_b_after_a_leaves_only_b() {
        let mut display = display();
        display.display_results(&sample_page());

        display.select_row(RowKey::results(1));
        let change = display.select_row(RowKey::results(2)).unwrap();

        assert_eq!(
            change,
            SelectionChange::Selected {
                instance_id: 2,
                start_time: 2_000_000,
                end_time: 2_500_000
            }
        );
        assert_eq!(highlighted_rows(&display), vec![RowKey::results(2)]);
        assert_eq!(display.markers().highlighted(), Some(2));
        assert_eq!(display.markers().get(1).unwrap().icon, MarkerIcon::Default);
    }

    #[test]
    fn reclicking_clears_everything() {
        let mut display = display();
        display.display_results(&sample_page());

        display.select_row(RowKey::results(2));
        let change = display.select_row(RowKey::results(2)).unwrap();

        assert_eq!(change, SelectionChange::Cleared);
        assert!(highlighted_rows(&display).is_empty());
        assert_eq!(display.markers().highlighted(), None);
        assert!(display
            .markers()
            .iter()
            .all(|(_, marker)| marker.opacity == 1.0));
    }

    #[test]
    fn selection_configures_scrubber_and_tracks() {
        let mut display = display();
        display.display_results(&sample_page());
        display.select_row(RowKey::feedback(1));

        let scrubber = display.scrubber();
        assert!(scrubber.enabled);
        assert_eq!((scrubber.min, scrubber.max), (1_000_000, 1_500_000));
        assert_eq!(scrubber.value, 1_000_000);
        assert_eq!(scrubber.label, "00:00:01");
        assert_eq!(display.displayed_tracks()[0].label, "Track-10");
    }

    #[test]
    fn selecting_unlocated_result_keeps_markers_visible() {
        let mut display = display();
        display.display_results(&sample_page());
        display.select_row(RowKey::results(1));
        display.select_row(RowKey::results(3));

        assert_eq!(display.markers().highlighted(), None);
        assert!(display
            .markers()
            .iter()
            .all(|(_, marker)| marker.opacity == 1.0));
    }

    #[test]
    fn timestamp_outside_bounds_is_ignored() {
        let mut display = display();
        display.display_results(&sample_page());
        display.select_row(RowKey::results(2));

        assert!(!display.update_timestamp_display(9_000_000));
        assert_eq!(display.scrubber().value, 2_000_000);
        assert!(display.update_timestamp_display(2_400_000));
        assert_eq!(display.scrubber().value, 2_400_000);
    }

    #[test]
    fn unknown_rows_are_ignored() {
        let mut display = display();
        display.display_results(&sample_page());
        assert_eq!(display.select_row(RowKey::results(99)), None);
        assert!(!display.open_context_menu(RowKey::feedback(99)));
    }

    #[test]
    fn rating_marks_both_panels() {
        let mut display = display();
        display.display_results(&sample_page());

        assert!(display.open_context_menu(RowKey::feedback(2)));
        let update = display
            .rate_context_row(IqrClassification::Positive)
            .unwrap();

        assert_eq!(
            update,
            FeedbackUpdate {
                instance_id: 2,
                classification: IqrClassification::Positive
            }
        );
        let marked: Vec<_> = display
            .results_panel()
            .iter()
            .chain(display.feedback_panel())
            .filter(|row| row.instance_id == 2)
            .map(|row| row.relevance)
            .collect();
        assert_eq!(marked, vec![Relevance::Relevant, Relevance::Relevant]);

        display.rate(2, IqrClassification::Unclassified);
        assert!(display
            .results_panel()
            .iter()
            .all(|row| row.relevance == Relevance::Unrated));
    }

    #[test]
    fn rating_without_context_row_does_nothing() {
        let mut display = display();
        display.display_results(&sample_page());
        assert_eq!(display.rate_context_row(IqrClassification::Negative), None);
    }
}
