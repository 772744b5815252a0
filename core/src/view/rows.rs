use crate::format::{color_for_score, format_timestamp, ColorStop};
use crate::records::{InstanceId, IqrClassification, QueryResult, Timestamp};
use chrono::TimeZone;
use std::fmt::Display;

/// Which score a row displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreField {
    #[default]
    Relevancy,
    Preference,
}

impl ScoreField {
    pub fn value(self, result: &QueryResult) -> f64 {
        match self {
            ScoreField::Relevancy => result.relevancy_score,
            ScoreField::Preference => result.preference_score,
        }
    }
}

/// Relevance marking of a row's instance number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relevance {
    Relevant,
    NotRelevant,
    #[default]
    Unrated,
}

impl Relevance {
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            Relevance::Relevant => Some("relevant"),
            Relevance::NotRelevant => Some("not-relevant"),
            Relevance::Unrated => None,
        }
    }
}

impl From<IqrClassification> for Relevance {
    fn from(value: IqrClassification) -> Self {
        match value {
            IqrClassification::Positive => Relevance::Relevant,
            IqrClassification::Negative => Relevance::NotRelevant,
            IqrClassification::Unclassified => Relevance::Unrated,
        }
    }
}

/// Display state of one result row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub instance_id: InstanceId,
    pub number: String,
    pub rank: String,
    pub score: String,
    pub score_tooltip: String,
    pub start: String,
    pub start_tooltip: String,
    pub end: String,
    pub end_tooltip: String,
    pub swatch: String,
    pub relevance: Relevance,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub highlighted: bool,
}

/// Builds the row for `result`. The swatch always follows the relevancy score.
pub fn render_row<Tz>(
    result: &QueryResult,
    score_field: ScoreField,
    stops: &[ColorStop],
    tz: &Tz,
) -> ResultRow
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let score = score_field.value(result);
    ResultRow {
        instance_id: result.instance_id,
        number: result.instance_id.to_string(),
        rank: result.rank.to_string(),
        score: format!("{score:.3}"),
        score_tooltip: score.to_string(),
        start: format_timestamp(result.start_time, false, tz),
        start_tooltip: format_timestamp(result.start_time, true, tz),
        end: format_timestamp(result.end_time, false, tz),
        end_tooltip: format_timestamp(result.end_time, true, tz),
        swatch: color_for_score(result.relevancy_score, stops).to_string(),
        relevance: result.user_score.into(),
        start_time: result.start_time,
        end_time: result.end_time,
        highlighted: false,
    }
}
