use crate::records::{InstanceId, QueryResult};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Result fields usable as sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    InstanceId,
    Rank,
    RelevancyScore,
    PreferenceScore,
    StartTime,
    EndTime,
}

impl SortField {
    fn compare(self, a: &QueryResult, b: &QueryResult) -> Ordering {
        match self {
            SortField::InstanceId => a.instance_id.cmp(&b.instance_id),
            SortField::Rank => a.rank.cmp(&b.rank),
            SortField::RelevancyScore => a
                .relevancy_score
                .partial_cmp(&b.relevancy_score)
                .unwrap_or(Ordering::Equal),
            SortField::PreferenceScore => a
                .preference_score
                .partial_cmp(&b.preference_score)
                .unwrap_or(Ordering::Equal),
            SortField::StartTime => a.start_time.cmp(&b.start_time),
            SortField::EndTime => a.end_time.cmp(&b.end_time),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub const fn ascending(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub const fn descending(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// Result list order: rank ascending.
pub const RANK_ORDER: [SortKey; 1] = [SortKey::ascending(SortField::Rank)];

/// Feedback request order: preference descending, then instance id ascending.
pub const FEEDBACK_ORDER: [SortKey; 2] = [
    SortKey::descending(SortField::PreferenceScore),
    SortKey::ascending(SortField::InstanceId),
];

/// Sorts `ids` in place by the referenced records.
///
/// Keys are compared in order and the first unequal field decides; a full tie
/// keeps the input order. An empty key list sorts by rank. Ids without a
/// record sort after every id that has one.
pub fn sort_by_fields(
    ids: &mut [InstanceId],
    records: &BTreeMap<InstanceId, QueryResult>,
    keys: &[SortKey],
) {
    let keys = if keys.is_empty() { &RANK_ORDER[..] } else { keys };

    ids.sort_by(|a, b| match (records.get(a), records.get(b)) {
        (Some(lhs), Some(rhs)) => {
            for key in keys {
                let ordering = key.field.compare(lhs, rhs);
                if ordering != Ordering::Equal {
                    return if key.descending {
                        ordering.reverse()
                    } else {
                        ordering
                    };
                }
            }
            Ordering::Equal
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
