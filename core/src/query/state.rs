/// What started the in-flight query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Execute,
    Refine,
}

/// Lifecycle of the current query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryPhase {
    #[default]
    Idle,
    Submitting(QueryKind),
    Polling(QueryKind),
    Completed,
    Failed,
}

impl QueryPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, QueryPhase::Submitting(_) | QueryPhase::Polling(_))
    }

    /// Text of the blocking loading indicator, if it should be shown.
    ///
    /// A refinement shows it from submission on; an execution only once the
    /// service has accepted the query.
    pub fn loading_message(self) -> Option<&'static str> {
        match self {
            QueryPhase::Submitting(QueryKind::Refine) | QueryPhase::Polling(QueryKind::Refine) => {
                Some("Refining results...")
            }
            QueryPhase::Polling(QueryKind::Execute) => Some("Executing query..."),
            _ => None,
        }
    }
}
