use crate::generator::profile::{assign_ranks, build_result_set, GeneratorConfig};
use crate::workflow::config::ServiceConfig;
use anyhow::Context;
use iqrcore::records::{InstanceId, IqrClassification, QueryResult, ResultPage};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A query session answering the `query:*` methods from a synthetic result set.
pub struct QueryRunner {
    config: ServiceConfig,
    state: Mutex<RunnerState>,
}

#[derive(Default)]
struct RunnerState {
    session: Option<QuerySession>,
    status: String,
}

struct QuerySession {
    results: BTreeMap<InstanceId, QueryResult>,
    feedback_ids: Vec<InstanceId>,
    feedback: BTreeMap<InstanceId, IqrClassification>,
    polls_remaining: u32,
    completed: bool,
}

impl QuerySession {
    fn ranked_ids(&self) -> Vec<InstanceId> {
        let mut ids: Vec<_> = self.results.keys().copied().collect();
        ids.sort_by_key(|id| self.results[id].rank);
        ids
    }

    /// Unrated results whose relevancy is closest to the decision boundary.
    fn most_uncertain(&self, count: usize) -> Vec<InstanceId> {
        let mut candidates: Vec<&QueryResult> = self
            .results
            .values()
            .filter(|result| !self.feedback.contains_key(&result.instance_id))
            .collect();
        candidates.sort_by(|a, b| {
            (a.relevancy_score - 0.5)
                .abs()
                .total_cmp(&(b.relevancy_score - 0.5).abs())
                .then(a.rank.cmp(&b.rank))
        });
        candidates
            .into_iter()
            .take(count)
            .map(|result| result.instance_id)
            .collect()
    }
}

impl QueryRunner {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RunnerState::default()),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn query_url(&self) -> &str {
        &self.config.query_url
    }

    /// Starts a new query session, replacing any previous one. A rejected
    /// query leaves the reason in the status message and returns `false`.
    pub fn execute_query(
        &self,
        service_url: &str,
        plan: &str,
        working_set_size: usize,
    ) -> anyhow::Result<bool> {
        let mut state = self.state();
        state.session = None;

        if plan.trim().is_empty() {
            state.status = "Failed to parse query plan: empty plan".into();
            return Ok(false);
        }
        if service_url.trim().is_empty() {
            state.status = "Failed to create query session".into();
            return Ok(false);
        }
        if working_set_size == 0 {
            state.status = "Failed to create query session: empty working set".into();
            return Ok(false);
        }

        let generator = GeneratorConfig {
            count: self.config.result_count.min(working_set_size),
            ..GeneratorConfig::from(&self.config)
        };
        let results = build_result_set(&generator).context("generating query results")?;
        let mut session = QuerySession {
            results,
            feedback_ids: Vec::new(),
            feedback: BTreeMap::new(),
            polls_remaining: self.config.completion_polls,
            completed: false,
        };
        session.feedback_ids = session.most_uncertain(self.config.feedback_count);

        info!(
            "executing query against {service_url}: {} results, {} feedback requests",
            session.results.len(),
            session.feedback_ids.len()
        );
        state.status = "Query executing".into();
        state.session = Some(session);
        Ok(true)
    }

    /// Answers `false` for the configured number of polls, then `true`.
    pub fn is_completed(&self) -> bool {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(session) = state.session.as_mut() else {
            return false;
        };
        if !session.completed {
            if session.polls_remaining == 0 {
                session.completed = true;
                state.status = "Query completed".into();
            } else {
                session.polls_remaining -= 1;
            }
        }
        session.completed
    }

    pub fn is_executing(&self) -> bool {
        self.state()
            .session
            .as_ref()
            .is_some_and(|session| !session.completed)
    }

    /// Records user feedback for one result. Unknown ids are refused.
    pub fn set_result_feedback(&self, instance_id: InstanceId, code: u8) -> anyhow::Result<bool> {
        let classification = IqrClassification::try_from(code).map_err(anyhow::Error::msg)?;
        let mut state = self.state();
        let Some(session) = state.session.as_mut() else {
            return Ok(false);
        };
        let Some(result) = session.results.get_mut(&instance_id) else {
            warn!("feedback for unknown result {instance_id}");
            return Ok(false);
        };
        result.user_score = classification;
        if classification == IqrClassification::Unclassified {
            session.feedback.remove(&instance_id);
        } else {
            session.feedback.insert(instance_id, classification);
        }
        debug!("feedback {instance_id} -> {classification:?}");
        Ok(true)
    }

    /// Re-scores the result set from the stored feedback and restarts
    /// completion polling.
    pub fn refine(&self) -> bool {
        let mut guard = self.state();
        let state = &mut *guard;
        let Some(session) = state.session.as_mut() else {
            return false;
        };

        for (id, classification) in &session.feedback {
            if let Some(result) = session.results.get_mut(id) {
                result.relevancy_score = match classification {
                    IqrClassification::Positive => {
                        result.relevancy_score + (1.0 - result.relevancy_score) * 0.5
                    }
                    IqrClassification::Negative => result.relevancy_score * 0.5,
                    IqrClassification::Unclassified => result.relevancy_score,
                };
            }
        }

        let mut ranked: Vec<QueryResult> = session.results.values().cloned().collect();
        assign_ranks(&mut ranked);
        session.results = ranked
            .into_iter()
            .map(|result| (result.instance_id, result))
            .collect();
        session.feedback_ids = session.most_uncertain(self.config.feedback_count);
        session.completed = false;
        session.polls_remaining = self.config.completion_polls;

        info!("refining with {} rated results", session.feedback.len());
        state.status = "Refining query".into();
        true
    }

    /// Rank-ordered result ids from `offset`, the current feedback requests
    /// and every record either list references.
    pub fn get_all_results(&self, offset: usize, limit: Option<usize>) -> ResultPage {
        let state = self.state();
        let Some(session) = state.session.as_ref() else {
            return ResultPage::default();
        };

        let result_ids: Vec<InstanceId> = session
            .ranked_ids()
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        let feedback_ids = session.feedback_ids.clone();
        let results = result_ids
            .iter()
            .chain(feedback_ids.iter())
            .filter_map(|id| session.results.get(id).map(|result| (*id, result.clone())))
            .collect();

        ResultPage {
            result_ids,
            feedback_ids,
            results,
        }
    }

    pub fn result(&self, instance_id: InstanceId) -> Option<QueryResult> {
        self.state()
            .session
            .as_ref()
            .and_then(|session| session.results.get(&instance_id).cloned())
    }

    pub fn result_count(&self) -> usize {
        self.state()
            .session
            .as_ref()
            .map_or(0, |session| session.results.len())
    }

    pub fn get_status(&self) -> String {
        self.state().status.clone()
    }

    pub fn shut_down(&self) {
        let mut state = self.state();
        if state.session.take().is_some() {
            info!("query session shut down");
        }
    }

    /// Runs one query to completion without a client attached.
    pub fn run_to_completion(&self, plan: &str) -> anyhow::Result<ResultPage> {
        let accepted = self.execute_query(self.query_url(), plan, 1500)?;
        anyhow::ensure!(accepted, "query rejected: {}", self.get_status());
        let mut polls = 1;
        while !self.is_completed() {
            polls += 1;
        }
        debug!("query completed after {polls} polls");
        Ok(self.get_all_results(0, Some(100)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(polls: u32) -> QueryRunner {
        let mut config = ServiceConfig::from_args(5, 30, polls);
        config.feedback_count = 4;
        QueryRunner::new(config)
    }

    #[test]
    fn completes_after_configured_polls() {
        let runner = runner(2);
        assert!(runner.execute_query("iqr://sim", "plan", 1500).unwrap());
        assert!(!runner.is_completed());
        assert!(!runner.is_completed());
        assert!(runner.is_completed());
        assert!(runner.is_completed());
        assert_eq!(runner.get_status(), "Query completed");
    }

    #[test]
    fn empty_plan_is_rejected_with_status() {
        let runner = runner(0);
        assert!(!runner.execute_query("iqr://sim", "  ", 1500).unwrap());
        assert_eq!(runner.get_status(), "Failed to parse query plan: empty plan");
        assert!(!runner.is_completed());
        assert_eq!(runner.get_all_results(0, None), ResultPage::default());
    }

    #[test]
    fn page_is_rank_ordered_and_carries_feedback_records() {
        let runner = runner(0);
        runner.execute_query("iqr://sim", "plan", 1500).unwrap();
        let page = runner.get_all_results(0, Some(10));
        assert_eq!(page.result_ids.len(), 10);
        let ranks: Vec<i64> = page.result_ids.iter().map(|id| page.results[id].rank).collect();
        assert_eq!(ranks, (1..=10).collect::<Vec<_>>());
        assert_eq!(page.feedback_ids.len(), 4);
        assert!(page.feedback_ids.iter().all(|id| page.results.contains_key(id)));

        let tail = runner.get_all_results(25, Some(10));
        assert_eq!(tail.result_ids.len(), 5);
    }

    #[test]
    fn working_set_caps_result_count() {
        let runner = runner(0);
        runner.execute_query("iqr://sim", "plan", 12).unwrap();
        assert_eq!(runner.result_count(), 12);
    }

    #[test]
    fn refine_promotes_positive_and_demotes_negative() {
        let runner = runner(1);
        runner.execute_query("iqr://sim", "plan", 1500).unwrap();
        let page = runner.get_all_results(0, None);
        let last = *page.result_ids.last().unwrap();
        let first = page.result_ids[0];

        assert!(runner.set_result_feedback(last, 0).unwrap());
        assert!(runner.set_result_feedback(first, 1).unwrap());
        let before_last = runner.result(last).unwrap().rank;
        let before_first = runner.result(first).unwrap().rank;

        assert!(runner.refine());
        assert!(!runner.is_completed());
        assert!(runner.is_completed());

        let promoted = runner.result(last).unwrap();
        assert!(promoted.rank < before_last);
        assert_eq!(promoted.user_score, IqrClassification::Positive);
        assert!(runner.result(first).unwrap().rank > before_first);

        let refined = runner.get_all_results(0, None);
        assert!(!refined.feedback_ids.contains(&last));
        assert!(!refined.feedback_ids.contains(&first));
    }

    #[test]
    fn feedback_without_session_or_for_unknown_id_is_refused() {
        let runner = runner(0);
        assert!(!runner.set_result_feedback(1000, 0).unwrap());
        assert!(!runner.refine());
        runner.execute_query("iqr://sim", "plan", 1500).unwrap();
        assert!(!runner.set_result_feedback(1, 0).unwrap());
        assert!(runner.set_result_feedback(1000, 7).is_err());
    }

    #[test]
    fn shut_down_drops_the_session() {
        let runner = runner(0);
        runner.execute_query("iqr://sim", "plan", 1500).unwrap();
        runner.shut_down();
        assert_eq!(runner.result_count(), 0);
        assert!(!runner.is_executing());
    }
}
