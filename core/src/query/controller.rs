use super::state::{QueryKind, QueryPhase};
use crate::prelude::{QueryError, RpcError};
use crate::records::ResultPage;
use crate::session::{RpcTransport, Session, RESULT_PAGE_LIMIT, WORKING_SET_SIZE};
use crate::telemetry::{log_rpc_failure, Metrics, SessionMetrics};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Interval between `query:isCompleted` checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Drives one query at a time from submission to a fetched result page.
///
/// Submissions while a query is in flight are refused with
/// [`QueryError::Busy`]. [`QueryController::cancel`] stops every poll loop
/// and makes the superseded submission resolve to [`QueryError::Cancelled`].
pub struct QueryController<T> {
    session: Arc<Session<T>>,
    phase: Mutex<QueryPhase>,
    generation: AtomicU64,
    active_polls: Mutex<Vec<u64>>,
    poll_interval: Duration,
    working_set_size: u32,
    metrics: SessionMetrics,
}

impl<T: RpcTransport> QueryController<T> {
    pub fn new(session: Arc<Session<T>>) -> Self {
        Self {
            session,
            phase: Mutex::new(QueryPhase::Idle),
            generation: AtomicU64::new(0),
            active_polls: Mutex::new(Vec::new()),
            poll_interval: DEFAULT_POLL_INTERVAL,
            working_set_size: WORKING_SET_SIZE,
            metrics: SessionMetrics::new(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn phase(&self) -> QueryPhase {
        self.phase
            .lock()
            .map(|phase| *phase)
            .unwrap_or(QueryPhase::Failed)
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    /// Runs a query plan and returns the first result page once completed.
    pub async fn execute_query(&self, plan: &str) -> Result<ResultPage, QueryError> {
        let generation = self.begin(QueryKind::Execute)?;
        let outcome = match self.submit_execution(plan).await {
            Ok(()) => self.poll_until_complete(generation, QueryKind::Execute).await,
            Err(err) => Err(err),
        };
        self.settle(generation, outcome)
    }

    /// Re-runs the current query with the feedback given so far.
    pub async fn refine(&self) -> Result<ResultPage, QueryError> {
        let generation = self.begin(QueryKind::Refine)?;
        let outcome = match self.submit_refinement().await {
            Ok(()) => self.poll_until_complete(generation, QueryKind::Refine).await,
            Err(err) => Err(err),
        };
        self.settle(generation, outcome)
    }

    /// Abandons the in-flight query, if any.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.stop_all_polls();
        if self.set_phase(QueryPhase::Idle).is_busy() {
            info!("in-flight query cancelled");
        }
    }

    fn begin(&self, kind: QueryKind) -> Result<u64, QueryError> {
        let mut phase = self.phase.lock().map_err(|_| QueryError::Busy)?;
        if phase.is_busy() {
            warn!("query submission refused: another query is in flight");
            return Err(QueryError::Busy);
        }
        *phase = QueryPhase::Submitting(kind);
        Ok(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn submit_execution(&self, plan: &str) -> Result<(), QueryError> {
        let query_url = self
            .session
            .get_query_url()
            .await
            .map_err(|err| logged("Failed to get query url", err))?;
        if query_url.is_empty() {
            warn!("invalid query url");
            return Err(QueryError::InvalidQueryUrl);
        }

        let accepted = self
            .session
            .execute_query(&query_url, plan, self.working_set_size)
            .await
            .map_err(|err| logged("Failed to execute query", err))?;
        if !accepted {
            let status = match self.session.get_status().await {
                Ok(status) => status,
                Err(err) => {
                    log_rpc_failure("Failed to get query status", &err);
                    String::new()
                }
            };
            warn!("Failed to execute query: {status}");
            return Err(QueryError::Rejected { status });
        }
        Ok(())
    }

    async fn submit_refinement(&self) -> Result<(), QueryError> {
        let accepted = self
            .session
            .refine()
            .await
            .map_err(|err| logged("Failed to refine query", err))?;
        if !accepted {
            warn!("Failed to refine query");
            return Err(QueryError::Rejected {
                status: "refinement not accepted".into(),
            });
        }
        Ok(())
    }

    async fn poll_until_complete(
        &self,
        generation: u64,
        kind: QueryKind,
    ) -> Result<ResultPage, QueryError> {
        if !self.is_current(generation) {
            return Err(QueryError::Cancelled);
        }
        self.set_phase(QueryPhase::Polling(kind));
        self.register_poll(generation);

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.is_polling(generation) {
                return Err(QueryError::Cancelled);
            }
            self.metrics.record_poll();
            let completed = self
                .session
                .is_completed()
                .await
                .map_err(|err| logged("Failed to check query status", err))?;
            if !self.is_polling(generation) {
                return Err(QueryError::Cancelled);
            }
            if completed {
                break;
            }
            debug!("query {generation} still running");
        }

        self.stop_all_polls();
        let page = self
            .session
            .get_all_results(0, RESULT_PAGE_LIMIT)
            .await
            .map_err(|err| logged("Failed to retrieve results", err))?;
        if !self.is_current(generation) {
            return Err(QueryError::Cancelled);
        }
        Ok(page)
    }

    fn settle(
        &self,
        generation: u64,
        outcome: Result<ResultPage, QueryError>,
    ) -> Result<ResultPage, QueryError> {
        if !self.is_current(generation) {
            return Err(QueryError::Cancelled);
        }
        self.stop_all_polls();
        match &outcome {
            Ok(page) => {
                self.metrics.record_completed();
                self.set_phase(QueryPhase::Completed);
                info!(
                    "query completed with {} results and {} feedback requests",
                    page.result_ids.len(),
                    page.feedback_ids.len()
                );
            }
            Err(QueryError::Cancelled) => {}
            Err(_) => {
                self.metrics.record_failure();
                self.set_phase(QueryPhase::Failed);
            }
        }
        outcome
    }

    /// Sets the phase and returns the previous one.
    fn set_phase(&self, next: QueryPhase) -> QueryPhase {
        match self.phase.lock() {
            Ok(mut phase) => std::mem::replace(&mut *phase, next),
            Err(_) => QueryPhase::Failed,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn register_poll(&self, generation: u64) {
        if let Ok(mut polls) = self.active_polls.lock() {
            polls.push(generation);
        }
    }

    fn is_polling(&self, generation: u64) -> bool {
        self.is_current(generation)
            && self
                .active_polls
                .lock()
                .map(|polls| polls.contains(&generation))
                .unwrap_or(false)
    }

    fn stop_all_polls(&self) {
        if let Ok(mut polls) = self.active_polls.lock() {
            polls.clear();
        }
    }
}

fn logged(label: &str, err: RpcError) -> QueryError {
    log_rpc_failure(label, &err);
    QueryError::Rpc(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::QueryResult;
    use crate::session::methods;
    use crate::session::transport::mock::ScriptedTransport;
    use serde_json::json;

    fn page_json() -> serde_json::Value {
        json!({
            "resultIds": [5],
            "feedbackIds": [5],
            "results": {"5": {"instanceId": 5, "rank": 1, "relevancyScore": 0.8}}
        })
    }

    fn accepting() -> ScriptedTransport {
        ScriptedTransport::new()
            .always(methods::GET_QUERY_URL, json!("svc://query"))
            .always(methods::EXECUTE_QUERY, json!(true))
            .always(methods::GET_ALL_RESULTS, page_json())
    }

    fn controller(transport: ScriptedTransport) -> QueryController<ScriptedTransport> {
        QueryController::new(Arc::new(Session::new(transport)))
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_completed_then_fetches_first_page() {
        let controller = controller(
            accepting()
                .reply(methods::IS_COMPLETED, json!(false))
                .reply(methods::IS_COMPLETED, json!(false))
                .reply(methods::IS_COMPLETED, json!(true)),
        );

        let started = Instant::now();
        let page = controller.execute_query("plan").await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(page.result_ids, vec![5]);
        assert_eq!(page.results[&5], QueryResult::new(5, 1, 0.8));
        assert_eq!(controller.phase(), QueryPhase::Completed);
        assert_eq!(controller.metrics().polls, 3);
        assert_eq!(controller.metrics().completed, 1);

        let transport = controller.session.transport();
        assert_eq!(transport.count(methods::GET_ALL_RESULTS), 1);
        let fetch = transport
            .calls()
            .into_iter()
            .find(|(method, _)| method == methods::GET_ALL_RESULTS)
            .unwrap();
        assert_eq!(fetch.1, vec![json!(0), json!(100)]);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_query_url_fails_without_executing() {
        let controller = controller(ScriptedTransport::new().reply(methods::GET_QUERY_URL, json!("")));
        let err = controller.execute_query("plan").await.unwrap_err();
        assert_eq!(err, QueryError::InvalidQueryUrl);
        assert_eq!(controller.phase(), QueryPhase::Failed);
        assert_eq!(controller.session.transport().count(methods::EXECUTE_QUERY), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_false_fetches_status() {
        let controller = controller(
            ScriptedTransport::new()
                .reply(methods::GET_QUERY_URL, json!("svc://query"))
                .reply(methods::EXECUTE_QUERY, json!(false))
                .reply(methods::GET_STATUS, json!("Failed to parse query plan")),
        );
        let err = controller.execute_query("bad plan").await.unwrap_err();
        assert_eq!(
            err,
            QueryError::Rejected {
                status: "Failed to parse query plan".into()
            }
        );
        assert_eq!(controller.phase().loading_message(), None);
        assert_eq!(controller.session.transport().count(methods::IS_COMPLETED), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_returns_to_idle_affordances() {
        let controller = controller(
            accepting()
                .reply(methods::IS_COMPLETED, json!(false))
                .fail(methods::IS_COMPLETED, "session lost"),
        );
        let err = controller.execute_query("plan").await.unwrap_err();
        assert!(matches!(err, QueryError::Rpc(RpcError::Call { .. })));
        assert_eq!(controller.phase(), QueryPhase::Failed);
        assert!(!controller.phase().is_busy());
        assert_eq!(controller.metrics().failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_submission_while_polling_is_busy() {
        let controller = controller(
            accepting()
                .reply(methods::IS_COMPLETED, json!(false))
                .reply(methods::IS_COMPLETED, json!(true)),
        );

        let (first, second) = tokio::join!(controller.execute_query("plan"), async {
            tokio::task::yield_now().await;
            controller.refine().await
        });

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), QueryError::Busy);
        assert_eq!(controller.session.transport().count(methods::REFINE), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_polling_without_display_update() {
        let controller = controller(accepting().always(methods::IS_COMPLETED, json!(false)));

        let (outcome, ()) = tokio::join!(controller.execute_query("plan"), async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            controller.cancel();
        });

        assert_eq!(outcome.unwrap_err(), QueryError::Cancelled);
        assert_eq!(controller.phase(), QueryPhase::Idle);
        assert_eq!(controller.session.transport().count(methods::GET_ALL_RESULTS), 0);
        assert_eq!(controller.metrics().polls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn refine_rejection_is_a_failure() {
        let controller = controller(ScriptedTransport::new().reply(methods::REFINE, json!(false)));
        let err = controller.refine().await.unwrap_err();
        assert!(matches!(err, QueryError::Rejected { .. }));
        assert_eq!(controller.phase(), QueryPhase::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn refine_polls_and_fetches() {
        let controller = controller(
            accepting()
                .reply(methods::REFINE, json!(true))
                .reply(methods::IS_COMPLETED, json!(true)),
        );
        let page = controller.refine().await.unwrap();
        assert_eq!(page.feedback_ids, vec![5]);
        assert_eq!(controller.phase(), QueryPhase::Completed);
    }
}
