//! Lifecycle of a natural-language query: idle -> pending -> succeeded | failed.

use std::sync::Arc;

use shared::{
    domain::Row,
    protocol::{QueryRequest, QueryResponse},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    events::{ControllerEvent, Notification},
    gateway::ApiGateway,
    RequestId,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueryPhase {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub question: String,
    pub sql: String,
    pub rows: Vec<Row>,
    pub error: Option<String>,
}

impl QueryResult {
    fn from_response(question: String, response: QueryResponse) -> Self {
        Self {
            question,
            sql: response.sql,
            rows: response.result,
            error: response.error,
        }
    }

    /// Application-level error reported next to valid output, if any.
    pub fn soft_error(&self) -> Option<ClientError> {
        self.error
            .as_deref()
            .map(str::trim)
            .filter(|err| !err.is_empty())
            .map(|err| ClientError::Application(err.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub phase: QueryPhase,
    /// Most recent successful result. Kept across failures.
    pub last_success: Option<QueryResult>,
}

impl QueryState {
    pub fn is_pending(&self) -> bool {
        self.phase == QueryPhase::Pending
    }

    /// The result to show. A failed query hides the previous result.
    pub fn displayed(&self) -> Option<&QueryResult> {
        match self.phase {
            QueryPhase::Failed(_) => None,
            _ => self.last_success.as_ref(),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.phase {
            QueryPhase::Failed(message) => Some(message),
            _ => None,
        }
    }
}

struct QueryControllerState {
    view: QueryState,
    in_flight: Option<RequestId>,
}

pub struct QueryController {
    gateway: Arc<dyn ApiGateway>,
    default_db: Option<String>,
    inner: Mutex<QueryControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl QueryController {
    pub fn new(
        gateway: Arc<dyn ApiGateway>,
        default_db: Option<String>,
        events: broadcast::Sender<ControllerEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            default_db,
            inner: Mutex::new(QueryControllerState {
                view: QueryState::default(),
                in_flight: None,
            }),
            events,
        })
    }

    pub async fn state(&self) -> QueryState {
        self.inner.lock().await.view.clone()
    }

    pub async fn is_pending(&self) -> bool {
        self.inner.lock().await.in_flight.is_some()
    }

    /// Starts a query. The outcome is published through controller state and
    /// events; the returned handle only signals completion.
    pub async fn submit(self: &Arc<Self>, question: &str) -> Result<JoinHandle<()>, ClientError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ClientError::validation("question must not be empty"));
        }

        let request_id = {
            let mut guard = self.inner.lock().await;
            if guard.in_flight.is_some() {
                debug!("rejecting query submission while another is pending");
                return Err(ClientError::InFlight);
            }
            let request_id = RequestId::new();
            guard.in_flight = Some(request_id);
            guard.view.phase = QueryPhase::Pending;
            let _ = self
                .events
                .send(ControllerEvent::QueryUpdated(guard.view.clone()));
            request_id
        };

        let request = QueryRequest::new(question).with_db(self.default_db.clone());
        info!(%request_id, "submitting query");
        let controller = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let outcome = controller.gateway.post_query(&request).await;
            controller
                .complete(request_id, request.question, outcome)
                .await;
        }))
    }

    async fn complete(
        &self,
        request_id: RequestId,
        question: String,
        outcome: Result<QueryResponse, ClientError>,
    ) {
        let mut guard = self.inner.lock().await;
        if guard.in_flight != Some(request_id) {
            debug!(%request_id, "discarding stale query completion");
            return;
        }
        guard.in_flight = None;

        match outcome {
            Ok(response) => {
                let result = QueryResult::from_response(question, response);
                info!(%request_id, rows = result.rows.len(), "query succeeded");
                let soft_error = result.soft_error();
                guard.view.phase = QueryPhase::Succeeded;
                guard.view.last_success = Some(result);
                let _ = self
                    .events
                    .send(ControllerEvent::QueryUpdated(guard.view.clone()));
                if let Some(err) = soft_error {
                    warn!(%request_id, "query returned soft error: {err}");
                    let _ = self
                        .events
                        .send(ControllerEvent::Notify(Notification::warning(format!(
                            "Error: {err}"
                        ))));
                }
            }
            Err(err) => {
                warn!(%request_id, "query failed: {err}");
                guard.view.phase = QueryPhase::Failed(err.to_string());
                let _ = self
                    .events
                    .send(ControllerEvent::QueryUpdated(guard.view.clone()));
                let _ = self
                    .events
                    .send(ControllerEvent::Notify(Notification::error(format!(
                        "Error: {err}"
                    ))));
                if err.requires_reauth() {
                    let _ = self.events.send(ControllerEvent::AuthRejected);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/query_controller_tests.rs"]
mod tests;
