use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use shared::{
    domain::CustomerId,
    protocol::{parse_timestamp, CustomerRecord, QueryRequest, QueryResponse},
};
use tokio::sync::{broadcast, Mutex, Semaphore};

use crate::{
    error::ClientError,
    events::{ControllerEvent, Notification},
    gateway::ApiGateway,
};

/// Scripted gateway. When gated, every call parks until `release` is called.
pub(crate) struct MockGateway {
    query_outcomes: Mutex<VecDeque<Result<QueryResponse, ClientError>>>,
    customer_outcomes: Mutex<VecDeque<Result<Vec<CustomerRecord>, ClientError>>>,
    query_requests: Mutex<Vec<QueryRequest>>,
    query_calls: AtomicUsize,
    customer_calls: AtomicUsize,
    gate: Option<Semaphore>,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self {
            query_outcomes: Mutex::new(VecDeque::new()),
            customer_outcomes: Mutex::new(VecDeque::new()),
            query_requests: Mutex::new(Vec::new()),
            query_calls: AtomicUsize::new(0),
            customer_calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub(crate) fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub(crate) fn with_query(self, outcome: Result<QueryResponse, ClientError>) -> Self {
        self.query_outcomes
            .try_lock()
            .expect("unshared mock")
            .push_back(outcome);
        self
    }

    pub(crate) fn with_customers(self, outcome: Result<Vec<CustomerRecord>, ClientError>) -> Self {
        self.customer_outcomes
            .try_lock()
            .expect("unshared mock")
            .push_back(outcome);
        self
    }

    pub(crate) fn release(&self, calls: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(calls);
        }
    }

    pub(crate) fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn customer_calls(&self) -> usize {
        self.customer_calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn query_requests(&self) -> Vec<QueryRequest> {
        self.query_requests.lock().await.clone()
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate open").forget();
        }
    }
}

#[async_trait]
impl ApiGateway for MockGateway {
    async fn post_query(&self, request: &QueryRequest) -> Result<QueryResponse, ClientError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.query_requests.lock().await.push(request.clone());
        self.wait_for_gate().await;
        self.query_outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::connection("no scripted query response")))
    }

    async fn get_customers(&self) -> Result<Vec<CustomerRecord>, ClientError> {
        self.customer_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        self.customer_outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::connection("no scripted customer response")))
    }
}

pub(crate) fn shared_mock(mock: MockGateway) -> (Arc<MockGateway>, Arc<dyn ApiGateway>) {
    let mock = Arc::new(mock);
    let gateway: Arc<dyn ApiGateway> = mock.clone();
    (mock, gateway)
}

pub(crate) fn event_bus() -> (
    broadcast::Sender<ControllerEvent>,
    broadcast::Receiver<ControllerEvent>,
) {
    broadcast::channel(64)
}

pub(crate) fn drain(rx: &mut broadcast::Receiver<ControllerEvent>) -> Vec<ControllerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub(crate) fn notifications(events: &[ControllerEvent]) -> Vec<Notification> {
    events
        .iter()
        .filter_map(|event| match event {
            ControllerEvent::Notify(notification) => Some(notification.clone()),
            _ => None,
        })
        .collect()
}

pub(crate) fn customer(id: i64, name: &str, created_at: &str) -> CustomerRecord {
    CustomerRecord {
        id: CustomerId(id),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_ascii_lowercase()),
        created_at: parse_timestamp(created_at).expect("timestamp"),
    }
}

pub(crate) fn unauthorized() -> ClientError {
    ClientError::from_api_error(
        401,
        shared::error::ApiError::from_response(401, r#"{"detail":"Invalid API key"}"#),
    )
}
