//! Lifecycle of the customer listing: idle/loading -> loaded | failed.

use std::sync::Arc;

use shared::protocol::CustomerRecord;
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

pub type Customer = CustomerRecord;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerListState {
    pub phase: LoadPhase,
    pub customers: Vec<Customer>,
}

impl CustomerListState {
    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }
}

struct CustomerControllerState {
    view: CustomerListState,
    in_flight: Option<RequestId>,
}

pub struct CustomerListController {
    gateway: Arc<dyn ApiGateway>,
    inner: Mutex<CustomerControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl CustomerListController {
    pub fn new(
        gateway: Arc<dyn ApiGateway>,
        events: broadcast::Sender<ControllerEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            inner: Mutex::new(CustomerControllerState {
                view: CustomerListState::default(),
                in_flight: None,
            }),
            events,
        })
    }

    pub async fn state(&self) -> CustomerListState {
        self.inner.lock().await.view.clone()
    }

    /// Fetches the collection. Returns `None` when a fetch is already
    /// running, in which case no new request is issued.
    pub async fn load(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let request_id = {
            let mut guard = self.inner.lock().await;
            if guard.in_flight.is_some() {
                debug!("customer fetch already in flight");
                return None;
            }
            let request_id = RequestId::new();
            guard.in_flight = Some(request_id);
            guard.view.phase = LoadPhase::Loading;
            let _ = self
                .events
                .send(ControllerEvent::CustomersUpdated(guard.view.clone()));
            request_id
        };

        info!(%request_id, "fetching customers");
        let controller = Arc::clone(self);
        Some(tokio::spawn(async move {
            let outcome = controller.gateway.get_customers().await;
            controller.complete(request_id, outcome).await;
        }))
    }

    pub async fn refresh(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.load().await
    }

    async fn complete(&self, request_id: RequestId, outcome: Result<Vec<Customer>, ClientError>) {
        let mut guard = self.inner.lock().await;
        if guard.in_flight != Some(request_id) {
            debug!(%request_id, "discarding stale customer completion");
            return;
        }
        guard.in_flight = None;

        match outcome {
            Ok(customers) => {
                info!(%request_id, count = customers.len(), "customers loaded");
                guard.view.phase = LoadPhase::Loaded;
                guard.view.customers = customers;
                let _ = self
                    .events
                    .send(ControllerEvent::CustomersUpdated(guard.view.clone()));
            }
            Err(err) => {
                warn!(%request_id, "customer fetch failed: {err}");
                guard.view.phase = LoadPhase::Failed(err.to_string());
                guard.view.customers.clear();
                let _ = self
                    .events
                    .send(ControllerEvent::CustomersUpdated(guard.view.clone()));
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
#[path = "tests/customer_controller_tests.rs"]
mod tests;
