//! Explicit context object wiring the credential, gateway and controllers.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{debug, error, warn};

use crate::{
    credentials::{CredentialHandle, CredentialPrompt, CredentialStore, PromptState},
    customer_controller::CustomerListController,
    error::ClientError,
    events::{ControllerEvent, Notification},
    gateway::{ApiGateway, AuthScheme, HttpGateway},
    query_controller::QueryController,
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub api_base_url: String,
    pub auth_scheme: AuthScheme,
    pub default_db: Option<String>,
    pub request_timeout: Option<Duration>,
}

pub struct Session {
    prompt: Arc<CredentialPrompt>,
    query: Arc<QueryController>,
    customers: Arc<CustomerListController>,
    events: broadcast::Sender<ControllerEvent>,
    auth_watch: JoinHandle<()>,
}

impl Session {
    pub async fn bootstrap(
        config: &SessionConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, ClientError> {
        let credential = CredentialHandle::default();
        let gateway = HttpGateway::new(
            &config.api_base_url,
            config.auth_scheme,
            Arc::clone(&credential),
            config.request_timeout,
        )?;
        Self::assemble(config, store, credential, Arc::new(gateway)).await
    }

    /// Builds a session around an existing gateway that reads `credential`.
    pub async fn assemble(
        config: &SessionConfig,
        store: Arc<dyn CredentialStore>,
        credential: CredentialHandle,
        gateway: Arc<dyn ApiGateway>,
    ) -> Result<Self, ClientError> {
        let prompt = Arc::new(CredentialPrompt::initialize(store, credential).await?);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let query = QueryController::new(
            Arc::clone(&gateway),
            config.default_db.clone(),
            events.clone(),
        );
        let customers = CustomerListController::new(gateway, events.clone());
        let auth_watch = spawn_auth_watch(Arc::clone(&prompt), events.clone());

        Ok(Self {
            prompt,
            query,
            customers,
            events,
            auth_watch,
        })
    }

    pub async fn needs_credential(&self) -> bool {
        self.prompt.state().await == PromptState::Unset
    }

    pub async fn provide_credential(&self, raw: &str) -> Result<(), ClientError> {
        self.prompt.submit(raw).await
    }

    pub async fn forget_credential(&self) -> Result<(), ClientError> {
        self.prompt.invalidate().await
    }

    pub fn query(&self) -> &Arc<QueryController> {
        &self.query
    }

    pub fn customers(&self) -> &Arc<CustomerListController> {
        &self.customers
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.auth_watch.abort();
    }
}

fn spawn_auth_watch(
    prompt: Arc<CredentialPrompt>,
    events: broadcast::Sender<ControllerEvent>,
) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ControllerEvent::AuthRejected) => {
                    warn!("API key rejected by gateway; prompting again");
                    if let Err(err) = prompt.invalidate().await {
                        error!("failed to clear rejected API key: {err}");
                    }
                    let _ = events.send(ControllerEvent::Notify(Notification::warning(
                        "API key was rejected; please enter a new one",
                    )));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "auth watcher lagged behind controller events");
                }
                Err(RecvError::Closed) => {
                    warn!("controller event bus closed; auth watcher exiting");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
