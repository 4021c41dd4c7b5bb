use std::fmt;

use uuid::Uuid;

pub mod credentials;
pub mod customer_controller;
pub mod error;
pub mod events;
pub mod gateway;
pub mod query_controller;
pub mod render;
pub mod session;

pub use credentials::{
    Credential, CredentialHandle, CredentialPrompt, CredentialStore, FileCredentialStore,
    MemoryCredentialStore, PromptState,
};
pub use customer_controller::{Customer, CustomerListController, CustomerListState, LoadPhase};
pub use error::ClientError;
pub use events::{ControllerEvent, Notification, NotificationLevel};
pub use gateway::{ApiGateway, AuthScheme, HttpGateway};
pub use query_controller::{QueryController, QueryPhase, QueryResult, QueryState};
pub use session::{Session, SessionConfig};

/// Correlates a controller's in-flight request with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/credentials_tests.rs"]
mod credentials_tests;

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod gateway_tests;
