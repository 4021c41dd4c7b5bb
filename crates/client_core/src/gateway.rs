//! HTTP access to the query gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    error::ApiError,
    protocol::{CustomerRecord, CustomersResponse, QueryRequest, QueryResponse},
};
use tracing::{debug, warn};
use url::Url;

use crate::{credentials::CredentialHandle, error::ClientError};

pub const API_KEY_HEADER: &str = "X-API-Key";

/// How the credential is attached to outgoing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    #[default]
    ApiKeyHeader,
    Bearer,
}

impl AuthScheme {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "api_key" | "api-key" | "x-api-key" => Some(Self::ApiKeyHeader),
            "bearer" => Some(Self::Bearer),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ApiGateway: Send + Sync {
    async fn post_query(&self, request: &QueryRequest) -> Result<QueryResponse, ClientError>;
    async fn get_customers(&self) -> Result<Vec<CustomerRecord>, ClientError>;
}

pub struct HttpGateway {
    http: Client,
    base_url: Url,
    auth_scheme: AuthScheme,
    credential: CredentialHandle,
}

impl HttpGateway {
    pub fn new(
        base_url: &str,
        auth_scheme: AuthScheme,
        credential: CredentialHandle,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url.trim()).map_err(|err| {
            ClientError::validation(format!("invalid API base URL '{base_url}': {err}"))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ClientError::connection(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            auth_scheme,
            credential,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ClientError::validation(format!("invalid endpoint '{path}': {err}")))
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let guard = self.credential.read().await;
        let credential = guard.as_ref().ok_or(ClientError::MissingCredential)?;
        Ok(match self.auth_scheme {
            AuthScheme::ApiKeyHeader => request.header(API_KEY_HEADER, credential.expose()),
            AuthScheme::Bearer => request.bearer_auth(credential.expose()),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &body);
            warn!(status = status.as_u16(), "gateway returned error: {}", err.message);
            return Err(ClientError::from_api_error(status.as_u16(), err));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn post_query(&self, request: &QueryRequest) -> Result<QueryResponse, ClientError> {
        let url = self.endpoint("query")?;
        debug!(%url, "posting query");
        let response = self
            .authorize(self.http.post(url))
            .await?
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_customers(&self) -> Result<Vec<CustomerRecord>, ClientError> {
        let url = self.endpoint("customers")?;
        debug!(%url, "fetching customers");
        let response = self.authorize(self.http.get(url)).await?.send().await?;
        let body: CustomersResponse = Self::decode(response).await?;
        Ok(body.into_customers())
    }
}
