use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{ClientListResponse, ClientRecord, ClientResponse, SaveResponse};

/// Failures below the application envelope. A `success: false` reply is not
/// an error at this level; callers inspect the envelope themselves.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response reported success without a client record")]
    MissingRecord,
}

/// The client record endpoints of the storage backend.
#[async_trait]
pub trait ClientApi: Send + Sync {
    async fn list_clients(&self) -> Result<ClientListResponse, ApiError>;
    async fn get_client(&self, id: i32) -> Result<ClientResponse, ApiError>;
    async fn create_client(&self, record: &ClientRecord) -> Result<SaveResponse, ApiError>;
    async fn update_client(&self, id: i32, record: &ClientRecord) -> Result<SaveResponse, ApiError>;
}

/// `ClientApi` over HTTP. Status codes are not interpreted; the JSON envelope
/// decides whether a call succeeded.
pub struct HttpClientApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpClientApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            config.clients_api_url(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn clients_url(&self) -> String {
        format!("{}/api/clients", self.base_url)
    }

    fn client_url(&self, id: i32) -> String {
        format!("{}/api/clients/{id}", self.base_url)
    }
}

async fn read_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    debug!(%status, bytes = body.len(), "api: response received");
    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl ClientApi for HttpClientApi {
    async fn list_clients(&self) -> Result<ClientListResponse, ApiError> {
        let url = self.clients_url();
        debug!(%url, "api: GET client list");
        let response = self.http.get(&url).send().await?;
        let envelope: ClientListResponse = read_envelope(response).await?;
        info!(success = envelope.success, count = envelope.clients.len(), "api: client list loaded");
        Ok(envelope)
    }

    async fn get_client(&self, id: i32) -> Result<ClientResponse, ApiError> {
        let url = self.client_url(id);
        debug!(%url, "api: GET client");
        let response = self.http.get(&url).send().await?;
        let envelope: ClientResponse = read_envelope(response).await?;
        info!(client_id = id, success = envelope.success, "api: client fetched");
        Ok(envelope)
    }

    async fn create_client(&self, record: &ClientRecord) -> Result<SaveResponse, ApiError> {
        let url = self.clients_url();
        debug!(%url, "api: POST client");
        let response = self.http.post(&url).json(record).send().await?;
        let envelope: SaveResponse = read_envelope(response).await?;
        info!(success = envelope.success, "api: client create answered");
        Ok(envelope)
    }

    async fn update_client(&self, id: i32, record: &ClientRecord) -> Result<SaveResponse, ApiError> {
        let url = self.client_url(id);
        debug!(%url, "api: PUT client");
        let response = self.http.put(&url).json(record).send().await?;
        let envelope: SaveResponse = read_envelope(response).await?;
        info!(client_id = id, success = envelope.success, "api: client update answered");
        Ok(envelope)
    }
}
