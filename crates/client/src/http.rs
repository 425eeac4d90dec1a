//! HTTP transport backed by reqwest.

use std::sync::Arc;

use async_trait::async_trait;
use defer_core::{
    CancelExecutionRequest, CancelExecutionResponse, EnqueueExecutionRequest,
    EnqueueExecutionResponse, ExecutionId, ExecutionTry, FetchExecutionResponse,
    RescheduleExecutionRequest, RescheduleExecutionResponse,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::transport::Transport;

const API_PREFIX: [&str; 2] = ["public", "v1"];
const USER_AGENT: &str = concat!("defer-rs/", env!("CARGO_PKG_VERSION"));

/// Transport talking JSON over HTTP to the Defer API.
#[derive(Clone)]
pub struct HttpTransport {
    config: Arc<ClientConfig>,
    endpoint: Url,
    token: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct CancelBody {
    force: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RescheduleBody {
    schedule_for: defer_core::Time,
}

impl HttpTransport {
    /// Create a transport from configuration. Fails if no token is configured.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| ClientError::config("no backend token configured"))?;
        let endpoint = config.endpoint_url()?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            endpoint,
            token,
            http_client,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::config(format!("endpoint {} cannot be a base", self.endpoint)))?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .basic_auth("", Some(&self.token))
    }

    /// Send a request and decode the JSON response. A 404 on an execution
    /// resource becomes [`ClientError::NotFound`].
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        execution: Option<&ExecutionId>,
    ) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        if let (StatusCode::NOT_FOUND, Some(id)) = (status, execution) {
            return Err(ClientError::NotFound(id.clone()));
        }

        let message = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %message, "Backend rejected request");
        Err(ClientError::api(status.as_u16(), message))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn enqueue_execution(
        &self,
        request: &EnqueueExecutionRequest,
    ) -> Result<EnqueueExecutionResponse> {
        let url = self.url(&["enqueue"])?;
        let response: EnqueueExecutionResponse = self
            .send(self.request(Method::POST, url).json(request), None)
            .await?;
        info!(function = %request.name, id = %response.id, "Enqueued execution");
        Ok(response)
    }

    async fn fetch_execution(&self, id: &ExecutionId) -> Result<FetchExecutionResponse> {
        let url = self.url(&["executions", id.as_str()])?;
        self.send(self.request(Method::GET, url), Some(id)).await
    }

    async fn wait_execution_result(&self, id: &ExecutionId) -> Result<FetchExecutionResponse> {
        loop {
            let record = self.fetch_execution(id).await?;
            if record.is_terminal() {
                return Ok(record);
            }
            debug!(%id, state = %record.state, "Waiting for execution");
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn cancel_execution(
        &self,
        request: &CancelExecutionRequest,
    ) -> Result<CancelExecutionResponse> {
        let url = self.url(&["executions", request.id.as_str(), "cancel"])?;
        let body = CancelBody {
            force: request.force,
        };
        self.send(self.request(Method::POST, url).json(&body), Some(&request.id))
            .await
    }

    async fn get_execution_tries(&self, id: &ExecutionId) -> Result<Vec<ExecutionTry>> {
        let url = self.url(&["executions", id.as_str(), "tries"])?;
        self.send(self.request(Method::GET, url), Some(id)).await
    }

    async fn reschedule_execution(
        &self,
        request: &RescheduleExecutionRequest,
    ) -> Result<RescheduleExecutionResponse> {
        let url = self.url(&["executions", request.id.as_str(), "reschedule"])?;
        let body = RescheduleBody {
            schedule_for: request.schedule_for,
        };
        self.send(self.request(Method::POST, url).json(&body), Some(&request.id))
            .await
    }
}
