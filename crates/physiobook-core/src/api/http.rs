use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::envelope;
use super::middleware::{RequestLayer, ResponseLayer};
use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client with an explicit middleware pipeline.
///
/// Layers run in the order they were added: every request passes through
/// all `RequestLayer`s before being sent, and every response status is
/// shown to all `ResponseLayer`s before the body is decoded. Clone is
/// cheap, the underlying client and layers are reference counted.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    request_layers: Vec<Arc<dyn RequestLayer>>,
    response_layers: Vec<Arc<dyn ResponseLayer>>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_layers: Vec::new(),
            response_layers: Vec::new(),
        })
    }

    pub fn layer_request(&mut self, layer: Arc<dyn RequestLayer>) {
        self.request_layers.push(layer);
    }

    pub fn layer_response(&mut self, layer: Arc<dyn ResponseLayer>) {
        self.response_layers.push(layer);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Run a request through the pipeline and return the raw status and
    /// body for decoding.
    async fn execute(&self, mut req: RequestBuilder, path: &str) -> Result<(StatusCode, String), ApiError> {
        for layer in &self.request_layers {
            req = layer.prepare(req).await;
        }

        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(path, status = %status, "API response received");

        for layer in &self.response_layers {
            layer.inspect(status).await;
        }

        Ok((status, body))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let (status, body) = self.execute(self.client.get(self.url(path)), path).await?;
        envelope::decode(status, &body)
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.client.post(self.url(path)).json(body);
        let (status, text) = self.execute(req, path).await?;
        envelope::decode(status, &text)
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let req = self.client.patch(self.url(path)).json(body);
        let (status, text) = self.execute(req, path).await?;
        envelope::decode(status, &text)
    }

    /// GET an acknowledgement-style endpoint, returning the server message
    pub async fn get_ack(&self, path: &str) -> Result<String, ApiError> {
        let (status, body) = self.execute(self.client.get(self.url(path)), path).await?;
        envelope::decode_ack(status, &body)
    }

    /// POST an acknowledgement-style endpoint, returning the server message
    pub async fn post_ack<B: Serialize>(&self, path: &str, body: &B) -> Result<String, ApiError> {
        let req = self.client.post(self.url(path)).json(body);
        let (status, text) = self.execute(req, path).await?;
        envelope::decode_ack(status, &text)
    }

    /// PATCH an acknowledgement-style endpoint, returning the server message
    pub async fn patch_ack<B: Serialize>(&self, path: &str, body: &B) -> Result<String, ApiError> {
        let req = self.client.patch(self.url(path)).json(body);
        let (status, text) = self.execute(req, path).await?;
        envelope::decode_ack(status, &text)
    }
}
