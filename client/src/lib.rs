//! reqwest adapter for the rxtriage backend.
//!
//! Every endpoint answers with a `{ "response": R }` envelope on success and
//! a JSON body carrying a `message` on failure. [`HttpBackend`] unwraps the
//! former and normalizes the latter into [`RemoteError`]. Dropping a returned
//! future aborts the underlying request.

mod lookup;
pub mod retry;

use std::fmt;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

use rxtriage_core::{RemoteError, TriageConfig};
use rxtriage_engine::MessageBackend;
use rxtriage_types::{
    CancelPayload, ClearScope, FilterPayload, MessageId, MessagePage, RequestId,
};

pub use lookup::{LookupResource, LookupSource, UnknownResource};
pub use retry::{RetryConfig, RetryOutcome, send_with_retry};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const TCP_KEEPALIVE_SECS: u64 = 60;
const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no API base URL configured; set [api] base_url or RXTRIAGE_BASE_URL")]
    MissingBaseUrl,
    #[error("invalid API base URL {0:?}")]
    InvalidBaseUrl(String),
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Deserialize)]
struct Envelope<R> {
    response: R,
}

#[derive(Debug, Deserialize)]
struct CountBody {
    count: u64,
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
    retry: RetryConfig,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Result<Self, ClientError> {
        let mut parsed =
            Url::parse(base_url).map_err(|_| ClientError::InvalidBaseUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(timeout)
            .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
            .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: parsed,
            token: token.filter(|token| !token.trim().is_empty()),
            retry,
        })
    }

    pub fn from_config(config: &TriageConfig) -> Result<Self, ClientError> {
        let base_url = config.base_url().ok_or(ClientError::MissingBaseUrl)?;
        let token = config.api.as_ref().and_then(|api| api.token.clone());
        Self::new(
            &base_url,
            token,
            Duration::from_secs(config.api_timeout_secs()),
            RetryConfig::with_max_retries(config.max_retries()),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, path: &str) -> Result<Url, RemoteError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| RemoteError::transport(format!("invalid request path {path:?}: {err}")))
    }

    fn request(&self, method: &Method, url: &Url, body: Option<&Value>) -> RequestBuilder {
        let mut builder = self.client.request(method.clone(), url.clone());
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        retry: &RetryConfig,
    ) -> Result<Response, RemoteError> {
        tracing::debug!(%method, url = url.as_str(), "sending request");
        let outcome = send_with_retry(|| self.request(&method, &url, body.as_ref()), retry).await;
        match outcome {
            RetryOutcome::Success(response) => Ok(response),
            RetryOutcome::HttpError(response) => {
                let status = response.status().as_u16();
                let body = read_capped_error_body(response).await;
                tracing::warn!(%method, url = url.as_str(), status, "request failed");
                Err(RemoteError::from_http(status, &body))
            }
            RetryOutcome::ConnectionError { attempts, source } => {
                tracing::warn!(%method, url = url.as_str(), attempts, error = %source, "connection failed");
                Err(RemoteError::transport(format!(
                    "connection failed after {attempts} attempts"
                )))
            }
            RetryOutcome::NonRetryable(source) => {
                tracing::warn!(%method, url = url.as_str(), error = %source, "request error");
                Err(RemoteError::transport(source.to_string()))
            }
        }
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<R, RemoteError> {
        let response = self.send(method, self.url(path)?, body, &self.retry).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| RemoteError::transport(err.to_string()))?;
        decode_envelope(&bytes)
    }

    /// A workflow command: only the status matters, the body is ignored.
    /// Sent exactly once; a failed command is retried only by the caller.
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<(), RemoteError> {
        let single = self.retry.single_attempt();
        self.send(method, self.url(path)?, body, &single)
            .await
            .map(drop)
    }

    pub async fn lookup(
        &self,
        resource: LookupResource,
        query: &str,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut url = self.url(&format!("{resource}/search"))?;
        url.query_pairs_mut().append_pair("q", query);
        let response = self.send(Method::GET, url, None, &self.retry).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| RemoteError::transport(err.to_string()))?;
        decode_envelope(&bytes)
    }
}

fn to_body(value: &impl Serialize) -> Result<Value, RemoteError> {
    serde_json::to_value(value).map_err(|err| RemoteError::Decode(err.to_string()))
}

/// Unwrap `{ "response": R }`. A 2xx body that carries an `error` instead
/// is treated as a rejection with that error's message.
fn decode_envelope<R: DeserializeOwned>(bytes: &[u8]) -> Result<R, RemoteError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|err| RemoteError::Decode(err.to_string()))?;
    let embedded_error = value
        .get("error")
        .or_else(|| value.pointer("/response/error"))
        .is_some_and(|error| !error.is_null());
    if embedded_error {
        return Err(RemoteError::from_payload(&value));
    }
    serde_json::from_value::<Envelope<R>>(value)
        .map(|envelope| envelope.response)
        .map_err(|err| RemoteError::Decode(err.to_string()))
}

/// Read at most [`MAX_ERROR_BODY_BYTES`] of an error body.
async fn read_capped_error_body(response: Response) -> String {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            break;
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

impl MessageBackend for HttpBackend {
    async fn fetch_messages(&self, filter: FilterPayload) -> Result<MessagePage, RemoteError> {
        self.call(Method::POST, "messages/search", Some(to_body(&filter)?))
            .await
    }

    async fn count_messages(&self, filter: FilterPayload) -> Result<u64, RemoteError> {
        let body: CountBody = self
            .call(Method::POST, "messages/count", Some(to_body(&filter)?))
            .await?;
        Ok(body.count)
    }

    async fn approve(&self, id: MessageId) -> Result<(), RemoteError> {
        self.command(Method::POST, &format!("messages/{id}/approve"), None)
            .await
    }

    async fn deny(&self, id: MessageId) -> Result<(), RemoteError> {
        self.command(Method::POST, &format!("messages/{id}/deny"), None)
            .await
    }

    async fn cancel(&self, id: MessageId, payload: CancelPayload) -> Result<(), RemoteError> {
        self.command(
            Method::POST,
            &format!("messages/{id}/cancel"),
            Some(to_body(&payload)?),
        )
        .await
    }

    async fn mark_reviewed(&self, request_id: RequestId, reviewed: bool) -> Result<(), RemoteError> {
        self.command(
            Method::PUT,
            &format!("requests/{request_id}/reviewed"),
            Some(json!({ "reviewed": reviewed })),
        )
        .await
    }

    async fn clear_all(&self, scope: ClearScope) -> Result<(), RemoteError> {
        self.command(Method::POST, "messages/clear", Some(to_body(&scope)?))
            .await
    }

    async fn delete(&self, id: MessageId) -> Result<(), RemoteError> {
        self.command(Method::DELETE, &format!("messages/{id}"), None)
            .await
    }
}
