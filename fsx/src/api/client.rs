use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::common::ErrorBody;
use super::error::ApiError;
use super::sigv4::{Credentials, Signer};

const TARGET_PREFIX: &str = "AWSSimbaAPIService_v20180301";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const SERVICE: &str = "fsx";

/// Amazon FSx API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    endpoint: Url,
    region: String,
    credentials: Credentials,
    retry_config: RetryConfig,
}

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Overrides the regional endpoint
    pub endpoint: Option<String>,
    pub region: String,
    pub credentials: Credentials,
    pub retry: RetryConfig,
}

impl ClientConfig {
    pub fn new(region: &str, credentials: Credentials) -> Self {
        Self {
            endpoint: None,
            region: region.to_string(),
            credentials,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn resolved_endpoint(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://fsx.{}.amazonaws.com", self.region),
        }
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let endpoint_str = config.resolved_endpoint();
        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| ApiError::InvalidEndpoint(format!("{}: {}", endpoint_str, e)))?;
        if endpoint.host_str().is_none() {
            return Err(ApiError::InvalidEndpoint(format!(
                "{}: missing host",
                endpoint_str
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.retry.timeout_seconds))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                endpoint,
                region: config.region,
                credentials: config.credentials,
                retry_config: config.retry,
            }),
        })
    }

    pub fn region(&self) -> &str {
        &self.inner.region
    }

    pub fn endpoint(&self) -> &str {
        self.inner.endpoint.as_str()
    }

    /// Volume operations
    pub fn volumes(&self) -> super::volumes::VolumesApi<'_> {
        super::volumes::VolumesApi::new(self)
    }

    /// Invoke one JSON protocol operation with retry logic
    pub async fn call<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        operation: &str,
        body: &Req,
    ) -> Result<Resp, ApiError> {
        let payload = serde_json::to_vec(body)
            .map_err(|e| ApiError::ParseError(format!("Failed to encode request: {}", e)))?;
        let target = format!("{}.{}", TARGET_PREFIX, operation);

        self.execute_with_retry(
            || async {
                tracing::debug!("POST {} to {}", operation, self.inner.endpoint);

                let signer = Signer::new(&self.inner.credentials, &self.inner.region, SERVICE);
                let signed = signer.sign(
                    "POST",
                    &self.inner.endpoint,
                    &[("content-type", CONTENT_TYPE), ("x-amz-target", &target)],
                    &payload,
                    Utc::now(),
                )?;

                let mut request = self
                    .inner
                    .http_client
                    .post(self.inner.endpoint.clone())
                    .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
                    .header("x-amz-target", &target);
                for (name, value) in signed {
                    request = request.header(name, value);
                }
                Ok::<_, ApiError>(request.body(payload.clone()).send().await?)
            },
            operation,
        )
        .await
    }

    async fn execute_with_retry<F, Fut, T>(&self, request_fn: F, operation: &str) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, ApiError>>,
        T: DeserializeOwned,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying {} after {}ms (attempt {})",
                    operation,
                    backoff,
                    attempt
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return self.parse_success_response(response).await;
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        match self.handle_error_response(response).await {
                            ApiError::RateLimited => last_error = Some(ApiError::RateLimited),
                            err => return Err(err),
                        }
                    }
                }
                Err(ApiError::RequestError(e)) => {
                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() || e.is_request() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
                Err(e) => return Err(e),
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        // Some operations answer with an empty body
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    async fn handle_error_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) if ApiError::is_throttling_code(body.code()) => ApiError::RateLimited,
            Ok(body) => {
                let message = body.message.clone().unwrap_or_default();
                ApiError::from_service(status, body.code(), message)
            }
            Err(_) => ApiError::Service {
                status,
                code: "UnknownError".to_string(),
                message: text,
            },
        }
    }
}
