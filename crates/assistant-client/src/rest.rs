//! REST implementation of [`AssistantProvider`].
//!
//! `RestAssistantClient` wraps a `reqwest::Client` and translates every
//! trait method into the corresponding HTTP call against the assistant
//! API, with automatic retry + exponential back-off on transient
//! failures.  Reads retry on 5xx, 429 and any transport error; writes
//! (`POST`) retry only on 429 and connection failures, where the server
//! cannot have applied the request.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use imo_domain::config::AssistantConfig;
use imo_domain::error::{Error, Result};
use imo_domain::trace::TraceEvent;

use crate::provider::AssistantProvider;
use crate::types::{
    CreateMessageRequest, CreateRunRequest, Role, Run, RunStepList, SubmitToolOutputsRequest,
    Thread, ThreadMessageList, ToolOutput,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which failures a request may be resent after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    /// `GET`: 5xx, 429 and every transport error.
    Idempotent,
    /// `POST`: 429 and connection failures only.
    ConnectOnly,
}

/// A REST-based client for the assistant threads / runs API.
///
/// Created once and shared by every message worker.  The underlying
/// `reqwest::Client` maintains a connection pool.
#[derive(Debug, Clone)]
pub struct RestAssistantClient {
    http: Client,
    base_url: String,
    api_key: String,
    beta_header: String,
    timeout: Duration,
    max_retries: u32,
}

impl RestAssistantClient {
    /// Build a client from config, reading the API key from the
    /// environment variable named in `api_key_env`.
    pub fn new(cfg: &AssistantConfig) -> Result<Self> {
        let api_key = cfg.api_key().ok_or_else(|| {
            Error::Config(format!(
                "environment variable {} is not set",
                cfg.api_key_env
            ))
        })?;
        Self::with_api_key(cfg, api_key)
    }

    /// Build a client with an explicit API key.
    pub fn with_api_key(cfg: &AssistantConfig, api_key: impl Into<String>) -> Result<Self> {
        let timeout = Duration::from_millis(cfg.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            beta_header: cfg.beta_header.clone(),
            timeout,
            max_retries: cfg.max_retries,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with auth and API-version headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.bearer_auth(&self.api_key)
            .header("OpenAI-Beta", &self.beta_header)
            .header("X-Request-Id", Uuid::new_v4().to_string())
    }

    /// Build the full URL for a path like `/threads`.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a transport failure, naming the endpoint and, for timeouts,
    /// the configured per-request limit.
    fn transport_error(&self, endpoint: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Http(format!(
                "{endpoint} timed out after {}ms: {e}",
                self.timeout.as_millis()
            ))
        } else {
            Error::Http(format!("{endpoint}: {e}"))
        }
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T> {
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body).map_err(|e| {
            Error::Assistant(format!("failed to parse {endpoint} response: {e}: {body}"))
        })
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Execute a request with retry + exponential back-off on transient errors.
    ///
    /// * `Retry::Idempotent` retries on 5xx, 429, timeouts and connection errors.
    /// * `Retry::ConnectOnly` retries on 429 and connection errors; a 5xx or a
    ///   timeout may mean the write was applied, so it fails immediately.
    /// * Does **not** retry on other 4xx (client errors are permanent).
    /// * Emits a `TraceEvent::AssistantCall` after every attempt.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        retry: Retry,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.decorate(build_request()).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status();

                    TraceEvent::AssistantCall {
                        endpoint: endpoint.to_owned(),
                        status: status.as_u16(),
                        duration_ms,
                    }
                    .emit();

                    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        let body = resp.text().await.unwrap_or_default();
                        let err = Error::Assistant(format!("{endpoint} returned {status}: {body}"));
                        if status.is_server_error() && retry == Retry::ConnectOnly {
                            return Err(err);
                        }
                        tracing::warn!(endpoint, %status, attempt, "transient assistant API failure");
                        last_err = Some(err);
                        continue;
                    }

                    if status.is_client_error() {
                        let body = resp.text().await.unwrap_or_default();
                        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                            return Err(Error::Auth(format!(
                                "{endpoint} auth failed ({status}): {body}"
                            )));
                        }
                        return Err(Error::Assistant(format!(
                            "{endpoint} returned {status}: {body}"
                        )));
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    TraceEvent::AssistantCall {
                        endpoint: endpoint.to_owned(),
                        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                        duration_ms,
                    }
                    .emit();

                    let resend = retry == Retry::Idempotent || e.is_connect();
                    let err = self.transport_error(endpoint, e);
                    if !resend {
                        return Err(err);
                    }
                    tracing::warn!(endpoint, attempt, error = %err, "assistant API unreachable");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Assistant(format!("{endpoint}: all retries exhausted"))))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl AssistantProvider for RestAssistantClient {
    async fn create_thread(&self) -> Result<Thread> {
        let url = self.url("/threads");
        let resp = self
            .execute_with_retry("POST /threads", Retry::ConnectOnly, || {
                self.http.post(&url).json(&serde_json::json!({}))
            })
            .await?;
        Self::decode("POST /threads", resp).await
    }

    async fn add_message(&self, thread_id: &str, role: Role, content: &str) -> Result<()> {
        let url = self.url(&format!("/threads/{thread_id}/messages"));
        let req = CreateMessageRequest { role, content };
        self.execute_with_retry("POST /threads/{id}/messages", Retry::ConnectOnly, || {
            self.http.post(&url).json(&req)
        })
        .await?;
        Ok(())
    }

    async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let url = self.url(&format!("/threads/{thread_id}/runs"));
        let req = CreateRunRequest { assistant_id };
        let resp = self
            .execute_with_retry("POST /threads/{id}/runs", Retry::ConnectOnly, || {
                self.http.post(&url).json(&req)
            })
            .await?;
        Self::decode("POST /threads/{id}/runs", resp).await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let url = self.url(&format!("/threads/{thread_id}/runs/{run_id}"));
        let resp = self
            .execute_with_retry("GET /threads/{id}/runs/{id}", Retry::Idempotent, || {
                self.http.get(&url)
            })
            .await?;
        Self::decode("GET /threads/{id}/runs/{id}", resp).await
    }

    async fn get_run_steps(&self, thread_id: &str, run_id: &str) -> Result<RunStepList> {
        let url = self.url(&format!("/threads/{thread_id}/runs/{run_id}/steps"));
        let resp = self
            .execute_with_retry(
                "GET /threads/{id}/runs/{id}/steps",
                Retry::Idempotent,
                || self.http.get(&url),
            )
            .await?;
        Self::decode("GET /threads/{id}/runs/{id}/steps", resp).await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<()> {
        let url = self.url(&format!(
            "/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"
        ));
        let req = SubmitToolOutputsRequest {
            tool_outputs: outputs,
        };
        self.execute_with_retry(
            "POST /threads/{id}/runs/{id}/submit_tool_outputs",
            Retry::ConnectOnly,
            || self.http.post(&url).json(&req),
        )
        .await?;
        Ok(())
    }

    async fn get_messages(&self, thread_id: &str) -> Result<ThreadMessageList> {
        let url = self.url(&format!("/threads/{thread_id}/messages"));
        let resp = self
            .execute_with_retry("GET /threads/{id}/messages", Retry::Idempotent, || {
                self.http.get(&url)
            })
            .await?;
        Self::decode("GET /threads/{id}/messages", resp).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Every transport failure, timeouts included, becomes `Error::Http`.
/// `Error::Timeout` is reserved for the per-message deadline.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Http(format!("request timed out: {e}"))
    } else {
        Error::Http(e.to_string())
    }
}
