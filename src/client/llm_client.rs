//! Chat-completions client for the remote generation endpoint.
//!
//! Epistemic foundation:
//! - K_i: The endpoint speaks the OpenAI chat-completions schema
//! - B_i: API will respond within timeout (might fail)
//! - B_i: Response will carry at least one choice (might not)
//! - I^B: Network availability unknowable → bounded retry policy

use crate::client::{RetryPolicy, TextGenerator};
use crate::models::{Config, ConfigError, CorpusError, RemoteCallError, Result};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Message in a chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion request payload.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f64,
}

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Error response body.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Extract the first choice's text from a success body.
///
/// A body without the expected shape is an `InvalidResponse`, never a panic.
fn parse_completion(body: &str) -> Result<(String, ChatUsage)> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body).map_err(|e| {
        RemoteCallError::InvalidResponse(format!("Failed to parse response: {e}"))
    })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| RemoteCallError::InvalidResponse("No choices in response".to_string()))?
        .message
        .content
        .ok_or_else(|| RemoteCallError::InvalidResponse("First choice has no content".to_string()))?;

    Ok((content, parsed.usage.unwrap_or_default()))
}

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Features:
/// - Bearer credential validated at construction
/// - Retry with bounded exponential backoff (see [`RetryPolicy`])
/// - `retry-after` honoured on 429
/// - Token usage tracking
pub struct LlmClient {
    client: reqwest::Client,
    /// Base URL for the API
    base_url: String,
    /// Prebuilt auth + content-type headers
    headers: HeaderMap,
    /// Request timeout
    timeout: Duration,
    /// Retry schedule
    retry: RetryPolicy,
    // Usage tracking
    total_requests: AtomicU64,
    total_prompt_tokens: AtomicU64,
    total_completion_tokens: AtomicU64,
}

impl LlmClient {
    /// Create a new client.
    ///
    /// A blank `api_key` is a configuration error raised before any request.
    pub fn new(
        api_key: &str,
        base_url: impl Into<String>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::InvalidApiKey("credential is empty".to_string()).into());
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim())).map_err(|_| {
            ConfigError::InvalidApiKey("credential contains invalid header characters".into())
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let timeout = Duration::from_secs(timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(CorpusError::Network)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers,
            timeout,
            retry,
            total_requests: AtomicU64::new(0),
            total_prompt_tokens: AtomicU64::new(0),
            total_completion_tokens: AtomicU64::new(0),
        })
    }

    /// Build a client from configuration, resolving the credential first.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        Self::new(
            &api_key,
            config.endpoint.base_url.clone(),
            config.endpoint.timeout_secs,
            RetryPolicy::from_config(&config.retry),
        )
    }

    /// One HTTP round trip, classified into text or a typed failure.
    async fn send_once(&self, url: &str, request: &ChatCompletionRequest<'_>) -> Result<String> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CorpusError::Timeout(self.timeout)
                } else {
                    CorpusError::Network(e)
                }
            })?;

        let status = response.status();
        let code = status.as_u16();

        if code == 429 {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<f64>().ok());
            return Err(RemoteCallError::RateLimited { retry_after_secs }.into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            let error = match code {
                401 | 403 => RemoteCallError::AuthenticationFailed { status: code },
                404 => RemoteCallError::ModelNotFound(request.model.to_string()),
                _ => RemoteCallError::ApiError {
                    status: code,
                    message,
                },
            };
            return Err(error.into());
        }

        let body = response.text().await.map_err(CorpusError::Network)?;
        let (content, usage) = parse_completion(&body)?;

        self.total_prompt_tokens
            .fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.total_completion_tokens
            .fetch_add(usage.completion_tokens, Ordering::Relaxed);

        Ok(content)
    }

    /// Complete a chat request under the retry policy.
    ///
    /// B_i(API available) → Result
    /// B_i(valid response) → Result
    pub async fn complete(
        &self,
        model: &str,
        messages: Vec<Message>,
        temperature: f64,
    ) -> Result<String> {
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature,
        };
        let url = format!("{}/chat/completions", self.base_url);

        let mut attempt = 0;
        loop {
            let error = match self.send_once(&url, &request).await {
                Ok(content) => return Ok(content),
                Err(e) => e,
            };

            if !error.is_retryable() {
                return Err(error);
            }
            if !self.retry.should_retry(attempt) {
                if self.retry.max_attempts == 1 {
                    return Err(error);
                }
                return Err(RemoteCallError::RetriesExhausted {
                    attempts: self.retry.max_attempts,
                    last_error: error.to_string(),
                }
                .into());
            }

            // Server hints are untrusted: non-finite or out-of-range values fall back
            let hinted = error
                .retry_after()
                .filter(|secs| secs.is_finite())
                .and_then(|secs| Duration::try_from_secs_f64(secs.max(0.0)).ok());
            let backoff = match hinted {
                Some(hint) => self.retry.clamp(hint),
                None => self.retry.delay_for(attempt),
            };
            debug!(
                model = model,
                attempt = attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Retrying remote call"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Requests sent, including retries.
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// (prompt, completion) tokens reported by the endpoint.
    pub fn total_tokens(&self) -> (u64, u64) {
        (
            self.total_prompt_tokens.load(Ordering::Relaxed),
            self.total_completion_tokens.load(Ordering::Relaxed),
        )
    }
}

impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, model: &str, temperature: f64) -> Result<String> {
        debug!(model = model, temperature = temperature, "Sending generation request");
        let result = self
            .complete(model, vec![Message::user(prompt)], temperature)
            .await;
        if let Err(e) = &result {
            warn!(model = model, error = %e, "Remote generation call failed");
        }
        result
    }

    fn usage(&self) -> (u64, u64) {
        self.total_tokens()
    }
}
