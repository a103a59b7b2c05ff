//! Chat-completion client.
//!
//! Non-streaming calls run an attempt/retry loop governed by [`RetryPolicy`].
//! Streaming calls are never retried: once tokens have been delivered a replay
//! would duplicate them, so a failed stream is reported and left to the caller.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::models::{fetch_models, sort_models};
use crate::api::{ChatCompletionResponse, ModelInfo};
use crate::core::chat_stream::{ChatStream, StreamParams};
use crate::core::config::{Config, DEFAULT_STREAM_BUFFER};
use crate::core::error::ChatError;
use crate::core::message::{ChatCompletionResult, ModelCallRequest};
use crate::core::request::{build_chat_request, ApiEndpoint};
use crate::core::retry::{RandomSource, RetryPolicy, Sleeper, SystemRandom, TokioSleeper};
use crate::core::transport::{HttpRequest, ReqwestTransport, Transport};


#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub endpoint: ApiEndpoint,
    pub retry_policy: RetryPolicy,
    pub stream_buffer: usize,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoint: ApiEndpoint::default(),
            retry_policy: RetryPolicy::default(),
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

impl From<&Config> for ClientSettings {
    fn from(config: &Config) -> Self {
        Self {
            endpoint: config.endpoint(),
            retry_policy: config.retry_policy(),
            stream_buffer: config.stream_buffer(),
        }
    }
}

/// Issues chat-completion calls against one API endpoint.
///
/// The client holds no per-call state; it can be shared across tasks and any
/// number of calls may run concurrently.
#[derive(Clone)]
pub struct ChatClient {
    transport: Arc<dyn Transport>,
    settings: ClientSettings,
    random: Arc<dyn RandomSource>,
    sleeper: Arc<dyn Sleeper>,
}

impl ChatClient {
    pub fn new(settings: ClientSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            settings,
            random: Arc::new(SystemRandom),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Build a client with the default `reqwest` transport.
    pub fn from_config(config: &Config) -> Result<Self, ChatError> {
        let transport = ReqwestTransport::with_connect_timeout(config.connect_timeout())?;
        Ok(Self::new(ClientSettings::from(config), Arc::new(transport)))
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Send a non-streaming completion request, retrying transient failures.
    ///
    /// Cancelling `cancel_token` during the network wait or a retry sleep
    /// returns [`ChatError::Cancelled`] without starting another attempt.
    pub async fn send_message(
        &self,
        request: &ModelCallRequest,
        cancel_token: &CancellationToken,
    ) -> Result<ChatCompletionResult, ChatError> {
        let mut request = request.clone();
        request.stream = false;
        let http_request = build_chat_request(&self.settings.endpoint, &request)?;
        let policy = &self.settings.retry_policy;

        let mut attempt = 1;
        loop {
            debug!(model = %request.model_id, attempt, "sending chat completion");
            let outcome = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => return Err(ChatError::Cancelled),
                outcome = self.attempt(http_request.clone(), &request.model_id) => outcome,
            };

            let err = match outcome {
                Ok(result) => return Ok(result),
                Err(err) => err,
            };

            if !policy.should_retry(attempt, &err) {
                warn!(model = %request.model_id, attempt, "chat completion failed: {err}");
                return Err(err);
            }

            let delay = policy.delay_for(attempt, err.retry_after(), self.random.as_ref());
            debug!(
                model = %request.model_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying after transient failure: {err}"
            );
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => return Err(ChatError::Cancelled),
                _ = self.sleeper.sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        http_request: HttpRequest,
        model_id: &str,
    ) -> Result<ChatCompletionResult, ChatError> {
        let response = self.transport.execute(http_request).await?;
        let status = response.status;
        let retry_after = response.retry_after;
        let success = response.is_success();
        let body = response.text().await.map_err(|err| match err {
            ChatError::Streaming(detail) => ChatError::NetworkUnavailable(detail),
            other => other,
        })?;

        if !success {
            return Err(ChatError::from_status(status, &body, retry_after, model_id));
        }
        decode_completion(&body, model_id)
    }

    /// Start a streaming completion. Events arrive lazily through the returned
    /// [`ChatStream`]; call [`ChatStream::cancel`] or drop it to abort.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime: the request is driven by a
    /// spawned task, and spawning outside a runtime panics.
    pub fn stream_message(&self, mut request: ModelCallRequest) -> ChatStream {
        request.stream = true;
        ChatStream::spawn(StreamParams {
            transport: Arc::clone(&self.transport),
            endpoint: self.settings.endpoint.clone(),
            request,
            cancel_token: CancellationToken::new(),
            buffer: self.settings.stream_buffer,
        })
    }

    /// Available models, newest first.
    pub async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, ChatError> {
        let response =
            fetch_models(self.transport.as_ref(), &self.settings.endpoint, api_key).await?;
        let mut models = response.data;
        sort_models(&mut models);
        Ok(models)
    }
}

/// Decode a successful non-streaming body.
///
/// Some upstreams answer 200 with an `error` object; its `code` is classified
/// like an HTTP status.
pub(crate) fn decode_completion(
    body: &str,
    requested_model: &str,
) -> Result<ChatCompletionResult, ChatError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|err| ChatError::Decoding(err.to_string()))?;

    if let Some(error) = response.error.as_ref() {
        let status = error
            .get("code")
            .and_then(|code| code.as_u64())
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or(500);
        return Err(ChatError::from_status(status, body, None, requested_model));
    }

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::Decoding("response contained no choices".to_string()))?;
    let content = choice
        .message
        .and_then(|message| message.content)
        .unwrap_or_default();
    let usage = response.usage.unwrap_or_default();

    Ok(ChatCompletionResult {
        content,
        prompt_tokens: usage.prompt_tokens.unwrap_or(0),
        completion_tokens: usage.completion_tokens.unwrap_or(0),
        model_id: response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
    })
}
