//! Turns a [`ModelCallRequest`] into a transport-ready [`HttpRequest`].
//!
//! Optional parameters are only sent when they differ from the provider's
//! neutral default so that server-side defaults stay in effect.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};

use crate::api::{ChatRequest, ReasoningPayload};
use crate::core::error::ChatError;
use crate::core::message::{ChatParameters, ModelCallRequest};
use crate::core::transport::{HttpMethod, HttpRequest};
use crate::utils::auth::{add_auth_headers, add_client_headers};
use crate::utils::url::endpoint_url;

pub const CHAT_COMPLETIONS_PATH: &str = "chat/completions";
pub const MODELS_PATH: &str = "models";

/// Where requests go and how the client identifies itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub base_url: String,
    pub app_name: String,
    pub referer: Option<String>,
}

impl Default for ApiEndpoint {
    fn default() -> Self {
        Self {
            base_url: crate::core::config::DEFAULT_BASE_URL.to_string(),
            app_name: crate::core::config::DEFAULT_APP_NAME.to_string(),
            referer: None,
        }
    }
}

pub fn build_chat_request(
    endpoint: &ApiEndpoint,
    request: &ModelCallRequest,
) -> Result<HttpRequest, ChatError> {
    let url = endpoint_url(&endpoint.base_url, CHAT_COMPLETIONS_PATH)?;
    let mut headers = base_headers(endpoint, &request.api_key)?;
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if request.stream {
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    }

    let body = chat_request_body(request);
    let body = serde_json::to_string(&body)
        .map_err(|err| ChatError::InvalidConfiguration(format!("unencodable request: {err}")))?;

    Ok(HttpRequest {
        method: HttpMethod::Post,
        url,
        headers,
        body: Some(body),
    })
}

pub fn build_models_request(
    endpoint: &ApiEndpoint,
    api_key: &str,
) -> Result<HttpRequest, ChatError> {
    let url = endpoint_url(&endpoint.base_url, MODELS_PATH)?;
    let mut headers = base_headers(endpoint, api_key)?;
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(HttpRequest {
        method: HttpMethod::Get,
        url,
        headers,
        body: None,
    })
}

fn base_headers(endpoint: &ApiEndpoint, api_key: &str) -> Result<HeaderMap, ChatError> {
    let mut headers = HeaderMap::new();
    add_auth_headers(&mut headers, api_key)?;
    add_client_headers(&mut headers, &endpoint.app_name, endpoint.referer.as_deref())?;
    Ok(headers)
}

pub fn chat_request_body(request: &ModelCallRequest) -> ChatRequest {
    let params = &request.parameters;
    ChatRequest {
        model: request.model_id.clone(),
        messages: request.messages.clone(),
        stream: request.stream,
        temperature: params.temperature,
        max_tokens: params.max_tokens,
        top_p: params.top_p,
        top_k: params.top_k.filter(|k| *k > 0),
        frequency_penalty: params.frequency_penalty.filter(|v| *v != 0.0),
        presence_penalty: params.presence_penalty.filter(|v| *v != 0.0),
        repetition_penalty: params.repetition_penalty.filter(|v| *v != 1.0),
        min_p: params.min_p.filter(|v| *v != 0.0),
        top_a: params.top_a.filter(|v| *v != 0.0),
        reasoning: reasoning_payload(params),
        verbosity: params.verbosity,
    }
}

fn reasoning_payload(params: &ChatParameters) -> Option<ReasoningPayload> {
    let enabled = params.reasoning_enabled?;
    // `max_tokens` and `effort` are mutually exclusive; the token budget wins.
    let (effort, max_tokens) = match params.reasoning_max_tokens {
        Some(budget) => (None, Some(budget)),
        None => (params.reasoning_effort, None),
    };
    Some(ReasoningPayload {
        enabled,
        effort,
        max_tokens,
        exclude: params.reasoning_exclude,
    })
}
