//! HTTP transport seam.
//!
//! The client never talks to `reqwest` directly; it hands a fully built
//! [`HttpRequest`] to a [`Transport`] and gets back a status plus a lazily
//! consumed body. Tests substitute a scripted transport.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::Url;
use tracing::debug;

use crate::core::error::ChatError;

pub type ByteStream = BoxStream<'static, Result<Bytes, ChatError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A transport-ready request: target, headers and serialized JSON body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

pub struct HttpResponse {
    pub status: u16,
    /// `Retry-After` header, in whole seconds.
    pub retry_after: Option<u64>,
    pub body: ByteStream,
}

impl HttpResponse {
    pub fn new(status: u16, body: ByteStream) -> Self {
        Self {
            status,
            retry_after: None,
            body,
        }
    }

    pub fn from_text(status: u16, body: impl Into<String>) -> Self {
        let bytes = Bytes::from(body.into());
        Self::new(status, stream::once(async move { Ok(bytes) }).boxed())
    }

    pub fn from_chunks<I>(status: u16, chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        let chunks: Vec<Result<Bytes, ChatError>> =
            chunks.into_iter().map(|chunk| Ok(chunk.into())).collect();
        Self::new(status, stream::iter(chunks).boxed())
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the whole body as (lossy) UTF-8.
    pub async fn text(self) -> Result<String, ChatError> {
        let chunks: Vec<Bytes> = self.body.try_collect().await?;
        let mut buffer = Vec::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in chunks {
            buffer.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("retry_after", &self.retry_after)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and return as soon as the status line and headers
    /// arrive. The body is read lazily from [`HttpResponse::body`].
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ChatError>;
}

/// Production transport over a shared `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_connect_timeout(timeout: Option<Duration>) -> Result<Self, ChatError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ChatError::InvalidConfiguration(err.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ChatError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .client
            .request(method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_send_error)?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        debug!(status, ?retry_after, "response headers received");

        let body = response
            .bytes_stream()
            .map_err(|err| ChatError::Streaming(err.to_string()))
            .boxed();

        Ok(HttpResponse {
            status,
            retry_after,
            body,
        })
    }
}

fn classify_send_error(err: reqwest::Error) -> ChatError {
    if err.is_builder() {
        ChatError::InvalidConfiguration(err.to_string())
    } else {
        ChatError::NetworkUnavailable(err.to_string())
    }
}

/// Parse a `Retry-After` value given in delta-seconds. HTTP dates are ignored.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
