use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use crate::core::error::ChatError;
use crate::core::retry::{RandomSource, Sleeper};
use crate::core::transport::{ByteStream, HttpRequest, HttpResponse, Transport};

/// Replays canned responses in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ChatError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<HttpResponse, ChatError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ChatError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ChatError::NetworkUnavailable("script exhausted".to_string())))
    }
}

/// Never answers; used to exercise cancellation during the network wait.
#[derive(Default)]
pub struct HangingTransport {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Transport for HangingTransport {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

/// Records the requested delay, then sleeps forever.
#[derive(Default)]
pub struct HangingSleeper {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Sleeper for HangingSleeper {
    async fn sleep(&self, _duration: Duration) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await
    }
}

pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&self) -> f64 {
        self.0
    }
}

/// SSE body made of the given lines, with no blank-line separators.
pub fn sse_body(lines: &[&str]) -> ByteStream {
    let chunks: Vec<Result<Bytes, ChatError>> = lines
        .iter()
        .map(|line| Ok(Bytes::from(format!("{line}\n"))))
        .collect();
    stream::iter(chunks).boxed()
}

/// A body fed by the returned sender. The sender's `closed()` resolves once
/// the consumer drops the body.
pub fn channel_body() -> (mpsc::Sender<Result<Bytes, ChatError>>, ByteStream) {
    let (tx, rx) = mpsc::channel(16);
    let body = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
    .boxed();
    (tx, body)
}
