use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::core::error::ChatError;
use crate::core::line_reader::StreamLineReader;
use crate::core::message::ModelCallRequest;
use crate::core::request::{build_chat_request, ApiEndpoint};
use crate::core::stream_event::{parse_sse_payload, StreamEvent};
use crate::core::transport::Transport;

/// Lifecycle of a streaming call as seen by the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Cancelled | StreamState::Failed
        )
    }
}

/// Frames passed from the producer task to [`ChatStream`].
#[derive(Debug)]
enum StreamMessage {
    Connected,
    Event(StreamEvent),
    Failed(ChatError),
    End,
}

pub struct StreamParams {
    pub transport: Arc<dyn Transport>,
    pub endpoint: ApiEndpoint,
    pub request: ModelCallRequest,
    pub cancel_token: CancellationToken,
    pub buffer: usize,
}

/// A cancellable, backpressured sequence of [`StreamEvent`]s.
///
/// A connection or HTTP failure is yielded once as `Err` and ends the stream.
/// Cancellation ends the stream without an error; dropping the stream cancels
/// the underlying request.
pub struct ChatStream {
    rx: mpsc::Receiver<StreamMessage>,
    cancel_token: CancellationToken,
    state: StreamState,
    _drop_guard: DropGuard,
}

impl ChatStream {
    /// Spawn the producer task on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn(params: StreamParams) -> Self {
        let (tx, rx) = mpsc::channel(params.buffer.max(1));
        let cancel_token = params.cancel_token.clone();
        let drop_guard = params.cancel_token.clone().drop_guard();

        tokio::spawn(async move {
            let StreamParams {
                transport,
                endpoint,
                request,
                cancel_token,
                ..
            } = params;

            tokio::select! {
                _ = produce(transport.as_ref(), &endpoint, &request, &tx, &cancel_token) => {}
                _ = cancel_token.cancelled() => {
                    debug!(model = %request.model_id, "stream cancelled");
                }
            }
        });

        Self {
            rx,
            cancel_token,
            state: StreamState::Connecting,
            _drop_guard: drop_guard,
        }
    }

    /// Abort the in-flight request. No further events are delivered.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// A handle that cancels this stream from elsewhere.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    fn finish(&mut self, state: StreamState) {
        self.state = state;
        self.rx.close();
    }
}

impl Stream for ChatStream {
    type Item = Result<StreamEvent, ChatError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.state.is_terminal() {
                return Poll::Ready(None);
            }
            if this.cancel_token.is_cancelled() {
                this.finish(StreamState::Cancelled);
                return Poll::Ready(None);
            }

            let message = match this.rx.poll_recv(cx) {
                Poll::Ready(message) => message,
                Poll::Pending => return Poll::Pending,
            };

            match message {
                Some(StreamMessage::Connected) => {
                    this.state = StreamState::Streaming;
                }
                Some(StreamMessage::Event(event)) => {
                    if event == StreamEvent::Done {
                        this.finish(StreamState::Completed);
                    }
                    return Poll::Ready(Some(Ok(event)));
                }
                Some(StreamMessage::Failed(err)) => {
                    this.finish(StreamState::Failed);
                    return Poll::Ready(Some(Err(err)));
                }
                Some(StreamMessage::End) => {
                    this.finish(StreamState::Completed);
                    return Poll::Ready(None);
                }
                None => {
                    let state = if this.cancel_token.is_cancelled() {
                        StreamState::Cancelled
                    } else {
                        StreamState::Completed
                    };
                    this.finish(state);
                    return Poll::Ready(None);
                }
            }
        }
    }
}

async fn produce(
    transport: &dyn Transport,
    endpoint: &ApiEndpoint,
    request: &ModelCallRequest,
    tx: &mpsc::Sender<StreamMessage>,
    cancel_token: &CancellationToken,
) {
    let http_request = match build_chat_request(endpoint, request) {
        Ok(http_request) => http_request,
        Err(err) => {
            let _ = tx.send(StreamMessage::Failed(err)).await;
            return;
        }
    };

    debug!(model = %request.model_id, "opening stream");
    let response = match transport.execute(http_request).await {
        Ok(response) => response,
        Err(err) => {
            warn!(model = %request.model_id, "stream request failed: {err}");
            let _ = tx.send(StreamMessage::Failed(err)).await;
            return;
        }
    };

    if !response.is_success() {
        let status = response.status;
        let retry_after = response.retry_after;
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        let err = ChatError::from_status(status, &body, retry_after, &request.model_id);
        warn!(model = %request.model_id, status, "stream rejected: {err}");
        let _ = tx.send(StreamMessage::Failed(err)).await;
        return;
    }

    if tx.send(StreamMessage::Connected).await.is_err() {
        return;
    }

    let mut reader = StreamLineReader::new(response.body);
    while let Some(payload) = reader.next_payload().await {
        if cancel_token.is_cancelled() {
            return;
        }

        let payload = match payload {
            Ok(payload) => payload,
            Err(err) => {
                warn!(model = %request.model_id, "stream interrupted: {err}");
                let _ = tx.send(StreamMessage::Failed(err)).await;
                return;
            }
        };

        for event in parse_sse_payload(&payload) {
            let is_done = event == StreamEvent::Done;
            if tx.send(StreamMessage::Event(event)).await.is_err() {
                return;
            }
            if is_done {
                debug!(model = %request.model_id, "stream finished with [DONE]");
                return;
            }
        }
    }

    debug!(model = %request.model_id, "stream body exhausted");
    let _ = tx.send(StreamMessage::End).await;
}
