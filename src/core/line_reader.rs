//! Line reassembly for `text/event-stream` bodies.
//!
//! Framing is deliberately loose: any line that starts with `data:` is a
//! payload, whether or not blank lines separate events.

use std::collections::VecDeque;

use futures_util::StreamExt;
use memchr::memchr;

use crate::core::error::ChatError;
use crate::core::transport::ByteStream;

/// Accumulates raw chunks and hands back complete, trimmed, non-empty lines.
#[derive(Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        self.drain_lines(false)
    }

    /// Flush whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<String> {
        self.drain_lines(true)
    }

    fn drain_lines(&mut self, flush: bool) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(relative) = memchr(b'\n', &self.buffer[start..]) {
            let newline = start + relative;
            push_line(&self.buffer[start..newline], &mut lines);
            start = newline + 1;
        }

        if flush {
            push_line(&self.buffer[start..], &mut lines);
            self.buffer.clear();
        } else if start > 0 {
            self.buffer.drain(..start);
        }

        lines
    }
}

fn push_line(bytes: &[u8], lines: &mut Vec<String>) {
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
        Err(err) => tracing::debug!("dropping non-UTF-8 stream line: {err}"),
    }
}

/// Strip the `data:` field name (and the optional following space).
pub fn sse_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Pulls `data:` payloads out of a live response body, one at a time.
///
/// Nothing is read from the transport until the caller asks for the next
/// payload, and the body is never buffered beyond the current partial line.
pub struct StreamLineReader {
    body: ByteStream,
    buffer: SseLineBuffer,
    pending: VecDeque<String>,
    exhausted: bool,
}

impl StreamLineReader {
    pub fn new(body: ByteStream) -> Self {
        Self {
            body,
            buffer: SseLineBuffer::default(),
            pending: VecDeque::new(),
            exhausted: false,
        }
    }

    /// The next payload, a transport failure, or `None` once the body ends.
    pub async fn next_payload(&mut self) -> Option<Result<String, ChatError>> {
        loop {
            if let Some(payload) = self.pending.pop_front() {
                return Some(Ok(payload));
            }
            if self.exhausted {
                return None;
            }

            match self.body.next().await {
                Some(Ok(chunk)) => {
                    let lines = self.buffer.push(&chunk);
                    self.enqueue(lines);
                }
                Some(Err(err)) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
                None => {
                    self.exhausted = true;
                    let lines = self.buffer.finish();
                    self.enqueue(lines);
                }
            }
        }
    }

    fn enqueue(&mut self, lines: Vec<String>) {
        for line in lines {
            if let Some(payload) = sse_data_payload(&line) {
                if !payload.is_empty() {
                    self.pending.push_back(payload.to_string());
                }
            }
        }
    }
}
