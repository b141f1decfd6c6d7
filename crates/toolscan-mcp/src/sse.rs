//! Server-sent events reader.
//!
//! Turns an HTTP response body into the sequence of logical messages it
//! carries. Only `data:` lines matter here: comments are skipped, other fields
//! are ignored, and a blank line ends the message being assembled.

use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};

/// Line-level SSE message assembler.
#[derive(Debug, Default)]
pub struct SseDecoder {
    data: String,
}

impl SseDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator). Returns a message when the line
    /// completes one.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();

        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data));
        }

        if line.starts_with(':') {
            return None;
        }

        if let Some(payload) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(payload.trim());
        }

        None
    }

    /// Whether data is pending for an unterminated message.
    pub fn has_pending(&self) -> bool {
        !self.data.is_empty()
    }
}

struct SseState<E> {
    byte_stream: Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>,
    buffer: Vec<u8>,
    decoder: SseDecoder,
}

/// Read SSE messages from a byte stream until it ends or fails.
///
/// Read errors end the sequence quietly, and a trailing unterminated line or
/// message is discarded.
pub fn sse_messages<S, E>(byte_stream: S) -> impl Stream<Item = String> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    futures::stream::unfold(
        SseState {
            byte_stream: Box::pin(byte_stream),
            buffer: Vec::new(),
            decoder: SseDecoder::new(),
        },
        |mut state| async move {
            loop {
                while let Some(line_end) = state.buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = state.buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&line);
                    tracing::trace!(line = %line.trim_end(), "sse line");

                    if let Some(message) = state.decoder.push_line(&line) {
                        return Some((message, state));
                    }
                }

                match state.byte_stream.next().await {
                    Some(Ok(bytes)) => state.buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "event stream read failed");
                        return None;
                    }
                    None => {
                        if state.decoder.has_pending() || !state.buffer.is_empty() {
                            tracing::debug!("event stream ended mid-message");
                        }
                        return None;
                    }
                }
            }
        },
    )
}
