//! Server-sent event decoding shared by the provider gateways.
//!
//! Both providers answer a streaming request with `data: <json>` lines. The decoder
//! buffers raw bytes so that lines (and multi-byte characters) split across network
//! chunks are reassembled before parsing.

use crate::error::GatewayError;
use crate::llm::gateway::TextStream;
use futures::stream::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

/// Marker OpenAI sends as the last event of a stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Incremental decoder yielding the payload of each `data:` line.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return the data payloads of every line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            if let Some(data) = parse_data_line(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a trailing line that was not terminated by a newline.
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        parse_data_line(&line)
    }
}

fn parse_data_line(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    let data = line.strip_prefix("data:")?;
    Some(data.trim_start().to_string())
}

/// Turn a successful streaming response into a [`TextStream`].
///
/// `extract` pulls the text out of one decoded event; events that carry no text are
/// skipped. An `error` object inside an event ends the stream with an API error.
pub(crate) fn text_stream<F>(
    response: reqwest::Response,
    provider: &'static str,
    extract: F,
) -> TextStream
where
    F: Fn(&Value) -> Option<String> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        let mut finished = false;

        while !finished {
            let payloads = match bytes.next().await {
                Some(Ok(chunk)) => decoder.push(&chunk),
                Some(Err(e)) => {
                    yield Err(GatewayError::from(e));
                    return;
                }
                None => {
                    finished = true;
                    decoder.finish().into_iter().collect()
                }
            };

            for data in payloads {
                if data == DONE_MARKER {
                    debug!(provider = provider, "Stream completed");
                    return;
                }

                let event = match serde_json::from_str::<Value>(&data) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(provider = provider, "Failed to parse streaming chunk: {}", e);
                        continue;
                    }
                };

                if let Some(error) = event.get("error") {
                    yield Err(GatewayError::ApiError(format!("{} stream error: {}", provider, error)));
                    return;
                }

                if let Some(text) = extract(&event) {
                    if !text.is_empty() {
                        yield Ok(text);
                    }
                }
            }
        }
    })
}
