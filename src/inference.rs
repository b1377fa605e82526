use crate::accumulator::accumulate;
use crate::conversation::build_messages;
use crate::error::ChatError;
use crate::models::{Chunk, Message, Turn};
use crate::params::GenerationConfig;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde_json::json;
use std::env;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const DEFAULT_API_URL: &str =
    "https://router.huggingface.co/hf-inference/v1/chat/completions";
const DEFAULT_MODEL: &str = "HuggingFaceH4/zephyr-7b-beta";

/// Client for an OpenAI-compatible streaming chat-completion endpoint.
pub struct InferenceClient {
    client: Client,
    api_url: String,
    model: String,
    api_token: String,
}

impl InferenceClient {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, api_token: impl Into<String>) -> Self {
        InferenceClient {
            client: Client::new(),
            api_url: api_url.into(),
            model: model.into(),
            api_token: api_token.into(),
        }
    }

    pub fn from_env() -> Result<Self, ChatError> {
        let api_token = env::var("HF_API_TOKEN").map_err(|_| ChatError::MissingApiToken)?;
        let api_url = env::var("INFERENCE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let model = env::var("INFERENCE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self::new(api_url, model, api_token))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends the message list and returns the raw delta stream. SSE parsing
    /// runs on a background task; dropping the returned stream stops it.
    pub async fn send_request(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<impl Stream<Item = Result<String, ChatError>>, ChatError> {
        let request_body = json!({
            "model": self.model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
            "stream": true,
            "messages": messages,
        });

        tracing::debug!(model = %self.model, messages = messages.len(), "dispatching chat completion");

        let response = self
            .client
            .post(self.api_url.as_str())
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api { status, body });
        }

        let (tx, rx) = mpsc::channel(100);
        let mut byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            // Network chunks do not align with SSE lines; carry the tail over.
            let mut buffer = SseLineBuffer::new();
            while let Some(item) = byte_stream.next().await {
                match item {
                    Ok(bytes) => {
                        for line in buffer.extend(&bytes) {
                            match fragment_from_line(&line) {
                                SseLine::Fragment(content) => {
                                    if tx.send(Ok(content)).await.is_err() {
                                        // Receiver dropped: request cancelled.
                                        return;
                                    }
                                }
                                SseLine::Done => {
                                    tracing::debug!("stream completed");
                                    return;
                                }
                                SseLine::Skip => {}
                            }
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "stream broke mid-generation");
                        let _ = tx.send(Err(ChatError::Stream(e.to_string()))).await;
                        return;
                    }
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    /// The whole respond cycle: validate the sampling parameters (failing
    /// before anything is sent), assemble the message list, issue the
    /// request and yield progressively longer response snapshots.
    pub async fn respond(
        &self,
        new_message: &str,
        history: &[Turn],
        system_message: &str,
        max_tokens: u32,
        temperature: f32,
        top_p: f32,
    ) -> Result<impl Stream<Item = Result<String, ChatError>>, ChatError> {
        let config = GenerationConfig::new(max_tokens, temperature, top_p)?;
        let messages = build_messages(system_message, history, new_message);
        let deltas = self.send_request(&messages, &config).await?;
        Ok(accumulate(deltas))
    }
}

/// Splits the SSE byte stream into lines. Buffered as raw bytes, not text:
/// a multibyte character torn across network chunks must be reassembled
/// before UTF-8 conversion or its halves decode as replacement characters.
struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    fn new() -> Self {
        SseLineBuffer { buf: Vec::new() }
    }

    /// Appends one network chunk and drains every complete line.
    fn extend(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

enum SseLine {
    Fragment(String),
    Done,
    Skip,
}

/// One SSE line to at most one text delta. Empty deltas (role-only chunks)
/// and unparseable payloads are skipped.
fn fragment_from_line(line: &str) -> SseLine {
    let Some(payload) = line.strip_prefix("data: ") else {
        return SseLine::Skip;
    };
    if payload == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str::<Chunk>(payload) {
        Ok(chunk) => {
            for choice in chunk.choices {
                if let Some(content) = choice.delta.content {
                    if !content.is_empty() {
                        return SseLine::Fragment(content);
                    }
                }
            }
            SseLine::Skip
        }
        Err(e) => {
            tracing::warn!(error = %e, "skipping unparseable stream line");
            SseLine::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn out_of_range_parameters_fail_before_any_request() {
        // Unroutable endpoint: reaching the network would surface a
        // connection error, not a parameter error.
        let client = InferenceClient::new("http://127.0.0.1:1/v1/chat/completions", "test", "tok");
        match client.respond("hi", &[], "S", 0, 0.7, 0.95).await {
            Err(ChatError::InvalidParameter { name, .. }) => assert_eq!(name, "max_tokens"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected validation failure"),
        }
    }

    #[test]
    fn reassembles_multibyte_characters_split_across_chunks() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"é\"}}]}\n";
        let bytes = line.as_bytes();
        // Cut between the two bytes of "é" (0xC3 0xA9).
        let cut = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let (head, tail) = bytes.split_at(cut);

        let mut buffer = SseLineBuffer::new();
        assert!(buffer.extend(head).is_empty());
        let lines = buffer.extend(tail);
        assert_eq!(lines.len(), 1);
        match fragment_from_line(&lines[0]) {
            SseLine::Fragment(content) => assert_eq!(content, "é"),
            _ => panic!("expected a fragment"),
        }
    }

    #[test]
    fn drains_multiple_lines_and_strips_crlf() {
        let mut buffer = SseLineBuffer::new();
        let lines = buffer.extend(b"data: a\r\ndata: b\npartial");
        assert_eq!(lines, ["data: a", "data: b"]);
        assert_eq!(buffer.extend(b"\n"), ["partial"]);
    }

    #[test]
    fn extracts_delta_content() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        match fragment_from_line(line) {
            SseLine::Fragment(content) => assert_eq!(content, "Hel"),
            _ => panic!("expected a fragment"),
        }
    }

    #[test]
    fn recognizes_done_marker() {
        assert!(matches!(fragment_from_line("data: [DONE]"), SseLine::Done));
    }

    #[test]
    fn skips_non_data_lines() {
        assert!(matches!(fragment_from_line(""), SseLine::Skip));
        assert!(matches!(fragment_from_line(": keep-alive"), SseLine::Skip));
        assert!(matches!(
            fragment_from_line("event: completion"),
            SseLine::Skip
        ));
    }

    #[test]
    fn skips_role_only_chunks() {
        let line = r#"data: {"choices":[{"delta":{"content":null}}]}"#;
        assert!(matches!(fragment_from_line(line), SseLine::Skip));
        let line = r#"data: {"choices":[{"delta":{"content":""}}]}"#;
        assert!(matches!(fragment_from_line(line), SseLine::Skip));
    }

    #[test]
    fn skips_garbage_payloads() {
        assert!(matches!(fragment_from_line("data: {not json"), SseLine::Skip));
    }
}
