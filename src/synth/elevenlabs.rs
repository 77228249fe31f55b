//! ElevenLabs text-to-speech client
//!
//! `POST /v1/text-to-speech/{voice_id}?output_format=...` with the
//! `xi-api-key` header. The audio body is streamed and collected in full
//! before returning.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{SpeechSynthesizer, SynthesisRequest};
use crate::error::{NarrateError, Result};
use crate::voice::VoiceSettings;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";

/// JSON body of a text-to-speech call.
#[derive(Debug, Serialize)]
struct TtsBody<'a> {
    text: &'a str,
    model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_settings: Option<&'a VoiceSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_text: Option<&'a str>,
}

impl<'a> TtsBody<'a> {
    fn from_request(request: &'a SynthesisRequest) -> Self {
        let hint = |text: &'a str| Some(text).filter(|t| !t.is_empty());
        Self {
            text: &request.text,
            model_id: &request.model_id,
            voice_settings: Some(&request.voice_settings).filter(|s| !s.is_neutral()),
            previous_text: hint(request.previous_text.as_str()),
            next_text: hint(request.next_text.as_str()),
        }
    }
}

/// Configured handle to the ElevenLabs API. Build once, share by reference.
pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ElevenLabsClient {
    /// Client for the production API
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Client for a custom API root (proxies, tests)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .connect_timeout(Duration::from_secs(10))
            // Long utterances take a while to render
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!("{}/v1/text-to-speech/{voice_id}", self.base_url)
    }
}

/// Pull a readable message out of an error body.
///
/// ElevenLabs answers `{"detail": {"message": ...}}` or `{"detail": "..."}`.
fn error_message(body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());

    match detail {
        Some(serde_json::Value::String(s)) => s,
        Some(d) => d
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| d.to_string(), str::to_string),
        None => body.trim().chars().take(500).collect(),
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    #[instrument(skip_all, fields(voice_id = %request.voice_id, chars = request.text.len()))]
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes> {
        let body = TtsBody::from_request(request);

        let response = self
            .client
            .post(self.endpoint(&request.voice_id))
            .query(&[("output_format", request.output_format.to_string())])
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NarrateError::Provider {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let mut stream = response.bytes_stream();
        let mut audio = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk?);
        }

        debug!("received {} audio bytes", audio.len());
        Ok(audio.freeze())
    }
}
