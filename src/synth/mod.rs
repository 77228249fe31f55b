//! Text-to-speech provider seam.

pub mod elevenlabs;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::audio::OutputFormat;
use crate::error::Result;
use crate::voice::VoiceSettings;

pub use elevenlabs::ElevenLabsClient;

/// Model used when none is configured.
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Everything the provider needs to voice one utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub model_id: String,
    #[serde(serialize_with = "serialize_display")]
    pub output_format: OutputFormat,
    /// Text of the preceding turn, empty at the start of the script.
    pub previous_text: String,
    /// Text of the following turn, empty at the end of the script.
    pub next_text: String,
    pub voice_settings: VoiceSettings,
}

fn serialize_display<S: serde::Serializer>(
    format: &OutputFormat,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(format)
}

/// A text-to-speech provider.
///
/// Calls are awaited one at a time; implementations return the complete
/// encoded audio body in `request.output_format`.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes>;
}
