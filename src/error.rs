//! Error types for the narration pipeline.

use thiserror::Error;

/// Errors raised while turning a script into audio.
///
/// Unmapped speakers are deliberately absent: they are skipped with a
/// warning, never surfaced as an error.
#[derive(Error, Debug)]
pub enum NarrateError {
    #[error("ELEVENLABS_API_KEY is not set (export it or put it in a .env file)")]
    MissingCredential,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No dialogue segments found. Ensure your file is annotated with [Speaker] markers")]
    EmptyScript,

    #[error("Script contains {0} malformed or unattributed fragment(s)")]
    MalformedScript(usize),

    #[error("No audio segments generated: no speaker in the script has a voice mapping")]
    NoSegmentsSynthesized,

    #[error("Synthesis failed for speaker '{speaker}': {source}")]
    Synthesis {
        speaker: String,
        #[source]
        source: Box<NarrateError>,
    },

    #[error("Provider returned HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("FFmpeg error: {0}")]
    Codec(String),

    #[error("Cannot join audio: {left} vs {right}")]
    FormatMismatch { left: String, right: String },

    #[error("Invalid output format '{0}' (expected e.g. mp3_44100_128 or pcm_24000)")]
    InvalidOutputFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl NarrateError {
    /// Wrap a per-segment failure with the speaker it belonged to.
    pub(crate) fn synthesis(speaker: &str, source: NarrateError) -> Self {
        Self::Synthesis {
            speaker: speaker.to_string(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, NarrateError>;
