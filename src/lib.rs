//! `narrate` - Dialogue scripts to narrated audio
//!
//! # Features
//!
//! - **Script parsing**: `[Speaker]` markers split plain text into turns
//! - **Voice mapping**: per-speaker ElevenLabs voice ids and settings from TOML
//! - **Context-aware synthesis**: neighbouring turns are sent as prosody hints
//! - **Assembly**: clips joined in script order with optional pauses, exported as MP3
//!
//! # Example
//!
//! ```rust,no_run
//! use narrate::{parse, Assembler, ElevenLabsClient, FfmpegCodec, VoiceMap};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let segments = parse("[Aria]\nHello!\n[Roger]\nHi, Aria.");
//!     let client = ElevenLabsClient::new(std::env::var("ELEVENLABS_API_KEY")?)?;
//!     let assembler = Assembler::new(client, FfmpegCodec::new());
//!     assembler
//!         .narrate(&segments, &VoiceMap::builtin(), std::path::Path::new("dialogue.mp3"))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod assemble;
pub mod audio;
pub mod config;
pub mod error;
pub mod script;
pub mod synth;
pub mod voice;

pub use assemble::{plan, Assembler, Assembly, Plan, PlannedSegment, TimelineEntry, TimelineItem};
pub use audio::{AudioClip, AudioCodec, AudioFormat, Codec, FfmpegCodec, OutputFormat};
pub use config::Settings;
pub use error::{NarrateError, Result};
pub use script::{parse, parse_report, DropReason, DroppedText, ParseReport, ScriptSegment};
pub use synth::{ElevenLabsClient, SpeechSynthesizer, SynthesisRequest};
pub use voice::{VoiceMap, VoiceProfile, VoiceResolver, VoiceSettings};

/// Version of narrate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
