//! Audio buffers and the codec seam.
//!
//! [`AudioClip`] is plain PCM held in memory, so silence and concatenation
//! are done in Rust. Turning provider bytes into PCM, and PCM into the final
//! MP3, goes through an [`AudioCodec`]; [`FfmpegCodec`] is the production one.

mod clip;
mod ffmpeg;
mod format;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

pub use clip::{AudioClip, AudioFormat};
pub use ffmpeg::FfmpegCodec;
pub use format::{Codec, OutputFormat};

/// Decodes synthesized audio and exports finished narrations.
#[async_trait]
pub trait AudioCodec: Send + Sync {
    /// Decode a provider response encoded as `format`.
    async fn decode(&self, bytes: &[u8], format: &OutputFormat) -> Result<AudioClip>;

    /// Write `clip` to `path` as MP3.
    async fn export_mp3(&self, clip: &AudioClip, bitrate_kbps: u32, path: &Path) -> Result<()>;
}
