//! ffmpeg bridge codec
//!
//! Uses an ffmpeg subprocess to:
//! - Decode provider MP3 into raw s16le PCM
//! - Encode the assembled PCM timeline back to MP3

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{NarrateError, Result};

use super::{AudioClip, AudioCodec, AudioFormat, Codec, OutputFormat};

/// ffmpeg-based audio codec
pub struct FfmpegCodec {
    /// Path to ffmpeg binary
    ffmpeg_path: String,
}

impl FfmpegCodec {
    /// Create codec, searching for the ffmpeg binary in PATH
    pub fn new() -> Self {
        let ffmpeg_path = which::which("ffmpeg")
            .map_or_else(|_| "ffmpeg".to_string(), |p| p.to_string_lossy().to_string());

        Self { ffmpeg_path }
    }

    /// Specify custom ffmpeg binary path
    #[must_use]
    pub fn with_ffmpeg_path(mut self, path: &str) -> Self {
        self.ffmpeg_path = path.to_string();
        self
    }

    /// Check if ffmpeg is available
    pub async fn check_available(&self) -> bool {
        Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Arguments turning an MP3 on stdin into s16le PCM on stdout
    fn decode_args(target: AudioFormat) -> Vec<String> {
        let mut args = quiet_args();
        args.extend(
            [
                "-f".to_string(),
                "mp3".to_string(),
                "-i".to_string(),
                "pipe:0".to_string(),
                "-f".to_string(),
                "s16le".to_string(),
                "-acodec".to_string(),
                "pcm_s16le".to_string(),
                "-ar".to_string(),
                target.sample_rate.to_string(),
                "-ac".to_string(),
                target.channels.to_string(),
                "pipe:1".to_string(),
            ],
        );
        args
    }

    /// Arguments turning s16le PCM on stdin into an MP3 file
    fn encode_args(source: AudioFormat, bitrate_kbps: u32, path: &Path) -> Vec<String> {
        let mut args = quiet_args();
        args.extend(
            [
                "-f".to_string(),
                "s16le".to_string(),
                "-ar".to_string(),
                source.sample_rate.to_string(),
                "-ac".to_string(),
                source.channels.to_string(),
                "-i".to_string(),
                "pipe:0".to_string(),
                "-codec:a".to_string(),
                "libmp3lame".to_string(),
                "-b:a".to_string(),
                format!("{bitrate_kbps}k"),
                "-f".to_string(),
                "mp3".to_string(),
                "-y".to_string(), // Overwrite
                path.to_string_lossy().to_string(),
            ],
        );
        args
    }

    /// Run ffmpeg with `input` on stdin and return its stdout
    async fn run(&self, args: &[String], input: Vec<u8>) -> Result<Vec<u8>> {
        debug!("ffmpeg args: {:?}", args);

        let mut child = Command::new(&self.ffmpeg_path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NarrateError::Codec(format!("failed to start {}: {e}", self.ffmpeg_path)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| NarrateError::Codec("Failed to capture ffmpeg stdin".to_string()))?;

        // Feed stdin concurrently so a full stdout pipe cannot deadlock us
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await?;
        let written = writer
            .await
            .map_err(|e| NarrateError::Codec(format!("stdin writer failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NarrateError::Codec(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        written?;

        Ok(output.stdout)
    }
}

impl Default for FfmpegCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Hidden sibling of `path` that the encoder writes before the final rename
fn partial_path(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        NarrateError::Codec(format!("output path '{}' has no file name", path.display()))
    })?;
    let mut partial = OsString::from(".");
    partial.push(name);
    partial.push(".partial");
    Ok(path.with_file_name(partial))
}

fn quiet_args() -> Vec<String> {
    ["-hide_banner", "-loglevel", "error"]
        .iter()
        .map(std::string::ToString::to_string)
        .collect()
}

#[async_trait]
impl AudioCodec for FfmpegCodec {
    async fn decode(&self, bytes: &[u8], format: &OutputFormat) -> Result<AudioClip> {
        if bytes.is_empty() {
            return Err(NarrateError::Codec("provider returned no audio".to_string()));
        }

        let target = format.audio_format();
        match format.codec {
            Codec::Pcm => {
                if bytes.len() % 2 != 0 {
                    return Err(NarrateError::Codec(format!(
                        "PCM body of {} bytes is not whole 16-bit samples",
                        bytes.len()
                    )));
                }
                // Already what we hold in memory
                Ok(AudioClip::from_le_bytes(target, bytes))
            }
            Codec::Mp3 => {
                let pcm = self.run(&Self::decode_args(target), bytes.to_vec()).await?;
                debug!("decoded {} MP3 bytes into {} PCM bytes", bytes.len(), pcm.len());
                Ok(AudioClip::from_le_bytes(target, &pcm))
            }
        }
    }

    async fn export_mp3(&self, clip: &AudioClip, bitrate_kbps: u32, path: &Path) -> Result<()> {
        // Never leave a truncated file at `path`
        let partial = partial_path(path)?;
        let args = Self::encode_args(clip.format(), bitrate_kbps, &partial);
        if let Err(e) = self.run(&args, clip.to_le_bytes()).await {
            tokio::fs::remove_file(&partial).await.ok();
            return Err(e);
        }
        tokio::fs::rename(&partial, path).await?;
        Ok(())
    }
}
