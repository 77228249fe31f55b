//! Provider output encodings (`mp3_44100_128`, `pcm_24000`, ...).

use std::fmt;
use std::str::FromStr;

use crate::error::NarrateError;

use super::AudioFormat;

/// Container/codec family of a provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Mp3,
    /// Raw signed 16-bit little-endian mono.
    Pcm,
}

/// Encoding requested from the synthesis provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub codec: Codec,
    pub sample_rate: u32,
    /// Only set for compressed codecs.
    pub bitrate_kbps: Option<u32>,
}

impl OutputFormat {
    /// Bitrate used when exporting to MP3 if the format carries none.
    pub const DEFAULT_BITRATE_KBPS: u32 = 128;

    #[must_use]
    pub const fn mp3(sample_rate: u32, bitrate_kbps: u32) -> Self {
        Self {
            codec: Codec::Mp3,
            sample_rate,
            bitrate_kbps: Some(bitrate_kbps),
        }
    }

    #[must_use]
    pub const fn pcm(sample_rate: u32) -> Self {
        Self {
            codec: Codec::Pcm,
            sample_rate,
            bitrate_kbps: None,
        }
    }

    /// PCM layout a response decodes to (provider audio is mono).
    #[must_use]
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::mono(self.sample_rate)
    }

    #[must_use]
    pub fn export_bitrate(&self) -> u32 {
        self.bitrate_kbps.unwrap_or(Self::DEFAULT_BITRATE_KBPS)
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::mp3(44_100, 128)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.codec, self.bitrate_kbps) {
            (Codec::Mp3, Some(kbps)) => write!(f, "mp3_{}_{kbps}", self.sample_rate),
            (Codec::Mp3, None) => {
                write!(f, "mp3_{}_{}", self.sample_rate, Self::DEFAULT_BITRATE_KBPS)
            }
            (Codec::Pcm, _) => write!(f, "pcm_{}", self.sample_rate),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = NarrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NarrateError::InvalidOutputFormat(s.to_string());
        let number = |part: &str| part.parse::<u32>().ok().filter(|n| *n > 0);

        let parts: Vec<&str> = s.trim().split('_').collect();
        match parts.as_slice() {
            ["mp3", rate, kbps] => Ok(Self::mp3(
                number(*rate).ok_or_else(invalid)?,
                number(*kbps).ok_or_else(invalid)?,
            )),
            ["pcm", rate] => Ok(Self::pcm(number(*rate).ok_or_else(invalid)?)),
            _ => Err(invalid()),
        }
    }
}
