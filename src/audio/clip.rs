//! In-memory PCM clips.

use std::fmt;
use std::time::Duration;

use crate::error::{NarrateError, Result};

/// Sample layout of a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    #[must_use]
    pub const fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
        }
    }

    fn samples_for(&self, duration: Duration) -> usize {
        let frames = u128::from(self.sample_rate) * duration.as_micros() / 1_000_000;
        let samples = frames * u128::from(self.channels);
        usize::try_from(samples).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz/{} ch", self.sample_rate, self.channels)
    }
}

/// Decoded audio: interleaved signed 16-bit samples.
///
/// Clips only ever grow by appending whole clips of the same format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    format: AudioFormat,
    samples: Vec<i16>,
}

impl AudioClip {
    pub fn new(format: AudioFormat, samples: Vec<i16>) -> Self {
        Self { format, samples }
    }

    /// Zero-length clip, the identity for [`append`](Self::append).
    pub fn empty(format: AudioFormat) -> Self {
        Self::new(format, Vec::new())
    }

    /// Digital silence of the given length.
    pub fn silent(format: AudioFormat, duration: Duration) -> Self {
        Self::new(format, vec![0; format.samples_for(duration)])
    }

    /// Decode raw little-endian s16 bytes. A trailing odd byte is ignored.
    pub fn from_le_bytes(format: AudioFormat, bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self::new(format, samples)
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels.max(1))
    }

    pub fn duration(&self) -> Duration {
        if self.format.sample_rate == 0 {
            return Duration::ZERO;
        }
        let micros = self.frames() as u128 * 1_000_000 / u128::from(self.format.sample_rate);
        Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
    }

    /// Append `other` to the end of this clip.
    pub fn append(&mut self, other: &AudioClip) -> Result<()> {
        if self.format != other.format {
            return Err(NarrateError::FormatMismatch {
                left: self.format.to_string(),
                right: other.format.to_string(),
            });
        }
        self.samples.extend_from_slice(&other.samples);
        Ok(())
    }

    /// Consume both clips and return them joined.
    pub fn concatenate(mut self, other: &AudioClip) -> Result<Self> {
        self.append(other)?;
        Ok(self)
    }
}
