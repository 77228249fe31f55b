//! Run settings loaded from `~/.config/narrate/voices.toml`.
//!
//! ```toml
//! model_id = "eleven_multilingual_v2"
//! output_format = "mp3_44100_128"
//! pause_ms = 100
//!
//! [speakers]
//! Aria = "9BWtsMINqrJLrRacOk9x"            # shorthand: voice id only
//!
//! [speakers.Roger]
//! voice_id = "CwhRBWXzGAHq8TQ4Fs17"
//! settings = { stability = 0.4, similarity_boost = 0.8, use_speaker_boost = true }
//! ```
//!
//! The API key never lives in this file; it comes from `ELEVENLABS_API_KEY`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::audio::OutputFormat;
use crate::error::{NarrateError, Result};
use crate::synth::elevenlabs::DEFAULT_BASE_URL;
use crate::synth::DEFAULT_MODEL_ID;
use crate::voice::{VoiceMap, VoiceProfile};

/// Environment variable holding the ElevenLabs credential.
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// A speaker entry: either a bare voice id or a full profile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SpeakerEntry {
    VoiceId(String),
    Profile(VoiceProfile),
}

impl From<SpeakerEntry> for VoiceProfile {
    fn from(entry: SpeakerEntry) -> Self {
        match entry {
            SpeakerEntry::VoiceId(id) => VoiceProfile::new(id),
            SpeakerEntry::Profile(profile) => profile,
        }
    }
}

/// On-disk shape of the settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub model_id: Option<String>,
    pub output_format: Option<String>,
    pub pause_ms: Option<u64>,
    pub api_base: Option<String>,
    #[serde(default)]
    pub speakers: BTreeMap<String, SpeakerEntry>,
}

impl ConfigFile {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub model_id: String,
    pub output_format: OutputFormat,
    /// Silence inserted between turns. Zero abuts them.
    pub pause: Duration,
    pub api_base: String,
    pub voices: VoiceMap,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            output_format: OutputFormat::default(),
            pause: Duration::ZERO,
            api_base: DEFAULT_BASE_URL.to_string(),
            voices: VoiceMap::builtin(),
        }
    }
}

impl Settings {
    /// Load settings.
    ///
    /// An explicit `path` must exist. Without one, the default config file is
    /// used when present, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) if !p.exists() => {
                return Err(NarrateError::Config(format!(
                    "config file {} does not exist",
                    p.display()
                )))
            }
            Some(p) => p.to_path_buf(),
            None => {
                let default = config_path();
                if !default.exists() {
                    debug!("no config at {}, using built-in voices", default.display());
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)?;
        let file = ConfigFile::parse(&content)
            .map_err(|e| NarrateError::Config(format!("invalid TOML in {}: {e}", path.display())))?;
        debug!("loaded settings from {}", path.display());
        Self::from_file(file)
    }

    /// Merge a parsed file over the defaults.
    pub fn from_file(file: ConfigFile) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(model_id) = file.model_id {
            settings.model_id = model_id;
        }
        if let Some(format) = file.output_format {
            settings.output_format = format.parse()?;
        }
        if let Some(ms) = file.pause_ms {
            settings.pause = Duration::from_millis(ms);
        }
        if let Some(base) = file.api_base {
            settings.api_base = base;
        }
        // No table means "use the stock voices"
        if !file.speakers.is_empty() {
            let mut voices = VoiceMap::new();
            for (speaker, entry) in file.speakers {
                let profile = VoiceProfile::from(entry);
                if profile.voice_id.trim().is_empty() {
                    return Err(NarrateError::Config(format!(
                        "speaker '{speaker}' has an empty voice_id"
                    )));
                }
                voices.insert(speaker, profile);
            }
            settings.voices = voices;
        }

        Ok(settings)
    }
}

/// Read the API key from the environment.
///
/// Call `dotenvy::dotenv()` first if `.env` files should be honoured.
pub fn api_key() -> Result<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or(NarrateError::MissingCredential)
}

/// Return the path to the default settings file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("narrate")
        .join("voices.toml")
}
