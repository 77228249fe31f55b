//! Speaker → voice mapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tunable ElevenLabs voice parameters.
///
/// Every field is optional; unset fields are left to the provider's voice
/// defaults and omitted from the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_boost: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_speaker_boost: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
}

impl VoiceSettings {
    /// `true` when nothing is overridden.
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self == &Self::default()
    }
}

/// Synthesis identity bound to a speaker label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Provider voice identifier (Voices → Library → View → ID)
    pub voice_id: String,
    #[serde(default)]
    pub settings: VoiceSettings,
}

impl VoiceProfile {
    /// Profile with neutral settings.
    pub fn new(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            settings: VoiceSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: VoiceSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Looks up the voice for a speaker label.
///
/// A miss is an ordinary outcome; callers decide what to do with it.
pub trait VoiceResolver {
    fn resolve(&self, speaker: &str) -> Option<&VoiceProfile>;
}

/// Static, case-sensitive speaker table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceMap {
    voices: HashMap<String, VoiceProfile>,
}

impl VoiceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stock voices from the ElevenLabs library.
    #[must_use]
    pub fn builtin() -> Self {
        [
            ("Aria", "9BWtsMINqrJLrRacOk9x"),
            ("Roger", "CwhRBWXzGAHq8TQ4Fs17"),
            ("Lily", "pFZP5JQG7iQjIQuC4Bku"),
        ]
        .into_iter()
        .map(|(speaker, id)| (speaker.to_string(), VoiceProfile::new(id)))
        .collect()
    }

    #[must_use]
    pub fn with_voice(mut self, speaker: impl Into<String>, profile: VoiceProfile) -> Self {
        self.insert(speaker, profile);
        self
    }

    pub fn insert(&mut self, speaker: impl Into<String>, profile: VoiceProfile) {
        self.voices.insert(speaker.into(), profile);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Speaker labels, sorted.
    #[must_use]
    pub fn speakers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.voices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl FromIterator<(String, VoiceProfile)> for VoiceMap {
    fn from_iter<I: IntoIterator<Item = (String, VoiceProfile)>>(iter: I) -> Self {
        Self {
            voices: iter.into_iter().collect(),
        }
    }
}

impl VoiceResolver for VoiceMap {
    fn resolve(&self, speaker: &str) -> Option<&VoiceProfile> {
        self.voices.get(speaker)
    }
}
