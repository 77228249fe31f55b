//! Narration assembly: script segments in, one audio timeline out.
//!
//! Orchestrates the complete workflow for a parsed script:
//! 1. resolve each speaker, skipping (and warning about) unmapped ones
//! 2. synthesize retained turns one at a time, passing the neighbouring
//!    turns' text as context
//! 3. decode and concatenate the clips with optional pauses
//! 4. export the result as MP3

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::{AudioClip, AudioCodec, OutputFormat};
use crate::config::Settings;
use crate::error::{NarrateError, Result};
use crate::script::ScriptSegment;
use crate::synth::{SpeechSynthesizer, SynthesisRequest, DEFAULT_MODEL_ID};
use crate::voice::{VoiceProfile, VoiceResolver};

/// Characters of each utterance shown in progress output.
const PREVIEW_CHARS: usize = 100;

/// A retained segment with its voice and context hints.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSegment<'a> {
    /// Position in the full, unfiltered script.
    pub index: usize,
    pub segment: &'a ScriptSegment,
    pub profile: &'a VoiceProfile,
    pub previous_text: &'a str,
    pub next_text: &'a str,
}

/// Synthesis plan for a script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan<'a> {
    pub segments: Vec<PlannedSegment<'a>>,
    /// Segments whose speaker has no voice, in script order.
    pub skipped: Vec<&'a ScriptSegment>,
}

/// Decide which segments get voiced and with what context.
///
/// Context hints always come from the full script, so a turn next to a
/// skipped speaker still hears that speaker's text.
pub fn plan<'a, R>(segments: &'a [ScriptSegment], resolver: &'a R) -> Plan<'a>
where
    R: VoiceResolver + ?Sized,
{
    let mut plan = Plan::default();

    for (index, segment) in segments.iter().enumerate() {
        let Some(profile) = resolver.resolve(&segment.speaker) else {
            warn!(
                "No voice mapping for speaker '{}' (line {}). Skipping this segment.",
                segment.speaker, segment.line
            );
            plan.skipped.push(segment);
            continue;
        };

        let previous_text = index
            .checked_sub(1)
            .map_or("", |i| segments[i].text.as_str());
        let next_text = segments.get(index + 1).map_or("", |s| s.text.as_str());

        plan.segments.push(PlannedSegment {
            index,
            segment,
            profile,
            previous_text,
            next_text,
        });
    }

    plan
}

/// What occupies a stretch of the finished narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineItem {
    /// Voiced turn; `index` is its position in the full script.
    Utterance { index: usize, speaker: String },
    Pause,
}

/// One stretch of the finished narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub item: TimelineItem,
    pub start: Duration,
    pub duration: Duration,
}

/// Result of a successful assembly.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub clip: AudioClip,
    pub timeline: Vec<TimelineEntry>,
    /// Speakers of skipped segments, in script order.
    pub skipped: Vec<String>,
}

impl Assembly {
    /// Number of voiced segments.
    pub fn synthesized(&self) -> usize {
        self.timeline
            .iter()
            .filter(|e| matches!(e.item, TimelineItem::Utterance { .. }))
            .count()
    }
}

/// Drives synthesis and builds the narration.
pub struct Assembler<S, C> {
    synthesizer: S,
    codec: C,
    model_id: String,
    output_format: OutputFormat,
    pause: Duration,
}

impl<S: SpeechSynthesizer, C: AudioCodec> Assembler<S, C> {
    /// Assembler with the default model, MP3 44.1 kHz/128 kbps and no pause
    pub fn new(synthesizer: S, codec: C) -> Self {
        Self {
            synthesizer,
            codec,
            model_id: DEFAULT_MODEL_ID.to_string(),
            output_format: OutputFormat::default(),
            pause: Duration::ZERO,
        }
    }

    /// Assembler configured from run settings
    pub fn from_settings(synthesizer: S, codec: C, settings: &Settings) -> Self {
        Self::new(synthesizer, codec)
            .with_model(&settings.model_id)
            .with_output_format(settings.output_format)
            .with_pause(settings.pause)
    }

    #[must_use]
    pub fn with_model(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Silence between consecutive turns (zero abuts them)
    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Synthesize and join every mapped segment.
    ///
    /// Fails with [`NarrateError::NoSegmentsSynthesized`] when nothing is
    /// mapped. Any synthesis or decode failure aborts the whole run.
    pub async fn assemble<R>(&self, segments: &[ScriptSegment], resolver: &R) -> Result<Assembly>
    where
        R: VoiceResolver + ?Sized,
    {
        self.assemble_plan(&plan(segments, resolver)).await
    }

    /// Like [`assemble`](Self::assemble) for an already computed plan.
    pub async fn assemble_plan(&self, plan: &Plan<'_>) -> Result<Assembly> {
        if plan.segments.is_empty() {
            return Err(NarrateError::NoSegmentsSynthesized);
        }

        let format = self.output_format.audio_format();
        let silence = AudioClip::silent(format, self.pause);
        let mut combined = AudioClip::empty(format);
        let mut timeline = Vec::with_capacity(plan.segments.len() * 2);

        for (n, planned) in plan.segments.iter().enumerate() {
            let clip = self.render(planned).await?;

            if n > 0 && !silence.is_empty() {
                push_entry(&mut combined, &mut timeline, &silence, TimelineItem::Pause)?;
            }
            let item = TimelineItem::Utterance {
                index: planned.index,
                speaker: planned.segment.speaker.clone(),
            };
            push_entry(&mut combined, &mut timeline, &clip, item)?;
        }

        info!(
            "Assembled {} segment(s), {:.1}s of audio ({} skipped)",
            plan.segments.len(),
            combined.duration().as_secs_f64(),
            plan.skipped.len()
        );

        Ok(Assembly {
            clip: combined,
            timeline,
            skipped: plan.skipped.iter().map(|s| s.speaker.clone()).collect(),
        })
    }

    /// Write a clip to `path` as MP3 at the output format's bitrate.
    pub async fn export(&self, clip: &AudioClip, path: &Path) -> Result<()> {
        self.codec
            .export_mp3(clip, self.output_format.export_bitrate(), path)
            .await?;
        info!("Final audio saved to '{}'", path.display());
        Ok(())
    }

    /// Assemble and export in one go. Nothing is written on failure.
    pub async fn narrate<R>(
        &self,
        segments: &[ScriptSegment],
        resolver: &R,
        output: &Path,
    ) -> Result<Assembly>
    where
        R: VoiceResolver + ?Sized,
    {
        let assembly = self.assemble(segments, resolver).await?;
        self.export(&assembly.clip, output).await?;
        Ok(assembly)
    }

    /// Synthesize and decode a single planned segment.
    async fn render(&self, planned: &PlannedSegment<'_>) -> Result<AudioClip> {
        let speaker = &planned.segment.speaker;
        info!(
            "Generating audio for {speaker}: {}",
            preview(&planned.segment.text, PREVIEW_CHARS)
        );

        let request = SynthesisRequest {
            text: planned.segment.text.clone(),
            voice_id: planned.profile.voice_id.clone(),
            model_id: self.model_id.clone(),
            output_format: self.output_format,
            previous_text: planned.previous_text.to_string(),
            next_text: planned.next_text.to_string(),
            voice_settings: planned.profile.settings.clone(),
        };

        let bytes = self
            .synthesizer
            .synthesize(&request)
            .await
            .map_err(|e| NarrateError::synthesis(speaker, e))?;

        let clip = self
            .codec
            .decode(&bytes, &self.output_format)
            .await
            .map_err(|e| NarrateError::synthesis(speaker, e))?;

        debug!(
            "segment {} ({speaker}): {} bytes -> {:.2}s",
            planned.index,
            bytes.len(),
            clip.duration().as_secs_f64()
        );
        Ok(clip)
    }
}

fn push_entry(
    combined: &mut AudioClip,
    timeline: &mut Vec<TimelineEntry>,
    clip: &AudioClip,
    item: TimelineItem,
) -> Result<()> {
    let start = combined.duration();
    combined.append(clip)?;
    timeline.push(TimelineEntry {
        item,
        start,
        duration: clip.duration(),
    });
    Ok(())
}

/// First `max_chars` characters of `text`, with `...` when cut.
fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioFormat;
    use crate::voice::VoiceMap;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Returns the utterance text as audio and records every request.
    #[derive(Default)]
    struct EchoSynth {
        requests: Mutex<Vec<SynthesisRequest>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl SpeechSynthesizer for EchoSynth {
        async fn synthesize(&self, request: &SynthesisRequest) -> Result<Bytes> {
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_on == Some(request.text.as_str()) {
                return Err(NarrateError::Provider {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(Bytes::from(request.text.clone().into_bytes()))
        }
    }

    /// One sample per byte; records exports instead of writing files.
    #[derive(Default)]
    struct ByteCodec {
        exports: Mutex<Vec<(PathBuf, u32, Vec<i16>)>>,
    }

    #[async_trait]
    impl AudioCodec for ByteCodec {
        async fn decode(&self, bytes: &[u8], format: &OutputFormat) -> Result<AudioClip> {
            let samples = bytes.iter().map(|b| i16::from(*b)).collect();
            Ok(AudioClip::new(format.audio_format(), samples))
        }

        async fn export_mp3(&self, clip: &AudioClip, bitrate_kbps: u32, path: &Path) -> Result<()> {
            self.exports.lock().unwrap().push((
                path.to_path_buf(),
                bitrate_kbps,
                clip.samples().to_vec(),
            ));
            Ok(())
        }
    }

    fn seg(speaker: &str, text: &str) -> ScriptSegment {
        ScriptSegment::new(speaker, text, 0)
    }

    fn voices(speakers: &[&str]) -> VoiceMap {
        speakers.iter().fold(VoiceMap::new(), |map, s| {
            map.with_voice(*s, VoiceProfile::new(format!("id-{s}")))
        })
    }

    /// 1 kHz mono so that 1 ms of pause is exactly one sample.
    fn assembler(pause_ms: u64) -> Assembler<EchoSynth, ByteCodec> {
        Assembler::new(EchoSynth::default(), ByteCodec::default())
            .with_output_format(OutputFormat::pcm(1000))
            .with_pause(Duration::from_millis(pause_ms))
    }

    fn s(text: &str) -> Vec<i16> {
        text.bytes().map(i16::from).collect()
    }

    #[tokio::test]
    async fn concatenates_in_order_with_pauses() {
        let segments = vec![seg("A", "1"), seg("B", "2"), seg("A", "3")];
        let asm = assembler(2);

        let assembly = asm.assemble(&segments, &voices(&["A", "B"])).await.unwrap();

        let expected: Vec<i16> = [s("1"), vec![0, 0], s("2"), vec![0, 0], s("3")].concat();
        assert_eq!(assembly.clip.samples(), expected.as_slice());
        assert_eq!(assembly.synthesized(), 3);

        let kinds: Vec<&TimelineItem> = assembly.timeline.iter().map(|e| &e.item).collect();
        assert_eq!(kinds.len(), 5);
        assert!(matches!(kinds[1], TimelineItem::Pause));
        assert!(matches!(kinds[3], TimelineItem::Pause));
        assert!(matches!(kinds[4], TimelineItem::Utterance { index: 2, .. }));
    }

    #[tokio::test]
    async fn zero_pause_abuts_segments() {
        let segments = vec![seg("A", "1"), seg("B", "2"), seg("A", "3")];
        let asm = assembler(0);

        let assembly = asm.assemble(&segments, &voices(&["A", "B"])).await.unwrap();

        assert_eq!(assembly.clip.samples(), s("123").as_slice());
        assert_eq!(assembly.timeline.len(), 3);
        assert!(assembly
            .timeline
            .iter()
            .all(|e| !matches!(e.item, TimelineItem::Pause)));
    }

    #[tokio::test]
    async fn timeline_starts_follow_durations() {
        let segments = vec![seg("A", "abcd"), seg("B", "xy")];
        let asm = assembler(3);

        let assembly = asm.assemble(&segments, &voices(&["A", "B"])).await.unwrap();
        let starts: Vec<Duration> = assembly.timeline.iter().map(|e| e.start).collect();

        assert_eq!(
            starts,
            vec![
                Duration::ZERO,
                Duration::from_millis(4),
                Duration::from_millis(7)
            ]
        );
        assert_eq!(assembly.clip.duration(), Duration::from_millis(9));
    }

    #[tokio::test]
    async fn unmapped_speaker_is_skipped_but_others_are_voiced() {
        let segments = vec![seg("A", "1"), seg("X", "2"), seg("B", "3")];
        let asm = assembler(0);

        let assembly = asm.assemble(&segments, &voices(&["A", "B"])).await.unwrap();

        assert_eq!(assembly.clip.samples(), s("13").as_slice());
        assert_eq!(assembly.skipped, vec!["X".to_string()]);
        let voiced: Vec<String> = asm
            .synthesizer
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.voice_id.clone())
            .collect();
        assert_eq!(voiced, vec!["id-A", "id-B"]);
    }

    #[tokio::test]
    async fn context_hints_come_from_the_full_script() {
        let segments = vec![
            seg("A", "first"),
            seg("X", "skipped"),
            seg("B", "third"),
            seg("A", "last"),
        ];
        let asm = assembler(0);

        asm.assemble(&segments, &voices(&["A", "B"])).await.unwrap();

        let requests = asm.synthesizer.requests.lock().unwrap();
        let hints: Vec<(&str, &str, &str)> = requests
            .iter()
            .map(|r| (r.previous_text.as_str(), r.text.as_str(), r.next_text.as_str()))
            .collect();
        assert_eq!(
            hints,
            vec![
                ("", "first", "skipped"),
                ("skipped", "third", "last"),
                ("third", "last", ""),
            ]
        );
    }

    #[tokio::test]
    async fn requests_carry_model_format_and_settings() {
        let settings = crate::voice::VoiceSettings {
            style: Some(0.3),
            ..Default::default()
        };
        let map = VoiceMap::new().with_voice("A", VoiceProfile::new("v").with_settings(settings.clone()));
        let asm = assembler(0).with_model("eleven_turbo_v2_5");

        asm.assemble(&[seg("A", "hi")], &map).await.unwrap();

        let requests = asm.synthesizer.requests.lock().unwrap();
        assert_eq!(requests[0].model_id, "eleven_turbo_v2_5");
        assert_eq!(requests[0].output_format, OutputFormat::pcm(1000));
        assert_eq!(requests[0].voice_settings, settings);
    }

    #[tokio::test]
    async fn all_unmapped_is_fatal_and_nothing_is_exported() {
        let segments = vec![seg("X", "1"), seg("Y", "2")];
        let asm = assembler(0);

        let err = asm
            .narrate(&segments, &voices(&["A"]), Path::new("out.mp3"))
            .await
            .unwrap_err();

        assert!(matches!(err, NarrateError::NoSegmentsSynthesized));
        assert!(asm.synthesizer.requests.lock().unwrap().is_empty());
        assert!(asm.codec.exports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_script_is_fatal() {
        let err = assembler(0).assemble(&[], &voices(&["A"])).await.unwrap_err();
        assert!(matches!(err, NarrateError::NoSegmentsSynthesized));
    }

    #[tokio::test]
    async fn synthesis_failure_aborts_the_run() {
        let segments = vec![seg("A", "1"), seg("B", "2"), seg("A", "3")];
        let asm = Assembler::new(
            EchoSynth {
                fail_on: Some("2"),
                ..Default::default()
            },
            ByteCodec::default(),
        );

        let err = asm
            .narrate(&segments, &voices(&["A", "B"]), Path::new("out.mp3"))
            .await
            .unwrap_err();

        match err {
            NarrateError::Synthesis { speaker, source } => {
                assert_eq!(speaker, "B");
                assert!(matches!(*source, NarrateError::Provider { status: 500, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Stops at the failing segment, never retries, never exports
        assert_eq!(asm.synthesizer.requests.lock().unwrap().len(), 2);
        assert!(asm.codec.exports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn narrate_exports_combined_clip() {
        let asm = Assembler::new(EchoSynth::default(), ByteCodec::default());

        let assembly = asm
            .narrate(&[seg("A", "hi")], &voices(&["A"]), Path::new("out.mp3"))
            .await
            .unwrap();

        let exports = asm.codec.exports.lock().unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].0, PathBuf::from("out.mp3"));
        assert_eq!(exports[0].1, 128);
        assert_eq!(exports[0].2, assembly.clip.samples());
        assert_eq!(assembly.clip.format(), AudioFormat::mono(44_100));
    }

    #[tokio::test]
    async fn repeated_runs_are_identical() {
        let segments = vec![seg("A", "1"), seg("X", "?"), seg("B", "2")];
        let map = voices(&["A", "B"]);

        let first = assembler(1).assemble(&segments, &map).await.unwrap();
        let second = assembler(1).assemble(&segments, &map).await.unwrap();

        assert_eq!(first.timeline, second.timeline);
        assert_eq!(first.clip, second.clip);
        assert_eq!(first.skipped, second.skipped);
    }

    #[test]
    fn plan_keeps_original_indices() {
        let segments = vec![seg("X", "a"), seg("A", "b"), seg("X", "c")];
        let map = voices(&["A"]);

        let plan = plan(&segments, &map);

        assert_eq!(plan.segments.len(), 1);
        assert_eq!(plan.segments[0].index, 1);
        assert_eq!(plan.segments[0].previous_text, "a");
        assert_eq!(plan.segments[0].next_text, "c");
        assert_eq!(plan.skipped.len(), 2);
    }

    #[test]
    fn preview_truncates_long_text() {
        assert_eq!(preview("short", 100), "short");
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("héllo", 2), "hé...");
        assert_eq!(preview("abc", 3), "abc");
    }
}
