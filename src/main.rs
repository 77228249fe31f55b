//! `narrate` CLI - render a `[Speaker]`-annotated script to one MP3

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use narrate::config::{self, Settings};
use narrate::{
    parse_report, plan, Assembler, ElevenLabsClient, FfmpegCodec, NarrateError, OutputFormat,
};

#[derive(Parser)]
#[command(name = "narrate")]
#[command(about = "Turn a [Speaker]-annotated dialogue script into a single narrated MP3")]
#[command(version)]
struct Cli {
    /// Annotated script (UTF-8 text)
    input: PathBuf,

    /// Where to write the MP3
    output: PathBuf,

    /// Voice table (default: ~/.config/narrate/voices.toml, else built-in voices)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Silence between turns, in milliseconds
    #[arg(short, long)]
    pause_ms: Option<u64>,

    /// ElevenLabs model id
    #[arg(short, long)]
    model: Option<String>,

    /// Provider encoding (e.g. mp3_44100_128, pcm_24000)
    #[arg(long)]
    output_format: Option<OutputFormat>,

    /// ElevenLabs API root
    #[arg(long)]
    api_base: Option<String>,

    /// Fail instead of warning when script text belongs to no speaker
    #[arg(long)]
    strict: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // .env may carry RUST_LOG, so it goes before the subscriber
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    let api_key = config::api_key()?;

    let mut settings = Settings::load(cli.config.as_deref())?;
    apply_overrides(&mut settings, &cli);

    let start = Instant::now();
    let raw = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("failed to read {}", cli.input.display()))?;

    let report = parse_report(&raw);
    for dropped in &report.dropped {
        warn!(
            "Line {}: {}; dropping {:?}",
            dropped.line, dropped.reason, dropped.text
        );
    }
    if cli.strict && !report.is_lossless() {
        return Err(NarrateError::MalformedScript(report.dropped.len()).into());
    }
    if report.segments.is_empty() {
        return Err(NarrateError::EmptyScript.into());
    }
    info!(
        "Parsed {} segment(s) from {}",
        report.segments.len(),
        cli.input.display()
    );

    let plan = plan(&report.segments, &settings.voices);
    if plan.segments.is_empty() {
        return Err(NarrateError::NoSegmentsSynthesized.into());
    }

    // Fail before spending API credits if we could never export
    let codec = FfmpegCodec::new();
    if !codec.check_available().await {
        return Err(NarrateError::Codec(
            "ffmpeg not found in PATH (install it to decode and export audio)".to_string(),
        )
        .into());
    }

    let client = ElevenLabsClient::with_base_url(api_key, &settings.api_base)?;
    let assembler = Assembler::from_settings(client, codec, &settings);

    let assembly = assembler.assemble_plan(&plan).await?;
    assembler.export(&assembly.clip, &cli.output).await?;

    print_summary(&cli.output, &assembly, start.elapsed());
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "narrate=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .compact()
        .init();
}

fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(ms) = cli.pause_ms {
        settings.pause = Duration::from_millis(ms);
    }
    if let Some(ref model) = cli.model {
        settings.model_id.clone_from(model);
    }
    if let Some(format) = cli.output_format {
        settings.output_format = format;
    }
    if let Some(ref base) = cli.api_base {
        settings.api_base.clone_from(base);
    }
}

fn print_summary(output: &Path, assembly: &narrate::Assembly, elapsed: Duration) {
    println!("✅ Narration saved to '{}'", output.display());
    println!(
        "   Segments: {} voiced, {} skipped",
        assembly.synthesized(),
        assembly.skipped.len()
    );
    println!(
        "   Duration: {:.1}s (rendered in {:.1}s)",
        assembly.clip.duration().as_secs_f64(),
        elapsed.as_secs_f64()
    );
}
