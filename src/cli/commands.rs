//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use log::{debug, info, warn};
use serde_json::json;

use crate::config::VoiceConfig;
use crate::engine::AudioBuffer;
use crate::params::{AberrationParams, Archetype, Emotion, EmotionState};
use crate::voice::MidLodKernel;

/// Peak level rendered files are pulled back to when the pipeline clips
const RENDER_CEILING: f32 = 0.99;

/// Load a config file, or fall back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<VoiceConfig> {
    match path {
        Some(path) => VoiceConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(VoiceConfig::default()),
    }
}

/// Resolve the parameters a command runs with.
///
/// Config-supplied parameters replace the archetype preset; an emotion is
/// layered on top of whichever base wins.
pub fn resolve_params(
    archetype: Archetype,
    emotion: Option<Emotion>,
    config: &VoiceConfig,
) -> AberrationParams {
    let base = match config.params {
        Some(params) => {
            debug!("Using parameters from config instead of {} preset", archetype);
            params
        }
        None => AberrationParams::for_archetype(archetype),
    };
    match emotion {
        Some(emotion) => EmotionState::from_emotion(emotion).apply_to(&base),
        None => base,
    }
}

/// Transform a WAV file.
pub fn render(
    input: &Path,
    output: &Path,
    archetype: Archetype,
    emotion: Option<Emotion>,
    config: Option<&Path>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = load_config(config)?;
    if let Some(seed) = seed {
        config.seed = seed;
    }
    let params = resolve_params(archetype, emotion, &config);
    info!(
        "Rendering {} as {} (classified {})",
        input.display(),
        archetype,
        params.archetype()
    );

    let source = AudioBuffer::load_from_file(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    config.sample_rate = source.sample_rate();

    let mut voice = MidLodKernel::from_config(&config);
    let started = Instant::now();
    let mut rendered = voice.render(&source, &params)?;
    let elapsed = started.elapsed();

    if rendered.peak() > 1.0 {
        warn!(
            "Output peaks at {:.1} dBFS, normalizing to {:.1} dBFS",
            rendered.peak_db(),
            crate::engine::linear_to_db(RENDER_CEILING)
        );
        rendered.normalize(RENDER_CEILING);
    }

    rendered
        .save_to_file(output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("Rendered: {}", output.display());
    println!(
        "Duration: {:.2}s, processed in {:.1} ms ({:.1}x real time)",
        rendered.duration_secs(),
        elapsed.as_secs_f64() * 1000.0,
        rendered.duration_secs() / elapsed.as_secs_f64().max(1e-9)
    );
    println!(
        "Level: {:.1} dB RMS in, {:.1} dB RMS out",
        source.rms_db(),
        rendered.rms_db()
    );

    Ok(())
}

/// Print the parameters for an archetype.
pub fn describe(archetype: Archetype, emotion: Option<Emotion>, as_json: bool) -> anyhow::Result<()> {
    let config = VoiceConfig::default();
    let params = resolve_params(archetype, emotion, &config);

    if as_json {
        let mut voice = MidLodKernel::from_config(&config);
        voice.update_modules_from_params(&params, 0);
        let report = json!({
            "preset": archetype.as_str(),
            "emotion": emotion.map(|e| e.as_str()),
            "archetype": params.archetype().as_str(),
            "params": params,
            "kernels": voice.kernel_params(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match emotion {
            Some(emotion) => println!("{} ({})", archetype, emotion),
            None => println!("{}", archetype),
        }
        println!("{}", params.describe());
    }

    Ok(())
}

/// Timing summary of a profiling run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileReport {
    pub blocks: usize,
    pub budget_secs: f64,
    pub mean_block_secs: f64,
    pub max_block_secs: f64,
    pub overruns: usize,
    pub output_finite: bool,
}

impl ProfileReport {
    /// Worst block as a fraction of the budget
    pub fn worst_load(&self) -> f64 {
        self.max_block_secs / self.budget_secs
    }
}

/// Run a synthetic 440 Hz tone through a voice block by block.
pub fn run_profile(config: &VoiceConfig, params: &AberrationParams, seconds: f32) -> anyhow::Result<ProfileReport> {
    let source = AudioBuffer::sine_wave(440.0, seconds.max(0.0), config.sample_rate)?;
    let mut voice = MidLodKernel::from_config(config);
    let budget_secs = config.block_budget_secs();

    let input = source.samples();
    let mut output = vec![0.0_f32; input.len()];
    let mut total = 0.0;
    let mut max_block: f64 = 0.0;
    let mut overruns = 0;
    let mut blocks = 0;

    for (out, inp) in output
        .chunks_mut(config.block_size)
        .zip(input.chunks(config.block_size))
    {
        let started = Instant::now();
        voice.process(out, inp, params);
        let secs = started.elapsed().as_secs_f64();

        total += secs;
        max_block = max_block.max(secs);
        if secs > budget_secs {
            overruns += 1;
        }
        blocks += 1;
    }

    Ok(ProfileReport {
        blocks,
        budget_secs,
        mean_block_secs: if blocks > 0 { total / blocks as f64 } else { 0.0 },
        max_block_secs: max_block,
        overruns,
        output_finite: output.iter().all(|s| s.is_finite()),
    })
}

/// Time the pipeline against the block budget.
pub fn profile(archetype: Archetype, seconds: f32, config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let params = resolve_params(archetype, None, &config);
    info!(
        "Profiling {} for {:.2}s at {} Hz, {} sample blocks",
        archetype, seconds, config.sample_rate, config.block_size
    );

    let report = run_profile(&config, &params, seconds)?;

    println!("Blocks: {}", report.blocks);
    println!("Budget: {:.3} ms per block", report.budget_secs * 1000.0);
    println!("Mean:   {:.3} ms", report.mean_block_secs * 1000.0);
    println!(
        "Worst:  {:.3} ms ({:.0}% of budget)",
        report.max_block_secs * 1000.0,
        report.worst_load() * 100.0
    );

    if report.overruns > 0 {
        warn!(
            "{} of {} blocks exceeded the real-time budget",
            report.overruns, report.blocks
        );
    }
    if !report.output_finite {
        warn!("Pipeline produced non-finite samples");
    }

    Ok(())
}
