//! Integration Tests
//!
//! End-to-end tests for the aberrant voice pipeline.

use std::time::Instant;

use aberrant::config::VoiceConfig;
use aberrant::dsp::{GlottalIncoherence, VoiceKernel};
use aberrant::engine::AudioBuffer;
use aberrant::params::{AberrationParams, Archetype, Emotion, EmotionState};
use aberrant::voice::{param_channel, LiveVoice, MidLodKernel};
use aberrant::AberrantError;

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 48000;
const BLOCK: usize = 128;

/// Helper to run a whole buffer through a voice block by block
fn process_blocks(voice: &mut MidLodKernel, params: &AberrationParams, input: &[f32]) -> Vec<f32> {
    let mut output = vec![0.0_f32; input.len()];
    for (out, inp) in output.chunks_mut(BLOCK).zip(input.chunks(BLOCK)) {
        voice.process(out, inp, params);
    }
    output
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

// === End-to-End Scenario ===

#[test]
fn test_zombie_transforms_one_second_sine() {
    let source = AudioBuffer::sine_wave(440.0, 1.0, SAMPLE_RATE).unwrap();
    let input = source.samples();
    let mut voice = MidLodKernel::new(SAMPLE_RATE as f32, 1);
    let params = AberrationParams::create_zombie();

    let mut output = vec![0.0_f32; input.len()];
    let mut worst_block = 0.0_f64;
    for (out, inp) in output.chunks_mut(BLOCK).zip(input.chunks(BLOCK)) {
        let started = Instant::now();
        voice.process(out, inp, &params);
        worst_block = worst_block.max(started.elapsed().as_secs_f64());
    }

    // (a) length preserved
    assert_eq!(output.len(), input.len());

    // (b) audible transformation
    let rms_in = rms(input);
    let rms_out = rms(&output);
    assert!(
        (rms_out - rms_in).abs() > 0.01,
        "RMS barely changed: {} -> {}",
        rms_in,
        rms_out
    );

    // (c) no NaN/Inf
    assert!(output.iter().all(|s| s.is_finite()));

    // (d) profiled against the ~2.67 ms budget; only gross overruns fail
    let budget = BLOCK as f64 / SAMPLE_RATE as f64;
    if worst_block > budget {
        eprintln!(
            "worst block {:.3} ms exceeds {:.3} ms budget (unoptimized build?)",
            worst_block * 1000.0,
            budget * 1000.0
        );
    }
    assert!(worst_block < budget * 100.0);
}

#[test]
fn test_every_preset_produces_finite_output() {
    let source = AudioBuffer::sine_wave(220.0, 0.5, SAMPLE_RATE).unwrap();
    for archetype in Archetype::PRESETS {
        let params = AberrationParams::for_archetype(archetype);
        let mut voice = MidLodKernel::new(SAMPLE_RATE as f32, 7);
        let output = process_blocks(&mut voice, &params, source.samples());
        assert!(
            output.iter().all(|s| s.is_finite() && s.abs() < 4.0),
            "{} produced invalid samples",
            archetype
        );
        assert_eq!(voice.archetype(), archetype);
    }
}

#[test]
fn test_human_voice_passes_through_untouched() {
    let source = AudioBuffer::sine_wave(330.0, 0.25, SAMPLE_RATE).unwrap();
    let mut voice = MidLodKernel::new(SAMPLE_RATE as f32, 3);
    let output = process_blocks(&mut voice, &AberrationParams::create_human(), source.samples());
    assert_eq!(output, source.samples());
}

// === Determinism ===

#[test]
fn test_reset_gives_bit_identical_output() {
    let source = AudioBuffer::sine_wave(180.0, 0.5, SAMPLE_RATE).unwrap();
    for archetype in Archetype::PRESETS {
        let params = AberrationParams::for_archetype(archetype);
        let mut voice = MidLodKernel::new(SAMPLE_RATE as f32, 99);

        voice.reset();
        let first = process_blocks(&mut voice, &params, source.samples());
        voice.reset();
        let second = process_blocks(&mut voice, &params, source.samples());
        assert_eq!(first, second, "{} leaked state across reset", archetype);
    }
}

#[test]
fn test_voices_with_same_seed_match() {
    let source = AudioBuffer::sine_wave(200.0, 0.25, SAMPLE_RATE).unwrap();
    let params = AberrationParams::create_werewolf();
    let a = process_blocks(&mut MidLodKernel::new(48000.0, 5), &params, source.samples());
    let b = process_blocks(&mut MidLodKernel::new(48000.0, 5), &params, source.samples());
    assert_eq!(a, b);
}

#[test]
fn test_voices_process_concurrently() {
    let source = AudioBuffer::sine_wave(200.0, 0.25, SAMPLE_RATE).unwrap();
    let samples = source.samples().to_vec();
    let expected = process_blocks(
        &mut MidLodKernel::new(48000.0, 11),
        &AberrationParams::create_zombie(),
        &samples,
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let samples = samples.clone();
            std::thread::spawn(move || {
                let mut voice = MidLodKernel::new(48000.0, 11);
                process_blocks(&mut voice, &AberrationParams::create_zombie(), &samples)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

// === Glottal Dynamic Intensity ===

#[test]
fn test_dynamic_intensity_rises_with_proximity() {
    let mut glottal = GlottalIncoherence::new(48000.0, 1);
    let mut block = vec![0.25_f32; BLOCK];

    let mut previous = (0.0_f32, 0.0_f32);
    for step in 0..=20 {
        let proximity = step as f32 / 20.0;
        glottal.set_dynamic_intensity(0.5, proximity, 0.5);
        glottal.process_block(&mut block);
        let now = (glottal.jitter_amount(), glottal.shimmer_amount());
        assert!(now.0 >= previous.0 && now.1 >= previous.1);
        previous = now;
    }
}

// === Emotion Layering ===

#[test]
fn test_emotion_layer_changes_rendering() {
    let source = AudioBuffer::sine_wave(220.0, 0.25, SAMPLE_RATE).unwrap();
    let base = AberrationParams::create_vampire();
    let fearful = EmotionState::from_emotion(Emotion::Fear).apply_to(&base);

    let calm = process_blocks(&mut MidLodKernel::new(48000.0, 2), &base, source.samples());
    let scared = process_blocks(&mut MidLodKernel::new(48000.0, 2), &fearful, source.samples());
    assert_ne!(calm, scared);
    // Base record untouched
    assert_eq!(base, AberrationParams::create_vampire());
}

// === File Round Trip ===

#[test]
fn test_render_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("anchor.wav");
    let output_path = dir.path().join("zombie.wav");

    let source = AudioBuffer::sine_wave(440.0, 0.5, SAMPLE_RATE).unwrap();
    source.save_to_file(&input_path).unwrap();

    let loaded = AudioBuffer::load_from_file(&input_path).unwrap();
    assert_eq!(loaded.num_frames(), source.num_frames());
    assert_eq!(loaded.sample_rate(), SAMPLE_RATE);

    let mut voice = MidLodKernel::new(SAMPLE_RATE as f32, 4);
    let mut rendered = voice
        .render(&loaded, &AberrationParams::create_zombie())
        .unwrap();
    if rendered.peak() > 1.0 {
        rendered.normalize(0.99);
    }
    rendered.save_to_file(&output_path).unwrap();

    let reloaded = AudioBuffer::load_from_file(&output_path).unwrap();
    assert_eq!(reloaded.num_frames(), source.num_frames());
    assert_eq!(reloaded.channels(), 1);
    assert_abs_diff_eq!(reloaded.rms(), rendered.rms(), epsilon = 1e-3);
}

#[test]
fn test_missing_file_names_path() {
    let err = AudioBuffer::load_from_file("/nonexistent/voice.wav").unwrap_err();
    assert!(matches!(err, AberrantError::FileNotFound { .. }));
    assert!(err.to_string().contains("/nonexistent/voice.wav"));
}

#[test]
fn test_config_drives_voice() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("voice.json");
    std::fs::write(
        &path,
        r#"{ "sample_rate": 44100, "seed": 3, "tuning": { "glottal": { "jitter_ratio": 0.4 } } }"#,
    )
    .unwrap();

    let config = VoiceConfig::load(&path).unwrap();
    let mut voice = MidLodKernel::from_config(&config);
    assert_eq!(voice.sample_rate(), 44100.0);

    voice.update_modules_from_params(&AberrationParams::create_zombie(), BLOCK);
    assert_abs_diff_eq!(voice.glottal().jitter_amount(), 0.8 * 0.4, epsilon = 1e-6);
}

// === Parameter Handoff ===

#[test]
fn test_live_voice_follows_control_thread() {
    let (mut sender, receiver) = param_channel(4);
    let mut live = LiveVoice::new(
        MidLodKernel::new(48000.0, 8),
        receiver,
        AberrationParams::create_human(),
    );

    let source = AudioBuffer::sine_wave(220.0, 0.1, SAMPLE_RATE).unwrap();
    let mut output = vec![0.0_f32; BLOCK];

    let control = std::thread::spawn(move || {
        while sender.send(AberrationParams::create_wraith()).is_err() {
            std::thread::yield_now();
        }
        // Keep feeding until the audio side goes away
        while sender.is_connected() {
            let _ = sender.send(AberrationParams::create_wraith());
            std::thread::yield_now();
        }
    });

    for chunk in source.samples().chunks(BLOCK) {
        live.process(&mut output[..chunk.len()], chunk);
    }
    while live.params().archetype() != Archetype::Wraith {
        live.process(&mut output, &source.samples()[..BLOCK]);
        std::thread::yield_now();
    }
    live.process(&mut output, &source.samples()[..BLOCK]);
    assert_eq!(live.kernel().archetype(), Archetype::Wraith);

    drop(live);
    control.join().unwrap();
}
