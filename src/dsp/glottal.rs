//! Glottal incoherence
//!
//! Models an unhealthy larynx: jitter (period instability) through a
//! modulated fractional delay, shimmer (amplitude instability) through gain
//! modulation, and pulse irregularity through short stochastic dropouts.
//!
//! The three components can be set directly, from a single intensity knob,
//! or from gameplay signals with [`GlottalIncoherence::set_dynamic_intensity`].

use std::f32::consts::TAU;

use serde_json::{json, Value};

use crate::config::GlottalTuning;
use crate::dsp::biquad::OnePole;
use crate::dsp::kernel::VoiceKernel;
use crate::dsp::noise::{NoiseSource, SeededNoise};

// ============================================================================
// Constants
// ============================================================================

/// Jitter modulator rate (human jitter band)
const JITTER_RATE_HZ: f32 = 7.0;

/// Shimmer modulator rate
const SHIMMER_RATE_HZ: f32 = 5.5;

/// Maximum jitter delay excursion in seconds
const MAX_JITTER_DELAY_SECS: f32 = 0.0015;

/// Maximum gain reduction from shimmer
const MAX_SHIMMER_DEPTH: f32 = 0.4;

/// Interval between pulse irregularity draws in seconds
const PULSE_CHECK_SECS: f32 = 0.005;

/// Dropout length range in seconds
const DROPOUT_MIN_SECS: f32 = 0.001;
const DROPOUT_MAX_SECS: f32 = 0.003;

/// Dropout depth range (1.0 = full silence)
const DROPOUT_MIN_DEPTH: f32 = 0.3;
const DROPOUT_MAX_DEPTH: f32 = 1.0;

/// Dropout gate ramp in seconds, keeps gaps click-free
const GATE_RAMP_SECS: f32 = 0.0002;

/// Weight of the periodic part of each modulator; the rest is noise
const PERIODIC_WEIGHT: f32 = 0.7;

// ============================================================================
// Glottal Incoherence
// ============================================================================

/// Jitter / shimmer / pulse irregularity kernel
#[derive(Debug, Clone)]
pub struct GlottalIncoherence<R: NoiseSource = SeededNoise> {
    sample_rate: f32,
    tuning: GlottalTuning,

    jitter: f32,
    shimmer: f32,
    irregularity: f32,

    noise: R,
    jitter_phase: f32,
    shimmer_phase: f32,
    jitter_noise: OnePole,
    shimmer_noise: OnePole,

    /// Fractional delay line, power-of-two length
    history: Vec<f32>,
    write_pos: usize,

    samples_to_check: u32,
    dropout_remaining: u32,
    dropout_depth: f32,
    gate: f32,
    gate_coeff: f32,
}

impl GlottalIncoherence<SeededNoise> {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self::with_noise(sample_rate, SeededNoise::new(seed), GlottalTuning::default())
    }
}

impl<R: NoiseSource> GlottalIncoherence<R> {
    /// Create with an explicit noise source and tuning
    pub fn with_noise(sample_rate: f32, noise: R, tuning: GlottalTuning) -> Self {
        let mut kernel = Self {
            sample_rate,
            tuning,
            jitter: 0.0,
            shimmer: 0.0,
            irregularity: 0.0,
            noise,
            jitter_phase: 0.0,
            shimmer_phase: 0.0,
            jitter_noise: OnePole::default(),
            shimmer_noise: OnePole::default(),
            history: Vec::new(),
            write_pos: 0,
            samples_to_check: 0,
            dropout_remaining: 0,
            dropout_depth: 0.0,
            gate: 1.0,
            gate_coeff: 1.0,
        };
        kernel.prepare(sample_rate);
        kernel
    }

    // ------------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------------

    /// Set the three components directly, each clamped to 0-1
    pub fn set_components(&mut self, jitter: f32, shimmer: f32, irregularity: f32) {
        self.jitter = clamp_unit(jitter);
        self.shimmer = clamp_unit(shimmer);
        self.irregularity = clamp_unit(irregularity);
    }

    /// Map one 0-1 knob onto jitter, shimmer and irregularity
    pub fn set_intensity(&mut self, intensity: f32) {
        let intensity = clamp_unit(intensity);
        self.set_components(
            intensity * self.tuning.jitter_ratio,
            intensity * self.tuning.shimmer_ratio,
            intensity * self.tuning.irregularity_ratio,
        );
    }

    /// Derive intensity from listener proximity and the acoustic environment
    ///
    /// # Arguments
    /// * `base` - Base intensity, 0-1
    /// * `proximity` - 0 = far, 1 = touching; scales intensity quadratically
    /// * `environment` - 0 = dry, 1 = wet; wet favors shimmer, dry favors jitter
    pub fn set_dynamic_intensity(&mut self, base: f32, proximity: f32, environment: f32) {
        let base = clamp_unit(base);
        let proximity = clamp_unit(proximity);
        let environment = clamp_unit(environment);
        let t = &self.tuning;

        let multiplier = t.proximity_floor + proximity * proximity * t.proximity_gain;
        let intensity = base * multiplier;

        self.set_components(
            intensity * t.jitter_ratio + (1.0 - environment) * t.dry_jitter_boost,
            intensity * t.shimmer_ratio + environment * t.wet_shimmer_boost,
            intensity * t.irregularity_ratio,
        );
    }

    pub fn set_tuning(&mut self, tuning: GlottalTuning) {
        self.tuning = tuning;
    }

    pub fn jitter_amount(&self) -> f32 {
        self.jitter
    }

    pub fn shimmer_amount(&self) -> f32 {
        self.shimmer
    }

    pub fn irregularity_amount(&self) -> f32 {
        self.irregularity
    }

    /// Whether a dropout is currently open
    pub fn in_dropout(&self) -> bool {
        self.dropout_remaining > 0
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    #[inline]
    fn push_history(&mut self, input: f32) {
        let mask = self.history.len() - 1;
        self.write_pos = (self.write_pos + 1) & mask;
        self.history[self.write_pos] = input;
    }

    /// Read `delay` samples behind the newest sample with linear interpolation
    #[inline]
    fn read_delayed(&self, delay: f32) -> f32 {
        let mask = self.history.len() - 1;
        let whole = delay.floor();
        let frac = delay - whole;
        let idx = (self.write_pos + self.history.len() - whole as usize) & mask;
        let prev = (idx + mask) & mask;
        self.history[idx] * (1.0 - frac) + self.history[prev] * frac
    }

    #[inline]
    fn advance_phase(phase: &mut f32, rate_hz: f32, sample_rate: f32) {
        *phase += rate_hz / sample_rate;
        if *phase >= 1.0 {
            *phase -= 1.0;
        }
    }

    /// Draw a dropout once per pulse check interval
    #[inline]
    fn update_dropout(&mut self) {
        if self.dropout_remaining > 0 {
            self.dropout_remaining -= 1;
        }
        if self.samples_to_check > 0 {
            self.samples_to_check -= 1;
            return;
        }
        self.samples_to_check = seconds_to_samples(PULSE_CHECK_SECS, self.sample_rate);

        if self.irregularity > 0.0 && self.noise.next_unit() > 1.0 - self.irregularity {
            let secs = self.noise.next_range(DROPOUT_MIN_SECS, DROPOUT_MAX_SECS);
            self.dropout_remaining = seconds_to_samples(secs, self.sample_rate);
            self.dropout_depth = self.noise.next_range(DROPOUT_MIN_DEPTH, DROPOUT_MAX_DEPTH);
        }
    }
}

impl<R: NoiseSource> VoiceKernel for GlottalIncoherence<R> {
    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        self.push_history(input);
        if !self.is_active() {
            return input;
        }

        // Jitter: sinusoidal plus smoothed Gaussian delay modulation
        Self::advance_phase(&mut self.jitter_phase, JITTER_RATE_HZ, self.sample_rate);
        let jitter_noise = self.jitter_noise.process(self.noise.next_gaussian());
        let jitter_mod = (PERIODIC_WEIGHT * (TAU * self.jitter_phase).sin()
            + (1.0 - PERIODIC_WEIGHT) * jitter_noise * 8.0)
            .clamp(-1.0, 1.0);
        let max_delay = self.jitter * MAX_JITTER_DELAY_SECS * self.sample_rate;
        let voiced = self.read_delayed(max_delay * (1.0 + jitter_mod));

        // Shimmer: gain dips driven the same way
        Self::advance_phase(&mut self.shimmer_phase, SHIMMER_RATE_HZ, self.sample_rate);
        let shimmer_noise = self.shimmer_noise.process(self.noise.next_gaussian());
        let shimmer_mod = (PERIODIC_WEIGHT * (0.5 + 0.5 * (TAU * self.shimmer_phase).sin())
            + (1.0 - PERIODIC_WEIGHT) * (shimmer_noise * 8.0).abs())
            .clamp(0.0, 1.0);
        let shimmer_gain = 1.0 - self.shimmer * MAX_SHIMMER_DEPTH * shimmer_mod;

        // Irregularity: frequency of dropouts rises with the amount, depth does not
        self.update_dropout();
        let gate_target = if self.dropout_remaining > 0 {
            1.0 - self.dropout_depth
        } else {
            1.0
        };
        self.gate += self.gate_coeff * (gate_target - self.gate);

        voiced * shimmer_gain * self.gate
    }

    /// Inactive blocks still feed the delay line so reactivation reads real history
    fn process_block(&mut self, samples: &mut [f32]) {
        if !self.is_active() {
            for &sample in samples.iter() {
                self.push_history(sample);
            }
            return;
        }
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        let max_delay = (2.0 * MAX_JITTER_DELAY_SECS * self.sample_rate).ceil() as usize + 4;
        let len = max_delay.next_power_of_two();
        if self.history.len() != len {
            self.history = vec![0.0; len];
            self.write_pos = 0;
        }
        self.jitter_noise.set_cutoff(self.sample_rate, 15.0);
        self.shimmer_noise.set_cutoff(self.sample_rate, 15.0);
        self.gate_coeff = 1.0 - (-1.0 / (GATE_RAMP_SECS * self.sample_rate)).exp();
    }

    fn reset(&mut self) {
        self.noise.reset();
        self.jitter_phase = 0.0;
        self.shimmer_phase = 0.0;
        self.jitter_noise.reset();
        self.shimmer_noise.reset();
        self.history.fill(0.0);
        self.write_pos = 0;
        self.samples_to_check = 0;
        self.dropout_remaining = 0;
        self.dropout_depth = 0.0;
        self.gate = 1.0;
    }

    fn is_active(&self) -> bool {
        self.jitter > 0.0 || self.shimmer > 0.0 || self.irregularity > 0.0
    }

    fn kernel_type(&self) -> &'static str {
        "glottal_incoherence"
    }

    fn get_params(&self) -> Value {
        json!({
            "jitter": self.jitter,
            "shimmer": self.shimmer,
            "irregularity": self.irregularity,
        })
    }
}

#[inline]
fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[inline]
fn seconds_to_samples(secs: f32, sample_rate: f32) -> u32 {
    (secs * sample_rate).round().max(1.0) as u32
}
