//! Pitch stabilizer
//!
//! Uncanny pitch stillness: the fundamental is tracked by autocorrelation and
//! pulled toward a slowly moving locked pitch, flattening vibrato and natural
//! drift. Correction is applied by a two-tap crossfaded delay-line shifter.
//!
//! All buffers are sized in `prepare`; processing never allocates.

use std::f32::consts::PI;

use serde_json::{json, Value};

use crate::dsp::kernel::VoiceKernel;
use crate::dsp::smoother::ParameterSmoother;

// ============================================================================
// Constants
// ============================================================================

/// Tracked pitch range in Hz
const MIN_F0_HZ: f32 = 60.0;
const MAX_F0_HZ: f32 = 500.0;

/// Samples between pitch estimates
const ANALYSIS_HOP: usize = 256;

/// Decimated frames in each autocorrelation window
const ANALYSIS_WINDOW: usize = 256;

/// Sample rate the analysis is decimated toward
const ANALYSIS_RATE_HZ: f32 = 12000.0;

/// Normalised correlation required to call a frame voiced
const VOICING_THRESHOLD: f32 = 0.5;

/// A correlation peak this close to the best one counts as the period
const PEAK_TOLERANCE: f32 = 0.9;

/// Minimum window energy per frame for analysis
const ENERGY_FLOOR: f32 = 1e-6;

/// Per-hop weight of a new estimate in the locked pitch
const LOCK_RATE: f32 = 0.05;

/// Correction ratio limits
const MIN_RATIO: f32 = 0.8;
const MAX_RATIO: f32 = 1.25;

/// Shifter crossfade window in samples at 48 kHz
const SHIFT_WINDOW_48K: f32 = 1024.0;

/// Deviation from unity at which correction is fully engaged
const FULL_ENGAGE_DEVIATION: f32 = 0.05;

/// Time at zero stillness after which analysis stops
const IDLE_HOLD_SECS: f32 = 0.25;

// ============================================================================
// Pitch Stabilizer
// ============================================================================

/// Pitch-locking kernel
#[derive(Debug, Clone)]
pub struct PitchStabilizer {
    sample_rate: f32,
    stillness: f32,

    // Analysis
    analysis: Vec<f32>,
    analysis_pos: usize,
    decimation: usize,
    min_lag: usize,
    max_lag: usize,
    correlation: Vec<f32>,
    /// Samples left before the analysis window holds only real input
    warmup: usize,
    hop_counter: usize,
    detected_f0: f32,
    locked_f0: f32,
    /// Consecutive samples processed at zero stillness
    idle_samples: usize,
    idle_hold: usize,

    // Correction
    ratio: ParameterSmoother,
    engagement: ParameterSmoother,
    delay: Vec<f32>,
    delay_pos: usize,
    window: f32,
    phase: f32,
}

impl PitchStabilizer {
    pub fn new(sample_rate: f32) -> Self {
        let mut kernel = Self {
            sample_rate,
            stillness: 0.0,
            analysis: Vec::new(),
            analysis_pos: 0,
            decimation: 1,
            min_lag: 1,
            max_lag: 2,
            correlation: Vec::new(),
            warmup: 0,
            hop_counter: 0,
            detected_f0: 0.0,
            locked_f0: 0.0,
            idle_samples: 0,
            idle_hold: 0,
            ratio: ParameterSmoother::new(sample_rate, 10.0, 1.0),
            engagement: ParameterSmoother::new(sample_rate, 30.0, 0.0),
            delay: Vec::new(),
            delay_pos: 0,
            window: SHIFT_WINDOW_48K,
            phase: 0.0,
        };
        kernel.prepare(sample_rate);
        kernel
    }

    /// Set stillness, 0-1 (0 = natural pitch, 1 = fully locked)
    pub fn set_stillness(&mut self, stillness: f32) {
        self.stillness = stillness.clamp(0.0, 1.0);
    }

    pub fn stillness(&self) -> f32 {
        self.stillness
    }

    /// Most recent voiced pitch estimate in Hz, 0 before the first one
    pub fn detected_f0(&self) -> f32 {
        self.detected_f0
    }

    /// Pitch the voice is being pulled toward, 0 before the first estimate
    pub fn locked_f0(&self) -> f32 {
        self.locked_f0
    }

    /// Current smoothed correction ratio
    pub fn correction_ratio(&self) -> f32 {
        self.ratio.current()
    }

    /// Idle long enough that analysis and shifting are skipped
    pub fn is_dormant(&self) -> bool {
        self.idle_samples >= self.idle_hold
    }

    /// Restart tracking after a dormant stretch; the buffers hold stale audio
    fn wake(&mut self) {
        self.warmup = self.analysis_span();
        self.hop_counter = 0;
        self.locked_f0 = 0.0;
        self.ratio.set_immediate(1.0);
        self.engagement.set_immediate(0.0);
        self.delay.fill(0.0);
    }

    // ------------------------------------------------------------------------
    // Analysis
    // ------------------------------------------------------------------------

    #[inline]
    fn push_analysis(&mut self, input: f32) {
        let mask = self.analysis.len() - 1;
        self.analysis[self.analysis_pos] = input;
        self.analysis_pos = (self.analysis_pos + 1) & mask;

        self.warmup = self.warmup.saturating_sub(1);
        self.hop_counter += 1;
        if self.hop_counter >= ANALYSIS_HOP {
            self.hop_counter = 0;
            if self.warmup == 0 {
                self.analyze();
            }
        }
    }

    /// Raw samples covered by one autocorrelation pass
    fn analysis_span(&self) -> usize {
        (ANALYSIS_WINDOW + self.max_lag + 1) * self.decimation
    }

    /// Decimated sample `frames_ago` frames before the newest one
    #[inline]
    fn frame(&self, frames_ago: usize) -> f32 {
        let mask = self.analysis.len() - 1;
        let offset = (frames_ago * self.decimation + 1) & mask;
        self.analysis[(self.analysis_pos + self.analysis.len() - offset) & mask]
    }

    fn analyze(&mut self) {
        let mut energy = 0.0;
        for i in 0..ANALYSIS_WINDOW {
            let x = self.frame(i);
            energy += x * x;
        }
        if energy < ENERGY_FLOOR * ANALYSIS_WINDOW as f32 {
            self.set_target_ratio(1.0);
            return;
        }

        let mut best_corr = 0.0;
        for lag in self.min_lag..=self.max_lag {
            let mut cross = 0.0;
            let mut lagged_energy = 0.0;
            for i in 0..ANALYSIS_WINDOW {
                let lagged = self.frame(i + lag);
                cross += self.frame(i) * lagged;
                lagged_energy += lagged * lagged;
            }
            let norm = (energy * lagged_energy).sqrt();
            let corr = if norm > 0.0 { cross / norm } else { 0.0 };
            self.correlation[lag] = corr;
            best_corr = f32::max(best_corr, corr);
        }

        if best_corr < VOICING_THRESHOLD {
            self.set_target_ratio(1.0);
            return;
        }

        // First local peak close to the best one; later peaks are octave errors
        let mut period = 0.0;
        for lag in self.min_lag + 1..self.max_lag {
            let (before, here, after) = (
                self.correlation[lag - 1],
                self.correlation[lag],
                self.correlation[lag + 1],
            );
            if here >= PEAK_TOLERANCE * best_corr && here >= before && here >= after {
                let curvature = before - 2.0 * here + after;
                let offset = if curvature < 0.0 {
                    (0.5 * (before - after) / curvature).clamp(-0.5, 0.5)
                } else {
                    0.0
                };
                period = lag as f32 + offset;
                break;
            }
        }
        if period <= 0.0 {
            self.set_target_ratio(1.0);
            return;
        }

        let f0 = self.sample_rate / (period * self.decimation as f32);
        self.detected_f0 = f0;
        if self.locked_f0 <= 0.0 {
            self.locked_f0 = f0;
        } else {
            self.locked_f0 += LOCK_RATE * (f0 - self.locked_f0);
        }
        self.set_target_ratio(self.locked_f0 / f0);
    }

    fn set_target_ratio(&mut self, ratio: f32) {
        let ratio = ratio.clamp(MIN_RATIO, MAX_RATIO);
        self.ratio.set_target(ratio);
        let deviation = (ratio - 1.0).abs();
        self.engagement
            .set_target((deviation / FULL_ENGAGE_DEVIATION).min(1.0));
    }

    // ------------------------------------------------------------------------
    // Correction
    // ------------------------------------------------------------------------

    #[inline]
    fn read_delay(&self, delay: f32) -> f32 {
        let mask = self.delay.len() - 1;
        let whole = delay.floor();
        let frac = delay - whole;
        let idx = (self.delay_pos + self.delay.len() - whole as usize) & mask;
        let prev = (idx + mask) & mask;
        self.delay[idx] * (1.0 - frac) + self.delay[prev] * frac
    }

    /// Two taps half a window apart with complementary sin² gains
    #[inline]
    fn shift(&mut self, input: f32, ratio: f32) -> f32 {
        let mask = self.delay.len() - 1;
        self.delay_pos = (self.delay_pos + 1) & mask;
        self.delay[self.delay_pos] = input;

        self.phase += (1.0 - ratio) / self.window;
        self.phase -= self.phase.floor();

        let second = (self.phase + 0.5).fract();
        let gain_a = (PI * self.phase).sin().powi(2);
        let gain_b = 1.0 - gain_a;
        gain_a * self.read_delay(self.phase * self.window)
            + gain_b * self.read_delay(second * self.window)
    }
}

impl VoiceKernel for PitchStabilizer {
    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        if !self.is_active() {
            if self.is_dormant() {
                return input;
            }
            self.idle_samples += 1;
        } else if self.idle_samples > 0 {
            if self.is_dormant() {
                self.wake();
            }
            self.idle_samples = 0;
        }

        self.push_analysis(input);
        let ratio = self.ratio.process_sample();
        let engagement = self.engagement.process_sample();
        let shifted = self.shift(input, ratio);
        if !self.is_active() {
            return input;
        }
        let amount = self.stillness * engagement;
        input + amount * (shifted - input)
    }

    /// Short inactive stretches still run analysis so tracking stays warm;
    /// once dormant the block is left untouched.
    fn process_block(&mut self, samples: &mut [f32]) {
        if !self.is_active() && self.is_dormant() {
            return;
        }
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.decimation = ((self.sample_rate / ANALYSIS_RATE_HZ).round() as usize).max(1);
        let decimated_rate = self.sample_rate / self.decimation as f32;
        self.min_lag = ((decimated_rate / MAX_F0_HZ).floor() as usize).max(1);
        self.max_lag = ((decimated_rate / MIN_F0_HZ).ceil() as usize).max(self.min_lag + 1);

        self.correlation = vec![0.0; self.max_lag + 2];
        self.warmup = self.analysis_span();

        let analysis_len = self.analysis_span().next_power_of_two();
        if self.analysis.len() != analysis_len {
            self.analysis = vec![0.0; analysis_len];
            self.analysis_pos = 0;
        }

        self.window = (SHIFT_WINDOW_48K * self.sample_rate / 48000.0).max(64.0);
        let delay_len = (self.window.ceil() as usize + 4).next_power_of_two();
        if self.delay.len() != delay_len {
            self.delay = vec![0.0; delay_len];
            self.delay_pos = 0;
        }

        self.idle_hold = (IDLE_HOLD_SECS * self.sample_rate) as usize;

        self.ratio.set_sample_rate(self.sample_rate);
        self.engagement.set_sample_rate(self.sample_rate);
    }

    fn reset(&mut self) {
        self.analysis.fill(0.0);
        self.analysis_pos = 0;
        self.warmup = self.analysis_span();
        self.hop_counter = 0;
        self.detected_f0 = 0.0;
        self.locked_f0 = 0.0;
        self.idle_samples = 0;
        self.ratio.set_immediate(1.0);
        self.engagement.set_immediate(0.0);
        self.delay.fill(0.0);
        self.delay_pos = 0;
        self.phase = 0.0;
    }

    fn is_active(&self) -> bool {
        self.stillness > 0.0
    }

    fn kernel_type(&self) -> &'static str {
        "pitch_stabilizer"
    }

    fn get_params(&self) -> Value {
        json!({
            "stillness": self.stillness,
            "detected_f0": self.detected_f0,
            "locked_f0": self.locked_f0,
            "correction_ratio": self.ratio.current(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (TAU * freq * i as f32 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_zero_stillness_is_bypass() {
        let mut pitch = PitchStabilizer::new(48000.0);
        let input = sine(220.0, 4096);
        let mut output = input.clone();
        pitch.process_block(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn test_detects_steady_pitch() {
        let mut pitch = PitchStabilizer::new(48000.0);
        pitch.set_stillness(1.0);
        let mut block = sine(220.0, 24000);
        pitch.process_block(&mut block);
        let f0 = pitch.detected_f0();
        assert!((f0 - 220.0).abs() / 220.0 < 0.03, "f0 = {}", f0);
        assert!((pitch.correction_ratio() - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_vibrato_engages_bounded_correction() {
        let mut pitch = PitchStabilizer::new(48000.0);
        pitch.set_stillness(1.0);

        // 200 Hz with +/-10% vibrato at 4 Hz
        let mut phase = 0.0_f32;
        let mut block: Vec<f32> = (0..96000)
            .map(|i| {
                let t = i as f32 / 48000.0;
                let freq = 200.0 * (1.0 + 0.1 * (TAU * 4.0 * t).sin());
                phase += freq / 48000.0;
                0.5 * (TAU * phase).sin()
            })
            .collect();

        let mut max_dev = 0.0_f32;
        for chunk in block.chunks_mut(128) {
            pitch.process_block(chunk);
            let ratio = pitch.correction_ratio();
            assert!((MIN_RATIO..=MAX_RATIO).contains(&ratio));
            max_dev = max_dev.max((ratio - 1.0).abs());
        }
        assert!(max_dev > 0.02, "correction never engaged");
        assert!(block.iter().all(|s| s.is_finite() && s.abs() < 1.5));
    }

    #[test]
    fn test_idle_voice_stops_tracking() {
        let mut pitch = PitchStabilizer::new(48000.0);
        pitch.set_stillness(1.0);
        pitch.process_block(&mut sine(220.0, 24000));

        // Tracking continues through a short idle stretch
        pitch.set_stillness(0.0);
        pitch.process_block(&mut sine(330.0, 12000));
        let f0 = pitch.detected_f0();
        assert!((f0 - 330.0).abs() / 330.0 < 0.03, "f0 = {}", f0);
        assert!(pitch.is_dormant());

        let input = sine(150.0, 24000);
        let mut output = input.clone();
        pitch.process_block(&mut output);
        assert_eq!(output, input);
        assert_eq!(pitch.detected_f0(), f0);

        pitch.set_stillness(1.0);
        pitch.process_block(&mut sine(150.0, 24000));
        assert!(!pitch.is_dormant());
        let f0 = pitch.detected_f0();
        assert!((f0 - 150.0).abs() / 150.0 < 0.03, "f0 = {}", f0);
    }

    #[test]
    fn test_silence_stays_silent() {
        let mut pitch = PitchStabilizer::new(48000.0);
        pitch.set_stillness(1.0);
        let mut block = vec![0.0_f32; 8192];
        pitch.process_block(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));
        assert_eq!(pitch.detected_f0(), 0.0);
    }

    #[test]
    fn test_reset_is_deterministic() {
        let mut pitch = PitchStabilizer::new(48000.0);
        pitch.set_stillness(0.8);
        let input = sine(180.0, 8192);

        let mut first = input.clone();
        pitch.process_block(&mut first);
        pitch.reset();
        let mut second = input.clone();
        pitch.process_block(&mut second);
        assert_eq!(first, second);
    }
}
