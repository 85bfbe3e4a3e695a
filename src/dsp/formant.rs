//! Formant bank
//!
//! Five parallel bandpass resonators at the neutral vowel formants. Shifting
//! works by subtracting the energy of each original resonance and re-adding
//! it at the shifted resonance, so neutral settings are an exact bypass and
//! the dry signal is never fully replaced.

use serde_json::{json, Value};

use crate::dsp::biquad::{Biquad, FilterKind};
use crate::dsp::kernel::VoiceKernel;

// ============================================================================
// Constants
// ============================================================================

/// Number of modelled formants
pub const NUM_FORMANTS: usize = 5;

/// Neutral vocal tract formant frequencies in Hz
pub const BASE_FREQUENCIES: [f32; NUM_FORMANTS] = [500.0, 1500.0, 2500.0, 3500.0, 4500.0];

/// Neutral formant bandwidths in Hz
pub const BASE_BANDWIDTHS: [f32; NUM_FORMANTS] = [80.0, 90.0, 120.0, 130.0, 140.0];

/// Relative weight of each formant
const FORMANT_GAINS: [f32; NUM_FORMANTS] = [1.0, 0.7, 0.5, 0.35, 0.25];

/// Lowest shifted formant frequency
const MIN_FORMANT_HZ: f32 = 80.0;

/// Highest shifted formant frequency as a fraction of the sample rate
const MAX_FORMANT_RATIO: f32 = 0.45;

/// How strongly full tension narrows the bandwidths
const TENSION_NARROWING: f32 = 0.3;

// ============================================================================
// Formant Bank
// ============================================================================

/// Vocal tract resonance shaper
#[derive(Debug, Clone)]
pub struct FormantBank {
    sample_rate: f32,
    shift_hz: f32,
    scale: f32,
    bandwidth_expansion: f32,
    tension: f32,
    frequencies: [f32; NUM_FORMANTS],
    bandwidths: [f32; NUM_FORMANTS],
    original: [Biquad; NUM_FORMANTS],
    shifted: [Biquad; NUM_FORMANTS],
}

impl FormantBank {
    pub fn new(sample_rate: f32) -> Self {
        let mut bank = Self {
            sample_rate,
            shift_hz: 0.0,
            scale: 1.0,
            bandwidth_expansion: 1.0,
            tension: 0.0,
            frequencies: BASE_FREQUENCIES,
            bandwidths: BASE_BANDWIDTHS,
            original: [Biquad::default(); NUM_FORMANTS],
            shifted: [Biquad::default(); NUM_FORMANTS],
        };
        bank.update_original();
        bank.update_shifted();
        bank
    }

    /// Set all vocal tract controls at once
    ///
    /// # Arguments
    /// * `shift_hz` - Linear shift applied after scaling
    /// * `scale` - Multiplicative formant scale (vocal tract length)
    /// * `bandwidth_expansion` - Bandwidth multiplier
    /// * `tension` - 0-1, narrows bandwidths
    pub fn configure(&mut self, shift_hz: f32, scale: f32, bandwidth_expansion: f32, tension: f32) {
        if shift_hz == self.shift_hz
            && scale == self.scale
            && bandwidth_expansion == self.bandwidth_expansion
            && tension == self.tension
        {
            return;
        }
        self.shift_hz = shift_hz;
        self.scale = scale;
        self.bandwidth_expansion = bandwidth_expansion;
        self.tension = tension.clamp(0.0, 1.0);
        self.update_shifted();
    }

    /// Shifted formant frequencies in Hz
    pub fn frequencies(&self) -> [f32; NUM_FORMANTS] {
        self.frequencies
    }

    /// Shifted formant bandwidths in Hz
    pub fn bandwidths(&self) -> [f32; NUM_FORMANTS] {
        self.bandwidths
    }

    fn update_original(&mut self) {
        for (i, filter) in self.original.iter_mut().enumerate() {
            let q = BASE_FREQUENCIES[i] / BASE_BANDWIDTHS[i];
            filter.set(FilterKind::BandPass, self.sample_rate, BASE_FREQUENCIES[i], q);
        }
    }

    fn update_shifted(&mut self) {
        let max_hz = (self.sample_rate * MAX_FORMANT_RATIO).max(MIN_FORMANT_HZ);
        let narrowing = 1.0 + TENSION_NARROWING * self.tension;
        for i in 0..NUM_FORMANTS {
            let freq = (BASE_FREQUENCIES[i] * self.scale + self.shift_hz).clamp(MIN_FORMANT_HZ, max_hz);
            let bandwidth = (BASE_BANDWIDTHS[i] * self.bandwidth_expansion / narrowing).max(1.0);
            self.frequencies[i] = freq;
            self.bandwidths[i] = bandwidth;
            self.shifted[i].set(FilterKind::BandPass, self.sample_rate, freq, freq / bandwidth);
        }
    }
}

impl VoiceKernel for FormantBank {
    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        if !self.is_active() {
            return input;
        }
        let mut correction = 0.0;
        for i in 0..NUM_FORMANTS {
            let moved = self.shifted[i].process(input);
            let removed = self.original[i].process(input);
            correction += FORMANT_GAINS[i] * (moved - removed);
        }
        input + correction
    }

    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_original();
        self.update_shifted();
    }

    fn reset(&mut self) {
        for filter in self.original.iter_mut().chain(self.shifted.iter_mut()) {
            filter.reset();
        }
    }

    fn is_active(&self) -> bool {
        self.shift_hz != 0.0
            || self.scale != 1.0
            || self.bandwidth_expansion != 1.0
            || self.tension != 0.0
    }

    fn kernel_type(&self) -> &'static str {
        "formant"
    }

    fn get_params(&self) -> Value {
        json!({
            "shift_hz": self.shift_hz,
            "scale": self.scale,
            "bandwidth_expansion": self.bandwidth_expansion,
            "tension": self.tension,
            "frequencies": self.frequencies.to_vec(),
            "bandwidths": self.bandwidths.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_neutral_is_bypass() {
        let mut bank = FormantBank::new(48000.0);
        assert!(!bank.is_active());
        let input = sine(440.0, 1024);
        let mut output = input.clone();
        bank.process_block(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn test_scale_and_shift_move_formants() {
        let mut bank = FormantBank::new(48000.0);
        bank.configure(-180.0, 0.82, 1.0, 0.0);
        let freqs = bank.frequencies();
        assert!((freqs[0] - (500.0 * 0.82 - 180.0)).abs() < 1e-3);
        assert!((freqs[1] - (1500.0 * 0.82 - 180.0)).abs() < 1e-3);
    }

    #[test]
    fn test_frequencies_clamped() {
        let mut bank = FormantBank::new(16000.0);
        bank.configure(-500.0, 0.5, 1.0, 0.0);
        assert_eq!(bank.frequencies()[0], MIN_FORMANT_HZ);

        bank.configure(500.0, 2.0, 1.0, 0.0);
        assert!(bank.frequencies().iter().all(|&f| f <= 16000.0 * MAX_FORMANT_RATIO));
    }

    #[test]
    fn test_tension_narrows_bandwidth() {
        let mut bank = FormantBank::new(48000.0);
        bank.configure(0.0, 1.0, 2.0, 0.0);
        let loose = bank.bandwidths()[0];
        bank.configure(0.0, 1.0, 2.0, 1.0);
        let tense = bank.bandwidths()[0];
        assert!(tense < loose);
    }

    #[test]
    fn test_shift_changes_signal() {
        let mut bank = FormantBank::new(48000.0);
        bank.configure(-120.0, 1.0, 1.8, 0.0);
        let input = sine(440.0, 4800);
        let mut output = input.clone();
        bank.process_block(&mut output);
        let diff: f32 = input.iter().zip(&output).map(|(a, b)| (a - b).abs()).sum();
        assert!(diff > 1.0);
        assert!(output.iter().all(|s| s.is_finite()));
    }
}
