//! Breathiness
//!
//! Adds aspiration noise that follows the level of the voice and thins the
//! voiced component. Whisper pushes the same mechanism further, toward
//! unvoiced speech.

use serde_json::{json, Value};

use crate::dsp::biquad::{Biquad, FilterKind};
use crate::dsp::envelope::EnvelopeFollower;
use crate::dsp::kernel::VoiceKernel;
use crate::dsp::noise::{NoiseSource, SeededNoise};

/// Aspiration noise band
const ASPIRATION_LOW_HZ: f32 = 1200.0;
const ASPIRATION_HIGH_HZ: f32 = 8000.0;

/// Voiced attenuation at full breathiness
const BREATH_VOICE_LOSS: f32 = 0.3;
/// Voiced attenuation at full whisper
const WHISPER_VOICE_LOSS: f32 = 0.8;

/// Aspiration level at full breathiness
const BREATH_NOISE_GAIN: f32 = 0.6;
/// Aspiration level at full whisper
const WHISPER_NOISE_GAIN: f32 = 0.9;

/// Breath noise generator
#[derive(Debug, Clone)]
pub struct Breathiness<R: NoiseSource = SeededNoise> {
    sample_rate: f32,
    amount: f32,
    whisper: f32,
    noise: R,
    highpass: Biquad,
    lowpass: Biquad,
    envelope: EnvelopeFollower,
}

impl Breathiness<SeededNoise> {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self::with_noise(sample_rate, SeededNoise::new(seed))
    }
}

impl<R: NoiseSource> Breathiness<R> {
    pub fn with_noise(sample_rate: f32, noise: R) -> Self {
        Self {
            sample_rate,
            amount: 0.0,
            whisper: 0.0,
            noise,
            highpass: Biquad::new(FilterKind::HighPass, sample_rate, ASPIRATION_LOW_HZ, 0.707),
            lowpass: Biquad::new(FilterKind::LowPass, sample_rate, ASPIRATION_HIGH_HZ, 0.707),
            envelope: EnvelopeFollower::new(sample_rate, 5.0, 80.0),
        }
    }

    /// Set breathiness, 0-1
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
    }

    /// Set whisper, 0-1
    pub fn set_whisper(&mut self, whisper: f32) {
        self.whisper = whisper.clamp(0.0, 1.0);
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn whisper(&self) -> f32 {
        self.whisper
    }
}

impl<R: NoiseSource> VoiceKernel for Breathiness<R> {
    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        if !self.is_active() {
            return input;
        }
        let level = self.envelope.process(input);
        let raw = self.noise.next_gaussian() * 0.5;
        let aspiration = self.lowpass.process(self.highpass.process(raw));

        let voiced_gain =
            (1.0 - BREATH_VOICE_LOSS * self.amount) * (1.0 - WHISPER_VOICE_LOSS * self.whisper);
        let noise_gain = BREATH_NOISE_GAIN * self.amount + WHISPER_NOISE_GAIN * self.whisper;

        input * voiced_gain + aspiration * level * noise_gain
    }

    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.highpass.set(FilterKind::HighPass, sample_rate, ASPIRATION_LOW_HZ, 0.707);
        self.lowpass.set(FilterKind::LowPass, sample_rate, ASPIRATION_HIGH_HZ, 0.707);
        self.envelope.set_sample_rate(sample_rate);
    }

    fn reset(&mut self) {
        self.noise.reset();
        self.highpass.reset();
        self.lowpass.reset();
        self.envelope.reset();
    }

    fn is_active(&self) -> bool {
        self.amount > 0.0 || self.whisper > 0.0
    }

    fn kernel_type(&self) -> &'static str {
        "breathiness"
    }

    fn get_params(&self) -> Value {
        json!({
            "amount": self.amount,
            "whisper": self.whisper,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 48000.0).sin())
            .collect()
    }

    #[test]
    fn test_zero_is_bypass() {
        let mut breath = Breathiness::new(48000.0, 1);
        let input = sine(512);
        let mut output = input.clone();
        breath.process_block(&mut output);
        assert_eq!(input, output);
    }

    #[test]
    fn test_noise_follows_voice_level() {
        let mut breath = Breathiness::new(48000.0, 1);
        breath.set_amount(1.0);
        let mut silence = vec![0.0_f32; 4800];
        breath.process_block(&mut silence);
        assert!(silence.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_whisper_attenuates_voicing() {
        let mut breath = Breathiness::new(48000.0, 1);
        breath.set_whisper(1.0);
        let input = sine(4800);
        let mut output = input.clone();
        breath.process_block(&mut output);
        let corr: f32 = input.iter().zip(&output).map(|(a, b)| a * b).sum::<f32>()
            / input.iter().map(|a| a * a).sum::<f32>();
        // Voiced part scaled to 0.2 of the input
        assert!(corr < 0.4, "corr = {}", corr);
    }

    #[test]
    fn test_reset_is_deterministic() {
        let mut breath = Breathiness::new(48000.0, 5);
        breath.set_amount(0.6);
        let input = sine(1024);

        let mut first = input.clone();
        breath.process_block(&mut first);
        breath.reset();
        let mut second = input.clone();
        breath.process_block(&mut second);
        assert_eq!(first, second);
    }
}
