//! Roughness
//!
//! Irregular amplitude modulation in the 30-40 Hz range combined with soft
//! saturation. Subglottal pressure scales the saturation drive.

use std::f32::consts::TAU;

use serde_json::{json, Value};

use crate::dsp::biquad::OnePole;
use crate::dsp::kernel::VoiceKernel;
use crate::dsp::noise::{NoiseSource, SeededNoise};

/// Center rate of the roughness modulator
const MOD_RATE_HZ: f32 = 35.0;
/// Random excursion of the modulator rate
const MOD_RATE_WOBBLE_HZ: f32 = 8.0;
/// Makes up the level lost to the wobble lowpass
const WOBBLE_GAIN: f32 = 10.0;
/// Modulation depth at full roughness
const MOD_DEPTH: f32 = 0.6;
/// Saturation drive at full roughness and nominal pressure
const MAX_DRIVE: f32 = 4.0;

/// Rough voice generator
#[derive(Debug, Clone)]
pub struct Roughness<R: NoiseSource = SeededNoise> {
    sample_rate: f32,
    amount: f32,
    pressure: f32,
    phase: f32,
    noise: R,
    wobble: OnePole,
}

impl Roughness<SeededNoise> {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self::with_noise(sample_rate, SeededNoise::new(seed))
    }
}

impl<R: NoiseSource> Roughness<R> {
    pub fn with_noise(sample_rate: f32, noise: R) -> Self {
        Self {
            sample_rate,
            amount: 0.0,
            pressure: 1.0,
            phase: 0.0,
            noise,
            wobble: OnePole::new(sample_rate, 20.0),
        }
    }

    /// Set roughness, 0-1
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
    }

    /// Set the subglottal pressure ratio, 0.5-2
    pub fn set_pressure(&mut self, pressure: f32) {
        self.pressure = pressure.clamp(0.5, 2.0);
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    pub fn pressure(&self) -> f32 {
        self.pressure
    }

    #[inline]
    fn drive(&self) -> f32 {
        1.0 + self.amount * MAX_DRIVE * self.pressure
    }
}

impl<R: NoiseSource> VoiceKernel for Roughness<R> {
    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        if !self.is_active() {
            return input;
        }
        // Smoothed noise keeps the modulator irregular without crackle
        let wobble = (self.wobble.process(self.noise.next_gaussian()) * WOBBLE_GAIN).clamp(-1.0, 1.0);
        let rate = MOD_RATE_HZ + MOD_RATE_WOBBLE_HZ * wobble;
        self.phase += rate / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        let lfo = 0.5 + 0.5 * (TAU * self.phase).sin();
        let modulation = 1.0 - MOD_DEPTH * self.amount * lfo * (0.7 + 0.3 * wobble.abs());

        let drive = self.drive();
        let saturated = (input * drive).tanh() / drive.tanh();
        let shaped = input + self.amount * (saturated - input);

        shaped * modulation
    }

    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.wobble.set_cutoff(sample_rate, 20.0);
    }

    fn reset(&mut self) {
        self.phase = 0.0;
        self.noise.reset();
        self.wobble.reset();
    }

    fn is_active(&self) -> bool {
        self.amount > 0.0
    }

    fn kernel_type(&self) -> &'static str {
        "roughness"
    }

    fn get_params(&self) -> Value {
        json!({
            "amount": self.amount,
            "pressure": self.pressure,
            "drive": self.drive(),
        })
    }
}
