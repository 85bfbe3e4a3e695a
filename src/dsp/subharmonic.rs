//! Subharmonic generator
//!
//! Growl undertone: an octave-divider tracks the fundamental through a
//! zero-crossing flip-flop, producing square waves at f0/2 and f0/4 that are
//! shaped by the voice envelope and softened by a lowpass.
//!
//! Transformation struggle layers random surges on top of the baseline growl.
//! Each surge starts at a random height and decays exponentially, so the
//! undertone flares up and falls back like something fighting to break free.

use serde_json::{json, Value};

use crate::dsp::biquad::{Biquad, FilterKind};
use crate::dsp::envelope::EnvelopeFollower;
use crate::dsp::kernel::VoiceKernel;
use crate::dsp::noise::{NoiseSource, SeededNoise};

/// Pre-filter that isolates the fundamental for crossing detection
const TRACKING_CUTOFF_HZ: f32 = 900.0;
/// Lowpass on the divider output
const SUB_CUTOFF_HZ: f32 = 400.0;

/// Level of the f0/2 and f0/4 squares
const OCTAVE_DOWN_GAIN: f32 = 0.7;
const TWO_OCTAVES_DOWN_GAIN: f32 = 0.3;

/// Overall undertone level at full growl
const SUB_GAIN: f32 = 0.8;
/// Level of the saturated grit layer at full growl
const GRIT_GAIN: f32 = 0.25;

/// Envelope level below which the divider holds its state
const GATE_LEVEL: f32 = 1e-4;

/// Expected surges per second at full struggle
const SURGE_RATE_HZ: f32 = 1.5;
/// Surge decay time constant in seconds
const SURGE_DECAY_SECS: f32 = 0.15;
/// Surges can only fire once the previous one has mostly died away
const SURGE_REARM_LEVEL: f32 = 0.05;
/// Growl added by a full surge at full struggle
const SURGE_DEPTH: f32 = 0.5;

/// Growl undertone kernel
#[derive(Debug, Clone)]
pub struct SubharmonicGenerator<R: NoiseSource = SeededNoise> {
    sample_rate: f32,
    growl: f32,
    struggle: f32,

    noise: R,
    tracking: Biquad,
    smoothing: Biquad,
    envelope: EnvelopeFollower,
    last_tracked: f32,
    half: f32,
    quarter: f32,

    surge: f32,
    surge_decay: f32,
}

impl SubharmonicGenerator<SeededNoise> {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self::with_noise(sample_rate, SeededNoise::new(seed))
    }
}

impl<R: NoiseSource> SubharmonicGenerator<R> {
    pub fn with_noise(sample_rate: f32, noise: R) -> Self {
        let mut kernel = Self {
            sample_rate,
            growl: 0.0,
            struggle: 0.0,
            noise,
            tracking: Biquad::default(),
            smoothing: Biquad::default(),
            envelope: EnvelopeFollower::new(sample_rate, 5.0, 60.0),
            last_tracked: 0.0,
            half: 1.0,
            quarter: 1.0,
            surge: 0.0,
            surge_decay: 0.0,
        };
        kernel.prepare(sample_rate);
        kernel
    }

    /// Set the baseline growl amount, 0-1
    pub fn set_growl(&mut self, growl: f32) {
        self.growl = growl.clamp(0.0, 1.0);
    }

    /// Set how hard the beast fights, 0-1
    ///
    /// Zero disables surges; existing surges still decay out.
    pub fn set_transformation_struggle(&mut self, struggle: f32) {
        self.struggle = struggle.clamp(0.0, 1.0);
    }

    pub fn growl(&self) -> f32 {
        self.growl
    }

    pub fn transformation_struggle(&self) -> f32 {
        self.struggle
    }

    /// Current surge envelope, 0-1
    ///
    /// A surge's height is scaled by the struggle at the moment it fires and
    /// keeps that scale while it decays.
    pub fn surge_level(&self) -> f32 {
        self.surge
    }

    /// Growl level after surges
    pub fn effective_level(&self) -> f32 {
        (self.growl + self.surge * SURGE_DEPTH).clamp(0.0, 1.0)
    }

    #[inline]
    fn update_surge(&mut self) {
        self.surge *= self.surge_decay;
        if self.surge < 1e-6 {
            self.surge = 0.0;
        }
        if self.struggle > 0.0 && self.surge < SURGE_REARM_LEVEL {
            let chance = SURGE_RATE_HZ * self.struggle / self.sample_rate;
            if self.noise.next_unit() < chance {
                self.surge = self.noise.next_range(0.5, 1.0) * self.struggle;
            }
        }
    }

    #[inline]
    fn update_divider(&mut self, input: f32, level: f32) {
        let tracked = self.tracking.process(input);
        if level > GATE_LEVEL && self.last_tracked <= 0.0 && tracked > 0.0 {
            self.half = -self.half;
            if self.half > 0.0 {
                self.quarter = -self.quarter;
            }
        }
        self.last_tracked = tracked;
    }
}

impl<R: NoiseSource> VoiceKernel for SubharmonicGenerator<R> {
    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        if !self.is_active() {
            return input;
        }
        self.update_surge();
        let level = self.envelope.process(input);
        self.update_divider(input, level);

        let square = OCTAVE_DOWN_GAIN * self.half + TWO_OCTAVES_DOWN_GAIN * self.quarter;
        let sub = self.smoothing.process(square * level);
        let grit = (3.0 * input).tanh() - input;

        input + self.effective_level() * (SUB_GAIN * sub + GRIT_GAIN * grit)
    }

    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.tracking
            .set(FilterKind::LowPass, self.sample_rate, TRACKING_CUTOFF_HZ, 0.707);
        self.smoothing
            .set(FilterKind::LowPass, self.sample_rate, SUB_CUTOFF_HZ, 0.707);
        self.envelope.set_sample_rate(self.sample_rate);
        self.surge_decay = (-1.0 / (SURGE_DECAY_SECS * self.sample_rate)).exp();
    }

    fn reset(&mut self) {
        self.noise.reset();
        self.tracking.reset();
        self.smoothing.reset();
        self.envelope.reset();
        self.last_tracked = 0.0;
        self.half = 1.0;
        self.quarter = 1.0;
        self.surge = 0.0;
    }

    fn is_active(&self) -> bool {
        self.growl > 0.0 || self.struggle > 0.0 || self.surge > 0.0
    }

    fn kernel_type(&self) -> &'static str {
        "subharmonic"
    }

    fn get_params(&self) -> Value {
        json!({
            "growl": self.growl,
            "transformation_struggle": self.struggle,
            "surge": self.surge,
            "effective_level": self.effective_level(),
        })
    }
}
