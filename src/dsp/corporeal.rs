//! Corporeal noise
//!
//! Additive body-failure sounds layered on top of the voice. Unlike the other
//! kernels this one never reshapes the input: it listens for onsets (a
//! rectified sample jumping well above the previous one) and answers them with
//! short bursts (wet clicks, wet pops, bone creaks) scaled by the voice
//! envelope. Breath rasp and mucus rattle run continuously.
//!
//! Output is `input + noise * mix_ceiling`, with the noise sum bounded to
//! [-1, 1], so body noise never dominates the voice.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::CorporealTuning;
use crate::dsp::biquad::{Biquad, FilterKind};
use crate::dsp::envelope::EnvelopeFollower;
use crate::dsp::kernel::VoiceKernel;
use crate::dsp::noise::{NoiseSource, SeededNoise};
use crate::params::Archetype;

// ============================================================================
// Profiles
// ============================================================================

/// Amount of each body sound, all 0-1
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorporealProfile {
    pub wet_click: f32,
    pub wet_pop: f32,
    pub bone_creak: f32,
    pub raspy_inhale: f32,
    pub mucus_rattle: f32,
}

impl CorporealProfile {
    /// Profile for an archetype
    ///
    /// The wet sounds (clicks, pops, rattle) scale with `wet_sounds`; creaks and
    /// rasp belong to the archetype itself.
    pub fn for_archetype(archetype: Archetype, wet_sounds: f32) -> Self {
        let wet = wet_sounds.clamp(0.0, 1.0);
        let (click, pop, rattle, creak, inhale) = match archetype {
            Archetype::Human | Archetype::Unknown => (0.4, 0.3, 0.2, 0.0, 0.0),
            Archetype::Vampire => (0.5, 0.2, 0.0, 0.1, 0.4),
            Archetype::Zombie => (0.8, 0.7, 0.8, 0.6, 0.3),
            Archetype::Werewolf => (0.3, 0.3, 0.2, 0.8, 0.5),
            Archetype::Wraith => (0.1, 0.0, 0.0, 0.2, 0.6),
        };
        Self {
            wet_click: click * wet,
            wet_pop: pop * wet,
            mucus_rattle: rattle * wet,
            bone_creak: creak,
            raspy_inhale: inhale,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.wet_click <= 0.0
            && self.wet_pop <= 0.0
            && self.bone_creak <= 0.0
            && self.raspy_inhale <= 0.0
            && self.mucus_rattle <= 0.0
    }

    fn clamped(self) -> Self {
        Self {
            wet_click: self.wet_click.clamp(0.0, 1.0),
            wet_pop: self.wet_pop.clamp(0.0, 1.0),
            bone_creak: self.bone_creak.clamp(0.0, 1.0),
            raspy_inhale: self.raspy_inhale.clamp(0.0, 1.0),
            mucus_rattle: self.mucus_rattle.clamp(0.0, 1.0),
        }
    }
}

// ============================================================================
// Bursts
// ============================================================================

/// Burst lengths in seconds
const CLICK_SECS: (f32, f32) = (0.002, 0.005);
const POP_SECS: (f32, f32) = (0.008, 0.015);
const CREAK_SECS: (f32, f32) = (0.040, 0.120);

/// Impulse density inside a bone creak, per sample
const CREAK_DENSITY: f32 = 0.02;

/// Level of each continuous layer at full amount
const INHALE_LEVEL: f32 = 0.25;
const RATTLE_LEVEL: f32 = 0.5;

/// Rattle flutter rate
const RATTLE_RATE_HZ: f32 = 12.0;

/// Burst gain range over the voice envelope
const MIN_ENVELOPE_GAIN: f32 = 0.25;

/// One transient in flight
#[derive(Debug, Clone, Copy, Default)]
struct Burst {
    remaining: u32,
    length: u32,
    gain: f32,
}

impl Burst {
    fn start(&mut self, length: u32, gain: f32) {
        self.length = length.max(1);
        self.remaining = self.length;
        self.gain = gain;
    }

    /// Position in the burst, 0 at the start and 1 at the end
    #[inline]
    fn progress(&self) -> f32 {
        1.0 - self.remaining as f32 / self.length as f32
    }

    #[inline]
    fn active(&self) -> bool {
        self.remaining > 0
    }

    #[inline]
    fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

// ============================================================================
// Corporeal Noise
// ============================================================================

/// Additive transient body-noise kernel
#[derive(Debug, Clone)]
pub struct CorporealNoise<R: NoiseSource = SeededNoise> {
    sample_rate: f32,
    tuning: CorporealTuning,
    profile: CorporealProfile,
    noise: R,

    envelope: EnvelopeFollower,
    prev_level: f32,
    refractory: u32,
    triggers: u64,

    click: Burst,
    pop: Burst,
    creak: Burst,

    click_filter: Biquad,
    pop_filter: Biquad,
    creak_filter: Biquad,
    inhale_filter: Biquad,
    rattle_filter: Biquad,
    rattle_phase: f32,
}

impl CorporealNoise<SeededNoise> {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self::with_noise(sample_rate, SeededNoise::new(seed), CorporealTuning::default())
    }
}

impl<R: NoiseSource> CorporealNoise<R> {
    pub fn with_noise(sample_rate: f32, noise: R, tuning: CorporealTuning) -> Self {
        let mut kernel = Self {
            sample_rate,
            tuning,
            profile: CorporealProfile::default(),
            noise,
            envelope: EnvelopeFollower::new(sample_rate, 1.0, 50.0),
            prev_level: 0.0,
            refractory: 0,
            triggers: 0,
            click: Burst::default(),
            pop: Burst::default(),
            creak: Burst::default(),
            click_filter: Biquad::default(),
            pop_filter: Biquad::default(),
            creak_filter: Biquad::default(),
            inhale_filter: Biquad::default(),
            rattle_filter: Biquad::default(),
            rattle_phase: 0.0,
        };
        kernel.prepare(sample_rate);
        kernel
    }

    pub fn set_profile(&mut self, profile: CorporealProfile) {
        self.profile = profile.clamped();
    }

    pub fn profile(&self) -> CorporealProfile {
        self.profile
    }

    pub fn set_tuning(&mut self, tuning: CorporealTuning) {
        self.tuning = tuning;
    }

    /// Onsets detected since construction or the last reset
    pub fn trigger_count(&self) -> u64 {
        self.triggers
    }

    #[inline]
    fn burst_samples(&mut self, range: (f32, f32)) -> u32 {
        (self.noise.next_range(range.0, range.1) * self.sample_rate).round() as u32
    }

    /// Onset heuristic with refractory debounce
    ///
    /// Fires when the rectified sample exceeds the previous rectified sample by
    /// `onset_ratio` and clears `onset_threshold`.
    #[inline]
    fn detect_onset(&mut self, input: f32) -> bool {
        let level = input.abs();
        let previous = self.prev_level;
        self.prev_level = level;
        self.envelope.process(input);

        if self.refractory > 0 {
            self.refractory -= 1;
            return false;
        }
        if level > previous * self.tuning.onset_ratio && level > self.tuning.onset_threshold {
            self.refractory = self.tuning.refractory_samples;
            self.triggers += 1;
            return true;
        }
        false
    }

    /// Each burst fires with probability equal to its amount
    fn trigger_bursts(&mut self) {
        let loudness = self.envelope.value().clamp(MIN_ENVELOPE_GAIN, 1.0);
        if self.profile.wet_click > 0.0 && self.noise.next_unit() < self.profile.wet_click {
            let length = self.burst_samples(CLICK_SECS);
            let gain = self.profile.wet_click * self.noise.next_range(0.6, 1.0) * loudness;
            self.click.start(length, gain);
        }
        if self.profile.wet_pop > 0.0 && self.noise.next_unit() < self.profile.wet_pop {
            let length = self.burst_samples(POP_SECS);
            let gain = self.profile.wet_pop * self.noise.next_range(0.6, 1.0) * loudness;
            self.pop.start(length, gain);
        }
        if self.profile.bone_creak > 0.0 && self.noise.next_unit() < self.profile.bone_creak {
            let length = self.burst_samples(CREAK_SECS);
            let gain = self.profile.bone_creak * self.noise.next_range(0.5, 1.0) * loudness;
            self.creak.start(length, gain);
        }
    }

    #[inline]
    fn render_bursts(&mut self) -> f32 {
        let mut sum = 0.0;

        if self.click.active() {
            // Sharp exponential decay
            let env = (-6.0 * self.click.progress()).exp();
            let excitation = self.noise.next_bipolar();
            sum += self.click_filter.process(excitation) * env * self.click.gain;
            self.click.tick();
        }

        if self.pop.active() {
            // Half-sine swell
            let env = (std::f32::consts::PI * self.pop.progress()).sin();
            let excitation = self.noise.next_bipolar();
            sum += self.pop_filter.process(excitation) * env * self.pop.gain * 1.5;
            self.pop.tick();
        }

        if self.creak.active() {
            // Sparse crackle impulses
            let impulse = if self.noise.next_unit() < CREAK_DENSITY {
                self.noise.next_bipolar()
            } else {
                0.0
            };
            let env = 1.0 - self.creak.progress();
            sum += self.creak_filter.process(impulse * 4.0) * env * self.creak.gain;
            self.creak.tick();
        }

        sum
    }

    #[inline]
    fn render_continuous(&mut self) -> f32 {
        let mut sum = 0.0;

        if self.profile.raspy_inhale > 0.0 {
            let hiss = self.inhale_filter.process(self.noise.next_gaussian() * 0.5);
            sum += hiss * self.profile.raspy_inhale * INHALE_LEVEL;
        }

        if self.profile.mucus_rattle > 0.0 {
            self.rattle_phase += RATTLE_RATE_HZ / self.sample_rate;
            if self.rattle_phase >= 1.0 {
                self.rattle_phase -= 1.0;
            }
            let flutter = (TAU * self.rattle_phase).sin().powi(2);
            let gurgle = self.rattle_filter.process(self.noise.next_gaussian() * 0.5);
            sum += gurgle * flutter * self.profile.mucus_rattle * RATTLE_LEVEL;
        }

        sum
    }
}

impl<R: NoiseSource> VoiceKernel for CorporealNoise<R> {
    #[inline]
    fn process_sample(&mut self, input: f32) -> f32 {
        if !self.is_active() {
            return input;
        }
        if self.detect_onset(input) {
            self.trigger_bursts();
        }
        let body = (self.render_bursts() + self.render_continuous()).clamp(-1.0, 1.0);
        input + body * self.tuning.mix_ceiling
    }

    fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        let sr = self.sample_rate;
        self.envelope.set_sample_rate(sr);
        self.click_filter.set(FilterKind::BandPass, sr, 2500.0, 1.5);
        self.pop_filter.set(FilterKind::BandPass, sr, 300.0, 2.0);
        self.creak_filter.set(FilterKind::BandPass, sr, 1200.0, 2.0);
        self.inhale_filter.set(FilterKind::HighPass, sr, 3000.0, 0.707);
        self.rattle_filter.set(FilterKind::BandPass, sr, 180.0, 3.0);
    }

    fn reset(&mut self) {
        self.noise.reset();
        self.envelope.reset();
        self.prev_level = 0.0;
        self.refractory = 0;
        self.triggers = 0;
        self.click = Burst::default();
        self.pop = Burst::default();
        self.creak = Burst::default();
        self.click_filter.reset();
        self.pop_filter.reset();
        self.creak_filter.reset();
        self.inhale_filter.reset();
        self.rattle_filter.reset();
        self.rattle_phase = 0.0;
    }

    fn is_active(&self) -> bool {
        !self.profile.is_silent()
            || self.click.active()
            || self.pop.active()
            || self.creak.active()
    }

    fn kernel_type(&self) -> &'static str {
        "corporeal_noise"
    }

    fn get_params(&self) -> Value {
        json!({
            "wet_click": self.profile.wet_click,
            "wet_pop": self.profile.wet_pop,
            "bone_creak": self.profile.bone_creak,
            "raspy_inhale": self.profile.raspy_inhale,
            "mucus_rattle": self.profile.mucus_rattle,
            "mix_ceiling": self.tuning.mix_ceiling,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_profile() -> CorporealProfile {
        CorporealProfile {
            wet_click: 1.0,
            wet_pop: 1.0,
            bone_creak: 1.0,
            raspy_inhale: 1.0,
            mucus_rattle: 1.0,
        }
    }

    /// Quiet gaps broken by loud 20-sample bursts every `spacing` samples
    fn stabs(spacing: usize, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| if i % spacing < 20 { 0.8 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_silent_profile_is_bypass() {
        let mut body = CorporealNoise::new(48000.0, 1);
        let input = stabs(500, 4800);
        let mut output = input.clone();
        body.process_block(&mut output);
        assert_eq!(input, output);
        assert_eq!(body.trigger_count(), 0);
    }

    #[test]
    fn test_mix_ceiling_bounds_added_noise() {
        let mut body = CorporealNoise::new(48000.0, 1);
        body.set_profile(full_profile());
        let input = stabs(1200, 48000);
        let mut output = input.clone();
        body.process_block(&mut output);
        for (x, y) in input.iter().zip(&output) {
            assert!((y - x).abs() <= 0.15 + 1e-6);
        }
    }

    #[test]
    fn test_refractory_debounces_onsets() {
        let mut body = CorporealNoise::new(48000.0, 1);
        body.set_profile(full_profile());
        // An onset every 100 samples, but only one per 1000 may register
        let mut input = stabs(100, 10000);
        body.process_block(&mut input);
        let triggers = body.trigger_count();
        assert!(triggers >= 1);
        assert!(triggers <= 10, "triggers = {}", triggers);
    }

    #[test]
    fn test_steady_tone_retriggers_each_refractory_window() {
        let mut body = CorporealNoise::new(48000.0, 1);
        body.set_profile(CorporealProfile::for_archetype(Archetype::Zombie, 0.7));
        let mut tone: Vec<f32> = (0..48000)
            .map(|i| (TAU * 440.0 * i as f32 / 48000.0).sin())
            .collect();
        body.process_block(&mut tone);

        // Every rising zero crossing is an onset; the 1000-sample refractory
        // window lets through at most 48 per second
        let triggers = body.trigger_count();
        assert!((40..=48).contains(&triggers), "triggers = {}", triggers);
    }

    #[test]
    fn test_onset_compares_previous_sample() {
        let mut body = CorporealNoise::new(48000.0, 1);
        body.set_profile(full_profile());

        // A slow ramp never jumps by 1.5x sample to sample once past the threshold
        let mut ramp: Vec<f32> = (0..2000).map(|i| 0.2 + i as f32 * 1e-4).collect();
        body.process_block(&mut ramp);
        assert_eq!(body.trigger_count(), 1);

        body.reset();
        let mut jump = vec![0.05_f32, 0.05, 0.5];
        body.process_block(&mut jump);
        assert_eq!(body.trigger_count(), 1);
    }

    #[test]
    fn test_quiet_input_never_triggers() {
        let mut body = CorporealNoise::new(48000.0, 1);
        body.set_profile(full_profile());
        let mut input: Vec<f32> = stabs(500, 10000).iter().map(|s| s * 0.1).collect();
        body.process_block(&mut input);
        assert_eq!(body.trigger_count(), 0);
    }

    #[test]
    fn test_continuous_layers_need_no_onset() {
        let mut body = CorporealNoise::new(48000.0, 1);
        body.set_profile(CorporealProfile {
            raspy_inhale: 1.0,
            ..Default::default()
        });
        let mut silence = vec![0.0_f32; 4800];
        body.process_block(&mut silence);
        assert!(silence.iter().any(|&s| s != 0.0));
        assert_eq!(body.trigger_count(), 0);
    }

    #[test]
    fn test_archetype_profiles() {
        assert!(CorporealProfile::for_archetype(Archetype::Human, 0.0).is_silent());
        let zombie = CorporealProfile::for_archetype(Archetype::Zombie, 0.7);
        assert!((zombie.wet_click - 0.56).abs() < 1e-6);
        assert_eq!(zombie.bone_creak, 0.6);
        let werewolf = CorporealProfile::for_archetype(Archetype::Werewolf, 0.0);
        assert_eq!(werewolf.wet_click, 0.0);
        assert!(werewolf.bone_creak > 0.0);
    }

    #[test]
    fn test_reset_is_deterministic() {
        let mut body = CorporealNoise::new(48000.0, 4);
        body.set_profile(full_profile());
        let input = stabs(2000, 12000);

        let mut first = input.clone();
        body.process_block(&mut first);
        body.reset();
        let mut second = input.clone();
        body.process_block(&mut second);
        assert_eq!(first, second);
    }
}
