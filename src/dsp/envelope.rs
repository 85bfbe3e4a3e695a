//! Envelope follower
//!
//! Peak follower with separate attack and release time constants. Kernels
//! use it to scale added noise by the level of the voice underneath.

/// Attack/release coefficient for a time constant
#[inline]
pub fn time_constant_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    let samples = (time_ms.max(0.001) * 0.001 * sample_rate.max(1.0)).max(1e-3);
    (-1.0 / samples).exp()
}

/// Rectifying envelope follower
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeFollower {
    attack_ms: f32,
    release_ms: f32,
    attack_coeff: f32,
    release_coeff: f32,
    value: f32,
}

impl EnvelopeFollower {
    pub fn new(sample_rate: f32, attack_ms: f32, release_ms: f32) -> Self {
        let mut follower = Self {
            attack_ms,
            release_ms,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            value: 0.0,
        };
        follower.set_sample_rate(sample_rate);
        follower
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.attack_coeff = time_constant_coeff(self.attack_ms, sample_rate);
        self.release_coeff = time_constant_coeff(self.release_ms, sample_rate);
    }

    /// Feed one sample and return the updated envelope
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let level = input.abs();
        let coeff = if level > self.value {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.value = level + coeff * (self.value - level);
        if self.value < 1e-12 {
            self.value = 0.0;
        }
        self.value
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}
