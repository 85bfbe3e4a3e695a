//! Biquad and one-pole filter primitives
//!
//! Coefficients follow the Audio EQ Cookbook. State is kept in f64 so long
//! runs of narrow bandpasses stay stable at low frequencies.

use std::f64::consts::PI;

/// Response of a biquad section
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    /// Constant 0 dB peak gain bandpass
    BandPass,
    /// Peaking bell with the given gain in dB
    Peak(f32),
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Default for BiquadCoeffs {
    /// Pass-through
    fn default() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

impl BiquadCoeffs {
    /// Calculate coefficients
    ///
    /// # Arguments
    /// * `kind` - Filter response
    /// * `sample_rate` - Sample rate in Hz
    /// * `frequency` - Center or corner frequency, clamped below Nyquist
    /// * `q` - Quality factor, clamped to [0.1, 50]
    pub fn calculate(kind: FilterKind, sample_rate: f32, frequency: f32, q: f32) -> Self {
        let sample_rate = (sample_rate as f64).max(1.0);
        let freq = (frequency as f64).clamp(10.0, sample_rate * 0.49);
        let q = (q as f64).clamp(0.1, 50.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match kind {
            FilterKind::LowPass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterKind::HighPass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            FilterKind::BandPass => (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha),
            FilterKind::Peak(gain_db) => {
                let a = 10.0_f64.powf(gain_db as f64 / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Biquad section with its own state (Direct Form I)
#[derive(Debug, Clone, Copy, Default)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    pub fn new(kind: FilterKind, sample_rate: f32, frequency: f32, q: f32) -> Self {
        Self {
            coeffs: BiquadCoeffs::calculate(kind, sample_rate, frequency, q),
            ..Default::default()
        }
    }

    /// Replace coefficients, keeping history so sweeps stay click-free
    #[inline]
    pub fn set(&mut self, kind: FilterKind, sample_rate: f32, frequency: f32, q: f32) {
        self.coeffs = BiquadCoeffs::calculate(kind, sample_rate, frequency, q);
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let x = input as f64;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        // Flush denormals
        self.y1 = if y.abs() < 1e-30 { 0.0 } else { y };

        y as f32
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// One-pole lowpass, used for control signals and gentle tone shaping
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePole {
    coeff: f32,
    state: f32,
}

impl OnePole {
    pub fn new(sample_rate: f32, cutoff_hz: f32) -> Self {
        let mut filter = Self::default();
        filter.set_cutoff(sample_rate, cutoff_hz);
        filter
    }

    pub fn set_cutoff(&mut self, sample_rate: f32, cutoff_hz: f32) {
        let sample_rate = sample_rate.max(1.0);
        let cutoff = cutoff_hz.clamp(0.01, sample_rate * 0.49);
        self.coeff = 1.0 - (-2.0 * std::f32::consts::PI * cutoff / sample_rate).exp();
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state += self.coeff * (input - self.state);
        self.state
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady_state_gain(filter: &mut Biquad, freq: f32, sample_rate: f32) -> f32 {
        let mut peak = 0.0_f32;
        let n = sample_rate as usize;
        for i in 0..n {
            let x = (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin();
            let y = filter.process(x);
            if i > n / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn test_default_is_passthrough() {
        let mut filter = Biquad::default();
        for x in [0.5, -0.25, 1.0] {
            assert_eq!(filter.process(x), x);
        }
    }

    #[test]
    fn test_bandpass_unity_at_center() {
        let mut filter = Biquad::new(FilterKind::BandPass, 48000.0, 1000.0, 5.0);
        let gain = steady_state_gain(&mut filter, 1000.0, 48000.0);
        assert!((gain - 1.0).abs() < 0.02, "gain = {}", gain);

        let mut filter = Biquad::new(FilterKind::BandPass, 48000.0, 1000.0, 5.0);
        let off = steady_state_gain(&mut filter, 8000.0, 48000.0);
        assert!(off < 0.1, "off-band gain = {}", off);
    }

    #[test]
    fn test_lowpass_attenuates_highs() {
        let mut filter = Biquad::new(FilterKind::LowPass, 48000.0, 500.0, 0.707);
        let high = steady_state_gain(&mut filter, 10000.0, 48000.0);
        assert!(high < 0.01);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut filter = Biquad::new(FilterKind::HighPass, 48000.0, 1000.0, 0.707);
        let mut last = 1.0;
        for _ in 0..48000 {
            last = filter.process(1.0);
        }
        assert!(last.abs() < 1e-4);
    }

    #[test]
    fn test_one_pole_tracks_dc() {
        let mut filter = OnePole::new(48000.0, 100.0);
        for _ in 0..48000 {
            filter.process(0.5);
        }
        assert!((filter.value() - 0.5).abs() < 1e-4);
        filter.reset();
        assert_eq!(filter.value(), 0.0);
    }
}
