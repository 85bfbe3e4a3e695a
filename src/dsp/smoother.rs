//! Parameter smoothing
//!
//! One-pole exponential smoother that turns parameter steps into click-free
//! ramps. `tau` is the time to cover ~63% of the distance to a new target.

/// Shortest allowed time constant in milliseconds
pub const MIN_TIME_CONSTANT_MS: f32 = 0.1;

/// Longest allowed time constant in milliseconds
pub const MAX_TIME_CONSTANT_MS: f32 = 100.0;

/// Distance at which the smoother snaps onto its target
pub const SNAP_EPSILON: f32 = 1e-6;

/// Single-pole exponential parameter smoother
///
/// Never allocates or locks; call `process_sample` once per sample on the
/// audio thread, or `advance` once per block at control rate.
///
/// # Example
/// ```
/// use aberrant::dsp::ParameterSmoother;
///
/// let mut smoother = ParameterSmoother::new(48000.0, 5.0, 0.0);
/// smoother.set_target(1.0);
/// let first = smoother.process_sample();
/// assert!(first > 0.0 && first < 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSmoother {
    current: f32,
    target: f32,
    sample_rate: f32,
    time_constant_ms: f32,
    alpha: f32,
}

impl ParameterSmoother {
    /// Create a smoother resting at `initial`
    pub fn new(sample_rate: f32, time_constant_ms: f32, initial: f32) -> Self {
        let mut smoother = Self {
            current: initial,
            target: initial,
            sample_rate: sample_rate.max(1.0),
            time_constant_ms: MIN_TIME_CONSTANT_MS,
            alpha: 1.0,
        };
        smoother.set_time_constant(time_constant_ms);
        smoother
    }

    /// Change the sample rate without disturbing current or target
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.update_alpha();
    }

    /// Change the time constant, clamped to [0.1, 100] ms
    pub fn set_time_constant(&mut self, time_constant_ms: f32) {
        self.time_constant_ms = if time_constant_ms.is_nan() {
            MIN_TIME_CONSTANT_MS
        } else {
            time_constant_ms.clamp(MIN_TIME_CONSTANT_MS, MAX_TIME_CONSTANT_MS)
        };
        self.update_alpha();
    }

    fn update_alpha(&mut self) {
        let tau_secs = self.time_constant_ms / 1000.0;
        let alpha = 1.0 - (-1.0 / (tau_secs * self.sample_rate)).exp();
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Jump straight to `value` with no ramp
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn time_constant_ms(&self) -> f32 {
        self.time_constant_ms
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Advance one sample and return the new value
    #[inline]
    pub fn process_sample(&mut self) -> f32 {
        let delta = self.target - self.current;
        if delta.abs() <= SNAP_EPSILON {
            self.current = self.target;
            return self.current;
        }
        let next = self.current + self.alpha * delta;
        self.current = self.settle(next, delta);
        self.current
    }

    /// Fill `out` with successive smoothed values
    pub fn process_buffer(&mut self, out: &mut [f32]) {
        for value in out.iter_mut() {
            *value = self.process_sample();
        }
    }

    /// Advance `num_samples` samples at once and return the new value
    ///
    /// Equivalent to calling `process_sample` that many times, up to
    /// rounding. Used by the orchestrator to update kernels at block rate.
    pub fn advance(&mut self, num_samples: usize) -> f32 {
        if num_samples == 0 {
            return self.current;
        }
        let delta = self.target - self.current;
        if delta.abs() <= SNAP_EPSILON {
            self.current = self.target;
            return self.current;
        }
        let decay = (1.0 - self.alpha as f64).powi(num_samples.min(i32::MAX as usize) as i32);
        let next = self.target - (delta as f64 * decay) as f32;
        self.current = self.settle(next, delta);
        self.current
    }

    /// Snap when within epsilon, when rounding crossed the target, or when
    /// f32 precision stalls the approach
    #[inline]
    fn settle(&self, next: f32, delta: f32) -> f32 {
        let remaining = self.target - next;
        if remaining.abs() <= SNAP_EPSILON || remaining * delta <= 0.0 || next == self.current {
            self.target
        } else {
            next
        }
    }
}
