//! Voice kernel trait definition
//!
//! Base trait for every stage of the per-voice pipeline. Kernels process mono
//! sample streams in place and own all of their state.

use serde_json::Value;

/// Base trait for all voice DSP kernels
///
/// `process_sample` and `process_block` run on the audio thread: they must
/// not allocate, lock, log or fail. `prepare` and `get_params` are setup and
/// debugging paths and may allocate.
pub trait VoiceKernel: Send {
    /// Process one sample
    fn process_sample(&mut self, input: f32) -> f32;

    /// Process a block of samples in place
    ///
    /// Inactive kernels leave the block untouched.
    fn process_block(&mut self, samples: &mut [f32]) {
        if !self.is_active() {
            return;
        }
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Prepare the kernel for a new sample rate
    ///
    /// Recomputes coefficients and may reallocate internal buffers.
    fn prepare(&mut self, sample_rate: f32);

    /// Reset kernel state
    ///
    /// Clears filter history, phases and envelopes and rewinds the noise
    /// source to its seed, without reallocating.
    fn reset(&mut self);

    /// Whether the kernel currently alters the signal
    fn is_active(&self) -> bool;

    /// Get the kernel type identifier
    fn kernel_type(&self) -> &'static str;

    /// Get all parameters as JSON (for logging and the CLI)
    fn get_params(&self) -> Value;
}
