//! Audio Buffer Management
//!
//! `AudioBuffer` is the common currency between every stage of the voice
//! pipeline. Samples are interleaved f32 held in 32-byte aligned storage so
//! hot loops can be vectorised without unaligned loads.

use std::fmt;
use std::path::Path;

use bytemuck::{Pod, Zeroable};

use crate::engine::io;
use crate::error::{AberrantError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Maximum supported channel count
pub const MAX_CHANNELS: u16 = 16;

/// Peak level below which a buffer is treated as silent by `normalize`
pub const SILENCE_THRESHOLD: f32 = 1e-10;

/// Alignment of the sample storage in bytes
pub const SIMD_ALIGNMENT: usize = 32;

const BLOCK_LANES: usize = SIMD_ALIGNMENT / std::mem::size_of::<f32>();

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns `f32::NEG_INFINITY` for zero or negative input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Aligned Storage
// ============================================================================

/// Eight f32 lanes on a 32-byte boundary
#[repr(C, align(32))]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
struct SimdBlock([f32; BLOCK_LANES]);

/// Growable f32 storage whose first element is always 32-byte aligned
#[derive(Clone, Default)]
struct AlignedSamples {
    blocks: Vec<SimdBlock>,
    len: usize,
}

impl AlignedSamples {
    fn zeroed(len: usize) -> Self {
        Self {
            blocks: vec![SimdBlock::default(); len.div_ceil(BLOCK_LANES)],
            len,
        }
    }

    fn from_slice(samples: &[f32]) -> Self {
        let mut storage = Self::zeroed(samples.len());
        storage.as_mut_slice().copy_from_slice(samples);
        storage
    }

    #[inline]
    fn as_slice(&self) -> &[f32] {
        &bytemuck::cast_slice::<SimdBlock, f32>(&self.blocks)[..self.len]
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [f32] {
        let len = self.len;
        &mut bytemuck::cast_slice_mut::<SimdBlock, f32>(&mut self.blocks)[..len]
    }

    /// Resize to `len` samples, zero-filling any new samples
    fn resize(&mut self, len: usize) {
        let old_len = self.len;
        self.blocks
            .resize(len.div_ceil(BLOCK_LANES), SimdBlock::default());
        self.len = len;
        if len > old_len {
            // The tail of the last block may still hold samples from before a shrink
            self.as_mut_slice()[old_len..].fill(0.0);
        }
    }

    fn extend_from_slice(&mut self, samples: &[f32]) {
        let old_len = self.len;
        self.resize(old_len + samples.len());
        self.as_mut_slice()[old_len..].copy_from_slice(samples);
    }

    fn clear(&mut self) {
        self.blocks.clear();
        self.len = 0;
    }
}

impl PartialEq for AlignedSamples {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for AlignedSamples {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedSamples")
            .field("len", &self.len)
            .finish()
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Interleaved, SIMD-aligned audio buffer
///
/// Samples are stored as `[ch0, ch1, ..., ch0, ch1, ...]`. The buffer is a
/// single-owner value type; `Clone` performs a deep copy.
///
/// # Invariants
/// - `sample_rate > 0`
/// - `1 <= channels <= 16`
/// - `samples().len() % channels == 0`
///
/// # Example
/// ```
/// use aberrant::engine::AudioBuffer;
///
/// let mut buffer = AudioBuffer::new(480, 1, 48000).unwrap();
/// buffer.samples_mut()[0] = 0.5;
/// assert_eq!(buffer.num_frames(), 480);
/// assert_eq!(buffer.peak(), 0.5);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    samples: AlignedSamples,
    channels: u16,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a zeroed buffer holding `num_frames` frames
    ///
    /// # Errors
    /// * `InvalidSampleRate` - if `sample_rate` is zero
    /// * `InvalidChannelCount` - if `channels` is outside 1-16
    pub fn new(num_frames: usize, channels: u16, sample_rate: u32) -> Result<Self> {
        validate_format(channels, sample_rate)?;
        Ok(Self {
            samples: AlignedSamples::zeroed(num_frames * channels as usize),
            channels,
            sample_rate,
        })
    }

    /// Create a buffer from existing interleaved samples
    ///
    /// # Errors
    /// Fails on an invalid format or when the sample count is not a multiple
    /// of the channel count.
    pub fn from_interleaved(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Self> {
        validate_format(channels, sample_rate)?;
        if samples.len() % channels as usize != 0 {
            return Err(AberrantError::InvalidSampleCount {
                samples: samples.len(),
                channels,
            });
        }
        Ok(Self {
            samples: AlignedSamples::from_slice(samples),
            channels,
            sample_rate,
        })
    }

    /// Create a silent buffer of the given duration
    pub fn silence(duration_secs: f32, channels: u16, sample_rate: u32) -> Result<Self> {
        let frames = (duration_secs.max(0.0) * sample_rate as f32) as usize;
        Self::new(frames, channels, sample_rate)
    }

    /// Create a mono sine test tone with unit amplitude
    pub fn sine_wave(frequency: f32, duration_secs: f32, sample_rate: u32) -> Result<Self> {
        let mut buffer = Self::silence(duration_secs, 1, sample_rate)?;
        let angular = 2.0 * std::f64::consts::PI * frequency as f64 / sample_rate as f64;
        for (i, sample) in buffer.samples_mut().iter_mut().enumerate() {
            *sample = (angular * i as f64).sin() as f32;
        }
        Ok(buffer)
    }

    /// Load a buffer from an audio file
    ///
    /// # Errors
    /// Returns an error naming the path and the backend-reported cause when
    /// the file is missing, unreadable or in an unsupported format.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        io::load_wav(path.as_ref())
    }

    /// Save the buffer as 16-bit PCM WAV
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        io::save_wav_pcm16(self, path.as_ref())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Interleaved samples
    #[inline]
    pub fn samples(&self) -> &[f32] {
        self.samples.as_slice()
    }

    /// Mutable interleaved samples
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        self.samples.as_mut_slice()
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn num_frames(&self) -> usize {
        self.samples.len / self.channels as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.len == 0
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Whether the sample storage starts on a 32-byte boundary
    pub fn is_simd_aligned(&self) -> bool {
        self.samples().as_ptr() as usize % SIMD_ALIGNMENT == 0
    }

    /// Get a sample at the given frame and channel
    #[inline]
    pub fn get_sample(&self, frame: usize, channel: u16) -> Option<f32> {
        if channel >= self.channels {
            return None;
        }
        self.samples()
            .get(frame * self.channels as usize + channel as usize)
            .copied()
    }

    /// Set a sample at the given frame and channel
    ///
    /// Returns false if the indices are out of bounds.
    #[inline]
    pub fn set_sample(&mut self, frame: usize, channel: u16, value: f32) -> bool {
        if channel >= self.channels {
            return false;
        }
        let index = frame * self.channels as usize + channel as usize;
        match self.samples_mut().get_mut(index) {
            Some(sample) => {
                *sample = value;
                true
            }
            None => false,
        }
    }

    /// Copy out one channel's samples
    pub fn channel_samples(&self, channel: u16) -> Vec<f32> {
        if channel >= self.channels {
            return Vec::new();
        }
        self.samples()
            .iter()
            .skip(channel as usize)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }

    /// Average all channels down to a mono buffer
    pub fn to_mono(&self) -> AudioBuffer {
        if self.channels == 1 {
            return self.clone();
        }
        let scale = 1.0 / self.channels as f32;
        let mono: Vec<f32> = self
            .samples()
            .chunks_exact(self.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect();
        AudioBuffer {
            samples: AlignedSamples::from_slice(&mono),
            channels: 1,
            sample_rate: self.sample_rate,
        }
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Resize to `num_frames` frames, zero-filling on growth
    pub fn resize(&mut self, num_frames: usize) {
        self.samples.resize(num_frames * self.channels as usize);
    }

    /// Drop all samples, keeping sample rate and channel count
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Zero every sample without changing the length
    pub fn fill_silence(&mut self) {
        self.samples_mut().fill(0.0);
    }

    /// Scale the buffer so its absolute peak equals `target_peak`
    ///
    /// Silent buffers (peak below `SILENCE_THRESHOLD`) are left untouched.
    pub fn normalize(&mut self, target_peak: f32) {
        let current = self.peak();
        if current < SILENCE_THRESHOLD {
            return;
        }
        self.apply_gain(target_peak / current);
    }

    /// Multiply every sample by a linear gain
    pub fn apply_gain(&mut self, gain: f32) {
        for sample in self.samples_mut() {
            *sample *= gain;
        }
    }

    /// Apply gain in decibels
    pub fn apply_gain_db(&mut self, gain_db: f32) {
        self.apply_gain(db_to_linear(gain_db));
    }

    /// Add `other * gain` into this buffer, up to the shorter length
    ///
    /// # Errors
    /// `BufferMismatch` if sample rate or channel count differ. The receiver
    /// is not modified on error.
    pub fn mix_from(&mut self, other: &AudioBuffer, gain: f32) -> Result<()> {
        self.check_compatible(other, "mix_from")?;
        for (dst, &src) in self.samples_mut().iter_mut().zip(other.samples()) {
            *dst += src * gain;
        }
        Ok(())
    }

    /// Append the frames of `other` to the end of this buffer
    ///
    /// # Errors
    /// `BufferMismatch` if sample rate or channel count differ. The receiver
    /// is not modified on error.
    pub fn append(&mut self, other: &AudioBuffer) -> Result<()> {
        self.check_compatible(other, "append")?;
        self.samples.extend_from_slice(other.samples());
        Ok(())
    }

    /// Copy frames `[start, end)` into a new buffer
    ///
    /// `end` is clamped to the buffer length. An empty or out-of-range window
    /// yields an empty buffer with the same format rather than an error.
    pub fn slice(&self, start: usize, end: usize) -> AudioBuffer {
        let end = end.min(self.num_frames());
        let channels = self.channels as usize;
        let window = if start < end {
            &self.samples()[start * channels..end * channels]
        } else {
            &[]
        };
        AudioBuffer {
            samples: AlignedSamples::from_slice(window),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    // ------------------------------------------------------------------------
    // Analysis
    // ------------------------------------------------------------------------

    /// Linear RMS over all samples; 0 for an empty buffer
    pub fn rms(&self) -> f32 {
        let samples = self.samples();
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_sq / samples.len() as f64).sqrt() as f32
    }

    /// Absolute peak over all samples; 0 for an empty buffer
    pub fn peak(&self) -> f32 {
        self.samples()
            .iter()
            .map(|s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// RMS level in dBFS
    pub fn rms_db(&self) -> f32 {
        linear_to_db(self.rms())
    }

    /// Peak level in dBFS
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak())
    }

    /// Check that every sample is finite (no NaN or infinity)
    pub fn is_finite(&self) -> bool {
        self.samples().iter().all(|s| s.is_finite())
    }

    fn check_compatible(&self, other: &AudioBuffer, operation: &'static str) -> Result<()> {
        if self.sample_rate != other.sample_rate {
            return Err(AberrantError::BufferMismatch {
                operation,
                details: format!(
                    "sample rate {} Hz vs {} Hz",
                    self.sample_rate, other.sample_rate
                ),
            });
        }
        if self.channels != other.channels {
            return Err(AberrantError::BufferMismatch {
                operation,
                details: format!("{} channels vs {} channels", self.channels, other.channels),
            });
        }
        Ok(())
    }
}

fn validate_format(channels: u16, sample_rate: u32) -> Result<()> {
    if sample_rate == 0 {
        return Err(AberrantError::InvalidSampleRate { sample_rate });
    }
    if channels == 0 || channels > MAX_CHANNELS {
        return Err(AberrantError::InvalidChannelCount { channels });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
