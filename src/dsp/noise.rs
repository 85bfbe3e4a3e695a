//! Per-kernel noise sources
//!
//! Every stochastic kernel owns its own `NoiseSource`. There is no shared
//! generator, so concurrently processed voices never contend for state or
//! produce correlated noise. Seeds for the kernels of one voice are derived
//! from the voice seed with BLAKE3, giving each kernel an independent stream.

use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_pcg::Pcg32;

/// Pseudo-random source injected into a kernel
pub trait NoiseSource: Send {
    /// Uniform sample in [0, 1)
    fn next_unit(&mut self) -> f32;

    /// Standard normal sample
    fn next_gaussian(&mut self) -> f32;

    /// Rewind to the start of the stream
    fn reset(&mut self);

    /// Uniform sample in [-1, 1)
    #[inline]
    fn next_bipolar(&mut self) -> f32 {
        self.next_unit() * 2.0 - 1.0
    }

    /// Uniform sample in [low, high)
    #[inline]
    fn next_range(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_unit()
    }
}

/// Deterministic PCG32 noise source
#[derive(Debug, Clone)]
pub struct SeededNoise {
    seed: u64,
    rng: Pcg32,
}

impl SeededNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl NoiseSource for SeededNoise {
    #[inline]
    fn next_unit(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    #[inline]
    fn next_gaussian(&mut self) -> f32 {
        self.rng.sample::<f32, _>(StandardNormal)
    }

    fn reset(&mut self) {
        self.rng = Pcg32::seed_from_u64(self.seed);
    }
}

/// Derive the seed of one kernel from its voice seed
///
/// Hashes the voice seed (little-endian) followed by the kernel key and keeps
/// the first eight bytes of the digest.
pub fn derive_kernel_seed(voice_seed: u64, key: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&voice_seed.to_le_bytes());
    hasher.update(key.as_bytes());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = SeededNoise::new(7);
        let mut b = SeededNoise::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_unit(), b.next_unit());
            assert_eq!(a.next_gaussian(), b.next_gaussian());
        }
    }

    #[test]
    fn test_reset_rewinds() {
        let mut noise = SeededNoise::new(99);
        let first: Vec<f32> = (0..16).map(|_| noise.next_bipolar()).collect();
        noise.reset();
        let second: Vec<f32> = (0..16).map(|_| noise.next_bipolar()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ranges() {
        let mut noise = SeededNoise::new(3);
        for _ in 0..1000 {
            let u = noise.next_unit();
            assert!((0.0..1.0).contains(&u));
            let b = noise.next_bipolar();
            assert!((-1.0..1.0).contains(&b));
            let r = noise.next_range(2.0, 3.0);
            assert!((2.0..3.0).contains(&r));
        }
    }

    #[test]
    fn test_kernel_seeds_are_independent() {
        let glottal = derive_kernel_seed(1, "glottal");
        let corporeal = derive_kernel_seed(1, "corporeal");
        assert_ne!(glottal, corporeal);
        assert_eq!(glottal, derive_kernel_seed(1, "glottal"));
        assert_ne!(glottal, derive_kernel_seed(2, "glottal"));
    }
}
