//! Voice configuration
//!
//! Setup-time settings for a voice, loaded from JSON. The kernel constants
//! were tuned by ear; they live here so audio review can adjust them without
//! touching DSP code.

use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{AberrantError, Result};
use crate::params::AberrationParams;

/// Default host sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default host block size in samples
pub const DEFAULT_BLOCK_SIZE: usize = 128;

/// Default parameter smoothing time constant
pub const DEFAULT_SMOOTHING_MS: f32 = 20.0;

/// Tunables for the glottal incoherence kernel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlottalTuning {
    /// Share of intensity routed to jitter
    pub jitter_ratio: f32,
    /// Share of intensity routed to shimmer
    pub shimmer_ratio: f32,
    /// Share of intensity routed to pulse irregularity
    pub irregularity_ratio: f32,
    /// Proximity multiplier at maximum distance
    pub proximity_floor: f32,
    /// Added proximity multiplier at contact, scaled by proximity squared
    pub proximity_gain: f32,
    /// Shimmer added in a fully wet environment
    pub wet_shimmer_boost: f32,
    /// Jitter added in a fully dry environment
    pub dry_jitter_boost: f32,
}

impl Default for GlottalTuning {
    fn default() -> Self {
        Self {
            jitter_ratio: 0.8,
            shimmer_ratio: 0.7,
            irregularity_ratio: 0.5,
            proximity_floor: 0.3,
            proximity_gain: 1.2,
            wet_shimmer_boost: 0.3,
            dry_jitter_boost: 0.2,
        }
    }
}

impl GlottalTuning {
    fn validate(&self) -> std::result::Result<(), String> {
        let ratios = [
            ("jitter_ratio", self.jitter_ratio),
            ("shimmer_ratio", self.shimmer_ratio),
            ("irregularity_ratio", self.irregularity_ratio),
        ];
        for (name, value) in ratios {
            in_unit_range("glottal", name, value)?;
        }
        let gains = [
            ("proximity_floor", self.proximity_floor),
            ("proximity_gain", self.proximity_gain),
            ("wet_shimmer_boost", self.wet_shimmer_boost),
            ("dry_jitter_boost", self.dry_jitter_boost),
        ];
        for (name, value) in gains {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("glottal.{} must be finite and >= 0, got {}", name, value));
            }
        }
        Ok(())
    }
}

/// Tunables for the corporeal noise kernel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorporealTuning {
    /// Ceiling on the body-noise mix relative to the voice
    pub mix_ceiling: f32,
    /// Rectified sample must exceed the previous one by this ratio to count as an onset
    pub onset_ratio: f32,
    /// Minimum rectified level for an onset
    pub onset_threshold: f32,
    /// Samples after a trigger during which no new onset fires
    pub refractory_samples: u32,
}

impl Default for CorporealTuning {
    fn default() -> Self {
        Self {
            mix_ceiling: 0.15,
            onset_ratio: 1.5,
            onset_threshold: 0.1,
            refractory_samples: 1000,
        }
    }
}

impl CorporealTuning {
    fn validate(&self) -> std::result::Result<(), String> {
        in_unit_range("corporeal", "mix_ceiling", self.mix_ceiling)?;
        if !self.onset_ratio.is_finite() || self.onset_ratio < 1.0 {
            return Err(format!(
                "corporeal.onset_ratio must be >= 1, got {}",
                self.onset_ratio
            ));
        }
        if !self.onset_threshold.is_finite() || self.onset_threshold < 0.0 {
            return Err(format!(
                "corporeal.onset_threshold must be >= 0, got {}",
                self.onset_threshold
            ));
        }
        Ok(())
    }
}

fn in_unit_range(section: &str, name: &str, value: f32) -> std::result::Result<(), String> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{}.{} must be within 0-1, got {}", section, name, value))
    }
}

/// All kernel tunables
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelTuning {
    pub glottal: GlottalTuning,
    pub corporeal: CorporealTuning,
}

/// Setup-time configuration for one voice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Host sample rate in Hz
    pub sample_rate: u32,
    /// Host block size in samples
    pub block_size: usize,
    /// Voice seed; every kernel derives its own stream from it
    pub seed: u64,
    /// Parameter smoothing time constant in milliseconds
    pub smoothing_ms: f32,
    pub tuning: KernelTuning,
    /// Custom parameters overriding any archetype preset
    pub params: Option<AberrationParams>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            seed: 0,
            smoothing_ms: DEFAULT_SMOOTHING_MS,
            tuning: KernelTuning::default(),
            params: None,
        }
    }
}

impl VoiceConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AberrantError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let config: VoiceConfig =
            serde_json::from_str(&text).map_err(|e| AberrantError::Config {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.validate().map_err(|reason| AberrantError::Config {
            path: path.display().to_string(),
            reason,
        })?;
        info!("Loaded voice config from {}", path.display());
        debug!("{:?}", config);
        Ok(config)
    }

    /// Check the values serde cannot constrain
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample_rate must be > 0".to_string());
        }
        if self.block_size == 0 {
            return Err("block_size must be > 0".to_string());
        }
        if !self.smoothing_ms.is_finite() || self.smoothing_ms < 0.0 {
            return Err("smoothing_ms must be finite and >= 0".to_string());
        }
        self.tuning.glottal.validate()?;
        self.tuning.corporeal.validate()
    }

    /// Real-time budget for one block
    pub fn block_budget_secs(&self) -> f64 {
        self.block_size as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_documented_constants() {
        let config = VoiceConfig::default();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.tuning.glottal.jitter_ratio, 0.8);
        assert_eq!(config.tuning.glottal.shimmer_ratio, 0.7);
        assert_eq!(config.tuning.glottal.irregularity_ratio, 0.5);
        assert_eq!(config.tuning.corporeal.mix_ceiling, 0.15);
        assert_eq!(config.tuning.corporeal.refractory_samples, 1000);
    }

    #[test]
    fn test_budget() {
        let config = VoiceConfig::default();
        assert!((config.block_budget_secs() - 0.002_666).abs() < 1e-5);
    }

    #[test]
    fn test_load_partial_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "seed": 42, "tuning": {{ "corporeal": {{ "mix_ceiling": 0.1 }} }},
                 "params": {{ "roughness": 0.9, "vocal_fold_irregularity": 0.9 }} }}"#
        )
        .unwrap();

        let config = VoiceConfig::load(file.path()).unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.tuning.corporeal.mix_ceiling, 0.1);
        assert_eq!(config.tuning.corporeal.onset_ratio, 1.5);
        assert_eq!(config.tuning.glottal, GlottalTuning::default());
        let params = config.params.unwrap();
        assert_eq!(params.roughness.get(), 0.9);
    }

    #[test]
    fn test_load_rejects_zero_sample_rate() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "sample_rate": 0 }}"#).unwrap();
        let err = VoiceConfig::load(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_load_rejects_mix_ceiling_above_one() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "tuning": {{ "corporeal": {{ "mix_ceiling": 3.0 }} }} }}"#).unwrap();
        let err = VoiceConfig::load(file.path()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("mix_ceiling"), "{}", err);
    }

    #[test]
    fn test_validate_bounds_tunables() {
        let mut config = VoiceConfig::default();
        assert!(config.validate().is_ok());

        config.tuning.glottal.shimmer_ratio = 1.2;
        assert!(config.validate().unwrap_err().contains("shimmer_ratio"));

        config.tuning.glottal = GlottalTuning {
            proximity_gain: -0.5,
            ..GlottalTuning::default()
        };
        assert!(config.validate().unwrap_err().contains("proximity_gain"));

        config.tuning.glottal = GlottalTuning::default();
        config.tuning.corporeal.onset_ratio = 0.5;
        assert!(config.validate().unwrap_err().contains("onset_ratio"));

        config.tuning.corporeal = CorporealTuning {
            mix_ceiling: f32::NAN,
            ..CorporealTuning::default()
        };
        assert!(config.validate().unwrap_err().contains("mix_ceiling"));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            VoiceConfig::load(file.path()),
            Err(AberrantError::Config { .. })
        ));
    }
}
