//! Aberration parameter record and archetype presets
//!
//! `AberrationParams` describes how far a voice deviates from a clean human
//! baseline. Archetype presets are deltas on top of that baseline: each
//! factory only touches the fields that make the archetype what it is.

use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::typed::{
    BandwidthExpansion, Breathiness, FormantScale, FormantShift, GrowlHarmonics,
    HollowResonance, Roughness, SubglottalPressure, Tension, VocalFoldIrregularity,
    WetSounds, WhisperAmount,
};

/// Threshold a field must exceed to define an archetype
const ARCHETYPE_THRESHOLD: f32 = 0.5;

/// Amount-style fields below this are "near zero" for the human check
const HUMAN_AMOUNT_CEILING: f32 = 0.1;

/// Formant shift below this (in Hz) counts as unshifted
const HUMAN_SHIFT_CEILING_HZ: f32 = 50.0;

/// Ratio fields within this of 1.0 count as unscaled
const HUMAN_RATIO_TOLERANCE: f32 = 0.05;

// ============================================================================
// Archetype
// ============================================================================

/// Voice archetype derived from a parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    #[default]
    Human,
    Vampire,
    Zombie,
    Werewolf,
    Wraith,
    Unknown,
}

impl Archetype {
    /// Every archetype with a named preset
    pub const PRESETS: [Archetype; 5] = [
        Archetype::Human,
        Archetype::Vampire,
        Archetype::Zombie,
        Archetype::Werewolf,
        Archetype::Wraith,
    ];

    /// Get string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Human => "human",
            Archetype::Vampire => "vampire",
            Archetype::Zombie => "zombie",
            Archetype::Werewolf => "werewolf",
            Archetype::Wraith => "wraith",
            Archetype::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Archetype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(Archetype::Human),
            "vampire" => Ok(Archetype::Vampire),
            "zombie" => Ok(Archetype::Zombie),
            "werewolf" => Ok(Archetype::Werewolf),
            "wraith" => Ok(Archetype::Wraith),
            other => Err(format!(
                "unknown archetype '{}' (expected human, vampire, zombie, werewolf or wraith)",
                other
            )),
        }
    }
}

// ============================================================================
// Aberration Parameters
// ============================================================================

/// Complete set of aberration controls for one voice
///
/// The default value is a clean human voice. Every field is a clamped newtype,
/// so the record can never hold an out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AberrationParams {
    pub formant_shift: FormantShift,
    pub formant_scale: FormantScale,
    pub breathiness: Breathiness,
    pub roughness: Roughness,
    pub hollow_resonance: HollowResonance,
    pub wet_sounds: WetSounds,
    pub vocal_fold_irregularity: VocalFoldIrregularity,
    pub bandwidth_expansion: BandwidthExpansion,
    pub growl_harmonics: GrowlHarmonics,
    pub whisper_amount: WhisperAmount,
    pub tension: Tension,
    pub subglottal_pressure: SubglottalPressure,
}

impl AberrationParams {
    /// Clean human baseline
    pub fn create_human() -> Self {
        Self::default()
    }

    /// Breathy, hollow and unnaturally still
    pub fn create_vampire() -> Self {
        Self {
            formant_shift: FormantShift::new(80.0),
            formant_scale: FormantScale::new(1.05),
            breathiness: Breathiness::new(0.6),
            hollow_resonance: HollowResonance::new(0.7),
            tension: Tension::new(0.6),
            ..Self::default()
        }
    }

    /// Rotting vocal folds: rough, irregular, wet
    pub fn create_zombie() -> Self {
        Self {
            formant_shift: FormantShift::new(-120.0),
            breathiness: Breathiness::new(0.3),
            roughness: Roughness::new(0.75),
            wet_sounds: WetSounds::new(0.7),
            vocal_fold_irregularity: VocalFoldIrregularity::new(0.8),
            bandwidth_expansion: BandwidthExpansion::new(1.8),
            subglottal_pressure: SubglottalPressure::new(0.7),
            ..Self::default()
        }
    }

    /// Long vocal tract with a subharmonic growl
    pub fn create_werewolf() -> Self {
        Self {
            formant_shift: FormantShift::new(-180.0),
            formant_scale: FormantScale::new(0.82),
            roughness: Roughness::new(0.4),
            growl_harmonics: GrowlHarmonics::new(0.8),
            tension: Tension::new(0.7),
            subglottal_pressure: SubglottalPressure::new(1.5),
            ..Self::default()
        }
    }

    /// Whispered, disembodied voice
    pub fn create_wraith() -> Self {
        Self {
            formant_scale: FormantScale::new(1.12),
            breathiness: Breathiness::new(0.35),
            hollow_resonance: HollowResonance::new(0.4),
            whisper_amount: WhisperAmount::new(0.85),
            bandwidth_expansion: BandwidthExpansion::new(1.4),
            subglottal_pressure: SubglottalPressure::new(0.6),
            ..Self::default()
        }
    }

    /// Preset for a named archetype; `Unknown` maps to the human baseline
    pub fn for_archetype(archetype: Archetype) -> Self {
        match archetype {
            Archetype::Human | Archetype::Unknown => Self::create_human(),
            Archetype::Vampire => Self::create_vampire(),
            Archetype::Zombie => Self::create_zombie(),
            Archetype::Werewolf => Self::create_werewolf(),
            Archetype::Wraith => Self::create_wraith(),
        }
    }

    /// Classify the parameter set
    ///
    /// Checks run in a fixed precedence: vampire (breathiness + hollow
    /// resonance), zombie (roughness + irregularity), werewolf (growl),
    /// wraith (whisper), then human when every aberration is near zero.
    /// The first match wins; magnitudes are never compared across categories.
    pub fn archetype(&self) -> Archetype {
        let over = |v: f32| v > ARCHETYPE_THRESHOLD;

        if over(self.breathiness.get()) && over(self.hollow_resonance.get()) {
            Archetype::Vampire
        } else if over(self.roughness.get()) && over(self.vocal_fold_irregularity.get()) {
            Archetype::Zombie
        } else if over(self.growl_harmonics.get()) {
            Archetype::Werewolf
        } else if over(self.whisper_amount.get()) {
            Archetype::Wraith
        } else if self.is_near_human() {
            Archetype::Human
        } else {
            Archetype::Unknown
        }
    }

    fn is_near_human(&self) -> bool {
        let amounts = [
            self.breathiness.get(),
            self.roughness.get(),
            self.hollow_resonance.get(),
            self.wet_sounds.get(),
            self.vocal_fold_irregularity.get(),
            self.growl_harmonics.get(),
            self.whisper_amount.get(),
        ];
        amounts.iter().all(|&v| v < HUMAN_AMOUNT_CEILING)
            && self.formant_shift.get().abs() < HUMAN_SHIFT_CEILING_HZ
            && (self.formant_scale.get() - 1.0).abs() < HUMAN_RATIO_TOLERANCE
            && (self.bandwidth_expansion.get() - 1.0).abs() < HUMAN_RATIO_TOLERANCE
    }

    /// Pitch-stillness amount for the pitch stabilizer
    ///
    /// `hollow_resonance` carries two meanings: the perceived hollowness of
    /// the voice and, through this adapter, how hard the pitch stabilizer
    /// locks the voice to a fixed pitch. Both come from the same field so that
    /// existing presets keep their behavior.
    #[inline]
    pub fn pitch_stillness(&self) -> f32 {
        self.hollow_resonance.get()
    }

    /// Deterministic human-readable dump of every field and the archetype
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let rows: [(&str, String); 12] = [
            ("formant_shift", self.formant_shift.to_string()),
            ("formant_scale", self.formant_scale.to_string()),
            ("breathiness", self.breathiness.to_string()),
            ("roughness", self.roughness.to_string()),
            ("hollow_resonance", self.hollow_resonance.to_string()),
            ("wet_sounds", self.wet_sounds.to_string()),
            (
                "vocal_fold_irregularity",
                self.vocal_fold_irregularity.to_string(),
            ),
            ("bandwidth_expansion", self.bandwidth_expansion.to_string()),
            ("growl_harmonics", self.growl_harmonics.to_string()),
            ("whisper_amount", self.whisper_amount.to_string()),
            ("tension", self.tension.to_string()),
            ("subglottal_pressure", self.subglottal_pressure.to_string()),
        ];
        for (name, value) in rows {
            // Writing into a String cannot fail
            let _ = writeln!(out, "{:<24}{}", name, value);
        }
        let _ = write!(out, "{:<24}{}", "archetype", self.archetype());
        out
    }
}
