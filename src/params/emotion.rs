//! Emotion modulation layer
//!
//! Emotions are points in PAD space (pleasure/valence, arousal, dominance),
//! each dimension normalised to 0-1 with 0.5 as neutral. `apply_to` bends an
//! archetype preset toward the emotion without mutating the preset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::aberration::AberrationParams;

/// Named emotions with fixed PAD coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    #[default]
    Neutral,
    Fear,
    Anger,
    Joy,
    Sadness,
    Disgust,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Emotion::Neutral,
        Emotion::Fear,
        Emotion::Anger,
        Emotion::Joy,
        Emotion::Sadness,
        Emotion::Disgust,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Fear => "fear",
            Emotion::Anger => "anger",
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Disgust => "disgust",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown emotion '{}'", s))
    }
}

/// Emotional state in normalised PAD space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionState {
    arousal: f32,
    valence: f32,
    dominance: f32,
}

impl Default for EmotionState {
    fn default() -> Self {
        Self::from_emotion(Emotion::Neutral)
    }
}

impl EmotionState {
    /// Create a state, clamping every dimension to [0, 1]
    pub fn new(arousal: f32, valence: f32, dominance: f32) -> Self {
        Self {
            arousal: unit(arousal),
            valence: unit(valence),
            dominance: unit(dominance),
        }
    }

    /// PAD coordinates for a named emotion
    pub fn from_emotion(emotion: Emotion) -> Self {
        match emotion {
            Emotion::Neutral => Self::new(0.5, 0.5, 0.5),
            Emotion::Fear => Self::new(0.85, 0.15, 0.2),
            Emotion::Anger => Self::new(0.9, 0.1, 0.9),
            Emotion::Joy => Self::new(0.7, 0.9, 0.6),
            Emotion::Sadness => Self::new(0.2, 0.15, 0.25),
            Emotion::Disgust => Self::new(0.55, 0.2, 0.6),
        }
    }

    pub fn arousal(&self) -> f32 {
        self.arousal
    }

    pub fn valence(&self) -> f32 {
        self.valence
    }

    pub fn dominance(&self) -> f32 {
        self.dominance
    }

    /// Return a modulated copy of `base`
    ///
    /// Offsets are computed from the distance to neutral (0.5) on each axis,
    /// so the neutral state returns `base` unchanged. Results pass through
    /// the clamping setters.
    pub fn apply_to(&self, base: &AberrationParams) -> AberrationParams {
        let a = self.arousal - 0.5;
        let v = self.valence - 0.5;
        let d = self.dominance - 0.5;
        let negative = (-v).max(0.0);

        let mut out = *base;

        // High arousal tightens and pushes the folds; low arousal lets air through
        out.tension.set(base.tension.get() + a * 0.5 + d * 0.2);
        out.subglottal_pressure
            .set(base.subglottal_pressure.get() * (1.0 + a * 0.6));
        out.breathiness
            .set(base.breathiness.get() + (-a).max(0.0) * 0.4);

        // Negative valence roughens and destabilises the voice
        out.roughness
            .set(base.roughness.get() + a.max(0.0) * 0.3 + negative * 0.2);
        out.vocal_fold_irregularity
            .set(base.vocal_fold_irregularity.get() + a.abs() * 0.1 + negative * 0.2);

        // Dominant hostility growls, submission whispers
        out.growl_harmonics
            .set(base.growl_harmonics.get() + d.max(0.0) * negative * 1.2);
        out.whisper_amount
            .set(base.whisper_amount.get() + (-d).max(0.0) * 0.4);

        // Pleasant emotions brighten the formants
        out.formant_shift.set(base.formant_shift.get() + v * 80.0);

        out
    }
}

#[inline]
fn unit(value: f32) -> f32 {
    if value.is_nan() {
        0.5
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Archetype;

    #[test]
    fn test_neutral_is_identity() {
        let neutral = EmotionState::from_emotion(Emotion::Neutral);
        for archetype in Archetype::PRESETS {
            let base = AberrationParams::for_archetype(archetype);
            assert_eq!(neutral.apply_to(&base), base);
        }
    }

    #[test]
    fn test_apply_does_not_mutate_input() {
        let base = AberrationParams::create_vampire();
        let copy = base;
        let _ = EmotionState::from_emotion(Emotion::Anger).apply_to(&base);
        assert_eq!(base, copy);
    }

    #[test]
    fn test_anger_roughens_and_growls() {
        let base = AberrationParams::create_human();
        let angry = EmotionState::from_emotion(Emotion::Anger).apply_to(&base);
        assert!(angry.roughness.get() > base.roughness.get());
        assert!(angry.growl_harmonics.get() > base.growl_harmonics.get());
        assert!(angry.tension.get() > base.tension.get());
        assert!(angry.subglottal_pressure.get() > base.subglottal_pressure.get());
    }

    #[test]
    fn test_sadness_is_breathy_and_fear_whispers() {
        let base = AberrationParams::create_human();
        let sad = EmotionState::from_emotion(Emotion::Sadness).apply_to(&base);
        assert!(sad.breathiness.get() > 0.0);
        assert!(sad.subglottal_pressure.get() < 1.0);

        let afraid = EmotionState::from_emotion(Emotion::Fear).apply_to(&base);
        assert!(afraid.whisper_amount.get() > 0.0);
    }

    #[test]
    fn test_results_stay_clamped() {
        let extreme = EmotionState::new(1.0, 0.0, 1.0);
        let maxed = extreme.apply_to(&AberrationParams::create_zombie());
        assert!(maxed.roughness.get() <= 1.0);
        assert!(maxed.growl_harmonics.get() <= 1.0);
        assert!(maxed.subglottal_pressure.get() <= 2.0);
    }

    #[test]
    fn test_new_clamps_dimensions() {
        let state = EmotionState::new(3.0, -1.0, f32::NAN);
        assert_eq!(state.arousal(), 1.0);
        assert_eq!(state.valence(), 0.0);
        assert_eq!(state.dominance(), 0.5);
    }

    #[test]
    fn test_emotion_parse() {
        assert_eq!("Anger".parse::<Emotion>().unwrap(), Emotion::Anger);
        assert!("boredom".parse::<Emotion>().is_err());
    }
}
