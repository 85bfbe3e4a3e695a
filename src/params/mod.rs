//! Strongly-typed aberration parameters
//!
//! Clamped per-field newtypes, the `AberrationParams` record with archetype
//! presets, and the `EmotionState` modulation layer.

pub mod aberration;
pub mod emotion;
pub mod typed;

pub use aberration::{AberrationParams, Archetype};
pub use emotion::{Emotion, EmotionState};
pub use typed::{
    BandwidthExpansion, Breathiness, FormantScale, FormantShift, GrowlHarmonics,
    HollowResonance, Roughness, SubglottalPressure, Tension, VocalFoldIrregularity, WetSounds,
    WhisperAmount,
};
